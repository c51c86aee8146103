use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use comfy_table::Table;
use common::{ActionKind, CommandId, PcId};
use pcfleet_console::{
    BatchProgress, BatchResult, Config, Console, DuplicateResolver, PendingQueue, TrackerEvent,
};
use std::io::Write;
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about = "Operator console for a managed PC fleet", long_about = None)]
struct Cli {
    /// Config file (.yaml or .toml)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Server base URL, overriding the config file
    #[arg(long)]
    server: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct TargetArgs {
    /// Target PC ids, comma separated
    #[arg(long, value_delimiter = ',')]
    pcs: Vec<i64>,
    /// Target every online PC instead of an explicit list
    #[arg(long)]
    all_online: bool,
    /// Restrict --all-online to one room
    #[arg(long)]
    room: Option<String>,
    /// Skip the confirmation prompt
    #[arg(short, long)]
    yes: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List the fleet
    Pcs {
        #[arg(long)]
        room: Option<String>,
    },
    /// Run a shell command on the selected PCs
    Exec {
        #[command(flatten)]
        targets: TargetArgs,
        command: String,
    },
    /// Show a message on the selected PCs
    Message {
        #[command(flatten)]
        targets: TargetArgs,
        message: String,
    },
    /// Kill a process on the selected PCs
    Kill {
        #[command(flatten)]
        targets: TargetArgs,
        process_name: String,
    },
    /// Install a package on the selected PCs
    Install {
        #[command(flatten)]
        targets: TargetArgs,
        app_id: String,
    },
    /// Download a file to the selected PCs
    Download {
        #[command(flatten)]
        targets: TargetArgs,
        url: String,
        destination: String,
    },
    /// Account management on the selected PCs
    User {
        #[command(subcommand)]
        command: UserCommands,
    },
    /// Shut down the selected PCs
    Shutdown {
        #[command(flatten)]
        targets: TargetArgs,
    },
    /// Restart the selected PCs
    Restart {
        #[command(flatten)]
        targets: TargetArgs,
    },
    /// Queued commands not yet picked up by an endpoint
    Pending {
        #[command(subcommand)]
        command: PendingCommands,
    },
    /// PCs registered more than once under the same hostname
    Duplicates {
        #[command(subcommand)]
        command: DuplicateCommands,
    },
}

#[derive(Subcommand)]
enum UserCommands {
    /// Create a local account
    Create {
        #[command(flatten)]
        targets: TargetArgs,
        username: String,
        password: String,
        /// Display language, e.g. ko-KR
        #[arg(long)]
        language: Option<String>,
    },
    /// Delete a local account
    Delete {
        #[command(flatten)]
        targets: TargetArgs,
        username: String,
    },
    /// Change an account password
    Passwd {
        #[command(flatten)]
        targets: TargetArgs,
        username: String,
        new_password: String,
    },
}

#[derive(Subcommand)]
enum PendingCommands {
    /// List all pending commands fleet-wide
    List,
    /// Delete all pending commands for the given PCs
    Clear {
        #[arg(long, value_delimiter = ',', required = true)]
        pcs: Vec<i64>,
        #[arg(short, long)]
        yes: bool,
    },
    /// Delete one pending command, then show the refreshed queue
    ClearOne {
        pc_id: i64,
        command_id: i64,
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum DuplicateCommands {
    /// List duplicate hostname groups
    List,
    /// Delete one PC registration. Irreversible.
    Delete {
        pc_id: i64,
        #[arg(short, long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_ref())?;
    if let Some(server) = cli.server {
        config.server.base_url = server;
    }
    setup_logging(&config)?;

    let mut console = Console::from_config(&config)?;

    match cli.command {
        Commands::Pcs { room } => {
            let room = room.or_else(|| config.room.clone());
            list_pcs(&mut console, room.as_deref()).await
        }
        Commands::Exec { targets, command } => {
            resolve_targets(&mut console, &targets).await?;
            run_action(&mut console, ActionKind::Execute { command }, targets.yes).await
        }
        Commands::Message { targets, message } => {
            resolve_targets(&mut console, &targets).await?;
            run_action(&mut console, ActionKind::Message { message }, targets.yes).await
        }
        Commands::Kill { targets, process_name } => {
            resolve_targets(&mut console, &targets).await?;
            run_action(&mut console, ActionKind::KillProcess { process_name }, targets.yes).await
        }
        Commands::Install { targets, app_id } => {
            resolve_targets(&mut console, &targets).await?;
            run_action(&mut console, ActionKind::Install { app_id }, targets.yes).await
        }
        Commands::Download { targets, url, destination } => {
            resolve_targets(&mut console, &targets).await?;
            run_action(&mut console, ActionKind::Download { url, destination }, targets.yes).await
        }
        Commands::User { command } => match command {
            UserCommands::Create { targets, username, password, language } => {
                resolve_targets(&mut console, &targets).await?;
                let action = ActionKind::CreateUser { username, password, language };
                run_action(&mut console, action, targets.yes).await
            }
            UserCommands::Delete { targets, username } => {
                resolve_targets(&mut console, &targets).await?;
                run_action(&mut console, ActionKind::DeleteUser { username }, targets.yes).await
            }
            UserCommands::Passwd { targets, username, new_password } => {
                resolve_targets(&mut console, &targets).await?;
                let action = ActionKind::ChangePassword { username, new_password };
                run_action(&mut console, action, targets.yes).await
            }
        },
        Commands::Shutdown { targets } => power_action(&mut console, targets, ActionKind::Shutdown).await,
        Commands::Restart { targets } => power_action(&mut console, targets, ActionKind::Restart).await,
        Commands::Pending { command } => pending_command(&console, command).await,
        Commands::Duplicates { command } => duplicates_command(&console, command).await,
    }
}

fn load_config(explicit: Option<&PathBuf>) -> Result<Config> {
    if let Some(path) = explicit {
        return Config::from_file(path);
    }
    let default = PathBuf::from(common::DEFAULT_CONFIG_PATH);
    if default.exists() {
        Config::from_file(&default)
    } else {
        Ok(Config::default())
    }
}

fn setup_logging(config: &Config) -> Result<()> {
    let level = config
        .logging
        .level
        .parse::<log::LevelFilter>()
        .unwrap_or(log::LevelFilter::Info);

    let mut dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}][{}][{}] {}",
                chrono::Local::now().format("%Y-%m-%d][%H:%M:%S"),
                record.target(),
                record.level(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stderr());

    if let Some(path) = &config.logging.output {
        dispatch = dispatch.chain(fern::log_file(path)?);
    }

    dispatch.apply()?;
    Ok(())
}

async fn resolve_targets(console: &mut Console, targets: &TargetArgs) -> Result<()> {
    if targets.all_online {
        console.refresh_fleet(targets.room.as_deref()).await?;
        console.select_all_online();
    } else {
        console
            .selection_mut()
            .add_range(targets.pcs.iter().map(|&id| PcId(id)));
    }
    Ok(())
}

/// Power actions confirm here, before dispatch, and therefore skip the
/// generic gate inside `run_action`.
async fn power_action(console: &mut Console, targets: TargetArgs, action: ActionKind) -> Result<()> {
    resolve_targets(console, &targets).await?;
    let count = console.selection().size();
    let verb = if action == ActionKind::Shutdown { "Shut down" } else { "Restart" };
    if count > 0 && !targets.yes && !confirm(&format!("{} {} selected PCs?", verb, count))? {
        println!("Cancelled.");
        return Ok(());
    }
    run_action(console, action, targets.yes).await
}

async fn run_action(console: &mut Console, action: ActionKind, skip_prompt: bool) -> Result<()> {
    let count = console.selection().size();
    if count > 0 && action.requires_confirmation() && !skip_prompt {
        let prompt = format!("Send '{}' to {} selected PCs?", action.command_type(), count);
        if !confirm(&prompt)? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let (batch, mut events) = console.execute(&action).await?;
    if batch.rejected > 0 {
        println!(
            "Dispatched: {} accepted, {} rejected",
            batch.accepted.len(),
            batch.rejected
        );
    } else {
        println!("Dispatched to {} PCs", batch.accepted.len());
    }

    while let Some(event) = events.recv().await {
        match event {
            TrackerEvent::Progress(progress) => {
                println!("{} / {} completed", progress.terminal_count(), progress.total());
            }
            TrackerEvent::Converged(progress) => {
                print_batch_results(console, &batch, &progress).await;
                console.finish_batch();
            }
        }
    }
    Ok(())
}

async fn print_batch_results(console: &mut Console, batch: &BatchResult, progress: &BatchProgress) {
    // Best effort: labels come from the fleet snapshot when we have one.
    if console.fleet().is_empty() {
        let _ = console.refresh_fleet(None).await;
    }

    let mut table = Table::new();
    table.set_header(vec!["PC", "Command", "Status", "Output"]);
    for accepted in &batch.accepted {
        let label = console
            .endpoint(accepted.pc_id)
            .map(|pc| pc.display_label().to_string())
            .unwrap_or_else(|| accepted.pc_id.to_string());
        let (status, detail) = progress
            .rows()
            .into_iter()
            .find(|(id, _, _)| *id == accepted.command_id)
            .map(|(_, status, detail)| (status.label(), detail.unwrap_or_default()))
            .unwrap_or(("unknown", String::new()));
        table.add_row(vec![
            label,
            accepted.command_id.to_string(),
            status.to_string(),
            detail,
        ]);
    }
    println!("{table}");
    println!(
        "All commands finished: {} completed, {} errors, {} skipped",
        progress.count_of(common::CommandStatus::Completed),
        progress.count_of(common::CommandStatus::Error),
        progress.count_of(common::CommandStatus::Skipped),
    );
}

async fn list_pcs(console: &mut Console, room: Option<&str>) -> Result<()> {
    let fleet = console.refresh_fleet(room).await?;
    let mut table = Table::new();
    table.set_header(vec!["ID", "Hostname", "Seat", "Room", "State", "CPU"]);
    for pc in fleet {
        let state = match pc.load_tier() {
            common::LoadTier::Offline => "offline",
            common::LoadTier::Critical => "online (hot)",
            common::LoadTier::High => "online (busy)",
            common::LoadTier::Normal => "online",
        };
        let cpu = pc
            .cpu_usage
            .map(|c| format!("{:.0}%", c))
            .unwrap_or_else(|| "-".to_string());
        table.add_row(vec![
            pc.id.to_string(),
            pc.hostname.clone(),
            pc.seat_number.clone().unwrap_or_else(|| "-".to_string()),
            pc.room_name.clone().unwrap_or_else(|| "-".to_string()),
            state.to_string(),
            cpu,
        ]);
    }
    println!("{table}");
    Ok(())
}

async fn pending_command(console: &Console, command: PendingCommands) -> Result<()> {
    let queue = PendingQueue::new(console.api().clone());
    match command {
        PendingCommands::List => {
            let pending = queue.list().await?;
            print_pending(&pending);
        }
        PendingCommands::Clear { pcs, yes } => {
            let targets: Vec<PcId> = pcs.into_iter().map(PcId).collect();
            let prompt = format!("Delete all pending commands for {} PCs?", targets.len());
            if !yes && !confirm(&prompt)? {
                println!("Cancelled.");
                return Ok(());
            }
            let summary = queue.clear_for(&targets).await?;
            println!(
                "Deleted {} pending commands ({} PCs ok, {} failed)",
                summary.total_deleted, summary.success, summary.failed
            );
        }
        PendingCommands::ClearOne { pc_id, command_id, yes } => {
            if !yes && !confirm("Delete this pending command?")? {
                println!("Cancelled.");
                return Ok(());
            }
            let (deleted, refreshed) = queue.clear_one(PcId(pc_id), CommandId(command_id)).await?;
            println!("Deleted {} commands", deleted);
            print_pending(&refreshed);
        }
    }
    Ok(())
}

fn print_pending(pending: &common::PendingListResponse) {
    if pending.total == 0 {
        println!("No pending commands.");
        return;
    }
    let mut table = Table::new();
    table.set_header(vec!["PC", "Seat", "Room", "Command", "Type", "Data", "Created", "Priority"]);
    for cmd in &pending.commands {
        table.add_row(vec![
            cmd.hostname.clone().unwrap_or_else(|| cmd.pc_id.to_string()),
            cmd.seat_number.clone().unwrap_or_else(|| "-".to_string()),
            cmd.room_name.clone().unwrap_or_else(|| "-".to_string()),
            cmd.command_id.to_string(),
            cmd.command_type.clone(),
            cmd.data_summary(),
            cmd.created_at.clone(),
            cmd.priority.to_string(),
        ]);
    }
    println!("{table}");
    println!("{} pending commands", pending.total);
}

async fn duplicates_command(console: &Console, command: DuplicateCommands) -> Result<()> {
    let resolver = DuplicateResolver::new(console.api().clone());
    match command {
        DuplicateCommands::List => {
            let listing = resolver.list().await?;
            if listing.total_duplicate_groups == 0 {
                println!("No duplicate PCs.");
                return Ok(());
            }
            for group in &listing.duplicates {
                println!("{} ({} entries)", group.hostname, group.count);
                let mut table = Table::new();
                table.set_header(vec!["ID", "IP", "MAC", "Machine ID", "Registered", "Placement"]);
                for pc in &group.pcs {
                    let placement = match (&pc.room_name, &pc.seat_number) {
                        (Some(room), Some(seat)) => format!("{} ({})", room, seat),
                        (Some(room), None) => room.clone(),
                        _ => "unplaced".to_string(),
                    };
                    table.add_row(vec![
                        pc.id.to_string(),
                        pc.ip_address.clone().unwrap_or_else(|| "-".to_string()),
                        pc.mac_address.clone().unwrap_or_else(|| "-".to_string()),
                        pc.machine_id.clone().unwrap_or_else(|| "-".to_string()),
                        pc.created_at.clone().unwrap_or_else(|| "-".to_string()),
                        placement,
                    ]);
                }
                println!("{table}");
            }
            println!("{} duplicate groups", listing.total_duplicate_groups);
        }
        DuplicateCommands::Delete { pc_id, yes } => {
            let prompt = format!("Really delete PC {}? This cannot be undone.", pc_id);
            if !yes && !confirm(&prompt)? {
                println!("Cancelled.");
                return Ok(());
            }
            let message = resolver.delete_one(PcId(pc_id)).await?;
            println!("{}", message);
            println!("Run 'pcfleet duplicates list' again for the updated groups.");
        }
    }
    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{} [y/N]: ", prompt);
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    let answer = line.trim().to_ascii_lowercase();
    Ok(answer == "y" || answer == "yes")
}
