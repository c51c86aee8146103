use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// A bulk action an operator can fan out to the selected endpoints. Each
/// variant maps to one `command_type` plus its `command_data` object on the
/// wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ActionKind {
    Execute { command: String },
    Message { message: String },
    KillProcess { process_name: String },
    Install { app_id: String },
    Download { url: String, destination: String },
    CreateUser { username: String, password: String, language: Option<String> },
    DeleteUser { username: String },
    ChangePassword { username: String, new_password: String },
    Shutdown,
    Restart,
}

impl ActionKind {
    pub fn command_type(&self) -> &'static str {
        match self {
            Self::Execute { .. } => "execute",
            Self::Message { .. } => "message",
            Self::KillProcess { .. } => "kill_process",
            Self::Install { .. } => "install",
            Self::Download { .. } => "download",
            Self::CreateUser { .. } => "create_user",
            Self::DeleteUser { .. } => "delete_user",
            Self::ChangePassword { .. } => "change_password",
            Self::Shutdown => "shutdown",
            Self::Restart => "restart",
        }
    }

    pub fn command_data(&self) -> Value {
        match self {
            Self::Execute { command } => json!({ "command": command }),
            Self::Message { message } => json!({ "message": message }),
            Self::KillProcess { process_name } => json!({ "process_name": process_name }),
            Self::Install { app_id } => json!({ "app_id": app_id }),
            Self::Download { url, destination } => {
                json!({ "url": url, "destination": destination })
            }
            Self::CreateUser { username, password, language } => json!({
                "username": username,
                "password": password,
                "language": language.as_deref().unwrap_or(""),
            }),
            Self::DeleteUser { username } => json!({ "username": username }),
            Self::ChangePassword { username, new_password } => {
                json!({ "username": username, "new_password": new_password })
            }
            Self::Shutdown | Self::Restart => json!({}),
        }
    }

    /// Power actions carry their own confirmation upstream, so they bypass
    /// the generic pre-send prompt every other kind requires.
    pub fn requires_confirmation(&self) -> bool {
        !matches!(self, Self::Shutdown | Self::Restart)
    }

    /// Rejects empty required fields before anything touches the network.
    pub fn validate(&self) -> Result<()> {
        let missing = |what: &str| Err(anyhow!("{} must not be empty", what));
        match self {
            Self::Execute { command } if command.trim().is_empty() => missing("command"),
            Self::Message { message } if message.trim().is_empty() => missing("message"),
            Self::KillProcess { process_name } if process_name.trim().is_empty() => {
                missing("process name")
            }
            Self::Install { app_id } if app_id.trim().is_empty() => missing("package id"),
            Self::Download { url, destination } => {
                if url.trim().is_empty() {
                    missing("url")
                } else if destination.trim().is_empty() {
                    missing("destination")
                } else {
                    Ok(())
                }
            }
            Self::CreateUser { username, password, .. } => {
                if username.trim().is_empty() {
                    missing("username")
                } else if password.is_empty() {
                    missing("password")
                } else {
                    Ok(())
                }
            }
            Self::DeleteUser { username } if username.trim().is_empty() => missing("username"),
            Self::ChangePassword { username, new_password } => {
                if username.trim().is_empty() {
                    missing("username")
                } else if new_password.is_empty() {
                    missing("new password")
                } else {
                    Ok(())
                }
            }
            _ => Ok(()),
        }
    }
}
