pub mod action;
pub mod endpoint;
pub mod protocol;
pub mod status;

pub use action::ActionKind;
pub use endpoint::{CommandId, Endpoint, LoadTier, PcId};
pub use protocol::{
    BulkCommandRequest, BulkCommandResponse, ClearSummary, CommandResult, DispatchEntry,
    DispatchStatus, DuplicateGroup, DuplicatesResponse, LayoutMap, LayoutSeat, MessageResponse,
    PcListResponse, PendingCommand, PendingListResponse, ResultsRequest, ResultsResponse,
    SingleClearResponse,
};
pub use status::CommandStatus;

// Production paths
pub const DEFAULT_CONFIG_PATH: &str = "/etc/pcfleet/config.yaml";
pub const DEFAULT_LOG_FILE: &str = "/var/log/pcfleet/console.log";

// Fallback paths for non-root users
pub const USER_CONFIG_PATH: &str = "~/.config/pcfleet/config.yaml";
pub const USER_LOG_FILE: &str = "pcfleet-console.log";

/// Default interval between result polls, in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;
