use serde::{Deserialize, Serialize};

/// Server-reported state of a single dispatched command.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CommandStatus {
    Pending,
    Executing,
    Completed,
    Error,
    Skipped,
}

impl CommandStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error | Self::Skipped)
    }

    /// Ordering used when merging poll responses: a stored status is only
    /// replaced by one with a strictly higher rank, so a late response for
    /// an older snapshot can never undo a terminal status.
    pub fn rank(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Executing => 1,
            Self::Completed | Self::Error | Self::Skipped => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Executing => "executing",
            Self::Completed => "completed",
            Self::Error => "error",
            Self::Skipped => "skipped",
        }
    }
}

impl std::fmt::Display for CommandStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
