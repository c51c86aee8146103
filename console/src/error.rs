use thiserror::Error;

/// Failure classes the console distinguishes. Preconditions never reach the
/// network; transport failures abort a dispatch but are retried silently
/// during polling; protocol errors are never silently truncated.
#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error("no endpoints selected")]
    EmptySelection,

    #[error("{0}")]
    Precondition(String),

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    /// Server accepted the request but rejected every target.
    #[error("batch rejected: {0}")]
    BatchRejected(String),
}

impl ConsoleError {
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

impl From<reqwest::Error> for ConsoleError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}
