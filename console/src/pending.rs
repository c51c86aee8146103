use common::{ClearSummary, CommandId, PcId, PendingListResponse};

use crate::api::ApiClient;
use crate::error::ConsoleError;

/// Lists and clears commands still queued server-side, independent of any
/// live batch. Listing is fleet-wide; clearing is scoped to the targets it
/// is given.
#[derive(Debug, Clone)]
pub struct PendingQueue {
    api: ApiClient,
}

impl PendingQueue {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// All pending commands, in the server's order. Not re-sorted here.
    pub async fn list(&self) -> Result<PendingListResponse, ConsoleError> {
        self.api.pending_commands().await
    }

    /// Deletes every pending command for the given endpoints in one
    /// request. The summary counts successes and failures per endpoint;
    /// per-command detail does not exist client-side.
    pub async fn clear_for(&self, targets: &[PcId]) -> Result<ClearSummary, ConsoleError> {
        if targets.is_empty() {
            return Err(ConsoleError::EmptySelection);
        }
        log::info!("Clearing pending commands for {} endpoints", targets.len());
        self.api.clear_pending(targets).await
    }

    /// Deletes one queued command, then re-fetches the list: the deletion
    /// response does not carry the updated queue.
    pub async fn clear_one(
        &self,
        pc_id: PcId,
        command_id: CommandId,
    ) -> Result<(u64, PendingListResponse), ConsoleError> {
        log::info!("Clearing pending command {} on PC {}", command_id, pc_id);
        let deleted = self.api.clear_pending_one(pc_id).await?;
        let refreshed = self.api.pending_commands().await?;
        Ok((deleted.deleted_count, refreshed))
    }
}
