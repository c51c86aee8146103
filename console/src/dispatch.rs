use common::{ActionKind, BulkCommandRequest, BulkCommandResponse, CommandId, DispatchStatus, PcId};

use crate::api::ApiClient;
use crate::error::ConsoleError;

/// A target the server accepted, with the command id to poll for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcceptedCommand {
    pub pc_id: PcId,
    pub command_id: CommandId,
}

/// Outcome of fanning one action out to a set of targets. Rejected targets
/// are counted, not retried; the accepted sublist is what a tracker polls.
#[derive(Debug, Clone)]
pub struct BatchResult {
    pub accepted: Vec<AcceptedCommand>,
    pub rejected: usize,
}

impl BatchResult {
    pub fn command_ids(&self) -> Vec<CommandId> {
        self.accepted.iter().map(|a| a.command_id).collect()
    }

    /// Pairs the server's per-target outcomes back with the targets they
    /// were sent for. The response order mirrors the request order; a length
    /// mismatch means the pairing is meaningless and is refused outright.
    pub fn from_response(
        targets: &[PcId],
        response: BulkCommandResponse,
    ) -> Result<Self, ConsoleError> {
        if response.success == 0 {
            let reason = response
                .error
                .unwrap_or_else(|| "all targets rejected".to_string());
            return Err(ConsoleError::BatchRejected(reason));
        }
        if response.results.len() != targets.len() {
            return Err(ConsoleError::Protocol(format!(
                "{} targets sent but {} outcomes returned",
                targets.len(),
                response.results.len()
            )));
        }

        let mut accepted = Vec::new();
        let mut rejected = 0;
        for (pc_id, entry) in targets.iter().zip(response.results) {
            match entry.status {
                DispatchStatus::Success => {
                    let command_id = entry.command_id.ok_or_else(|| {
                        ConsoleError::Protocol(format!(
                            "accepted target {} carries no command id",
                            pc_id
                        ))
                    })?;
                    accepted.push(AcceptedCommand { pc_id: *pc_id, command_id });
                }
                DispatchStatus::Error => rejected += 1,
            }
        }
        if accepted.is_empty() {
            // success > 0 promised accepted targets; there is nothing to track.
            return Err(ConsoleError::Protocol(
                "positive success count but no accepted outcomes".to_string(),
            ));
        }
        Ok(Self { accepted, rejected })
    }
}

/// Fans one operator action out as a single bulk request over the selected
/// targets.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    api: ApiClient,
}

impl Dispatcher {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Preconditions (empty selection, blank required fields) are rejected
    /// before any network call. Transport failure aborts the whole batch;
    /// no partial accepted set is assumed.
    pub async fn dispatch(
        &self,
        action: &ActionKind,
        targets: &[PcId],
    ) -> Result<BatchResult, ConsoleError> {
        if targets.is_empty() {
            return Err(ConsoleError::EmptySelection);
        }
        action
            .validate()
            .map_err(|e| ConsoleError::Precondition(e.to_string()))?;

        let request = BulkCommandRequest {
            pc_ids: targets.to_vec(),
            command_type: action.command_type().to_string(),
            command_data: action.command_data(),
        };
        log::info!(
            "Dispatching '{}' to {} endpoints",
            request.command_type,
            targets.len()
        );

        let response = self.api.bulk_command(&request).await?;
        let batch = BatchResult::from_response(targets, response)?;
        if batch.rejected > 0 {
            log::warn!(
                "Dispatch partially rejected: {} accepted, {} rejected",
                batch.accepted.len(),
                batch.rejected
            );
        }
        Ok(batch)
    }
}
