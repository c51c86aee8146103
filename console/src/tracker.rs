use common::{CommandId, CommandResult, CommandStatus};
use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::error::ConsoleError;

#[derive(Debug, Clone, PartialEq, Eq)]
struct CommandState {
    status: CommandStatus,
    detail: Option<String>,
}

/// Per-command status of one tracked batch, merged across poll responses.
/// Merging keeps the most-advanced status seen per command, so a poll
/// response arriving out of order can never regress a terminal status.
#[derive(Debug, Clone)]
pub struct BatchProgress {
    entries: BTreeMap<CommandId, CommandState>,
}

impl BatchProgress {
    pub fn new(command_ids: &[CommandId]) -> Self {
        let entries = command_ids
            .iter()
            .map(|&id| (id, CommandState { status: CommandStatus::Pending, detail: None }))
            .collect();
        Self { entries }
    }

    pub fn merge(&mut self, results: &[CommandResult]) {
        for result in results {
            // Ids outside this batch are ignored; only the current tracker's
            // commands may be written.
            let Some(entry) = self.entries.get_mut(&result.id) else {
                continue;
            };
            let detail = result.result.clone().or_else(|| result.error_message.clone());
            if result.status.rank() > entry.status.rank() {
                entry.status = result.status;
                entry.detail = detail;
            } else if result.status == entry.status && entry.detail.is_none() {
                entry.detail = detail;
            }
        }
    }

    pub fn total(&self) -> usize {
        self.entries.len()
    }

    pub fn terminal_count(&self) -> usize {
        self.entries.values().filter(|e| e.status.is_terminal()).count()
    }

    pub fn is_converged(&self) -> bool {
        self.entries.values().all(|e| e.status.is_terminal())
    }

    pub fn status_of(&self, id: CommandId) -> Option<CommandStatus> {
        self.entries.get(&id).map(|e| e.status)
    }

    pub fn count_of(&self, status: CommandStatus) -> usize {
        self.entries.values().filter(|e| e.status == status).count()
    }

    /// `(command id, status, result-or-error text)` rows in command id order.
    pub fn rows(&self) -> Vec<(CommandId, CommandStatus, Option<String>)> {
        self.entries
            .iter()
            .map(|(&id, e)| (id, e.status, e.detail.clone()))
            .collect()
    }
}

/// Snapshots emitted by a running tracker. `Converged` is sent exactly once
/// and is the last event of the stream.
#[derive(Debug, Clone)]
pub enum TrackerEvent {
    Progress(BatchProgress),
    Converged(BatchProgress),
}

/// Polls command results on a fixed interval until every command in the
/// batch is terminal. Owns its timer task: dropping (or stopping) the
/// tracker aborts the task, so a response still in flight can no longer
/// reach anyone.
#[derive(Debug)]
pub struct ResultTracker {
    handle: tokio::task::JoinHandle<()>,
}

impl ResultTracker {
    /// Starts polling immediately, then on every `interval` tick. `poll`
    /// performs one results request; a transport failure is logged and
    /// skipped, and the next tick retries. There is no retry cap:
    /// convergence is purely status-driven.
    pub fn spawn<F, Fut>(
        command_ids: Vec<CommandId>,
        interval: Duration,
        mut poll: F,
    ) -> (Self, mpsc::UnboundedReceiver<TrackerEvent>)
    where
        F: FnMut(Vec<CommandId>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<Vec<CommandResult>, ConsoleError>> + Send + 'static,
    {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(async move {
            let mut progress = BatchProgress::new(&command_ids);
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                // Every poll carries the full id set, terminal ones included,
                // so the merge stays a plain union.
                match poll(command_ids.clone()).await {
                    Ok(results) => {
                        progress.merge(&results);
                        if progress.is_converged() {
                            log::info!(
                                "Batch converged: {} of {} commands terminal",
                                progress.terminal_count(),
                                progress.total()
                            );
                            let _ = events_tx.send(TrackerEvent::Converged(progress));
                            return;
                        }
                        let _ = events_tx.send(TrackerEvent::Progress(progress.clone()));
                    }
                    Err(e) => {
                        log::warn!("Result poll failed, retrying next tick: {}", e);
                    }
                }
            }
        });
        (Self { handle }, events_rx)
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Cooperative stop: the task is aborted at its next await point and
    /// the completion event is never sent.
    pub fn stop(self) {
        drop(self);
    }
}

impl Drop for ResultTracker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use tokio::time::timeout;

    fn result(id: i64, status: CommandStatus) -> CommandResult {
        CommandResult {
            id: CommandId(id),
            status,
            result: None,
            error_message: None,
        }
    }

    /// Poll closure replaying a scripted sequence of responses, then
    /// failing with a transport error once the script runs out.
    fn scripted(
        script: Vec<Result<Vec<CommandResult>, ()>>,
    ) -> impl FnMut(Vec<CommandId>) -> std::future::Ready<Result<Vec<CommandResult>, ConsoleError>>
    {
        let script = Arc::new(Mutex::new(script.into_iter().collect::<VecDeque<_>>()));
        move |_ids| {
            let next = script.lock().unwrap().pop_front();
            std::future::ready(match next {
                Some(Ok(results)) => Ok(results),
                Some(Err(())) | None => Err(ConsoleError::Transport("script over".to_string())),
            })
        }
    }

    #[test]
    fn test_merge_never_regresses_terminal() {
        let mut progress = BatchProgress::new(&[CommandId(1)]);
        progress.merge(&[result(1, CommandStatus::Completed)]);
        progress.merge(&[result(1, CommandStatus::Pending)]);
        assert_eq!(progress.status_of(CommandId(1)), Some(CommandStatus::Completed));
        progress.merge(&[result(1, CommandStatus::Executing)]);
        assert_eq!(progress.status_of(CommandId(1)), Some(CommandStatus::Completed));
    }

    #[test]
    fn test_merge_ignores_foreign_ids() {
        let mut progress = BatchProgress::new(&[CommandId(1)]);
        progress.merge(&[result(99, CommandStatus::Completed)]);
        assert_eq!(progress.total(), 1);
        assert!(progress.status_of(CommandId(99)).is_none());
        assert!(!progress.is_converged());
    }

    #[test]
    fn test_merge_keeps_detail_of_winning_status() {
        let mut progress = BatchProgress::new(&[CommandId(1)]);
        progress.merge(&[CommandResult {
            id: CommandId(1),
            status: CommandStatus::Error,
            result: None,
            error_message: Some("boom".to_string()),
        }]);
        progress.merge(&[result(1, CommandStatus::Pending)]);
        let rows = progress.rows();
        assert_eq!(rows[0].1, CommandStatus::Error);
        assert_eq!(rows[0].2.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn test_tracker_converges_and_emits_once() {
        let ids = vec![CommandId(1), CommandId(2)];
        let (tracker, mut events) = ResultTracker::spawn(
            ids,
            Duration::from_millis(5),
            scripted(vec![
                Ok(vec![result(1, CommandStatus::Pending), result(2, CommandStatus::Pending)]),
                Ok(vec![result(1, CommandStatus::Completed), result(2, CommandStatus::Executing)]),
                Ok(vec![result(1, CommandStatus::Completed), result(2, CommandStatus::Error)]),
            ]),
        );

        let mut converged = 0;
        while let Some(event) = timeout(Duration::from_secs(2), events.recv()).await.unwrap() {
            if let TrackerEvent::Converged(progress) = event {
                converged += 1;
                assert_eq!(progress.count_of(CommandStatus::Completed), 1);
                assert_eq!(progress.count_of(CommandStatus::Error), 1);
            }
        }
        // Stream closed after the single converged event.
        assert_eq!(converged, 1);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(tracker.is_finished());
    }

    #[tokio::test]
    async fn test_poll_failure_is_skipped_and_retried() {
        let ids = vec![CommandId(1)];
        let (_tracker, mut events) = ResultTracker::spawn(
            ids,
            Duration::from_millis(5),
            scripted(vec![
                Err(()),
                Err(()),
                Ok(vec![result(1, CommandStatus::Completed)]),
            ]),
        );

        let event = timeout(Duration::from_secs(2), events.recv()).await.unwrap().unwrap();
        assert!(matches!(event, TrackerEvent::Converged(_)));
    }

    #[tokio::test]
    async fn test_stop_aborts_without_convergence() {
        let polls = Arc::new(Mutex::new(0u32));
        let counter = polls.clone();
        let (tracker, mut events) = ResultTracker::spawn(
            vec![CommandId(1)],
            Duration::from_millis(5),
            move |_ids| {
                *counter.lock().unwrap() += 1;
                std::future::ready(Ok(vec![result(1, CommandStatus::Pending)]))
            },
        );

        // Let a few ticks happen, then stop mid-flight.
        tokio::time::sleep(Duration::from_millis(30)).await;
        tracker.stop();
        tokio::time::sleep(Duration::from_millis(30)).await;
        let after_stop = *polls.lock().unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(*polls.lock().unwrap(), after_stop);

        // Drain: only progress events, never a converged one.
        while let Some(event) = events.recv().await {
            assert!(matches!(event, TrackerEvent::Progress(_)));
        }
    }
}
