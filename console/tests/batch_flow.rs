use common::{
    BulkCommandResponse, ClearSummary, CommandId, CommandResult, CommandStatus, DispatchEntry,
    DispatchStatus, PcId,
};
use pcfleet_console::{ApiClient, BatchResult, Console, ConsoleError, TrackerEvent};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::timeout;

fn console() -> Console {
    // Unroutable address: these tests never perform real HTTP.
    let api = ApiClient::new("http://127.0.0.1:1", Duration::from_millis(100)).unwrap();
    Console::new(api, Duration::from_millis(5))
}

fn accepted(command_ids: &[i64]) -> BulkCommandResponse {
    BulkCommandResponse {
        success: command_ids.len() as u32,
        failed: 0,
        results: command_ids
            .iter()
            .map(|&id| DispatchEntry {
                status: DispatchStatus::Success,
                command_id: Some(CommandId(id)),
                error: None,
            })
            .collect(),
        error: None,
    }
}

fn result(id: i64, status: CommandStatus) -> CommandResult {
    CommandResult {
        id: CommandId(id),
        status,
        result: None,
        error_message: None,
    }
}

fn scripted(
    script: Vec<Vec<CommandResult>>,
) -> impl FnMut(Vec<CommandId>) -> std::future::Ready<Result<Vec<CommandResult>, ConsoleError>> {
    let script = Arc::new(Mutex::new(script.into_iter().collect::<VecDeque<_>>()));
    move |_ids| {
        let next = script.lock().unwrap().pop_front();
        std::future::ready(match next {
            Some(results) => Ok(results),
            None => Err(ConsoleError::Transport("script over".to_string())),
        })
    }
}

/// Select three endpoints, dispatch, watch three polls land, converge with
/// two completed and one error, and end with the selection cleared.
#[tokio::test]
async fn three_endpoint_batch_converges_and_clears_selection() {
    let mut console = console();
    console.selection_mut().enter_selection_mode();
    console.selection_mut().add_range([PcId(1), PcId(2), PcId(3)]);

    let targets = console.selection().ids();
    let batch = BatchResult::from_response(&targets, accepted(&[10, 11, 12])).unwrap();
    assert_eq!(batch.accepted.len(), 3);
    assert_eq!(batch.rejected, 0);

    let mut events = console.begin_tracking_with(
        batch.command_ids(),
        scripted(vec![
            vec![
                result(10, CommandStatus::Pending),
                result(11, CommandStatus::Pending),
                result(12, CommandStatus::Pending),
            ],
            vec![
                result(10, CommandStatus::Completed),
                result(11, CommandStatus::Executing),
                result(12, CommandStatus::Pending),
            ],
            vec![
                result(10, CommandStatus::Completed),
                result(11, CommandStatus::Completed),
                result(12, CommandStatus::Error),
            ],
        ]),
    );

    let mut progress_events = 0;
    loop {
        let event = timeout(Duration::from_secs(2), events.recv())
            .await
            .expect("tracker stalled")
            .expect("stream ended before convergence");
        match event {
            TrackerEvent::Progress(_) => progress_events += 1,
            TrackerEvent::Converged(progress) => {
                assert_eq!(progress.count_of(CommandStatus::Completed), 2);
                assert_eq!(progress.count_of(CommandStatus::Error), 1);
                console.finish_batch();
                break;
            }
        }
    }
    assert_eq!(progress_events, 2);
    assert!(events.recv().await.is_none());
    assert!(console.selection().is_empty());
    assert!(!console.has_live_tracker());
}

/// Dispatching k accepted out of N targets tracks exactly k command ids.
#[tokio::test]
async fn partial_accept_tracks_only_accepted_targets() {
    let targets = vec![PcId(1), PcId(2), PcId(3)];
    let response = BulkCommandResponse {
        success: 2,
        failed: 1,
        results: vec![
            DispatchEntry {
                status: DispatchStatus::Success,
                command_id: Some(CommandId(20)),
                error: None,
            },
            DispatchEntry {
                status: DispatchStatus::Error,
                command_id: None,
                error: Some("offline".to_string()),
            },
            DispatchEntry {
                status: DispatchStatus::Success,
                command_id: Some(CommandId(21)),
                error: None,
            },
        ],
        error: None,
    };
    let batch = BatchResult::from_response(&targets, response).unwrap();
    assert_eq!(batch.rejected, 1);

    let mut console = console();
    let mut events = console.begin_tracking_with(
        batch.command_ids(),
        scripted(vec![vec![
            result(20, CommandStatus::Completed),
            result(21, CommandStatus::Skipped),
            // A stray id outside the batch must be ignored.
            result(999, CommandStatus::Error),
        ]]),
    );

    let event = timeout(Duration::from_secs(2), events.recv()).await.unwrap().unwrap();
    match event {
        TrackerEvent::Converged(progress) => {
            assert_eq!(progress.total(), 2);
            assert!(progress.status_of(CommandId(999)).is_none());
        }
        other => panic!("expected convergence, got {other:?}"),
    }
}

/// Starting batch B stops batch A's tracker; A's stream ends without a
/// converged event and B converges normally.
#[tokio::test]
async fn new_batch_stops_previous_tracker() {
    let mut console = console();

    let mut events_a = console.begin_tracking_with(
        vec![CommandId(1)],
        // Never converges on its own.
        |_ids| std::future::ready(Ok(vec![result(1, CommandStatus::Executing)])),
    );
    tokio::time::sleep(Duration::from_millis(20)).await;

    let mut events_b = console.begin_tracking_with(
        vec![CommandId(2)],
        scripted(vec![vec![result(2, CommandStatus::Completed)]]),
    );

    // A's channel drains to a close without ever seeing convergence.
    while let Some(event) = timeout(Duration::from_secs(2), events_a.recv()).await.unwrap() {
        assert!(matches!(event, TrackerEvent::Progress(_)));
    }

    let event = timeout(Duration::from_secs(2), events_b.recv()).await.unwrap().unwrap();
    match event {
        TrackerEvent::Converged(progress) => {
            assert_eq!(progress.status_of(CommandId(2)), Some(CommandStatus::Completed));
            assert!(progress.status_of(CommandId(1)).is_none());
        }
        other => panic!("expected convergence, got {other:?}"),
    }
}

/// Closing the result view stops polling without convergence and keeps the
/// selection.
#[tokio::test]
async fn closing_results_keeps_selection() {
    let mut console = console();
    console.selection_mut().enter_selection_mode();
    console.selection_mut().add_range([PcId(1)]);

    let mut events = console.begin_tracking_with(
        vec![CommandId(1)],
        |_ids| std::future::ready(Ok(vec![result(1, CommandStatus::Pending)])),
    );
    tokio::time::sleep(Duration::from_millis(20)).await;
    console.close_results();

    while let Some(event) = timeout(Duration::from_secs(2), events.recv()).await.unwrap() {
        assert!(matches!(event, TrackerEvent::Progress(_)));
    }
    assert!(console.selection().has(PcId(1)));
    assert!(!console.has_live_tracker());
}

/// The bulk clear summary is surfaced verbatim: counts are per endpoint,
/// with no per-command breakdown to invent.
#[test]
fn clear_summary_is_surfaced_verbatim() {
    let raw = r#"{"total_deleted": 5, "success": 2, "failed": 0}"#;
    let summary: ClearSummary = serde_json::from_str(raw).unwrap();
    assert_eq!(summary.total_deleted, 5);
    assert_eq!(summary.success, 2);
    assert_eq!(summary.failed, 0);
}
