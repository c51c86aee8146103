use common::{ActionKind, CommandId, CommandResult, Endpoint, PcId};
use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::api::ApiClient;
use crate::config::Config;
use crate::dispatch::{BatchResult, Dispatcher};
use crate::error::ConsoleError;
use crate::grid::{DragSelector, SeatGrid};
use crate::selection::SelectionStore;
use crate::tracker::{ResultTracker, TrackerEvent};

/// What a cell click means in the current mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickAction {
    /// Selection mode: membership was toggled.
    Toggled,
    /// Idle mode: the UI should open this endpoint's detail view.
    OpenDetail(PcId),
}

/// Ties the pieces together: the selection store, the cached fleet
/// snapshot, the seat grid, and the single active result tracker. At most
/// one tracker is live; starting a new batch stops the previous one.
pub struct Console {
    api: ApiClient,
    dispatcher: Dispatcher,
    poll_interval: Duration,
    selection: SelectionStore,
    drag: DragSelector,
    grid: SeatGrid,
    fleet: Vec<Endpoint>,
    tracker: Option<ResultTracker>,
}

impl Console {
    pub fn new(api: ApiClient, poll_interval: Duration) -> Self {
        Self {
            dispatcher: Dispatcher::new(api.clone()),
            api,
            poll_interval,
            selection: SelectionStore::new(),
            drag: DragSelector::new(),
            grid: SeatGrid::default(),
            fleet: Vec::new(),
            tracker: None,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, ConsoleError> {
        let api = ApiClient::new(
            &config.server.base_url,
            Duration::from_millis(config.server.request_timeout_ms),
        )?;
        Ok(Self::new(api, Duration::from_millis(config.polling.interval_ms)))
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn selection(&self) -> &SelectionStore {
        &self.selection
    }

    pub fn selection_mut(&mut self) -> &mut SelectionStore {
        &mut self.selection
    }

    pub fn fleet(&self) -> &[Endpoint] {
        &self.fleet
    }

    pub fn endpoint(&self, id: PcId) -> Option<&Endpoint> {
        self.fleet.iter().find(|pc| pc.id == id)
    }

    pub fn grid(&self) -> &SeatGrid {
        &self.grid
    }

    /// Replaces the cached fleet snapshot. The snapshot is owned by the
    /// server; whoever refreshes it pushes it in here.
    pub fn set_fleet(&mut self, fleet: Vec<Endpoint>) {
        self.fleet = fleet;
    }

    pub async fn refresh_fleet(&mut self, room: Option<&str>) -> Result<&[Endpoint], ConsoleError> {
        let fleet = self.api.list_pcs(room).await?;
        log::info!("Fleet snapshot refreshed: {} endpoints", fleet.len());
        self.fleet = fleet;
        Ok(&self.fleet)
    }

    pub async fn load_layout(&mut self, room: &str) -> Result<&SeatGrid, ConsoleError> {
        let layout = self.api.layout_map(room).await?;
        self.grid = SeatGrid::from_layout(&layout);
        Ok(&self.grid)
    }

    // ---- selection-mode interaction -------------------------------------

    pub fn click_cell(&mut self, id: PcId) -> ClickAction {
        if self.selection.selection_mode() {
            self.selection.toggle(id);
            ClickAction::Toggled
        } else {
            ClickAction::OpenDetail(id)
        }
    }

    pub fn pointer_down(&mut self, row: u32, col: u32) {
        self.drag.pointer_down(&self.selection, row, col);
    }

    pub fn pointer_over(&mut self, row: u32, col: u32) {
        self.drag.pointer_over(&self.grid, &mut self.selection, row, col);
    }

    pub fn pointer_up(&mut self) {
        self.drag.pointer_up();
    }

    pub fn select_all_online(&mut self) {
        self.selection.select_online(&self.fleet);
    }

    // ---- batch dispatch and tracking ------------------------------------

    /// Dispatches `action` to the current selection and starts tracking the
    /// accepted commands. The returned receiver yields progress snapshots
    /// and ends with a single `Converged` event; pass that back into
    /// [`finish_batch`](Self::finish_batch).
    ///
    /// Confirmation is the caller's concern: prompt first when
    /// `action.requires_confirmation()` says so.
    pub async fn execute(
        &mut self,
        action: &ActionKind,
    ) -> Result<(BatchResult, UnboundedReceiver<TrackerEvent>), ConsoleError> {
        let targets = self.selection.ids();
        let batch = self.dispatcher.dispatch(action, &targets).await?;
        let api = self.api.clone();
        let events = self.begin_tracking_with(batch.command_ids(), move |ids| {
            let api = api.clone();
            async move { api.poll_results(&ids).await }
        });
        Ok((batch, events))
    }

    /// Starts a tracker for `command_ids` with the given poll function,
    /// stopping any tracker already running first so only one timer is ever
    /// live and an old batch can no longer write anywhere.
    pub fn begin_tracking_with<F, Fut>(
        &mut self,
        command_ids: Vec<CommandId>,
        poll: F,
    ) -> UnboundedReceiver<TrackerEvent>
    where
        F: FnMut(Vec<CommandId>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<Vec<CommandResult>, ConsoleError>> + Send + 'static,
    {
        if let Some(previous) = self.tracker.take() {
            log::info!("Stopping previous result tracker");
            previous.stop();
        }
        let (tracker, events) = ResultTracker::spawn(command_ids, self.poll_interval, poll);
        self.tracker = Some(tracker);
        events
    }

    pub fn has_live_tracker(&self) -> bool {
        self.tracker.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Call once the converged event arrives: releases the tracker slot and
    /// clears the selection, the single per-batch `clear()`.
    pub fn finish_batch(&mut self) {
        self.tracker = None;
        self.selection.clear();
    }

    /// Operator closed the result view before convergence: stop polling
    /// without waiting. The selection is kept.
    pub fn close_results(&mut self) {
        if let Some(tracker) = self.tracker.take() {
            tracker.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn console() -> Console {
        let api = ApiClient::new("http://127.0.0.1:1", Duration::from_millis(100)).unwrap();
        Console::new(api, Duration::from_millis(5))
    }

    fn pc(id: i64, online: bool) -> Endpoint {
        Endpoint {
            id: PcId(id),
            hostname: format!("LAB-{:02}", id),
            seat_number: None,
            room_name: None,
            is_online: online,
            cpu_usage: None,
            ip_address: None,
            mac_address: None,
            machine_id: None,
            created_at: None,
        }
    }

    #[test]
    fn test_click_opens_detail_outside_selection_mode() {
        let mut console = console();
        assert_eq!(console.click_cell(PcId(4)), ClickAction::OpenDetail(PcId(4)));
        assert!(console.selection().is_empty());
    }

    #[test]
    fn test_click_toggles_in_selection_mode() {
        let mut console = console();
        console.selection_mut().enter_selection_mode();
        assert_eq!(console.click_cell(PcId(4)), ClickAction::Toggled);
        assert!(console.selection().has(PcId(4)));
        console.click_cell(PcId(4));
        assert!(!console.selection().has(PcId(4)));
    }

    #[test]
    fn test_select_all_online_uses_snapshot() {
        let mut console = console();
        console.set_fleet(vec![pc(1, true), pc(2, false), pc(3, true)]);
        console.select_all_online();
        assert_eq!(console.selection().ids(), vec![PcId(1), PcId(3)]);
        assert_eq!(console.fleet().len(), 3);
    }

    #[tokio::test]
    async fn test_execute_with_empty_selection_fails_fast() {
        let mut console = console();
        let action = ActionKind::Execute { command: "whoami".to_string() };
        let err = console.execute(&action).await.unwrap_err();
        assert!(matches!(err, ConsoleError::EmptySelection));
        assert!(!console.has_live_tracker());
    }
}
