use common::{Endpoint, PcId};
use std::collections::BTreeSet;

/// The current set of target endpoints plus the interaction mode. Nothing
/// here touches rendering; the UI layer re-reads the store after every
/// mutation. All operations are total over any id; a stale id is simply
/// ignored by whoever renders the set.
#[derive(Debug, Default)]
pub struct SelectionStore {
    selected: BTreeSet<PcId>,
    selection_mode: bool,
}

impl SelectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flips membership of a single endpoint.
    pub fn toggle(&mut self, id: PcId) {
        if !self.selected.remove(&id) {
            self.selected.insert(id);
        }
    }

    /// Unions a batch of ids into the set (drag rectangles, select-all).
    pub fn add_range<I: IntoIterator<Item = PcId>>(&mut self, ids: I) {
        self.selected.extend(ids);
    }

    /// Selects every online endpoint in the fleet snapshot, entering
    /// selection mode if needed.
    pub fn select_online(&mut self, fleet: &[Endpoint]) {
        if !self.selection_mode {
            self.enter_selection_mode();
        }
        self.add_range(fleet.iter().filter(|pc| pc.is_online).map(|pc| pc.id));
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    pub fn has(&self, id: PcId) -> bool {
        self.selected.contains(&id)
    }

    pub fn size(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Selected ids in ascending order; this is the target order a dispatch
    /// sends, which the server's per-target results mirror.
    pub fn ids(&self) -> Vec<PcId> {
        self.selected.iter().copied().collect()
    }

    pub fn selection_mode(&self) -> bool {
        self.selection_mode
    }

    pub fn enter_selection_mode(&mut self) {
        self.selection_mode = true;
    }

    /// Leaving selection mode clears the set so no stale selection survives
    /// a mode switch.
    pub fn exit_selection_mode(&mut self) {
        self.selection_mode = false;
        self.clear();
    }
}
