use common::{LayoutMap, PcId};
use std::collections::HashMap;

use crate::selection::SelectionStore;

/// Occupancy snapshot of one room's seating grid: which `(row, col)` cells
/// hold a PC. Built from the server's layout map; empty seats are dropped.
#[derive(Debug, Clone, Default)]
pub struct SeatGrid {
    rows: u32,
    cols: u32,
    occupied: HashMap<(u32, u32), PcId>,
}

impl SeatGrid {
    pub fn from_layout(layout: &LayoutMap) -> Self {
        let occupied = layout
            .seats
            .iter()
            .filter_map(|seat| seat.pc_id.map(|id| ((seat.row, seat.col), id)))
            .collect();
        Self {
            rows: layout.rows,
            cols: layout.cols,
            occupied,
        }
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn cols(&self) -> u32 {
        self.cols
    }

    pub fn pc_at(&self, row: u32, col: u32) -> Option<PcId> {
        self.occupied.get(&(row, col)).copied()
    }

    /// Occupied cells inside the closed rectangle spanned by two corners,
    /// in either corner order.
    pub fn pcs_in_rect(&self, a: (u32, u32), b: (u32, u32)) -> Vec<PcId> {
        let (min_row, max_row) = (a.0.min(b.0), a.0.max(b.0));
        let (min_col, max_col) = (a.1.min(b.1), a.1.max(b.1));
        self.occupied
            .iter()
            .filter(|(&(row, col), _)| {
                row >= min_row && row <= max_row && col >= min_col && col <= max_col
            })
            .map(|(_, &id)| id)
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DragState {
    Idle,
    Dragging { anchor: (u32, u32) },
}

/// Translates pointer events over the grid into range selections. Selection
/// only grows during a drag (paint semantics); the anchor is the cell where
/// the pointer went down.
#[derive(Debug)]
pub struct DragSelector {
    state: DragState,
}

impl Default for DragSelector {
    fn default() -> Self {
        Self::new()
    }
}

impl DragSelector {
    pub fn new() -> Self {
        Self { state: DragState::Idle }
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging { .. })
    }

    /// Pointer pressed on a cell. Ignored outside selection mode.
    pub fn pointer_down(&mut self, selection: &SelectionStore, row: u32, col: u32) {
        if !selection.selection_mode() {
            return;
        }
        self.state = DragState::Dragging { anchor: (row, col) };
    }

    /// Pointer moved onto a cell. While dragging, unions every occupied cell
    /// in the anchor-to-here rectangle into the selection.
    pub fn pointer_over(
        &mut self,
        grid: &SeatGrid,
        selection: &mut SelectionStore,
        row: u32,
        col: u32,
    ) {
        let anchor = match self.state {
            DragState::Dragging { anchor } if selection.selection_mode() => anchor,
            _ => return,
        };
        selection.add_range(grid.pcs_in_rect(anchor, (row, col)));
    }

    /// Pointer released anywhere, including outside the grid. The caller
    /// must wire this to a global listener so a drag cannot get stuck when
    /// the pointer leaves the grid bounds.
    pub fn pointer_up(&mut self) {
        self.state = DragState::Idle;
    }
}
