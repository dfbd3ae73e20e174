//! Screen coordinates to logical targets.
//!
//! Everything here derives from [`crate::ui::layout_for`] and the pane row
//! enumeration in [`crate::panes`], the same inputs the renderer paints from.

use ratatui::layout::{Position, Rect};

use crate::panes::{PaneRow, selection_of_row};
use crate::state::ui::{Pane, Tab};
use crate::ui::{ScreenLayout, footer_tabs};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MouseTarget {
    /// Selection index in the top pane.
    TopItem(usize),
    /// Wrapped row index in the bottom pane.
    BottomRow(usize),
    FooterTab(Tab),
    None,
}

/// Scroll position and row count of the bottom pane.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BottomView {
    pub offset: usize,
    pub total: usize,
}

/// Row index inside `rect`'s bordered content area, `None` on the border
/// or past the last row.
pub fn pane_row_at(rect: Rect, offset: usize, total: usize, col: u16, row: u16) -> Option<usize> {
    let inner = ScreenLayout::inner(rect);
    if !inner.contains(Position::new(col, row)) {
        return None;
    }
    let idx = offset + usize::from(row - inner.y);
    (idx < total).then_some(idx)
}

pub fn hit_test<R: PaneRow>(
    layout: &ScreenLayout,
    top_rows: &[R],
    top_offset: usize,
    bottom: BottomView,
    col: u16,
    row: u16,
) -> MouseTarget {
    let pos = Position::new(col, row);
    if layout.footer.contains(pos) {
        return footer_tabs(layout.footer)
            .into_iter()
            .find(|(_, r)| r.contains(pos))
            .map_or(MouseTarget::None, |(tab, _)| MouseTarget::FooterTab(tab));
    }
    if layout.top.contains(pos) {
        return pane_row_at(layout.top, top_offset, top_rows.len(), col, row)
            .and_then(|idx| selection_of_row(top_rows, idx))
            .map_or(MouseTarget::None, MouseTarget::TopItem);
    }
    if layout.bottom.contains(pos) {
        return pane_row_at(layout.bottom, bottom.offset, bottom.total, col, row)
            .map_or(MouseTarget::None, MouseTarget::BottomRow);
    }
    MouseTarget::None
}

/// Pane under the cursor, for wheel scrolling.
pub fn pane_at(layout: &ScreenLayout, col: u16, row: u16) -> Option<Pane> {
    let pos = Position::new(col, row);
    if layout.top.contains(pos) {
        Some(Pane::Top)
    } else if layout.bottom.contains(pos) {
        Some(Pane::Bottom)
    } else {
        None
    }
}
