pub mod explorer;
pub mod files;
pub mod history;

use ratatui::{
    Frame,
    layout::Rect,
    style::{Modifier, Style},
    widgets::{List, ListItem, ListState},
};

use super::{ScreenLayout, pane_block, render_scrollbar};
use crate::theme::Palette;

pub(crate) struct ListPane {
    pub title: String,
    pub active: bool,
    pub offset: usize,
    /// Row index, headers included.
    pub selected: Option<usize>,
}

/// Paints the window of `items` starting at the pane's offset. The window
/// is cut here rather than by `List` so the painted offset is always the
/// one the mouse mapper uses.
pub(crate) fn render_list_window(f: &mut Frame, palette: &Palette, area: Rect, pane: ListPane, items: Vec<ListItem<'static>>) {
    let ListPane {
        title,
        active,
        offset,
        selected,
    } = pane;
    let total = items.len();
    f.render_widget(pane_block(palette, title, active), area);
    let inner = ScreenLayout::inner(area);
    let height = usize::from(inner.height);

    let window: Vec<ListItem> = items.into_iter().skip(offset).take(height).collect();
    let selected = selected
        .and_then(|s| s.checked_sub(offset))
        .filter(|s| *s < height);
    let mut state = ListState::default().with_selected(selected);

    let mut highlight = Style::default().bg(palette.selection_bg);
    if active {
        highlight = highlight.add_modifier(Modifier::BOLD);
    }
    let list = List::new(window)
        .highlight_style(highlight)
        .highlight_symbol("▎");
    f.render_stateful_widget(list, inner, &mut state);

    render_scrollbar(f, area, total, offset);
}
