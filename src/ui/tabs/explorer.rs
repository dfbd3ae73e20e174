use ratatui::{
    Frame,
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::ListItem,
};

use super::{ListPane, render_list_window};
use crate::app::App;
use crate::panes::{ExplorerRow, explorer_rows};
use crate::state::explorer::ExplorerEntry;
use crate::theme::Palette;
use crate::ui::detail::{RowsView, render_rows};
use crate::ui::{ScreenLayout, pane_block, render_placeholder, render_scrollbar};

fn entry_item(palette: &Palette, entry: &ExplorerEntry) -> ListItem<'static> {
    let (text, color) = if entry.is_dir {
        (format!("{}/", entry.name), palette.dir_color)
    } else if entry.name.starts_with('.') {
        (entry.name.clone(), palette.muted)
    } else {
        (entry.name.clone(), palette.fg)
    };
    ListItem::new(Line::from(Span::styled(text, Style::default().fg(color))))
}

pub fn render_explorer_list(f: &mut Frame, app: &App, palette: &Palette, area: Rect, active: bool) {
    let ui = app.ui();
    let ex = app.explorer();
    let mut title = format!(" {} ", ex.relative_dir());
    if ex.show_hidden {
        title.push_str("(all) ");
    }

    let rows = explorer_rows(ex.entries.len(), ex.at_root());
    if rows.is_empty() {
        f.render_widget(pane_block(palette, title, active), area);
        let (text, is_error) = match &ex.error {
            Some(e) => (e.as_str(), true),
            None if ex.loading => ("Loading…", false),
            None => ("Empty directory", false),
        };
        render_placeholder(f, palette, ScreenLayout::inner(area), text, is_error);
        return;
    }

    let items = rows
        .iter()
        .map(|row| match row {
            ExplorerRow::Parent => ListItem::new(Line::from(Span::styled(
                "../",
                Style::default().fg(palette.dir_color),
            ))),
            ExplorerRow::Entry(i) => ex
                .entries
                .get(*i)
                .map_or_else(|| ListItem::new(""), |e| entry_item(palette, e)),
        })
        .collect();
    let pane = ListPane {
        title,
        active,
        offset: ui.scroll.explorer,
        selected: Some(ui.selection.explorer),
    };
    render_list_window(f, palette, area, pane, items);
}

pub fn render_content(f: &mut Frame, app: &App, palette: &Palette, area: Rect, active: bool) {
    let ui = app.ui();
    let ex = app.explorer();
    let mut title = match &ex.content_path {
        Some(path) => format!(" {} ", path.strip_prefix(&ex.root).unwrap_or(path).display()),
        None => " Content ".to_string(),
    };
    if ex.content.as_ref().is_some_and(|c| c.truncated) {
        title.push_str("(truncated) ");
    }
    f.render_widget(pane_block(palette, title, active), area);
    let inner = ScreenLayout::inner(area);

    if let Some(e) = &ex.content_error {
        render_placeholder(f, palette, inner, e, true);
        return;
    }
    let Some(content) = &ex.content else {
        let text = if ex.content_loading {
            "Loading…"
        } else {
            "Select a file to preview"
        };
        render_placeholder(f, palette, inner, text, false);
        return;
    };
    if content.is_binary {
        render_placeholder(f, palette, inner, "Binary file", false);
        return;
    }

    let rows = app.bottom_rows();
    if rows.is_empty() {
        render_placeholder(f, palette, inner, "Empty file", false);
        return;
    }
    let view = RowsView {
        rows: &rows,
        offset: ui.scroll.explorer_content,
        wrap: ui.wrap,
        highlighted: content.highlighted.as_deref().map(Vec::as_slice),
    };
    render_rows(f, palette, inner, &view);
    render_scrollbar(f, area, app.bottom_total(), ui.scroll.explorer_content);
}
