use ratatui::{
    Frame,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::ListItem,
};

use super::{ListPane, render_list_window};
use crate::app::App;
use crate::diff::CompareDiff;
use crate::git::CommitEntry;
use crate::panes::{CompareRow, compare_rows, row_of_selection};
use crate::rows::DisplayRow;
use crate::theme::Palette;
use crate::ui::detail::{RowsView, render_rows};
use crate::ui::{ScreenLayout, pane_block, render_placeholder, render_scrollbar};

fn commit_item(palette: &Palette, c: &CommitEntry) -> ListItem<'static> {
    let mut spans = vec![
        Span::styled(format!("{} ", c.short_hash), Style::default().fg(palette.accent_secondary)),
        Span::styled(c.subject().to_string(), Style::default().fg(palette.fg)),
    ];
    if !c.refs.is_empty() {
        spans.push(Span::styled(
            format!(" ({})", c.refs),
            Style::default()
                .fg(palette.accent_primary)
                .add_modifier(Modifier::BOLD),
        ));
    }
    spans.push(Span::styled(
        format!("  {}, {}", c.author, c.date),
        Style::default().fg(palette.muted),
    ));
    ListItem::new(Line::from(spans))
}

pub fn render_history_list(f: &mut Frame, app: &App, palette: &Palette, area: Rect, active: bool) {
    let ui = app.ui();
    let history = app.history();
    let title = format!(" History ({}) ", history.commits.len());
    if history.commits.is_empty() {
        f.render_widget(pane_block(palette, title, active), area);
        let text = if history.loading {
            "Loading history…"
        } else {
            "No commits yet"
        };
        render_placeholder(f, palette, ScreenLayout::inner(area), text, false);
        return;
    }

    let items = history.commits.iter().map(|c| commit_item(palette, c)).collect();
    let pane = ListPane {
        title,
        active,
        offset: ui.scroll.history,
        selected: Some(ui.selection.history),
    };
    render_list_window(f, palette, area, pane, items);
}

/// Bottom pane of the History and Compare tabs.
fn render_detail(
    f: &mut Frame,
    app: &App,
    palette: &Palette,
    area: Rect,
    title: String,
    active: bool,
    empty: (&str, bool),
) {
    f.render_widget(pane_block(palette, title, active), area);
    let inner = ScreenLayout::inner(area);
    let rows: Vec<DisplayRow> = app.bottom_rows();
    if rows.is_empty() {
        render_placeholder(f, palette, inner, empty.0, empty.1);
        return;
    }
    let ui = app.ui();
    let offset = ui.tab.bottom_scroll().map_or(0, |t| ui.scroll.get(t));
    let view = RowsView {
        rows: &rows,
        offset,
        wrap: ui.wrap,
        highlighted: None,
    };
    render_rows(f, palette, inner, &view);
    render_scrollbar(f, area, app.bottom_total(), offset);
}

pub fn render_commit_detail(f: &mut Frame, app: &App, palette: &Palette, area: Rect, active: bool) {
    let history = app.history();
    let title = match app.selected_commit() {
        Some(c) if history.detail_loading => format!(" {} loading… ", c.short_hash),
        Some(c) => format!(" {} ", c.short_hash),
        None => " Commit ".to_string(),
    };
    let empty = match &history.detail_error {
        Some(e) => (e.as_str(), true),
        None => ("No commit selected", false),
    };
    render_detail(f, app, palette, area, title, active, empty);
}

fn compare_item(palette: &Palette, compare: &CompareDiff, row: CompareRow) -> ListItem<'static> {
    match row {
        CompareRow::Summary {
            files,
            commits,
            additions,
            deletions,
        } => ListItem::new(Line::from(vec![
            Span::styled(
                format!("{commits} commits, {files} files "),
                Style::default()
                    .fg(palette.accent_secondary)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(format!("+{additions} "), Style::default().fg(palette.diff_add_fg)),
            Span::styled(format!("-{deletions}"), Style::default().fg(palette.diff_del_fg)),
        ])),
        CompareRow::File(i) => {
            let Some(file) = compare.files.get(i) else {
                return ListItem::new("");
            };
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{} ", file.status.symbol()),
                    Style::default().fg(palette.modified_fg),
                ),
                Span::styled(file.path.clone(), Style::default().fg(palette.fg)),
                Span::styled(format!("  +{}", file.additions), Style::default().fg(palette.diff_add_fg)),
                Span::styled(format!(" -{}", file.deletions), Style::default().fg(palette.diff_del_fg)),
            ]))
        }
    }
}

pub fn render_compare_list(f: &mut Frame, app: &App, palette: &Palette, area: Rect, active: bool) {
    let ui = app.ui();
    let history = app.history();
    let title = match &history.base_branch {
        Some(base) => format!(" Compare {base}...HEAD "),
        None => " Compare ".to_string(),
    };

    let compare = history.compare.as_deref();
    let Some(compare) = compare.filter(|c| !c.files.is_empty()) else {
        f.render_widget(pane_block(palette, title, active), area);
        let (text, is_error) = if let Some(e) = &history.compare_error {
            (e.clone(), true)
        } else if history.compare_loading {
            ("Comparing…".to_string(), false)
        } else if let Some(base) = &history.base_branch {
            (format!("No differences from {base}"), false)
        } else {
            ("No base branch found, press B to pick one".to_string(), false)
        };
        render_placeholder(f, palette, ScreenLayout::inner(area), &text, is_error);
        return;
    };

    let rows = compare_rows(Some(compare));
    let items = rows.iter().map(|r| compare_item(palette, compare, *r)).collect();
    let pane = ListPane {
        title,
        active,
        offset: ui.scroll.compare,
        selected: row_of_selection(&rows, ui.selection.compare),
    };
    render_list_window(f, palette, area, pane, items);
}

pub fn render_compare_diff(f: &mut Frame, app: &App, palette: &Palette, area: Rect, active: bool) {
    let history = app.history();
    let title = match (&history.compare, &history.base_branch) {
        (Some(c), _) => format!(" Diff against {} ", c.base_branch),
        (None, Some(base)) => format!(" Diff against {base} "),
        (None, None) => " Diff ".to_string(),
    };
    render_detail(f, app, palette, area, title, active, ("Nothing to compare", false));
}
