//! Diff and Commit tabs: the file list, the selected file's diff and the
//! commit panel.

use ratatui::{
    Frame,
    layout::{Position, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{ListItem, Paragraph},
};

use super::{ListPane, render_list_window};
use crate::app::App;
use crate::git::{FileStatus, StagingState, display_width, truncate_to_width};
use crate::panes::{FileListRow, row_of_selection, selectable_count};
use crate::ui::detail::{RowsView, render_rows};
use crate::ui::{ScreenLayout, pane_block, render_placeholder, render_scrollbar};
use crate::theme::Palette;

pub fn render_file_list(f: &mut Frame, app: &App, palette: &Palette, area: Rect, active: bool) {
    let ui = app.ui();
    let status = app.status();
    let rows = app.file_rows();
    let mut title = format!(" Files ({}) ", selectable_count(&rows));
    if ui.flat_view {
        title.push_str("flat ");
    }
    if ui.tree_view {
        title.push_str("tree ");
    }

    if rows.is_empty() {
        f.render_widget(pane_block(palette, title, active), area);
        let text = if status.loading {
            "Loading status…"
        } else {
            "Working tree clean"
        };
        render_placeholder(f, palette, ScreenLayout::inner(area), text, false);
        return;
    }

    let items = rows.iter().map(|r| file_row_item(palette, r)).collect();
    let pane = ListPane {
        title,
        active,
        offset: ui.scroll.file_list,
        selected: row_of_selection(&rows, ui.selection.file),
    };
    render_list_window(f, palette, area, pane, items);
}

fn file_row_item(palette: &Palette, row: &FileListRow) -> ListItem<'static> {
    match row {
        FileListRow::Header { title, count } => ListItem::new(Line::from(Span::styled(
            format!("{title} ({count})"),
            Style::default()
                .fg(palette.accent_secondary)
                .add_modifier(Modifier::BOLD),
        ))),
        FileListRow::Spacer => ListItem::new(""),
        FileListRow::Directory { label } => ListItem::new(Line::from(Span::styled(
            label.clone(),
            Style::default().fg(palette.dir_color),
        ))),
        FileListRow::File { item, label } => {
            let color = match (item.staging, item.status) {
                (_, FileStatus::Conflicted) => palette.error_fg,
                (StagingState::Staged, _) => palette.staged_fg,
                (StagingState::Partial, _) => palette.accent_secondary,
                (_, FileStatus::Untracked) => palette.untracked_fg,
                _ => palette.modified_fg,
            };
            let marker = match item.staging {
                StagingState::Staged => "●",
                StagingState::Partial => "◐",
                StagingState::Unstaged => "○",
            };
            ListItem::new(Line::from(vec![
                Span::styled(format!("{marker} "), Style::default().fg(palette.border_inactive)),
                Span::styled(format!("{} ", item.status.symbol()), Style::default().fg(color)),
                Span::styled(label.clone(), Style::default().fg(palette.fg)),
            ]))
        }
    }
}

pub fn render_diff(f: &mut Frame, app: &App, palette: &Palette, area: Rect, active: bool) {
    let ui = app.ui();
    let status = app.status();
    let selected = app.selected_file();
    let title = match &selected {
        Some(file) => format!(" {} ", file.path),
        None => " Diff ".to_string(),
    };
    f.render_widget(pane_block(palette, title, active), area);
    let inner = ScreenLayout::inner(area);

    if let Some(err) = &status.diff_error {
        render_placeholder(f, palette, inner, err, true);
        return;
    }
    let rows = app.bottom_rows();
    if rows.is_empty() {
        let text = if status.diff_loading {
            "Loading diff…"
        } else if selected.is_none() {
            "No file selected"
        } else {
            "No textual changes"
        };
        render_placeholder(f, palette, inner, text, false);
        return;
    }

    let view = RowsView {
        rows: &rows,
        offset: ui.scroll.diff,
        wrap: ui.wrap,
        highlighted: None,
    };
    render_rows(f, palette, inner, &view);
    render_scrollbar(f, area, app.bottom_total(), ui.scroll.diff);
}

/// Summary line over the message editor.
fn commit_summary(app: &App, palette: &Palette) -> Line<'static> {
    let status = app.status();
    if status.committing {
        return Line::from(Span::styled("Committing…", Style::default().fg(palette.accent_primary)));
    }
    let staged = status.staged_count();
    let count = if staged == 0 {
        Span::styled("Nothing staged", Style::default().fg(palette.modified_fg))
    } else {
        Span::styled(
            format!("{staged} staged"),
            Style::default()
                .fg(palette.staged_fg)
                .add_modifier(Modifier::BOLD),
        )
    };
    Line::from(vec![
        count,
        Span::styled(
            "  Ctrl+S commit  Ctrl+A amend  Esc back",
            Style::default().fg(palette.border_inactive),
        ),
    ])
}

pub fn render_commit_panel(f: &mut Frame, app: &App, palette: &Palette, area: Rect, active: bool) {
    let draft = &app.status().commit;
    let title = if draft.amend {
        " Commit (amend) ".to_string()
    } else {
        " Commit ".to_string()
    };
    f.render_widget(pane_block(palette, title, active), area);
    let inner = ScreenLayout::inner(area);
    if inner.height == 0 {
        return;
    }

    f.render_widget(
        Paragraph::new(commit_summary(app, palette)),
        Rect::new(inner.x, inner.y, inner.width, 1),
    );
    let editor = Rect::new(inner.x, inner.y + 1, inner.width, inner.height - 1);
    if editor.height == 0 {
        return;
    }

    let width = usize::from(editor.width);
    let top = usize::from(draft.scroll_y);
    if draft.message.is_empty() && !active {
        f.render_widget(
            Paragraph::new("Commit message").style(Style::default().fg(palette.muted)),
            editor,
        );
    } else {
        let lines: Vec<Line> = draft
            .message
            .split('\n')
            .skip(top)
            .take(usize::from(editor.height))
            .map(|l| Line::from(truncate_to_width(l, width)))
            .collect();
        f.render_widget(Paragraph::new(lines).style(Style::default().fg(palette.fg)), editor);
    }

    if active {
        let (line, col) = draft.cursor_line_col();
        if line >= top && line < top + usize::from(editor.height) {
            let before: String = draft
                .message
                .split('\n')
                .nth(line)
                .unwrap_or("")
                .chars()
                .take(col)
                .collect();
            let x = display_width(&before).min(width.saturating_sub(1));
            f.set_cursor_position(Position::new(
                editor.x + x as u16,
                editor.y + (line - top) as u16,
            ));
        }
    }
}
