//! Rendering and screen geometry.
//!
//! `layout_for` and `footer_tabs` are also what the mouse mapper resolves
//! clicks against, so nothing here may place a row that they do not know
//! about.

mod detail;
mod modals;
mod tabs;

use ratatui::{
    Frame,
    layout::{Margin, Rect},
    style::{Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState},
};

use crate::app::App;
use crate::layout::{MIN_TOP_PANE_HEIGHT, max_scroll_offset, split_panes};
use crate::state::ui::{Pane, Tab};
use crate::theme::{Palette, palette};

/// Rows of the header, status line and footer together.
const CHROME_ROWS: u16 = 3;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScreenLayout {
    pub header: Rect,
    pub top: Rect,
    pub bottom: Rect,
    pub status: Rect,
    pub footer: Rect,
}

impl ScreenLayout {
    /// Content area of a bordered pane.
    pub fn inner(rect: Rect) -> Rect {
        rect.inner(Margin {
            vertical: 1,
            horizontal: 1,
        })
    }
}

/// Header, top pane, bottom pane, status line and footer, top to bottom.
/// The top pane asks for `top_rows` plus its two border rows.
pub fn layout_for(area: Rect, top_rows: usize, ratio: f64) -> ScreenLayout {
    let available = area.height.saturating_sub(CHROME_ROWS);
    let heights = split_panes(available, top_rows.saturating_add(2), MIN_TOP_PANE_HEIGHT, ratio);

    let band = |y: u16, height: u16| Rect::new(area.x, y, area.width, height).intersection(area);
    let top_y = area.y.saturating_add(1);
    let bottom_y = top_y.saturating_add(heights.top);
    let status_y = bottom_y.saturating_add(heights.bottom);
    ScreenLayout {
        header: band(area.y, 1),
        top: band(top_y, heights.top),
        bottom: band(bottom_y, heights.bottom),
        status: band(status_y, 1),
        footer: band(status_y.saturating_add(1), 1),
    }
}

fn footer_label(index: usize, tab: Tab) -> String {
    format!(" {} {} ", index + 1, tab.label())
}

/// Footer tab buttons, left to right, one column apart. Labels that would
/// not fit are dropped.
pub fn footer_tabs(footer: Rect) -> Vec<(Tab, Rect)> {
    let mut out = Vec::with_capacity(Tab::ALL.len());
    let mut x = footer.x;
    for (i, tab) in Tab::ALL.into_iter().enumerate() {
        let width = footer_label(i, tab).chars().count() as u16;
        if x.saturating_add(width) > footer.right() {
            break;
        }
        out.push((tab, Rect::new(x, footer.y, width, footer.height.min(1))));
        x += width + 1;
    }
    out
}

pub fn draw(f: &mut Frame, app: &App) {
    let area = f.area();
    let ui = app.ui();
    let palette = palette(ui.theme);
    f.render_widget(Block::default().bg(palette.bg), area);

    let layout = app.screen();
    render_header(f, app, &palette, layout.header);

    let top_active = ui.pane == Pane::Top && ui.modal.is_none();
    let bottom_active = ui.pane == Pane::Bottom && ui.modal.is_none();
    match ui.tab {
        Tab::Diff => {
            tabs::files::render_file_list(f, app, &palette, layout.top, top_active);
            tabs::files::render_diff(f, app, &palette, layout.bottom, bottom_active);
        }
        Tab::Commit => {
            tabs::files::render_file_list(f, app, &palette, layout.top, top_active);
            tabs::files::render_commit_panel(f, app, &palette, layout.bottom, bottom_active);
        }
        Tab::History => {
            tabs::history::render_history_list(f, app, &palette, layout.top, top_active);
            tabs::history::render_commit_detail(f, app, &palette, layout.bottom, bottom_active);
        }
        Tab::Compare => {
            tabs::history::render_compare_list(f, app, &palette, layout.top, top_active);
            tabs::history::render_compare_diff(f, app, &palette, layout.bottom, bottom_active);
        }
        Tab::Explorer => {
            tabs::explorer::render_explorer_list(f, app, &palette, layout.top, top_active);
            tabs::explorer::render_content(f, app, &palette, layout.bottom, bottom_active);
        }
    }

    render_status_line(f, app, &palette, layout.status);
    render_footer(f, app, &palette, layout.footer);

    if let Some(modal) = &ui.modal {
        modals::render_modal(f, &palette, area, modal);
    }
}

/// Bordered pane in the active or inactive border color.
pub(crate) fn pane_block(palette: &Palette, title: String, active: bool) -> Block<'static> {
    let border = if active {
        palette.accent_primary
    } else {
        palette.border_inactive
    };
    Block::default()
        .borders(Borders::ALL)
        .border_set(ratatui::symbols::border::PLAIN)
        .border_style(Style::default().fg(border))
        .title(title)
}

/// Right-edge scrollbar over a bordered pane, only when content overflows.
pub(crate) fn render_scrollbar(f: &mut Frame, area: Rect, total: usize, offset: usize) {
    let visible = usize::from(ScreenLayout::inner(area).height);
    if total <= visible {
        return;
    }
    let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
        .begin_symbol(Some("▴"))
        .end_symbol(Some("▾"))
        .track_symbol(Some("│"))
        .thumb_symbol("█");
    let mut state = ScrollbarState::new(max_scroll_offset(total, visible)).position(offset);
    f.render_stateful_widget(
        scrollbar,
        area.inner(Margin {
            vertical: 1,
            horizontal: 0,
        }),
        &mut state,
    );
}

/// One muted line in the middle of an empty pane.
pub(crate) fn render_placeholder(f: &mut Frame, palette: &Palette, inner: Rect, text: &str, is_error: bool) {
    if inner.height == 0 {
        return;
    }
    let fg = if is_error { palette.error_fg } else { palette.muted };
    let y = inner.y + inner.height / 2;
    f.render_widget(
        Paragraph::new(text.to_string())
            .style(Style::default().fg(fg))
            .centered(),
        Rect::new(inner.x, y, inner.width, 1),
    );
}

fn render_header(f: &mut Frame, app: &App, palette: &Palette, area: Rect) {
    let branch = &app.status().branch;
    let mut spans = vec![
        Span::styled(
            " stagepane ",
            Style::default()
                .bg(palette.accent_primary)
                .fg(palette.bg)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
        Span::styled(app.root().display().to_string(), Style::default().fg(palette.fg)),
    ];

    if !branch.current.is_empty() {
        spans.push(Span::styled(
            format!("  ⎇ {}", branch.current),
            Style::default()
                .fg(palette.accent_secondary)
                .add_modifier(Modifier::BOLD),
        ));
    }
    if let Some(tracking) = &branch.tracking {
        spans.push(Span::styled(
            format!(" → {tracking}"),
            Style::default().fg(palette.border_inactive),
        ));
    }
    if branch.ahead > 0 {
        spans.push(Span::styled(
            format!(" ↑{}", branch.ahead),
            Style::default().fg(palette.staged_fg),
        ));
    }
    if branch.behind > 0 {
        spans.push(Span::styled(
            format!(" ↓{}", branch.behind),
            Style::default().fg(palette.modified_fg),
        ));
    }

    let remote = app.remote();
    if remote.in_progress
        && let Some(op) = remote.operation
    {
        spans.push(Span::styled(
            format!("  {}…", op.label()),
            Style::default().fg(palette.accent_primary),
        ));
    }
    let queue = app.queue();
    if queue.is_busy() {
        spans.push(Span::styled(
            format!("  ⟳ {} queued", queue.pending()),
            Style::default().fg(palette.muted),
        ));
    }

    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// The flash message if one is showing, otherwise the first recorded
/// failure of the active tab's managers.
fn status_message(app: &App) -> Option<(String, bool)> {
    let ui = app.ui();
    if let Some(flash) = &ui.flash {
        return Some((flash.text.clone(), flash.is_error));
    }

    let status = app.status();
    let history = app.history();
    let explorer = app.explorer();
    let errors: Vec<Option<&String>> = match ui.tab {
        Tab::Diff => vec![status.error.as_ref(), status.diff_error.as_ref()],
        Tab::Commit => vec![status.commit_error.as_ref(), status.error.as_ref()],
        Tab::History => vec![history.error.as_ref(), history.detail_error.as_ref()],
        Tab::Compare => vec![history.compare_error.as_ref()],
        Tab::Explorer => vec![explorer.error.as_ref(), explorer.content_error.as_ref()],
    };
    errors
        .into_iter()
        .chain([app.remote().error.as_ref()])
        .flatten()
        .next()
        .map(|e| (e.clone(), true))
}

fn render_status_line(f: &mut Frame, app: &App, palette: &Palette, area: Rect) {
    let Some((text, is_error)) = status_message(app) else {
        return;
    };
    let fg = if is_error { palette.error_fg } else { palette.accent_secondary };
    f.render_widget(
        Paragraph::new(format!(" {text}")).style(Style::default().fg(fg)),
        area,
    );
}

fn render_footer(f: &mut Frame, app: &App, palette: &Palette, area: Rect) {
    let active = app.ui().tab;
    let tabs = footer_tabs(area);
    let mut used = area.x;
    for (i, (tab, rect)) in tabs.iter().enumerate() {
        let style = if *tab == active {
            Style::default()
                .bg(palette.accent_primary)
                .fg(palette.bg)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().bg(palette.bg).fg(palette.fg)
        };
        f.render_widget(Paragraph::new(footer_label(i, *tab)).style(style), *rect);
        used = rect.right() + 1;
    }

    let hint = "? help  q quit ";
    let width = hint.chars().count() as u16;
    if used.saturating_add(width) < area.right() {
        f.render_widget(
            Paragraph::new(hint).style(Style::default().fg(palette.border_inactive)),
            Rect::new(area.right() - width, area.y, width, 1),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_stacks_chrome_and_panes() {
        let l = layout_for(Rect::new(0, 0, 80, 30), 5, 0.4);
        assert_eq!(l.header, Rect::new(0, 0, 80, 1));
        assert_eq!(l.top, Rect::new(0, 1, 80, 7));
        assert_eq!(l.bottom, Rect::new(0, 8, 80, 20));
        assert_eq!(l.status, Rect::new(0, 28, 80, 1));
        assert_eq!(l.footer, Rect::new(0, 29, 80, 1));
    }

    #[test]
    fn top_pane_is_capped_by_ratio() {
        let l = layout_for(Rect::new(0, 0, 80, 30), 100, 0.4);
        assert_eq!(l.top.height, 10);
        assert_eq!(l.top.height + l.bottom.height, 27);
    }

    #[test]
    fn tiny_terminal_stays_inside_area() {
        let area = Rect::new(0, 0, 20, 2);
        let l = layout_for(area, 3, 0.4);
        for r in [l.header, l.top, l.bottom, l.status, l.footer] {
            assert!(r.is_empty() || area.contains(r.as_position()));
        }
    }

    #[test]
    fn footer_tabs_are_separated_and_ordered() {
        let tabs = footer_tabs(Rect::new(0, 29, 80, 1));
        let order: Vec<Tab> = tabs.iter().map(|(t, _)| *t).collect();
        assert_eq!(order, Tab::ALL.to_vec());
        assert_eq!(tabs[0].1, Rect::new(0, 29, 8, 1));
        for pair in tabs.windows(2) {
            assert_eq!(pair[0].1.right() + 1, pair[1].1.x);
        }
    }

    #[test]
    fn narrow_footer_drops_tabs_that_do_not_fit() {
        let tabs = footer_tabs(Rect::new(0, 0, 20, 1));
        assert_eq!(tabs.len(), 2);
        assert!(tabs.iter().all(|(_, r)| r.right() <= 20));
    }
}
