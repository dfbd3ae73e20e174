use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Margin, Position, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph},
};

use crate::branch::{BranchListItem, BranchPicker, PickerPurpose};
use crate::events::KEY_HELP;
use crate::git::display_width;
use crate::state::ui::{ConfirmAction, Modal};
use crate::theme::Palette;

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let w = width.min(area.width);
    let h = height.min(area.height);
    Rect::new(
        area.x + (area.width - w) / 2,
        area.y + (area.height - h) / 2,
        w,
        h,
    )
}

fn modal_block(palette: &Palette, title: &str) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_set(ratatui::symbols::border::PLAIN)
        .border_style(Style::default().fg(palette.accent_primary))
        .style(Style::default().bg(palette.menu_bg))
        .title(format!(" {title} "))
}

pub fn render_modal(f: &mut Frame, palette: &Palette, area: Rect, modal: &Modal) {
    match modal {
        Modal::Help => render_help(f, palette, area),
        Modal::BranchPicker(picker) => render_branch_picker(f, palette, area, picker),
        Modal::NewBranch { input } => render_new_branch(f, palette, area, input),
        Modal::Confirm(action) => render_confirm(f, palette, area, action),
    }
}

fn render_help(f: &mut Frame, palette: &Palette, area: Rect) {
    let key_w = KEY_HELP.iter().map(|(k, _)| display_width(k)).max().unwrap_or(0);
    let lines: Vec<Line> = KEY_HELP
        .iter()
        .map(|(key, what)| {
            Line::from(vec![
                Span::styled(
                    format!("{key:<key_w$}  "),
                    Style::default()
                        .fg(palette.accent_secondary)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled(*what, Style::default().fg(palette.fg)),
            ])
        })
        .collect();

    let modal = centered(area, 64, lines.len() as u16 + 2);
    f.render_widget(Clear, modal);
    let block = modal_block(palette, "Keys");
    let inner = block.inner(modal);
    f.render_widget(block, modal);
    f.render_widget(Paragraph::new(lines), inner);
}

fn render_branch_picker(f: &mut Frame, palette: &Palette, area: Rect, picker: &BranchPicker) {
    let modal = centered(area, 72, 20);
    f.render_widget(Clear, modal);
    let title = match picker.purpose {
        PickerPurpose::Switch => "Switch Branch",
        PickerPurpose::CompareBase => "Compare Against",
    };
    let block = modal_block(palette, title);
    f.render_widget(block, modal);

    let inner = modal.inner(Margin {
        vertical: 1,
        horizontal: 1,
    });
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(0)])
        .split(inner);

    let query = format!("Filter: {}", picker.query);
    f.render_widget(
        Paragraph::new(query.clone()).style(Style::default().fg(palette.fg)),
        rows[0],
    );
    f.set_cursor_position(Position::new(
        rows[0].x + (display_width(&query) as u16).min(rows[0].width.saturating_sub(1)),
        rows[0].y,
    ));

    let items: Vec<ListItem> = picker
        .items
        .iter()
        .map(|item| match item {
            BranchListItem::Header(t) => ListItem::new(Span::styled(
                t.clone(),
                Style::default()
                    .fg(palette.accent_secondary)
                    .add_modifier(Modifier::BOLD),
            )),
            BranchListItem::Branch { idx } => {
                let Some(b) = picker.branches.get(*idx) else {
                    return ListItem::new("");
                };
                let cur = if b.is_current { "* " } else { "  " };
                let mut spans = vec![Span::styled(
                    format!("{cur}{}", b.name),
                    Style::default().fg(palette.fg),
                )];
                if let Some(up) = &b.upstream {
                    spans.push(Span::styled(format!("  {up}"), Style::default().fg(palette.muted)));
                }
                if let Some(tr) = &b.track {
                    spans.push(Span::styled(format!("  {tr}"), Style::default().fg(palette.modified_fg)));
                }
                ListItem::new(Line::from(spans))
            }
        })
        .collect();

    if items.is_empty() {
        f.render_widget(
            Paragraph::new("No matching branches").style(Style::default().fg(palette.muted)),
            rows[1],
        );
        return;
    }
    let list = List::new(items)
        .highlight_style(
            Style::default()
                .bg(palette.selection_bg)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("▎");
    f.render_stateful_widget(list, rows[1], &mut picker.list_state.clone());
}

fn render_new_branch(f: &mut Frame, palette: &Palette, area: Rect, input: &str) {
    let modal = centered(area, 60, 5);
    f.render_widget(Clear, modal);
    let block = modal_block(palette, "New Branch");
    let inner = block.inner(modal);
    f.render_widget(block, modal);

    let prompt = format!("Name: {input}");
    let lines = vec![
        Line::styled(prompt.clone(), Style::default().fg(palette.fg)),
        Line::default(),
        Line::styled("Enter create  Esc cancel", Style::default().fg(palette.border_inactive)),
    ];
    f.render_widget(Paragraph::new(lines), inner);
    if inner.height > 0 {
        f.set_cursor_position(Position::new(
            inner.x + (display_width(&prompt) as u16).min(inner.width.saturating_sub(1)),
            inner.y,
        ));
    }
}

fn render_confirm(f: &mut Frame, palette: &Palette, area: Rect, action: &ConfirmAction) {
    let prompt = action.prompt();
    let width = (display_width(&prompt) as u16 + 6).max(36);
    let modal = centered(area, width, 5);
    f.render_widget(Clear, modal);
    let block = modal_block(palette, "Confirm");
    let inner = block.inner(modal);
    f.render_widget(block, modal);

    let lines = vec![
        Line::styled(prompt, Style::default().fg(palette.fg)),
        Line::default(),
        Line::from(vec![
            Span::styled(
                " y ",
                Style::default()
                    .bg(palette.accent_secondary)
                    .fg(palette.bg)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(" confirm   ", Style::default().fg(palette.fg)),
            Span::styled(" n ", Style::default().bg(palette.selection_bg).fg(palette.fg)),
            Span::styled(" cancel", Style::default().fg(palette.fg)),
        ]),
    ];
    f.render_widget(Paragraph::new(lines), inner);
}
