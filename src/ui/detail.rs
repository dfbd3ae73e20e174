//! Painter for the bottom pane's display rows.
//!
//! Rows are wrapped with the same engine that sizes the scroll range, then
//! the visible window is turned into styled lines.

use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
};

use crate::git::{display_width, pad_to_width, truncate_to_width};
use crate::highlight::{StyledLine, ensure_contrast, slice_line};
use crate::rows::{DIFF_GUTTER_WIDTH, DisplayRow, format_file_header, format_hunk_header, gutter_text};
use crate::theme::Palette;
use crate::wrap::{WrappedRow, wrap_display_rows};

pub(crate) struct RowsView<'a> {
    pub rows: &'a [DisplayRow],
    pub offset: usize,
    pub wrap: bool,
    /// Per-line highlighting, indexed by line number minus one.
    pub highlighted: Option<&'a [StyledLine]>,
}

pub(crate) fn render_rows(f: &mut Frame, palette: &Palette, inner: Rect, view: &RowsView<'_>) {
    let lines = visible_lines(palette, inner, view);
    f.render_widget(Paragraph::new(lines), inner);
}

fn visible_lines(palette: &Palette, inner: Rect, view: &RowsView<'_>) -> Vec<Line<'static>> {
    let width = usize::from(inner.width);
    let height = usize::from(inner.height);
    let body_w = width.saturating_sub(DIFF_GUTTER_WIDTH);
    let wrapped = wrap_display_rows(view.rows, body_w, view.wrap);

    let mut out = Vec::with_capacity(height);
    // Char column of the current segment within its source line.
    let mut column = 0usize;
    let mut source_line: Option<usize> = None;
    for (i, w) in wrapped.iter().enumerate() {
        if !w.is_continuation {
            column = 0;
            source_line = w.row.line_num().and_then(|n| (n as usize).checked_sub(1));
        }
        let seg_chars = w.row.content().chars().count();
        if i >= view.offset && out.len() < height {
            let styled = view
                .highlighted
                .zip(source_line)
                .and_then(|(lines, idx)| lines.get(idx))
                .map(|line| slice_line(line, column, seg_chars));
            out.push(row_line(palette, w, width, styled));
        }
        column += seg_chars;
        if out.len() >= height {
            break;
        }
    }
    out
}

fn row_line(palette: &Palette, w: &WrappedRow, width: usize, styled: Option<StyledLine>) -> Line<'static> {
    match &w.row {
        DisplayRow::DiffHeader { content } => file_header_line(palette, content, width),
        DisplayRow::DiffHunk { content } => Line::from(Span::styled(
            pad_to_width(format_hunk_header(content, width), width),
            Style::default()
                .fg(palette.accent_secondary)
                .bg(palette.diff_hunk_bg)
                .add_modifier(Modifier::BOLD),
        )),
        DisplayRow::DiffAdd { .. } => body_line(palette, w, width, palette.diff_add_fg, palette.diff_add_bg, styled),
        DisplayRow::DiffDel { .. } => body_line(palette, w, width, palette.diff_del_fg, palette.diff_del_bg, styled),
        DisplayRow::DiffContext { .. } => body_line(palette, w, width, palette.fg, palette.bg, styled),
        DisplayRow::CommitHeader { content } => {
            let style = if content.starts_with("commit ") {
                Style::default()
                    .fg(palette.accent_secondary)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(palette.muted)
            };
            Line::from(Span::styled(truncate_to_width(content, width), style))
        }
        DisplayRow::CommitMessage { content } => Line::from(Span::styled(
            truncate_to_width(&format!("    {content}"), width),
            Style::default().fg(palette.fg),
        )),
        DisplayRow::Spacer => Line::default(),
    }
}

/// `diff --git` rows show the file name first and its directory dimmed;
/// other header rows (renames, modes, binary notices) are shown as is.
fn file_header_line(palette: &Palette, content: &str, width: usize) -> Line<'static> {
    if !content.starts_with("diff --git ") {
        return Line::from(Span::styled(
            truncate_to_width(content, width),
            Style::default().fg(palette.accent_secondary),
        ));
    }
    let path = format_file_header(content);
    let (dir, name) = match path.rfind('/') {
        Some(i) if !path.contains(" → ") => (path[..=i].to_string(), path[i + 1..].to_string()),
        _ => (String::new(), path),
    };
    let name = truncate_to_width(&name, width);
    let rest = width.saturating_sub(display_width(&name) + 2);
    let mut spans = vec![Span::styled(
        name,
        Style::default()
            .fg(palette.accent_primary)
            .add_modifier(Modifier::BOLD),
    )];
    if !dir.is_empty() && rest > 0 {
        spans.push(Span::styled(
            format!("  {}", truncate_to_width(&dir, rest)),
            Style::default().fg(palette.border_inactive),
        ));
    }
    Line::from(spans)
}

fn body_line(
    palette: &Palette,
    w: &WrappedRow,
    width: usize,
    fg: Color,
    bg: Color,
    styled: Option<StyledLine>,
) -> Line<'static> {
    let body_w = width.saturating_sub(DIFF_GUTTER_WIDTH);
    let mut spans = vec![Span::styled(
        truncate_to_width(&gutter_text(&w.row, w.is_continuation), width),
        Style::default().fg(palette.diff_gutter_fg).bg(bg),
    )];

    let mut used = 0usize;
    match styled {
        Some(frags) => {
            for (color, text) in frags {
                if used >= body_w {
                    break;
                }
                let piece = truncate_to_width(&text, body_w - used);
                used += display_width(&piece);
                let color = if color == Color::Reset { fg } else { ensure_contrast(color, bg) };
                spans.push(Span::styled(piece, Style::default().fg(color).bg(bg)));
            }
        }
        None => {
            let piece = truncate_to_width(w.row.content(), body_w);
            used = display_width(&piece);
            spans.push(Span::styled(piece, Style::default().fg(fg).bg(bg)));
        }
    }
    if used < body_w {
        spans.push(Span::styled(" ".repeat(body_w - used), Style::default().bg(bg)));
    }
    Line::from(spans)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::parse_diff;
    use crate::rows::{build_diff_display_rows, build_explorer_content_rows};
    use crate::theme::{Theme, palette};

    fn text(line: &Line<'_>) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    fn diff_rows() -> Vec<DisplayRow> {
        build_diff_display_rows(&parse_diff(
            "diff --git a/src/lib.rs b/src/lib.rs\n@@ -1,2 +1,2 @@\n keep\n-old line\n+new line that is rather long\n",
        ))
    }

    #[test]
    fn window_starts_at_offset() {
        let p = palette(Theme::Terminal);
        let rows = diff_rows();
        let view = RowsView {
            rows: &rows,
            offset: 2,
            wrap: false,
            highlighted: None,
        };
        let lines = visible_lines(&p, Rect::new(0, 0, 40, 2), &view);
        assert_eq!(lines.len(), 2);
        assert!(text(&lines[0]).starts_with("   1   keep"));
        assert!(text(&lines[1]).starts_with("   2 - old line"));
        assert_eq!(display_width(&text(&lines[1])), 40);
    }

    #[test]
    fn file_header_shows_name_then_directory() {
        let p = palette(Theme::Terminal);
        let line = file_header_line(&p, "diff --git a/src/lib.rs b/src/lib.rs", 40);
        assert_eq!(text(&line), "lib.rs  src/");
    }

    #[test]
    fn wrapped_rows_continue_without_gutter_number() {
        let p = palette(Theme::Terminal);
        let rows = diff_rows();
        let view = RowsView {
            rows: &rows,
            offset: 4,
            wrap: true,
            highlighted: None,
        };
        // 17 columns leave 10 for content.
        let lines = visible_lines(&p, Rect::new(0, 0, 17, 5), &view);
        assert_eq!(text(&lines[0]), "   2 + new line t");
        assert_eq!(text(&lines[1]), "       hat is rat");
    }

    #[test]
    fn highlighted_segments_follow_wrap_columns() {
        let p = palette(Theme::Terminal);
        let rows = build_explorer_content_rows("abcdefghijklmno\n");
        let hl: Vec<StyledLine> = vec![vec![
            (Color::Rgb(200, 80, 80), "abcde".to_string()),
            (Color::Rgb(80, 200, 80), "fghijklmno".to_string()),
        ]];
        let view = RowsView {
            rows: &rows,
            offset: 0,
            wrap: true,
            highlighted: Some(&hl),
        };
        let lines = visible_lines(&p, Rect::new(0, 0, 17, 3), &view);
        assert_eq!(lines.len(), 2);
        assert_eq!(text(&lines[0]), "   1   abcdefghij");
        assert_eq!(text(&lines[1]), "       klmno     ");
        assert_eq!(lines[1].spans[1].content, "klmno");
    }
}
