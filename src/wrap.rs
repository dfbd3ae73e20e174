//! Line breaking and the display-row wrap engine.
//!
//! `wrap_display_rows` and `wrapped_row_count` are both driven by
//! [`LineBreaks`], so the row count used for scroll bounds can never drift
//! from the rows that are actually painted.

use crate::git::{char_width, display_width};
use crate::rows::DisplayRow;

/// Narrowest content width wrapping will break at.
pub const MIN_WRAP_WIDTH: usize = 10;

/// Iterator over the width-bounded segments of one line.
///
/// Breaks on display width, never inside a character. An empty line yields a
/// single empty segment so it still occupies a row.
pub struct LineBreaks<'a> {
    rest: &'a str,
    width: usize,
    done: bool,
}

impl<'a> LineBreaks<'a> {
    pub fn new(line: &'a str, width: usize) -> Self {
        Self {
            rest: line,
            width: width.max(1),
            done: false,
        }
    }
}

impl<'a> Iterator for LineBreaks<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        if self.done {
            return None;
        }

        let mut used = 0usize;
        let mut end = self.rest.len();
        for (idx, ch) in self.rest.char_indices() {
            let w = char_width(ch);
            // A lone over-wide char still gets a segment of its own.
            if used > 0 && used + w > self.width {
                end = idx;
                break;
            }
            used += w;
        }

        let (segment, rest) = self.rest.split_at(end);
        self.rest = rest;
        if self.rest.is_empty() {
            self.done = true;
        }
        Some(segment)
    }
}

/// Splits `line` into segments no wider than `width`.
pub fn break_line(line: &str, width: usize) -> Vec<&str> {
    LineBreaks::new(line, width).collect()
}

/// A display row after wrapping. Continuations never carry a line number.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WrappedRow {
    pub row: DisplayRow,
    pub is_continuation: bool,
}

fn effective_width(content_width: usize) -> usize {
    content_width.max(MIN_WRAP_WIDTH)
}

/// Number of terminal rows `row` occupies at `width`.
fn row_span(row: &DisplayRow, width: usize) -> usize {
    match row.wrappable_content() {
        Some(content) if display_width(content) > width => LineBreaks::new(content, width).count(),
        _ => 1,
    }
}

pub fn wrap_display_rows(rows: &[DisplayRow], content_width: usize, enabled: bool) -> Vec<WrappedRow> {
    if !enabled {
        return rows
            .iter()
            .cloned()
            .map(|row| WrappedRow {
                row,
                is_continuation: false,
            })
            .collect();
    }

    let width = effective_width(content_width);
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let content = match row.wrappable_content() {
            Some(c) if display_width(c) > width => c,
            _ => {
                out.push(WrappedRow {
                    row: row.clone(),
                    is_continuation: false,
                });
                continue;
            }
        };

        for (i, segment) in LineBreaks::new(content, width).enumerate() {
            let line_num = if i == 0 { row.line_num() } else { None };
            out.push(WrappedRow {
                row: row.with_content(line_num, segment.to_string()),
                is_continuation: i > 0,
            });
        }
    }
    out
}

/// Same total as `wrap_display_rows(..).len()` without building the rows.
pub fn wrapped_row_count(rows: &[DisplayRow], content_width: usize, enabled: bool) -> usize {
    if !enabled {
        return rows.len();
    }
    let width = effective_width(content_width);
    rows.iter().map(|row| row_span(row, width)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add(n: u32, s: &str) -> DisplayRow {
        DisplayRow::DiffAdd {
            line_num: Some(n),
            content: s.to_string(),
        }
    }

    #[test]
    fn breaks_on_width() {
        assert_eq!(break_line("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
        assert_eq!(break_line("", 4), vec![""]);
        assert_eq!(break_line("abc", 4), vec!["abc"]);
    }

    #[test]
    fn wide_chars_do_not_split() {
        assert_eq!(break_line("日本語", 5), vec!["日本", "語"]);
        assert_eq!(break_line("日", 1), vec!["日"]);
    }

    #[test]
    fn disabled_is_identity() {
        let rows = vec![
            DisplayRow::DiffHeader {
                content: "diff --git a/x b/x".to_string(),
            },
            add(1, &"x".repeat(200)),
            DisplayRow::Spacer,
        ];
        let wrapped = wrap_display_rows(&rows, 10, false);
        let back: Vec<DisplayRow> = wrapped.iter().map(|w| w.row.clone()).collect();
        assert_eq!(back, rows);
        assert!(wrapped.iter().all(|w| !w.is_continuation));
    }

    #[test]
    fn long_addition_wraps_into_continuations() {
        let rows = vec![add(7, &"a".repeat(25))];
        let wrapped = wrap_display_rows(&rows, 10, true);
        assert_eq!(wrapped.len(), 3);
        assert_eq!(wrapped[0].row.line_num(), Some(7));
        assert!(!wrapped[0].is_continuation);
        for w in &wrapped[1..] {
            assert!(w.is_continuation);
            assert_eq!(w.row.line_num(), None);
        }
    }

    #[test]
    fn width_is_floored() {
        let rows = vec![add(1, &"b".repeat(20))];
        assert_eq!(wrap_display_rows(&rows, 3, true).len(), 2);
        assert_eq!(wrapped_row_count(&rows, 0, true), 2);
    }

    #[test]
    fn headers_are_never_wrapped() {
        let rows = vec![
            DisplayRow::DiffHunk {
                content: "@".repeat(50),
            },
            DisplayRow::CommitMessage {
                content: "m".repeat(50),
            },
        ];
        assert_eq!(wrap_display_rows(&rows, 10, true).len(), 2);
    }

    #[test]
    fn count_matches_rows() {
        let samples = [
            "",
            "short",
            "exactly ten",
            "a much longer line that needs more than one segment to fit",
            "日本語のテキストを折り返す",
            "\tindented\twith tabs",
        ];
        let rows: Vec<DisplayRow> = samples
            .iter()
            .enumerate()
            .flat_map(|(i, s)| {
                vec![
                    add(i as u32, s),
                    DisplayRow::DiffDel {
                        line_num: None,
                        content: s.to_string(),
                    },
                    DisplayRow::DiffHeader {
                        content: s.to_string(),
                    },
                ]
            })
            .collect();
        for width in 0..40 {
            for enabled in [true, false] {
                assert_eq!(
                    wrapped_row_count(&rows, width, enabled),
                    wrap_display_rows(&rows, width, enabled).len(),
                    "width {width} enabled {enabled}"
                );
            }
        }
    }
}
