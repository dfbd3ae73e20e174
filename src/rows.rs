//! Conversion of diffs, commits and file content into display rows.
//!
//! Every builder here is total: malformed input degrades to literal rows.

use crate::diff::{CompareDiff, DiffLineKind, ParsedDiff, parse_hunk_header};
use crate::git::{CommitEntry, truncate_to_width};

/// Columns taken by the `{:>4} + ` gutter in front of diff content.
pub const DIFF_GUTTER_WIDTH: usize = 7;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DisplayRow {
    DiffHeader { content: String },
    DiffHunk { content: String },
    DiffAdd { line_num: Option<u32>, content: String },
    DiffDel { line_num: Option<u32>, content: String },
    DiffContext { line_num: Option<u32>, content: String },
    CommitHeader { content: String },
    CommitMessage { content: String },
    Spacer,
}

impl DisplayRow {
    pub fn line_num(&self) -> Option<u32> {
        match self {
            DisplayRow::DiffAdd { line_num, .. }
            | DisplayRow::DiffDel { line_num, .. }
            | DisplayRow::DiffContext { line_num, .. } => *line_num,
            _ => None,
        }
    }

    pub fn content(&self) -> &str {
        match self {
            DisplayRow::DiffHeader { content }
            | DisplayRow::DiffHunk { content }
            | DisplayRow::DiffAdd { content, .. }
            | DisplayRow::DiffDel { content, .. }
            | DisplayRow::DiffContext { content, .. }
            | DisplayRow::CommitHeader { content }
            | DisplayRow::CommitMessage { content } => content,
            DisplayRow::Spacer => "",
        }
    }

    /// Content of the rows that may be split across terminal rows.
    pub fn wrappable_content(&self) -> Option<&str> {
        match self {
            DisplayRow::DiffAdd { content, .. }
            | DisplayRow::DiffDel { content, .. }
            | DisplayRow::DiffContext { content, .. } => Some(content),
            _ => None,
        }
    }

    /// Same variant with new content; used for wrap segments.
    pub fn with_content(&self, line_num: Option<u32>, content: String) -> DisplayRow {
        match self {
            DisplayRow::DiffAdd { .. } => DisplayRow::DiffAdd { line_num, content },
            DisplayRow::DiffDel { .. } => DisplayRow::DiffDel { line_num, content },
            DisplayRow::DiffContext { .. } => DisplayRow::DiffContext { line_num, content },
            DisplayRow::DiffHeader { .. } => DisplayRow::DiffHeader { content },
            DisplayRow::DiffHunk { .. } => DisplayRow::DiffHunk { content },
            DisplayRow::CommitHeader { .. } => DisplayRow::CommitHeader { content },
            DisplayRow::CommitMessage { .. } => DisplayRow::CommitMessage { content },
            DisplayRow::Spacer => DisplayRow::Spacer,
        }
    }

    pub fn is_spacer(&self) -> bool {
        matches!(self, DisplayRow::Spacer)
    }
}

/// Header lines already implied by the file header row.
const REDUNDANT_HEADERS: &[&str] = &["index ", "--- ", "+++ ", "similarity index"];

fn is_redundant_header(line: &str) -> bool {
    REDUNDANT_HEADERS.iter().any(|p| line.starts_with(p))
}

pub fn build_diff_display_rows(diff: &ParsedDiff) -> Vec<DisplayRow> {
    let mut rows = Vec::with_capacity(diff.lines.len());
    for line in &diff.lines {
        let content = line.content.clone();
        let row = match line.kind {
            DiffLineKind::Header => {
                if is_redundant_header(&line.content) {
                    continue;
                }
                DisplayRow::DiffHeader { content }
            }
            DiffLineKind::Hunk => DisplayRow::DiffHunk { content },
            DiffLineKind::Addition => DisplayRow::DiffAdd {
                line_num: line.new_line,
                content,
            },
            DiffLineKind::Deletion => DisplayRow::DiffDel {
                line_num: line.old_line,
                content,
            },
            DiffLineKind::Context => DisplayRow::DiffContext {
                line_num: line.new_line.or(line.old_line),
                content,
            },
        };
        rows.push(row);
    }
    rows
}

pub fn build_history_display_rows(commit: &CommitEntry, diff: Option<&ParsedDiff>) -> Vec<DisplayRow> {
    let mut rows = vec![
        DisplayRow::CommitHeader {
            content: format!("commit {}", commit.hash),
        },
        DisplayRow::CommitHeader {
            content: format!("Author: {}", commit.author),
        },
        DisplayRow::CommitHeader {
            content: format!("Date:   {}", commit.date),
        },
        DisplayRow::Spacer,
    ];
    rows.extend(commit.message.lines().map(|l| DisplayRow::CommitMessage {
        content: l.to_string(),
    }));
    rows.push(DisplayRow::Spacer);
    if let Some(diff) = diff {
        rows.extend(build_diff_display_rows(diff));
    }
    rows
}

pub fn build_compare_display_rows(compare: &CompareDiff) -> Vec<DisplayRow> {
    compare
        .files
        .iter()
        .flat_map(|f| build_diff_display_rows(&f.diff))
        .collect()
}

/// One numbered row per line of file content.
pub fn build_explorer_content_rows(text: &str) -> Vec<DisplayRow> {
    text.lines()
        .enumerate()
        .map(|(i, line)| DisplayRow::DiffContext {
            line_num: u32::try_from(i + 1).ok(),
            content: line.to_string(),
        })
        .collect()
}

/// Index of the first display row belonging to each file of a compare diff.
pub fn compare_file_offsets(compare: &CompareDiff) -> Vec<usize> {
    let mut offsets = Vec::with_capacity(compare.files.len());
    let mut at = 0usize;
    for f in &compare.files {
        offsets.push(at);
        at += build_diff_display_rows(&f.diff).len();
    }
    offsets
}

/// Hunk headers are shown as `@@ -a,b +c,d @@ context`; anything that does
/// not parse is shown verbatim, truncated.
pub fn format_hunk_header(content: &str, width: usize) -> String {
    match parse_hunk_header(content) {
        Some((h, ctx)) => {
            let base = format!(
                "@@ -{},{} +{},{} @@",
                h.old_start, h.old_count, h.new_start, h.new_count
            );
            let text = if ctx.is_empty() {
                base
            } else {
                format!("{base} {ctx}")
            };
            truncate_to_width(&text, width)
        }
        None => truncate_to_width(content, width),
    }
}

/// Shortens `diff --git a/x b/x` to the path it names.
pub fn format_file_header(content: &str) -> String {
    if let Some(rest) = content.strip_prefix("diff --git ") {
        if let Some((a, b)) = rest.split_once(" b/") {
            let a = a.strip_prefix("a/").unwrap_or(a);
            if a == b {
                return b.to_string();
            }
            return format!("{a} → {b}");
        }
    }
    content.to_string()
}

/// Gutter for a body row: right-aligned number and a marker.
pub fn gutter_text(row: &DisplayRow, is_continuation: bool) -> String {
    let marker = match row {
        DisplayRow::DiffAdd { .. } => '+',
        DisplayRow::DiffDel { .. } => '-',
        _ => ' ',
    };
    let marker = if is_continuation { ' ' } else { marker };
    match row.line_num() {
        Some(n) => format!("{n:>4} {marker} "),
        None => format!("     {marker} "),
    }
}

/// Plain text of one wrapped row at `width`.
#[cfg(test)]
pub fn row_text(row: &DisplayRow, is_continuation: bool, width: usize) -> String {
    match row {
        DisplayRow::DiffAdd { content, .. }
        | DisplayRow::DiffDel { content, .. }
        | DisplayRow::DiffContext { content, .. } => {
            let body_w = width.saturating_sub(DIFF_GUTTER_WIDTH);
            format!(
                "{}{}",
                gutter_text(row, is_continuation),
                truncate_to_width(content, body_w)
            )
        }
        DisplayRow::DiffHeader { content } => truncate_to_width(&format_file_header(content), width),
        DisplayRow::DiffHunk { content } => format_hunk_header(content, width),
        DisplayRow::CommitHeader { content } | DisplayRow::CommitMessage { content } => {
            truncate_to_width(content, width)
        }
        DisplayRow::Spacer => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::{CompareFileDiff, parse_diff};
    use crate::git::FileStatus;
    use crate::wrap::wrap_display_rows;

    const SAMPLE: &str = "diff --git a/src/app.rs b/src/app.rs
index 83db48f..bf269f4 100644
--- a/src/app.rs
+++ b/src/app.rs
@@ -1,3 +1,3 @@
 use std::io;
-fn old() {}
+fn new() {}
";

    fn commit() -> CommitEntry {
        CommitEntry {
            hash: "0123456789abcdef".to_string(),
            short_hash: "0123456".to_string(),
            author: "Dana Lee".to_string(),
            date: "2024-03-01".to_string(),
            message: "Fix parser\n\nHandle empty input.".to_string(),
            refs: String::new(),
        }
    }

    #[test]
    fn redundant_headers_are_dropped() {
        let diff = parse_diff(SAMPLE);
        let rows = build_diff_display_rows(&diff);
        let kept_headers = diff
            .lines
            .iter()
            .filter(|l| l.kind == DiffLineKind::Header && !is_redundant_header(&l.content))
            .count();
        let body = diff
            .lines
            .iter()
            .filter(|l| l.kind != DiffLineKind::Header)
            .count();
        assert_eq!(rows.len(), kept_headers + body);
        assert_eq!(rows.len(), 5);
        assert!(matches!(&rows[0], DisplayRow::DiffHeader { content } if content.starts_with("diff --git")));
    }

    #[test]
    fn rename_and_mode_headers_survive() {
        let raw = "diff --git a/old.rs b/new.rs\nsimilarity index 90%\nrename from old.rs\nrename to new.rs\nold mode 100644\nnew mode 100755\n";
        let rows = build_diff_display_rows(&parse_diff(raw));
        let texts: Vec<&str> = rows.iter().map(|r| r.content()).collect();
        assert_eq!(
            texts,
            vec![
                "diff --git a/old.rs b/new.rs",
                "rename from old.rs",
                "rename to new.rs",
                "old mode 100644",
                "new mode 100755",
            ]
        );
    }

    #[test]
    fn line_numbers_come_from_the_right_side() {
        let rows = build_diff_display_rows(&parse_diff(SAMPLE));
        assert_eq!(rows[2].line_num(), Some(1));
        assert!(matches!(rows[3], DisplayRow::DiffDel { line_num: Some(2), .. }));
        assert!(matches!(rows[4], DisplayRow::DiffAdd { line_num: Some(2), .. }));
    }

    #[test]
    fn history_rows_prepend_commit_block() {
        let diff = parse_diff(SAMPLE);
        let rows = build_history_display_rows(&commit(), Some(&diff));
        assert!(matches!(&rows[0], DisplayRow::CommitHeader { content } if content == "commit 0123456789abcdef"));
        assert!(matches!(&rows[1], DisplayRow::CommitHeader { content } if content.contains("Dana Lee")));
        assert!(rows[3].is_spacer());
        assert!(matches!(&rows[4], DisplayRow::CommitMessage { content } if content == "Fix parser"));
        assert!(matches!(&rows[5], DisplayRow::CommitMessage { content } if content.is_empty()));
        assert!(rows[7].is_spacer());
        assert_eq!(rows.len(), 8 + build_diff_display_rows(&diff).len());
    }

    #[test]
    fn compare_rows_concatenate_in_file_order() {
        let file = |path: &str| CompareFileDiff {
            path: path.to_string(),
            status: FileStatus::Modified,
            additions: 1,
            deletions: 1,
            diff: parse_diff(SAMPLE),
        };
        let compare = CompareDiff {
            base_branch: "main".to_string(),
            files: vec![file("a"), file("b")],
            commits: Vec::new(),
        };
        let rows = build_compare_display_rows(&compare);
        assert_eq!(rows.len(), 10);
        assert_eq!(compare_file_offsets(&compare), vec![0, 5]);
    }

    #[test]
    fn unparsable_hunk_is_truncated_literal() {
        assert_eq!(format_hunk_header("@@ broken header here @@", 9), "@@ broken");
        assert_eq!(format_hunk_header("@@ -1 +1 @@ fn x", 40), "@@ -1,1 +1,1 @@ fn x");
    }

    #[test]
    fn wrapped_add_renders_gutter_once() {
        let rows = build_diff_display_rows(&parse_diff(&format!(
            "@@ -0,0 +1,1 @@\n+{}\n",
            "x".repeat(25)
        )));
        let wrapped = wrap_display_rows(&rows, 10, true);
        assert_eq!(wrapped.len(), 4);
        let first = row_text(&wrapped[1].row, wrapped[1].is_continuation, 17);
        let second = row_text(&wrapped[2].row, wrapped[2].is_continuation, 17);
        assert_eq!(first, format!("   1 + {}", "x".repeat(10)));
        assert_eq!(second, format!("       {}", "x".repeat(10)));
    }

    #[test]
    fn explorer_rows_are_numbered() {
        let rows = build_explorer_content_rows("a\nb\n");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].line_num(), Some(2));
    }
}
