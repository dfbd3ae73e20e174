use crate::git::{CommitEntry, FileStatus};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiffLineKind {
    Header,
    Hunk,
    Addition,
    Deletion,
    Context,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiffLine {
    pub kind: DiffLineKind,
    /// Full text for headers and hunks; text without the `+`/`-`/` ` marker
    /// for body lines.
    pub content: String,
    pub old_line: Option<u32>,
    pub new_line: Option<u32>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParsedDiff {
    pub raw: String,
    pub lines: Vec<DiffLine>,
}

impl ParsedDiff {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompareFileDiff {
    pub path: String,
    pub status: FileStatus,
    pub additions: u32,
    pub deletions: u32,
    pub diff: ParsedDiff,
}

/// The working branch compared against its merge-base with `base_branch`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CompareDiff {
    pub base_branch: String,
    pub files: Vec<CompareFileDiff>,
    pub commits: Vec<CommitEntry>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HunkHeader {
    pub old_start: u32,
    pub old_count: u32,
    pub new_start: u32,
    pub new_count: u32,
}

/// Parses `@@ -a,b +c,d @@ context`. Counts default to 1 when omitted.
/// Returns the header and the trailing section context.
pub fn parse_hunk_header(line: &str) -> Option<(HunkHeader, &str)> {
    let rest = line.strip_prefix("@@")?.trim_start();
    let (range, context) = rest.split_once("@@")?;
    let mut it = range.split_whitespace();
    let (old_start, old_count) = parse_range(it.next()?.strip_prefix('-')?)?;
    let (new_start, new_count) = parse_range(it.next()?.strip_prefix('+')?)?;
    if it.next().is_some() {
        return None;
    }
    Some((
        HunkHeader {
            old_start,
            old_count,
            new_start,
            new_count,
        },
        context.trim(),
    ))
}

fn parse_range(tok: &str) -> Option<(u32, u32)> {
    match tok.split_once(',') {
        Some((start, count)) => Some((start.parse().ok()?, count.parse().ok()?)),
        None => Some((tok.parse().ok()?, 1)),
    }
}

const HEADER_PREFIXES: &[&str] = &[
    "diff --git ",
    "index ",
    "--- ",
    "+++ ",
    "new file mode",
    "deleted file mode",
    "old mode",
    "new mode",
    "similarity index",
    "dissimilarity index",
    "rename from",
    "rename to",
    "copy from",
    "copy to",
    "Binary files ",
];

fn is_header_line(line: &str) -> bool {
    HEADER_PREFIXES.iter().any(|p| line.starts_with(p))
}

/// Splits raw `git diff` output into tagged lines with old/new numbering.
///
/// Anything unrecognised outside a hunk becomes a header line; inside a hunk
/// it is treated as context so a truncated diff still renders.
pub fn parse_diff(raw: &str) -> ParsedDiff {
    let mut lines = Vec::new();
    let mut old_line: Option<u32> = None;
    let mut new_line: Option<u32> = None;
    let mut in_hunk = false;

    for line in raw.lines() {
        if line.starts_with("diff --git ") {
            in_hunk = false;
            old_line = None;
            new_line = None;
        }

        if !in_hunk && is_header_line(line) {
            lines.push(DiffLine {
                kind: DiffLineKind::Header,
                content: line.to_string(),
                old_line: None,
                new_line: None,
            });
            continue;
        }

        if line.starts_with("@@") {
            in_hunk = true;
            match parse_hunk_header(line) {
                Some((h, _)) => {
                    old_line = Some(h.old_start);
                    new_line = Some(h.new_start);
                }
                None => {
                    old_line = None;
                    new_line = None;
                }
            }
            lines.push(DiffLine {
                kind: DiffLineKind::Hunk,
                content: line.to_string(),
                old_line: None,
                new_line: None,
            });
            continue;
        }

        if !in_hunk {
            lines.push(DiffLine {
                kind: DiffLineKind::Header,
                content: line.to_string(),
                old_line: None,
                new_line: None,
            });
            continue;
        }

        let mut chars = line.chars();
        match chars.next() {
            Some('+') => {
                lines.push(DiffLine {
                    kind: DiffLineKind::Addition,
                    content: chars.as_str().to_string(),
                    old_line: None,
                    new_line,
                });
                bump(&mut new_line);
            }
            Some('-') => {
                lines.push(DiffLine {
                    kind: DiffLineKind::Deletion,
                    content: chars.as_str().to_string(),
                    old_line,
                    new_line: None,
                });
                bump(&mut old_line);
            }
            Some('\\') => {
                // "\ No newline at end of file" belongs to no side.
                lines.push(DiffLine {
                    kind: DiffLineKind::Context,
                    content: line.to_string(),
                    old_line: None,
                    new_line: None,
                });
            }
            Some(' ') | None => {
                lines.push(DiffLine {
                    kind: DiffLineKind::Context,
                    content: chars.as_str().to_string(),
                    old_line,
                    new_line,
                });
                bump(&mut old_line);
                bump(&mut new_line);
            }
            Some(_) => {
                lines.push(DiffLine {
                    kind: DiffLineKind::Context,
                    content: line.to_string(),
                    old_line: None,
                    new_line: None,
                });
            }
        }
    }

    ParsedDiff {
        raw: raw.to_string(),
        lines,
    }
}

/// A counter that would pass `u32::MAX` loses its number.
fn bump(counter: &mut Option<u32>) {
    *counter = counter.and_then(|v| v.checked_add(1));
}

/// Renders an untracked file's content as an all-additions diff.
pub fn untracked_file_diff(path: &str, content: &str) -> String {
    let lines: Vec<&str> = content.lines().collect();
    let mut out = format!(
        "diff --git a/{path} b/{path}\nnew file mode 100644\n--- /dev/null\n+++ b/{path}\n@@ -0,0 +1,{} @@\n",
        lines.len()
    );
    for line in lines {
        out.push('+');
        out.push_str(line);
        out.push('\n');
    }
    out
}

/// Splits a multi-file diff into one chunk per `diff --git` section, paired
/// with the `b/` path of that section.
pub fn split_by_file(raw: &str) -> Vec<(String, String)> {
    let mut out: Vec<(String, String)> = Vec::new();
    for line in raw.lines() {
        if let Some(rest) = line.strip_prefix("diff --git ") {
            let path = rest
                .rsplit_once(" b/")
                .map(|(_, p)| p.to_string())
                .unwrap_or_else(|| rest.to_string());
            out.push((path, String::new()));
        }
        if let Some((_, chunk)) = out.last_mut() {
            chunk.push_str(line);
            chunk.push('\n');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "diff --git a/src/main.rs b/src/main.rs
index 83db48f..bf269f4 100644
--- a/src/main.rs
+++ b/src/main.rs
@@ -10,4 +10,5 @@ fn main() {
 let a = 1;
-let b = 2;
+let b = 3;
+let c = 4;
 println!();
";

    #[test]
    fn numbers_follow_hunk_header() {
        let diff = parse_diff(SAMPLE);
        let kinds: Vec<DiffLineKind> = diff.lines.iter().map(|l| l.kind).collect();
        assert_eq!(
            kinds,
            vec![
                DiffLineKind::Header,
                DiffLineKind::Header,
                DiffLineKind::Header,
                DiffLineKind::Header,
                DiffLineKind::Hunk,
                DiffLineKind::Context,
                DiffLineKind::Deletion,
                DiffLineKind::Addition,
                DiffLineKind::Addition,
                DiffLineKind::Context,
            ]
        );
        assert_eq!(diff.lines[5].old_line, Some(10));
        assert_eq!(diff.lines[6].old_line, Some(11));
        assert_eq!(diff.lines[7].new_line, Some(11));
        assert_eq!(diff.lines[8].new_line, Some(12));
        assert_eq!(diff.lines[9].old_line, Some(12));
        assert_eq!(diff.lines[9].new_line, Some(13));
        assert_eq!(diff.lines[7].content, "let b = 3;");
    }

    #[test]
    fn hunk_header_defaults_count_to_one() {
        let (h, ctx) = parse_hunk_header("@@ -3 +4,2 @@ impl Foo").unwrap();
        assert_eq!(h.old_count, 1);
        assert_eq!(h.new_start, 4);
        assert_eq!(ctx, "impl Foo");
        assert!(parse_hunk_header("@@ garbage @@").is_none());
    }

    #[test]
    fn malformed_hunk_keeps_lines_without_numbers() {
        let diff = parse_diff("diff --git a/x b/x\n@@ nonsense @@\n+added\n");
        assert_eq!(diff.lines[1].kind, DiffLineKind::Hunk);
        assert_eq!(diff.lines[2].kind, DiffLineKind::Addition);
        assert_eq!(diff.lines[2].new_line, None);
    }

    #[test]
    fn header_looking_body_lines_stay_in_hunk() {
        let diff = parse_diff("@@ -1,1 +1,1 @@\n--- not a header\n");
        assert_eq!(diff.lines[1].kind, DiffLineKind::Deletion);
        assert_eq!(diff.lines[1].content, "-- not a header");
    }

    #[test]
    fn untracked_content_becomes_additions() {
        let diff = parse_diff(&untracked_file_diff("new.txt", "one\ntwo\n"));
        let adds: Vec<&DiffLine> = diff
            .lines
            .iter()
            .filter(|l| l.kind == DiffLineKind::Addition)
            .collect();
        assert_eq!(adds.len(), 2);
        assert_eq!(adds[1].new_line, Some(2));
    }

    #[test]
    fn splits_multi_file_output() {
        let raw = "diff --git a/a.rs b/a.rs\n+x\ndiff --git a/b.rs b/b.rs\n+y\n";
        let parts = split_by_file(raw);
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].0, "a.rs");
        assert!(parts[1].1.ends_with("+y\n"));
    }

    #[test]
    fn line_numbers_past_u32_max_are_dropped() {
        let diff = parse_diff("diff --git a/x b/x\n@@ -4294967295,2 +4294967295,2 @@\n a\n b\n");
        let context: Vec<&DiffLine> = diff
            .lines
            .iter()
            .filter(|l| l.kind == DiffLineKind::Context)
            .collect();
        assert_eq!(context[0].new_line, Some(u32::MAX));
        assert_eq!(context[1].new_line, None);
        assert_eq!(context[1].old_line, None);

        let rows = crate::rows::build_diff_display_rows(&diff);
        assert!(rows.iter().any(|r| r.content() == "b"));
    }
}
