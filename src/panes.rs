//! Rows of the top list panes.
//!
//! The renderer paints these rows and the mouse mapper resolves clicks
//! against them, so both always agree on what sits on a given line.
//! Selection indices count selectable rows only.

use crate::diff::CompareDiff;
use crate::diff_loader::DiffSource;
use crate::file_tree::{TreeRowKind, build_tree_rows};
use crate::git::{FileEntry, FileStatus, FlatFileEntry, StagingState};

pub trait PaneRow {
    fn is_selectable(&self) -> bool;
}

/// Index into `rows` of the `selection`-th selectable row.
pub fn row_of_selection<R: PaneRow>(rows: &[R], selection: usize) -> Option<usize> {
    rows.iter()
        .enumerate()
        .filter(|(_, r)| r.is_selectable())
        .nth(selection)
        .map(|(i, _)| i)
}

/// Selection index of `rows[row]`, `None` for headers and spacers.
pub fn selection_of_row<R: PaneRow>(rows: &[R], row: usize) -> Option<usize> {
    if !rows.get(row)?.is_selectable() {
        return None;
    }
    Some(rows[..row].iter().filter(|r| r.is_selectable()).count())
}

pub fn selectable_count<R: PaneRow>(rows: &[R]) -> usize {
    rows.iter().filter(|r| r.is_selectable()).count()
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileItem {
    pub path: String,
    pub status: FileStatus,
    pub staging: StagingState,
}

impl FileItem {
    /// Partially staged files show their worktree diff.
    pub fn diff_source(&self) -> DiffSource {
        DiffSource::File {
            path: self.path.clone(),
            staged: self.staging == StagingState::Staged,
            untracked: self.status == FileStatus::Untracked,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FileListRow {
    Header { title: &'static str, count: usize },
    Spacer,
    Directory { label: String },
    File { item: FileItem, label: String },
}

impl PaneRow for FileListRow {
    fn is_selectable(&self) -> bool {
        matches!(self, FileListRow::File { .. })
    }
}

impl FileListRow {
    pub fn file(&self) -> Option<&FileItem> {
        match self {
            FileListRow::File { item, .. } => Some(item),
            _ => None,
        }
    }
}

/// File list rows: sectioned (Modified, Untracked, Staged) or flat, with
/// optional tree grouping.
pub fn file_list_rows(files: &[FileEntry], flat: &[FlatFileEntry], flat_view: bool, tree_view: bool) -> Vec<FileListRow> {
    let mut rows = Vec::new();
    if flat_view {
        let items: Vec<FileItem> = flat
            .iter()
            .map(|f| FileItem {
                path: f.path.clone(),
                status: f.status,
                staging: f.staging_state,
            })
            .collect();
        push_items(&mut rows, items, tree_view);
        return rows;
    }

    let section = |pred: &dyn Fn(&FileEntry) -> bool, staging: StagingState| -> Vec<FileItem> {
        let mut items: Vec<FileItem> = files
            .iter()
            .filter(|&f| pred(f))
            .map(|f| FileItem {
                path: f.path.clone(),
                status: f.status,
                staging,
            })
            .collect();
        items.sort_by(|a, b| a.path.cmp(&b.path));
        items
    };
    let sections = [
        (
            "Modified",
            section(&|f| !f.staged && f.status != FileStatus::Untracked, StagingState::Unstaged),
        ),
        (
            "Untracked",
            section(&|f| !f.staged && f.status == FileStatus::Untracked, StagingState::Unstaged),
        ),
        ("Staged", section(&|f| f.staged, StagingState::Staged)),
    ];

    for (title, items) in sections {
        if items.is_empty() {
            continue;
        }
        if !rows.is_empty() {
            rows.push(FileListRow::Spacer);
        }
        rows.push(FileListRow::Header {
            title,
            count: items.len(),
        });
        push_items(&mut rows, items, tree_view);
    }
    rows
}

fn push_items(rows: &mut Vec<FileListRow>, items: Vec<FileItem>, tree_view: bool) {
    if !tree_view {
        rows.extend(items.into_iter().map(|item| FileListRow::File {
            label: item.path.clone(),
            item,
        }));
        return;
    }
    let paths: Vec<&str> = items.iter().map(|i| i.path.as_str()).collect();
    for tree_row in build_tree_rows(&paths) {
        let label = format!("{}{}", tree_row.prefix(), tree_row.name);
        match (tree_row.kind, tree_row.file_index) {
            (TreeRowKind::File, Some(idx)) => rows.push(FileListRow::File {
                item: items[idx].clone(),
                label,
            }),
            _ => rows.push(FileListRow::Directory {
                label: format!("{label}/"),
            }),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompareRow {
    Summary {
        files: usize,
        commits: usize,
        additions: u32,
        deletions: u32,
    },
    File(usize),
}

impl PaneRow for CompareRow {
    fn is_selectable(&self) -> bool {
        matches!(self, CompareRow::File(_))
    }
}

pub fn compare_rows(compare: Option<&CompareDiff>) -> Vec<CompareRow> {
    let Some(compare) = compare else {
        return Vec::new();
    };
    let mut rows = vec![CompareRow::Summary {
        files: compare.files.len(),
        commits: compare.commits.len(),
        additions: compare.files.iter().map(|f| f.additions).sum(),
        deletions: compare.files.iter().map(|f| f.deletions).sum(),
    }];
    rows.extend((0..compare.files.len()).map(CompareRow::File));
    rows
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExplorerRow {
    Parent,
    Entry(usize),
}

impl PaneRow for ExplorerRow {
    fn is_selectable(&self) -> bool {
        true
    }
}

pub fn explorer_rows(entry_count: usize, at_root: bool) -> Vec<ExplorerRow> {
    let parent = (!at_root).then_some(ExplorerRow::Parent);
    parent.into_iter().chain((0..entry_count).map(ExplorerRow::Entry)).collect()
}

/// History rows are the commits themselves, all selectable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HistoryRow(pub usize);

impl PaneRow for HistoryRow {
    fn is_selectable(&self) -> bool {
        true
    }
}

pub fn history_rows(commit_count: usize) -> Vec<HistoryRow> {
    (0..commit_count).map(HistoryRow).collect()
}

/// Rows of whichever list the active tab shows on top.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TopRows {
    Files(Vec<FileListRow>),
    History(Vec<HistoryRow>),
    Compare(Vec<CompareRow>),
    Explorer(Vec<ExplorerRow>),
}

impl TopRows {
    pub fn len(&self) -> usize {
        match self {
            TopRows::Files(r) => r.len(),
            TopRows::History(r) => r.len(),
            TopRows::Compare(r) => r.len(),
            TopRows::Explorer(r) => r.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn selectable_count(&self) -> usize {
        match self {
            TopRows::Files(r) => selectable_count(r),
            TopRows::History(r) => selectable_count(r),
            TopRows::Compare(r) => selectable_count(r),
            TopRows::Explorer(r) => selectable_count(r),
        }
    }

    pub fn row_of_selection(&self, selection: usize) -> Option<usize> {
        match self {
            TopRows::Files(r) => row_of_selection(r, selection),
            TopRows::History(r) => row_of_selection(r, selection),
            TopRows::Compare(r) => row_of_selection(r, selection),
            TopRows::Explorer(r) => row_of_selection(r, selection),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::{CompareFileDiff, ParsedDiff};
    use crate::git::build_flat_file_list;

    fn entry(path: &str, status: FileStatus, staged: bool) -> FileEntry {
        FileEntry {
            path: path.to_string(),
            original_path: None,
            status,
            staged,
        }
    }

    fn sample() -> Vec<FileEntry> {
        vec![
            entry("src/b.rs", FileStatus::Modified, false),
            entry("src/a.rs", FileStatus::Modified, true),
            entry("src/a.rs", FileStatus::Modified, false),
            entry("notes.md", FileStatus::Untracked, false),
        ]
    }

    fn labels(rows: &[FileListRow]) -> Vec<String> {
        rows.iter()
            .map(|r| match r {
                FileListRow::Header { title, count } => format!("# {title} ({count})"),
                FileListRow::Spacer => String::new(),
                FileListRow::Directory { label } | FileListRow::File { label, .. } => label.clone(),
            })
            .collect()
    }

    #[test]
    fn sections_in_order_with_spacers() {
        let files = sample();
        let rows = file_list_rows(&files, &build_flat_file_list(&files), false, false);
        assert_eq!(
            labels(&rows),
            vec![
                "# Modified (2)",
                "src/a.rs",
                "src/b.rs",
                "",
                "# Untracked (1)",
                "notes.md",
                "",
                "# Staged (1)",
                "src/a.rs",
            ]
        );
        assert_eq!(selectable_count(&rows), 4);
        let staged = rows[8].file().unwrap();
        assert_eq!(staged.staging, StagingState::Staged);
        assert_eq!(
            staged.diff_source(),
            DiffSource::File {
                path: "src/a.rs".to_string(),
                staged: true,
                untracked: false
            }
        );
    }

    #[test]
    fn flat_view_merges_partial() {
        let files = sample();
        let rows = file_list_rows(&files, &build_flat_file_list(&files), true, false);
        assert_eq!(labels(&rows), vec!["notes.md", "src/a.rs", "src/b.rs"]);
        assert_eq!(rows[1].file().unwrap().staging, StagingState::Partial);
        assert!(rows[0].file().unwrap().diff_source() != rows[1].file().unwrap().diff_source());
    }

    #[test]
    fn tree_view_groups_directories() {
        let files = sample();
        let rows = file_list_rows(&files, &build_flat_file_list(&files), true, true);
        assert_eq!(labels(&rows), vec!["├─ src/", "│  ├─ a.rs", "│  └─ b.rs", "└─ notes.md"]);
        assert_eq!(row_of_selection(&rows, 0), Some(1));
        assert_eq!(selection_of_row(&rows, 0), None);
        assert_eq!(selection_of_row(&rows, 3), Some(2));
    }

    #[test]
    fn selection_mapping_skips_headers() {
        let files = sample();
        let rows = file_list_rows(&files, &build_flat_file_list(&files), false, false);
        assert_eq!(row_of_selection(&rows, 0), Some(1));
        assert_eq!(row_of_selection(&rows, 2), Some(5));
        assert_eq!(row_of_selection(&rows, 4), None);
        assert_eq!(selection_of_row(&rows, 4), None);
        assert_eq!(selection_of_row(&rows, 5), Some(2));
        assert_eq!(selection_of_row(&rows, 99), None);
    }

    #[test]
    fn compare_rows_lead_with_summary() {
        assert!(compare_rows(None).is_empty());
        let file = |p: &str, a, d| CompareFileDiff {
            path: p.to_string(),
            status: FileStatus::Modified,
            additions: a,
            deletions: d,
            diff: ParsedDiff::default(),
        };
        let compare = CompareDiff {
            base_branch: "main".to_string(),
            files: vec![file("a", 3, 1), file("b", 2, 0)],
            commits: Vec::new(),
        };
        let rows = compare_rows(Some(&compare));
        assert_eq!(
            rows[0],
            CompareRow::Summary {
                files: 2,
                commits: 0,
                additions: 5,
                deletions: 1
            }
        );
        assert_eq!(row_of_selection(&rows, 1), Some(2));
    }

    #[test]
    fn explorer_parent_row_only_below_root() {
        assert_eq!(explorer_rows(2, true), vec![ExplorerRow::Entry(0), ExplorerRow::Entry(1)]);
        assert_eq!(explorer_rows(1, false), vec![ExplorerRow::Parent, ExplorerRow::Entry(0)]);
    }

    #[test]
    fn top_rows_delegate_to_their_list() {
        let files = sample();
        let rows = TopRows::Files(file_list_rows(&files, &build_flat_file_list(&files), false, false));
        assert_eq!(rows.len(), 9);
        assert_eq!(rows.selectable_count(), 4);
        assert_eq!(rows.row_of_selection(3), Some(8));

        let rows = TopRows::Explorer(explorer_rows(0, true));
        assert!(rows.is_empty());
        assert_eq!(rows.row_of_selection(0), None);
    }
}
