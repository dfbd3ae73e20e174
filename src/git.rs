use std::cmp::Ordering;
use unicode_width::UnicodeWidthChar;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileStatus {
    Modified,
    Added,
    Deleted,
    Renamed,
    Copied,
    Untracked,
    Conflicted,
}

impl FileStatus {
    fn from_code(code: char) -> Option<Self> {
        match code {
            'M' | 'T' => Some(FileStatus::Modified),
            'A' => Some(FileStatus::Added),
            'D' => Some(FileStatus::Deleted),
            'R' => Some(FileStatus::Renamed),
            'C' => Some(FileStatus::Copied),
            'U' => Some(FileStatus::Conflicted),
            '?' => Some(FileStatus::Untracked),
            _ => None,
        }
    }

    pub fn symbol(self) -> char {
        match self {
            FileStatus::Modified => 'M',
            FileStatus::Added => 'A',
            FileStatus::Deleted => 'D',
            FileStatus::Renamed => 'R',
            FileStatus::Copied => 'C',
            FileStatus::Untracked => '?',
            FileStatus::Conflicted => 'U',
        }
    }
}

/// One record of `git status`. A path changed in both the index and the
/// worktree appears twice, once with `staged` set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileEntry {
    pub path: String,
    pub original_path: Option<String>,
    pub status: FileStatus,
    pub staged: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StagingState {
    Unstaged,
    Staged,
    Partial,
}

/// One row per unique path, merging the staged and unstaged records.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlatFileEntry {
    pub path: String,
    pub status: FileStatus,
    pub staging_state: StagingState,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BranchInfo {
    pub current: String,
    pub tracking: Option<String>,
    pub ahead: u32,
    pub behind: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitEntry {
    pub hash: String,
    pub short_hash: String,
    pub author: String,
    pub date: String,
    pub message: String,
    pub refs: String,
}

impl CommitEntry {
    pub fn subject(&self) -> &str {
        self.message.lines().next().unwrap_or("")
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub branch: BranchInfo,
    pub files: Vec<FileEntry>,
}

/// Parses `git status --porcelain=v1 -z -b` output.
pub fn parse_status_porcelain(out: &[u8]) -> StatusSnapshot {
    let mut snapshot = StatusSnapshot::default();

    let items: Vec<&[u8]> = out.split(|b| *b == 0).filter(|s| !s.is_empty()).collect();
    let mut i = 0;
    while i < items.len() {
        let s = String::from_utf8_lossy(items[i]).to_string();
        if let Some(branch_line) = s.strip_prefix("## ") {
            snapshot.branch = parse_branch_line(branch_line);
            i += 1;
            continue;
        }

        if s.len() < 4 {
            i += 1;
            continue;
        }

        let x = s.chars().next().unwrap_or(' ');
        let y = s.chars().nth(1).unwrap_or(' ');
        let path = s[3..].to_string();

        if x == '?' && y == '?' {
            snapshot.files.push(FileEntry {
                path,
                original_path: None,
                status: FileStatus::Untracked,
                staged: false,
            });
            i += 1;
            continue;
        }

        // Renames and copies carry the source path as the following item.
        let mut original_path = None;
        if x == 'R' || x == 'C' || y == 'R' || y == 'C' {
            original_path = items
                .get(i + 1)
                .map(|b| String::from_utf8_lossy(b).to_string());
            i += 1;
        }

        if is_conflict_status(x, y) {
            snapshot.files.push(FileEntry {
                path,
                original_path,
                status: FileStatus::Conflicted,
                staged: false,
            });
            i += 1;
            continue;
        }

        if let Some(status) = FileStatus::from_code(x) {
            snapshot.files.push(FileEntry {
                path: path.clone(),
                original_path: original_path.clone(),
                status,
                staged: true,
            });
        }
        if let Some(status) = FileStatus::from_code(y) {
            snapshot.files.push(FileEntry {
                path,
                original_path,
                status,
                staged: false,
            });
        }
        i += 1;
    }

    snapshot
}

fn parse_branch_line(line: &str) -> BranchInfo {
    let rest = line.trim();
    let mut info = BranchInfo::default();
    if rest.is_empty() {
        return info;
    }

    let (head, ab_part) = if let Some((left, right)) = rest.rsplit_once(" [") {
        (left.trim(), Some(right.trim_end_matches(']').trim()))
    } else {
        (rest, None)
    };

    if let Some(name) = head.strip_prefix("No commits yet on ") {
        info.current = name.trim().to_string();
        return info;
    }

    match head.split_once("...") {
        Some((local, upstream)) => {
            info.current = local.trim().to_string();
            info.tracking = Some(upstream.trim().to_string()).filter(|s| !s.is_empty());
        }
        None => info.current = head.to_string(),
    }

    let Some(ab_part) = ab_part else {
        return info;
    };
    for item in ab_part.split(',').map(str::trim) {
        if let Some(v) = item.strip_prefix("ahead ") {
            info.ahead = v.parse::<u32>().unwrap_or(0);
        } else if let Some(v) = item.strip_prefix("behind ") {
            info.behind = v.parse::<u32>().unwrap_or(0);
        }
    }
    info
}

fn is_conflict_status(x: char, y: char) -> bool {
    matches!(
        (x, y),
        ('U', 'U') | ('A', 'A') | ('D', 'D') | ('A', 'U') | ('U', 'A') | ('D', 'U') | ('U', 'D')
    )
}

/// Merges staged and unstaged records into one entry per path, sorted by path.
pub fn build_flat_file_list(files: &[FileEntry]) -> Vec<FlatFileEntry> {
    let mut flat: Vec<FlatFileEntry> = Vec::with_capacity(files.len());
    let mut sorted: Vec<&FileEntry> = files.iter().collect();
    sorted.sort_by(|a, b| a.path.cmp(&b.path).then(b.staged.cmp(&a.staged)));

    for entry in sorted {
        let state = if entry.staged {
            StagingState::Staged
        } else {
            StagingState::Unstaged
        };
        match flat.last_mut() {
            Some(last) if last.path == entry.path => {
                if last.staging_state != state {
                    last.staging_state = StagingState::Partial;
                }
                // The worktree status is the more current one to show.
                if !entry.staged {
                    last.status = entry.status;
                }
            }
            _ => flat.push(FlatFileEntry {
                path: entry.path.clone(),
                status: entry.status,
                staging_state: state,
            }),
        }
    }
    flat
}

/// Case-insensitive ordering with a case-sensitive tiebreak, so `Readme`
/// and `readme` still sort deterministically.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

pub fn char_width(ch: char) -> usize {
    if ch == '\t' {
        4
    } else {
        UnicodeWidthChar::width(ch).unwrap_or(0)
    }
}

pub fn display_width(s: &str) -> usize {
    s.chars().map(char_width).sum()
}

pub fn truncate_to_width(s: &str, width: usize) -> String {
    if width == 0 {
        return String::new();
    }

    let mut out = String::new();
    let mut wsum = 0usize;

    for ch in s.chars() {
        let w = char_width(ch);
        if wsum + w > width {
            break;
        }
        if ch == '\t' {
            out.push_str("    ");
        } else {
            out.push(ch);
        }
        wsum += w;
        if wsum >= width {
            break;
        }
    }

    out
}

pub fn pad_to_width(mut s: String, width: usize) -> String {
    if width == 0 {
        return String::new();
    }

    let w = display_width(&s);
    if w >= width {
        return truncate_to_width(&s, width);
    }

    s.push_str(&" ".repeat(width - w));
    s
}
