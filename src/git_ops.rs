use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    process::{Command, Output},
};

use crate::branch::BranchEntry;
use crate::diff::{CompareDiff, CompareFileDiff, DiffLineKind, parse_diff, split_by_file, untracked_file_diff};
use crate::error::GitError;
use crate::git::{CommitEntry, FileStatus, StatusSnapshot, parse_status_porcelain};

/// Untracked files bigger than this are cut before being rendered as a diff.
const UNTRACKED_PREVIEW_LIMIT: usize = 512 * 1024;
pub const HISTORY_LIMIT: usize = 500;

const RECORD_SEP: char = '\u{1e}';
const FIELD_SEP: char = '\u{1f}';
const LOG_FORMAT: &str = "--pretty=format:%x1e%H%x1f%h%x1f%an%x1f%ad%x1f%D%x1f%B";

/// Every call blocks on a `git` subprocess; run it in `spawn_blocking`.
pub trait GitBackend: Send + Sync {
    fn root(&self) -> &Path;

    fn status(&self) -> Result<StatusSnapshot, GitError>;
    fn file_diff(&self, path: &str, staged: bool) -> Result<String, GitError>;
    fn untracked_diff(&self, path: &str) -> Result<String, GitError>;
    fn log(&self, max: usize) -> Result<Vec<CommitEntry>, GitError>;
    fn commit_diff(&self, hash: &str) -> Result<String, GitError>;
    fn default_base_branch(&self) -> Result<Option<String>, GitError>;
    fn compare(&self, base: &str) -> Result<CompareDiff, GitError>;
    fn branches(&self) -> Result<Vec<BranchEntry>, GitError>;
    fn last_commit_message(&self) -> Result<String, GitError>;

    fn stage(&self, paths: &[String]) -> Result<(), GitError>;
    fn unstage(&self, paths: &[String]) -> Result<(), GitError>;
    fn stage_all(&self) -> Result<(), GitError>;
    fn unstage_all(&self) -> Result<(), GitError>;
    fn commit(&self, message: &str, amend: bool) -> Result<(), GitError>;
    fn push(&self) -> Result<(), GitError>;
    fn fetch(&self) -> Result<(), GitError>;
    fn pull_rebase(&self) -> Result<(), GitError>;
    fn stash(&self) -> Result<(), GitError>;
    fn stash_pop(&self) -> Result<(), GitError>;
    fn switch_branch(&self, branch: &BranchEntry) -> Result<(), GitError>;
    fn create_branch(&self, name: &str) -> Result<(), GitError>;
    fn soft_reset(&self) -> Result<(), GitError>;
    fn cherry_pick(&self, hash: &str) -> Result<(), GitError>;
    fn revert(&self, hash: &str) -> Result<(), GitError>;
}

fn run_git(cwd: &Path, args: &[&str]) -> Result<Output, GitError> {
    log::trace!("git {}", args.join(" "));
    let out = Command::new("git")
        .arg("-C")
        .arg(cwd)
        .args(args)
        .env("GIT_TERMINAL_PROMPT", "0")
        .env("GCM_INTERACTIVE", "never")
        .env("GIT_PAGER", "cat")
        .env("PAGER", "cat")
        .env("GIT_EDITOR", ":")
        .env("EDITOR", ":")
        .env("GIT_SEQUENCE_EDITOR", ":")
        .env("GIT_MERGE_AUTOEDIT", "no")
        .output()?;
    Ok(out)
}

/// Runs git and returns stdout, turning a non-zero exit into `GitError::Failed`.
fn git_stdout(cwd: &Path, args: &[&str]) -> Result<Vec<u8>, GitError> {
    let out = run_git(cwd, args)?;
    if out.status.success() {
        Ok(out.stdout)
    } else {
        Err(GitError::failed(command_label(args), &out.stderr))
    }
}

fn git_text(cwd: &Path, args: &[&str]) -> Result<String, GitError> {
    git_stdout(cwd, args).map(|b| String::from_utf8_lossy(&b).to_string())
}

fn git_unit(cwd: &Path, args: &[&str]) -> Result<(), GitError> {
    git_stdout(cwd, args).map(|_| ())
}

fn command_label(args: &[&str]) -> String {
    match args.first() {
        Some(sub) => format!("git {sub}"),
        None => "git".to_string(),
    }
}

/// The real backend: one repository root, `git` on `PATH`.
#[derive(Clone, Debug)]
pub struct GitCli {
    root: PathBuf,
}

impl GitCli {
    /// Resolves `path` to its work tree root.
    pub fn open(path: &Path) -> Result<Self, GitError> {
        let out = run_git(path, &["rev-parse", "--show-toplevel"])?;
        if !out.status.success() {
            return Err(GitError::NotARepository(path.to_path_buf()));
        }
        let root = String::from_utf8_lossy(&out.stdout).trim().to_string();
        if root.is_empty() {
            return Err(GitError::NotARepository(path.to_path_buf()));
        }
        Ok(Self {
            root: PathBuf::from(root),
        })
    }

    fn has_head(&self) -> bool {
        run_git(&self.root, &["rev-parse", "--verify", "--quiet", "HEAD"])
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    fn ref_exists(&self, name: &str) -> bool {
        run_git(&self.root, &["rev-parse", "--verify", "--quiet", name])
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    fn log_range(&self, range: Option<&str>, max: usize) -> Result<Vec<CommitEntry>, GitError> {
        if !self.has_head() {
            return Ok(Vec::new());
        }
        let max_s = max.to_string();
        let mut args = vec![
            "log",
            "--no-color",
            "--decorate=short",
            "--date=short",
            "--max-count",
            max_s.as_str(),
            LOG_FORMAT,
        ];
        if let Some(r) = range {
            args.push(r);
        }
        let text = git_text(&self.root, &args)?;
        Ok(parse_log(&text))
    }
}

impl GitBackend for GitCli {
    fn root(&self) -> &Path {
        &self.root
    }

    fn status(&self) -> Result<StatusSnapshot, GitError> {
        let out = git_stdout(
            &self.root,
            &["status", "--porcelain=v1", "-z", "-b", "--untracked-files=all"],
        )?;
        Ok(parse_status_porcelain(&out))
    }

    fn file_diff(&self, path: &str, staged: bool) -> Result<String, GitError> {
        let mut args: Vec<&str> = vec!["diff", "--no-color"];
        if staged {
            args.push("--cached");
        }
        args.push("--");
        args.push(path);
        git_text(&self.root, &args)
    }

    fn untracked_diff(&self, path: &str) -> Result<String, GitError> {
        let bytes = fs::read(self.root.join(path))?;
        if bytes.iter().take(8000).any(|b| *b == 0) {
            return Ok(format!(
                "diff --git a/{path} b/{path}\nnew file mode 100644\nBinary files /dev/null and b/{path} differ\n"
            ));
        }
        let cut = bytes.len().min(UNTRACKED_PREVIEW_LIMIT);
        let text = String::from_utf8_lossy(&bytes[..cut]);
        Ok(untracked_file_diff(path, &text))
    }

    fn log(&self, max: usize) -> Result<Vec<CommitEntry>, GitError> {
        self.log_range(None, max)
    }

    fn commit_diff(&self, hash: &str) -> Result<String, GitError> {
        git_text(
            &self.root,
            &[
                "show",
                "--no-color",
                "--format=",
                "--patch",
                "--diff-merges=first-parent",
                hash,
            ],
        )
    }

    fn default_base_branch(&self) -> Result<Option<String>, GitError> {
        let out = run_git(
            &self.root,
            &["symbolic-ref", "--quiet", "--short", "refs/remotes/origin/HEAD"],
        )?;
        if out.status.success() {
            let name = String::from_utf8_lossy(&out.stdout).trim().to_string();
            if !name.is_empty() {
                return Ok(Some(name));
            }
        }
        for candidate in ["main", "master"] {
            if self.ref_exists(candidate) {
                return Ok(Some(candidate.to_string()));
            }
        }
        Ok(None)
    }

    fn compare(&self, base: &str) -> Result<CompareDiff, GitError> {
        let merge_base = git_text(&self.root, &["merge-base", "HEAD", base])?
            .trim()
            .to_string();
        let raw = git_text(&self.root, &["diff", "--no-color", "-M", &merge_base, "HEAD"])?;
        let name_status = git_text(&self.root, &["diff", "--name-status", "-M", &merge_base, "HEAD"])?;
        let statuses = parse_name_status(&name_status);

        let files = split_by_file(&raw)
            .into_iter()
            .map(|(path, chunk)| {
                let diff = parse_diff(&chunk);
                let additions = count_kind(&diff.lines, DiffLineKind::Addition);
                let deletions = count_kind(&diff.lines, DiffLineKind::Deletion);
                CompareFileDiff {
                    status: statuses.get(&path).copied().unwrap_or(FileStatus::Modified),
                    path,
                    additions,
                    deletions,
                    diff,
                }
            })
            .collect();

        let range = format!("{merge_base}..HEAD");
        let commits = self.log_range(Some(&range), HISTORY_LIMIT)?;
        Ok(CompareDiff {
            base_branch: base.to_string(),
            files,
            commits,
        })
    }

    fn branches(&self) -> Result<Vec<BranchEntry>, GitError> {
        let format = "%(HEAD)\t%(refname:short)\t%(upstream:short)\t%(upstream:track)";
        let local = git_text(
            &self.root,
            &["for-each-ref", "--sort=-committerdate", "refs/heads", "--format", format],
        )?;
        let remote = git_text(
            &self.root,
            &["for-each-ref", "--sort=-committerdate", "refs/remotes", "--format", format],
        )?;
        Ok(parse_branch_refs(&local, &remote))
    }

    fn last_commit_message(&self) -> Result<String, GitError> {
        if !self.has_head() {
            return Ok(String::new());
        }
        let text = git_text(&self.root, &["log", "-1", "--format=%B"])?;
        Ok(text.trim_end().to_string())
    }

    fn stage(&self, paths: &[String]) -> Result<(), GitError> {
        if paths.is_empty() {
            return Ok(());
        }
        let mut args: Vec<&str> = vec!["add", "--"];
        args.extend(paths.iter().map(String::as_str));
        git_unit(&self.root, &args)
    }

    fn unstage(&self, paths: &[String]) -> Result<(), GitError> {
        if paths.is_empty() {
            return Ok(());
        }
        // `restore --staged` needs a HEAD to restore from.
        let mut args: Vec<&str> = if self.has_head() {
            vec!["restore", "--staged", "--"]
        } else {
            vec!["rm", "--cached", "-q", "--"]
        };
        args.extend(paths.iter().map(String::as_str));
        git_unit(&self.root, &args)
    }

    fn stage_all(&self) -> Result<(), GitError> {
        git_unit(&self.root, &["add", "-A"])
    }

    fn unstage_all(&self) -> Result<(), GitError> {
        if self.has_head() {
            git_unit(&self.root, &["reset", "-q"])
        } else {
            git_unit(&self.root, &["rm", "-r", "--cached", "-q", "--", "."])
        }
    }

    fn commit(&self, message: &str, amend: bool) -> Result<(), GitError> {
        let msg = message.trim();
        if msg.is_empty() {
            return Err(GitError::Rejected("Empty commit message".to_string()));
        }

        let mut path = std::env::temp_dir();
        path.push(format!(
            "stagepane-commit-{}-{}.txt",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis()
        ));
        fs::write(&path, msg)?;

        let path_s = path.to_string_lossy().to_string();
        let mut args = vec!["commit", "-F", path_s.as_str()];
        if amend {
            args.push("--amend");
        }
        let result = git_unit(&self.root, &args);
        let _ = fs::remove_file(&path);
        result
    }

    fn push(&self) -> Result<(), GitError> {
        git_unit(&self.root, &["push"])
    }

    fn fetch(&self) -> Result<(), GitError> {
        git_unit(&self.root, &["fetch", "--prune"])
    }

    fn pull_rebase(&self) -> Result<(), GitError> {
        git_unit(&self.root, &["pull", "--rebase"])
    }

    fn stash(&self) -> Result<(), GitError> {
        git_unit(&self.root, &["stash", "push", "--include-untracked"])
    }

    fn stash_pop(&self) -> Result<(), GitError> {
        git_unit(&self.root, &["stash", "pop"])
    }

    fn switch_branch(&self, branch: &BranchEntry) -> Result<(), GitError> {
        if !branch.is_remote {
            return git_unit(&self.root, &["switch", branch.name.as_str()]);
        }
        let local_name = branch
            .name
            .split_once('/')
            .map(|(_, rest)| rest)
            .unwrap_or(branch.name.as_str());
        if self.ref_exists(&format!("refs/heads/{local_name}")) {
            return git_unit(&self.root, &["switch", local_name]);
        }
        git_unit(
            &self.root,
            &["switch", "--track", "-c", local_name, branch.name.as_str()],
        )
    }

    fn create_branch(&self, name: &str) -> Result<(), GitError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(GitError::Rejected("Branch name is empty".to_string()));
        }
        git_unit(&self.root, &["switch", "-c", name])
    }

    fn soft_reset(&self) -> Result<(), GitError> {
        git_unit(&self.root, &["reset", "--soft", "HEAD~1"])
    }

    fn cherry_pick(&self, hash: &str) -> Result<(), GitError> {
        git_unit(&self.root, &["cherry-pick", hash])
    }

    fn revert(&self, hash: &str) -> Result<(), GitError> {
        git_unit(&self.root, &["revert", "--no-edit", hash])
    }
}

fn count_kind(lines: &[crate::diff::DiffLine], kind: DiffLineKind) -> u32 {
    lines.iter().filter(|l| l.kind == kind).count() as u32
}

/// Parses records written with [`LOG_FORMAT`].
fn parse_log(text: &str) -> Vec<CommitEntry> {
    let mut entries = Vec::new();
    for record in text.split(RECORD_SEP) {
        let record = record.trim_start_matches('\n');
        if record.is_empty() {
            continue;
        }
        let mut it = record.splitn(6, FIELD_SEP);
        let hash = it.next().unwrap_or("").trim().to_string();
        if hash.is_empty() {
            continue;
        }
        let short_hash = it.next().unwrap_or("").trim().to_string();
        let author = it.next().unwrap_or("").trim().to_string();
        let date = it.next().unwrap_or("").trim().to_string();
        let refs = it.next().unwrap_or("").trim().to_string();
        let message = it.next().unwrap_or("").trim_end().to_string();
        entries.push(CommitEntry {
            hash,
            short_hash,
            author,
            date,
            message,
            refs,
        });
    }
    entries
}

/// `--name-status` output keyed by the post-image path.
fn parse_name_status(text: &str) -> HashMap<String, FileStatus> {
    let mut out = HashMap::new();
    for line in text.lines() {
        let parts: Vec<&str> = line.trim().split('\t').collect();
        let Some(code) = parts.first().and_then(|s| s.chars().next()) else {
            continue;
        };
        let status = match code {
            'A' => FileStatus::Added,
            'D' => FileStatus::Deleted,
            'R' => FileStatus::Renamed,
            'C' => FileStatus::Copied,
            'U' => FileStatus::Conflicted,
            _ => FileStatus::Modified,
        };
        let path = if matches!(code, 'R' | 'C') {
            parts.get(2)
        } else {
            parts.get(1)
        };
        if let Some(path) = path.filter(|p| !p.is_empty()) {
            out.insert(path.to_string(), status);
        }
    }
    out
}

fn parse_branch_refs(local: &str, remote: &str) -> Vec<BranchEntry> {
    let mut branches = Vec::new();
    for (text, is_remote) in [(local, false), (remote, true)] {
        for line in text.lines() {
            let mut it = line.split('\t');
            let head = it.next().unwrap_or("").trim();
            let name = it.next().unwrap_or("").trim().to_string();
            if name.is_empty() || (is_remote && (name.ends_with("/HEAD") || !name.contains('/'))) {
                continue;
            }
            let upstream = it.next().map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
            let track = it.next().map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
            branches.push(BranchEntry {
                name,
                is_current: !is_remote && head == "*",
                is_remote,
                upstream,
                track,
            });
        }
    }
    branches
}
