use std::{io, path::PathBuf};
use thiserror::Error;

/// Failure of a call into the git command layer.
///
/// Managers never propagate this past their own state: the rendered message
/// lands in the manager's `error` field and is shown in the status line.
#[derive(Error, Debug)]
pub enum GitError {
    #[error("failed to run git: {0}")]
    Spawn(#[from] io::Error),

    #[error("{command} failed: {stderr}")]
    Failed { command: String, stderr: String },

    #[error("not a git repository: {}", .0.display())]
    NotARepository(PathBuf),

    #[error("{0}")]
    Rejected(String),

    #[error("operation queue is closed")]
    QueueClosed,

    #[error("background task failed: {0}")]
    Join(String),
}

impl GitError {
    pub fn failed(command: impl Into<String>, stderr: &[u8]) -> Self {
        let stderr = String::from_utf8_lossy(stderr).trim().to_string();
        GitError::Failed {
            command: command.into(),
            stderr: if stderr.is_empty() {
                "exited with an error".to_string()
            } else {
                stderr
            },
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("no home directory to store preferences in")]
    NoHome,

    #[error("preferences io error on {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("malformed preferences in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_uses_trimmed_stderr() {
        let err = GitError::failed("git push", b"  rejected: non-fast-forward\n");
        assert_eq!(err.to_string(), "git push failed: rejected: non-fast-forward");
    }

    #[test]
    fn failed_without_stderr_has_fallback() {
        let err = GitError::failed("git fetch", b"");
        assert_eq!(err.to_string(), "git fetch failed: exited with an error");
    }
}
