//! Async diff loading with cancellation support.
//!
//! Diffs of large files or commits can take a while, so they are produced in
//! `spawn_blocking` and delivered back to the event loop over a channel.
//! Every request carries an id; callers drop results whose id is stale.

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::diff::{ParsedDiff, parse_diff};
use crate::git_ops::GitBackend;

/// What to diff.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DiffSource {
    /// A working tree file, against the index or HEAD.
    File {
        path: String,
        staged: bool,
        untracked: bool,
    },
    /// A commit against its first parent.
    Commit { hash: String },
}

struct DiffRequest {
    git: Arc<dyn GitBackend>,
    source: DiffSource,
    request_id: u64,
    cancel: CancellationToken,
}

#[derive(Debug)]
pub enum DiffResult {
    Ready {
        request_id: u64,
        source: DiffSource,
        diff: ParsedDiff,
    },
    Error {
        request_id: u64,
        source: DiffSource,
        error: String,
    },
    Cancelled,
}

/// Handle for requesting diffs. Cheap to clone.
#[derive(Clone)]
pub struct DiffLoader {
    tx: mpsc::Sender<DiffRequest>,
}

impl DiffLoader {
    /// Spawns the loader task; poll the receiver in the main loop.
    pub fn new() -> (Self, mpsc::Receiver<DiffResult>) {
        let (request_tx, request_rx) = mpsc::channel::<DiffRequest>(32);
        let (result_tx, result_rx) = mpsc::channel::<DiffResult>(32);

        tokio::spawn(diff_loader_task(request_rx, result_tx));

        (Self { tx: request_tx }, result_rx)
    }

    /// Non-blocking send. Cancel the returned token to discard the result.
    pub fn request(&self, git: Arc<dyn GitBackend>, source: DiffSource, request_id: u64) -> CancellationToken {
        let cancel = CancellationToken::new();
        let sent = self.tx.try_send(DiffRequest {
            git,
            source,
            request_id,
            cancel: cancel.clone(),
        });
        if let Err(e) = sent {
            log::warn!("diff request {request_id} dropped: {e}");
        }
        cancel
    }
}

async fn diff_loader_task(mut rx: mpsc::Receiver<DiffRequest>, tx: mpsc::Sender<DiffResult>) {
    while let Some(request) = rx.recv().await {
        let DiffRequest {
            git,
            source,
            request_id,
            cancel,
        } = request;

        if cancel.is_cancelled() {
            let _ = tx.send(DiffResult::Cancelled).await;
            continue;
        }

        let src = source.clone();
        let result = tokio::task::spawn_blocking(move || load_diff(git.as_ref(), &src)).await;

        if cancel.is_cancelled() {
            let _ = tx.send(DiffResult::Cancelled).await;
            continue;
        }

        let out = match result {
            Ok(Ok(diff)) => DiffResult::Ready {
                request_id,
                source,
                diff,
            },
            Ok(Err(e)) => DiffResult::Error {
                request_id,
                source,
                error: e,
            },
            Err(e) => DiffResult::Error {
                request_id,
                source,
                error: format!("Task join error: {e}"),
            },
        };
        let _ = tx.send(out).await;
    }
}

fn load_diff(git: &dyn GitBackend, source: &DiffSource) -> Result<ParsedDiff, String> {
    let raw = match source {
        DiffSource::File {
            path,
            untracked: true,
            ..
        } => git.untracked_diff(path),
        DiffSource::File { path, staged, .. } => git.file_diff(path, *staged),
        DiffSource::Commit { hash } => git.commit_diff(hash),
    }
    .map_err(|e| e.to_string())?;
    Ok(parse_diff(&raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::DiffLineKind;
    use crate::git_ops::fake::FakeGit;

    #[tokio::test]
    async fn loads_and_tags_results() {
        let (loader, mut rx) = DiffLoader::new();
        let git: Arc<dyn GitBackend> = Arc::new(FakeGit::new());
        let source = DiffSource::File {
            path: "src/lib.rs".to_string(),
            staged: true,
            untracked: false,
        };
        loader.request(Arc::clone(&git), source.clone(), 4);

        match rx.recv().await.unwrap() {
            DiffResult::Ready {
                request_id,
                source: got,
                diff,
            } => {
                assert_eq!(request_id, 4);
                assert_eq!(got, source);
                assert!(diff.lines.iter().any(|l| l.kind == DiffLineKind::Addition));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn cancelled_request_yields_cancelled() {
        let (loader, mut rx) = DiffLoader::new();
        let git: Arc<dyn GitBackend> = Arc::new(FakeGit::new());
        let token = loader.request(
            git,
            DiffSource::Commit {
                hash: "abc".to_string(),
            },
            1,
        );
        token.cancel();
        assert!(matches!(rx.recv().await.unwrap(), DiffResult::Cancelled));
    }
}
