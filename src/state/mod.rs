//! State managers.
//!
//! Each manager owns one state value. Mutations clone the current value,
//! modify the clone, swap it in and then notify subscribers synchronously.
//! Managers never hold references to each other: behavior that crosses
//! managers goes through the callback traits the orchestrator implements.
//!
//! Background work (git calls, directory listings) reports back through a
//! single [`EventSender`]; the orchestrator feeds each [`StateEvent`] to the
//! manager that issued it.

pub mod explorer;
pub mod history;
pub mod remote;
pub mod status;
pub mod ui;

use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::branch::{BranchEntry, PickerPurpose};
use crate::diff::CompareDiff;
use crate::error::GitError;
use crate::git::{CommitEntry, StatusSnapshot};
use crate::git_ops::GitBackend;
use crate::queue::OperationQueue;

pub use explorer::ExplorerEntry;
pub use remote::Operation;

/// Completion of background work started by a manager.
#[derive(Debug)]
pub enum StateEvent {
    Status {
        request_id: u64,
        result: Result<StatusSnapshot, GitError>,
    },
    StagingFinished {
        label: String,
        result: Result<(), GitError>,
    },
    CommitFinished {
        amend: bool,
        result: Result<(), GitError>,
    },
    LastCommitMessage(Result<String, GitError>),
    History {
        request_id: u64,
        result: Result<Vec<CommitEntry>, GitError>,
    },
    BaseDetected {
        request_id: u64,
        result: Result<Option<String>, GitError>,
    },
    Compare {
        request_id: u64,
        result: Result<CompareDiff, GitError>,
    },
    Branches {
        purpose: PickerPurpose,
        result: Result<Vec<BranchEntry>, GitError>,
    },
    Remote {
        op: Operation,
        detail: String,
        result: Result<(), GitError>,
    },
    DirListed {
        request_id: u64,
        dir: PathBuf,
        result: Result<Vec<ExplorerEntry>, String>,
    },
}

pub type EventSender = mpsc::UnboundedSender<StateEvent>;

/// Runs a read-only git call off the event loop and posts its completion.
/// Reads do not go through the operation queue.
pub(crate) fn spawn_read<T, F, D>(git: &Arc<dyn GitBackend>, events: &EventSender, op: F, done: D)
where
    T: Send + 'static,
    F: FnOnce(&dyn GitBackend) -> Result<T, GitError> + Send + 'static,
    D: FnOnce(Result<T, GitError>) -> StateEvent + Send + 'static,
{
    let git = Arc::clone(git);
    let events = events.clone();
    tokio::spawn(async move {
        let result = tokio::task::spawn_blocking(move || op(git.as_ref()))
            .await
            .unwrap_or_else(|e| Err(GitError::Join(e.to_string())));
        let _ = events.send(done(result));
    });
}

/// Submits a mutating git call to the operation queue and posts its
/// completion. The queue position is taken before this returns.
pub(crate) fn spawn_queued<T, F, D>(
    queue: &OperationQueue,
    git: &Arc<dyn GitBackend>,
    events: &EventSender,
    op: F,
    done: D,
) where
    T: Send + 'static,
    F: FnOnce(&dyn GitBackend) -> Result<T, GitError> + Send + 'static,
    D: FnOnce(Result<T, GitError>) -> StateEvent + Send + 'static,
{
    let git = Arc::clone(git);
    let events = events.clone();
    let pending = queue.enqueue(move || async move {
        tokio::task::spawn_blocking(move || op(git.as_ref()))
            .await
            .unwrap_or_else(|e| Err(GitError::Join(e.to_string())))
    });
    tokio::spawn(async move {
        let result = pending.await;
        let _ = events.send(done(result));
    });
}

#[cfg(test)]
pub(crate) mod testing {
    //! Shared fixtures for manager tests.

    use super::*;
    use crate::git_ops::fake::FakeGit;

    pub struct Harness {
        pub fake: Arc<FakeGit>,
        pub git: Arc<dyn GitBackend>,
        pub queue: OperationQueue,
        pub events: EventSender,
        pub rx: mpsc::UnboundedReceiver<StateEvent>,
    }

    impl Harness {
        pub fn new() -> Self {
            let fake = Arc::new(FakeGit::new());
            let git: Arc<dyn GitBackend> = fake.clone();
            let (events, rx) = mpsc::unbounded_channel();
            Self {
                fake,
                git,
                queue: OperationQueue::new(),
                events,
                rx,
            }
        }

        pub async fn next(&mut self) -> StateEvent {
            tokio::time::timeout(std::time::Duration::from_secs(5), self.rx.recv())
                .await
                .expect("timed out waiting for a state event")
                .expect("event channel closed")
        }
    }
}
