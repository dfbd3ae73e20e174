//! Working tree status, the selected file's diff and the commit draft.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::commit::CommitDraft;
use crate::diff::ParsedDiff;
use crate::diff_loader::{DiffLoader, DiffResult, DiffSource};
use crate::emitter::{Emitter, SubscriptionId};
use crate::error::GitError;
use crate::git::{BranchInfo, FileEntry, FlatFileEntry, StatusSnapshot, build_flat_file_list};
use crate::git_ops::GitBackend;
use crate::queue::OperationQueue;

use super::{EventSender, StateEvent, spawn_queued, spawn_read};

#[derive(Clone, Debug, Default)]
pub struct StatusState {
    pub branch: BranchInfo,
    pub files: Vec<FileEntry>,
    pub flat: Vec<FlatFileEntry>,
    pub loading: bool,
    pub error: Option<String>,

    pub diff_source: Option<DiffSource>,
    pub diff: Arc<ParsedDiff>,
    pub diff_loading: bool,
    pub diff_error: Option<String>,

    pub commit: CommitDraft,
    pub committing: bool,
    pub commit_error: Option<String>,
    /// Message of HEAD, fetched when amend is switched on.
    pub last_message: Option<String>,

    /// Stage/unstage calls queued but not yet applied.
    pub pending_staging: usize,
}

impl StatusState {
    pub fn has_staged(&self) -> bool {
        self.files.iter().any(|f| f.staged)
    }

    pub fn staged_count(&self) -> usize {
        self.files.iter().filter(|f| f.staged).count()
    }
}

pub trait StatusCallbacks {
    /// A commit (or amend) landed; history is stale.
    fn on_commit_created(&mut self);
    /// A status refresh reported `branch` as HEAD.
    fn on_branch_observed(&mut self, branch: &str);
}

pub struct StatusManager {
    state: StatusState,
    emitter: Emitter<StatusState>,
    git: Arc<dyn GitBackend>,
    queue: OperationQueue,
    events: EventSender,
    diff_loader: DiffLoader,
    callbacks: Box<dyn StatusCallbacks>,
    status_request: u64,
    diff_request: u64,
    diff_cancel: Option<CancellationToken>,
}

impl StatusManager {
    pub fn new(
        git: Arc<dyn GitBackend>,
        queue: OperationQueue,
        events: EventSender,
        diff_loader: DiffLoader,
        callbacks: Box<dyn StatusCallbacks>,
    ) -> Self {
        Self {
            state: StatusState::default(),
            emitter: Emitter::new(),
            git,
            queue,
            events,
            diff_loader,
            callbacks,
            status_request: 0,
            diff_request: 0,
            diff_cancel: None,
        }
    }

    pub fn state(&self) -> &StatusState {
        &self.state
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&StatusState) + 'static) -> SubscriptionId {
        self.emitter.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.emitter.unsubscribe(id)
    }

    fn update(&mut self, f: impl FnOnce(&mut StatusState)) {
        let mut next = self.state.clone();
        f(&mut next);
        self.state = next;
        self.emitter.emit(&self.state);
    }

    /// Points the manager at another repository and drops everything
    /// loaded from the old one.
    pub fn set_backend(&mut self, git: Arc<dyn GitBackend>) {
        self.git = git;
        if let Some(token) = self.diff_cancel.take() {
            token.cancel();
        }
        self.status_request += 1;
        self.diff_request += 1;
        self.update(|s| *s = StatusState::default());
        self.refresh();
    }

    pub fn refresh(&mut self) {
        self.status_request += 1;
        let request_id = self.status_request;
        self.update(|s| s.loading = true);
        spawn_read(&self.git, &self.events, |g| g.status(), move |result| {
            StateEvent::Status { request_id, result }
        });
    }

    pub fn apply_status(&mut self, request_id: u64, result: Result<StatusSnapshot, GitError>) {
        if request_id != self.status_request {
            log::trace!("dropping stale status {request_id}");
            return;
        }
        match result {
            Ok(snapshot) => {
                let branch = snapshot.branch.current.clone();
                self.update(|s| {
                    s.loading = false;
                    s.error = None;
                    s.flat = build_flat_file_list(&snapshot.files);
                    s.branch = snapshot.branch;
                    s.files = snapshot.files;
                });
                self.callbacks.on_branch_observed(&branch);
            }
            Err(e) => {
                log::warn!("status failed: {e}");
                self.update(|s| {
                    s.loading = false;
                    s.error = Some(e.to_string());
                });
            }
        }
    }

    /// Shows the diff for `source`. Selecting the current source again is
    /// a no-op; use [`Self::reload_diff`] to force a reload.
    pub fn select_diff(&mut self, source: Option<DiffSource>) {
        if source == self.state.diff_source {
            return;
        }
        self.load_diff(source);
    }

    pub fn reload_diff(&mut self) {
        let source = self.state.diff_source.clone();
        self.load_diff(source);
    }

    fn load_diff(&mut self, source: Option<DiffSource>) {
        if let Some(token) = self.diff_cancel.take() {
            token.cancel();
        }
        self.diff_request += 1;
        let Some(src) = source else {
            self.update(|s| {
                s.diff_source = None;
                s.diff = Arc::default();
                s.diff_loading = false;
                s.diff_error = None;
            });
            return;
        };
        self.diff_cancel = Some(self.diff_loader.request(
            Arc::clone(&self.git),
            src.clone(),
            self.diff_request,
        ));
        self.update(|s| {
            s.diff_source = Some(src);
            s.diff_loading = true;
            s.diff_error = None;
        });
    }

    pub fn apply_diff(&mut self, result: DiffResult) {
        match result {
            DiffResult::Ready {
                request_id, diff, ..
            } if request_id == self.diff_request => {
                self.diff_cancel = None;
                self.update(|s| {
                    s.diff = Arc::new(diff);
                    s.diff_loading = false;
                    s.diff_error = None;
                });
            }
            DiffResult::Error {
                request_id, error, ..
            } if request_id == self.diff_request => {
                self.diff_cancel = None;
                self.update(|s| {
                    s.diff = Arc::default();
                    s.diff_loading = false;
                    s.diff_error = Some(error);
                });
            }
            _ => {}
        }
    }

    fn queue_staging<F>(&mut self, label: String, call: F)
    where
        F: FnOnce(&dyn GitBackend) -> Result<(), GitError> + Send + 'static,
    {
        log::debug!("queueing {label}");
        self.update(|s| s.pending_staging += 1);
        spawn_queued(&self.queue, &self.git, &self.events, call, move |result| {
            StateEvent::StagingFinished { label, result }
        });
    }

    pub fn stage(&mut self, paths: Vec<String>) {
        if paths.is_empty() {
            return;
        }
        let label = format!("stage {}", paths.join(", "));
        self.queue_staging(label, move |g| g.stage(&paths));
    }

    pub fn unstage(&mut self, paths: Vec<String>) {
        if paths.is_empty() {
            return;
        }
        let label = format!("unstage {}", paths.join(", "));
        self.queue_staging(label, move |g| g.unstage(&paths));
    }

    pub fn stage_all(&mut self) {
        self.queue_staging("stage all".to_string(), |g| g.stage_all());
    }

    pub fn unstage_all(&mut self) {
        self.queue_staging("unstage all".to_string(), |g| g.unstage_all());
    }

    pub fn apply_staging_finished(&mut self, label: &str, result: Result<(), GitError>) {
        match &result {
            Ok(()) => log::info!("{label} finished"),
            Err(e) => log::warn!("{label} failed: {e}"),
        }
        self.update(|s| {
            s.pending_staging = s.pending_staging.saturating_sub(1);
            s.error = result.err().map(|e| e.to_string());
        });
        self.refresh();
        self.reload_diff();
    }

    pub fn edit_draft(&mut self, f: impl FnOnce(&mut CommitDraft)) {
        self.update(|s| {
            f(&mut s.commit);
            s.commit_error = None;
        });
    }

    pub fn toggle_amend(&mut self) {
        let amend = !self.state.commit.amend;
        let last = self.state.last_message.clone();
        self.update(|s| {
            s.commit.amend = amend;
            if !amend && last.as_deref() == Some(s.commit.message.as_str()) {
                s.commit.clear();
            }
        });
        if amend && self.state.commit.is_blank() {
            spawn_read(&self.git, &self.events, |g| g.last_commit_message(), StateEvent::LastCommitMessage);
        }
    }

    pub fn apply_last_message(&mut self, result: Result<String, GitError>) {
        match result {
            Ok(message) => self.update(|s| {
                if s.commit.amend && s.commit.is_blank() {
                    s.commit.set_message(&message);
                }
                s.last_message = Some(message);
            }),
            Err(e) => {
                log::warn!("could not read last commit message: {e}");
                self.update(|s| s.commit_error = Some(e.to_string()));
            }
        }
    }

    /// Queues the commit. Rejects a blank message, and a plain commit with
    /// nothing staged.
    pub fn commit(&mut self) -> Result<(), GitError> {
        let draft = &self.state.commit;
        let rejection = if self.state.committing {
            Some("A commit is already in progress")
        } else if draft.is_blank() {
            Some("Commit message is empty")
        } else if !draft.amend && !self.state.has_staged() {
            Some("Nothing staged to commit")
        } else {
            None
        };
        if let Some(reason) = rejection {
            self.update(|s| s.commit_error = Some(reason.to_string()));
            return Err(GitError::Rejected(reason.to_string()));
        }

        let message = draft.message.clone();
        let amend = draft.amend;
        log::debug!("queueing {}", if amend { "amend" } else { "commit" });
        self.update(|s| {
            s.committing = true;
            s.commit_error = None;
        });
        spawn_queued(&self.queue, &self.git, &self.events, move |g| g.commit(&message, amend), move |result| {
            StateEvent::CommitFinished { amend, result }
        });
        Ok(())
    }

    pub fn apply_commit_finished(&mut self, amend: bool, result: Result<(), GitError>) {
        match result {
            Ok(()) => {
                log::info!("{} finished", if amend { "amend" } else { "commit" });
                self.update(|s| {
                    s.committing = false;
                    s.commit = CommitDraft::default();
                    s.last_message = None;
                });
                self.callbacks.on_commit_created();
                self.refresh();
                self.reload_diff();
            }
            Err(e) => {
                log::warn!("commit failed: {e}");
                self.update(|s| {
                    s.committing = false;
                    s.commit_error = Some(e.to_string());
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::{FileStatus, StagingState};
    use crate::state::testing::Harness;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;
    use tokio::sync::mpsc;

    struct Recorder(Rc<RefCell<Vec<String>>>);

    impl StatusCallbacks for Recorder {
        fn on_commit_created(&mut self) {
            self.0.borrow_mut().push("commit".to_string());
        }
        fn on_branch_observed(&mut self, branch: &str) {
            self.0.borrow_mut().push(format!("branch {branch}"));
        }
    }

    fn entry(path: &str, status: FileStatus, staged: bool) -> FileEntry {
        FileEntry {
            path: path.to_string(),
            original_path: None,
            status,
            staged,
        }
    }

    fn manager(h: &Harness) -> (StatusManager, mpsc::Receiver<DiffResult>, Rc<RefCell<Vec<String>>>) {
        let (loader, rx) = DiffLoader::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let m = StatusManager::new(
            Arc::clone(&h.git),
            h.queue.clone(),
            h.events.clone(),
            loader,
            Box::new(Recorder(Rc::clone(&log))),
        );
        (m, rx, log)
    }

    async fn pump(h: &mut Harness, m: &mut StatusManager) {
        match h.next().await {
            StateEvent::Status { request_id, result } => m.apply_status(request_id, result),
            StateEvent::StagingFinished { label, result } => m.apply_staging_finished(&label, result),
            StateEvent::CommitFinished { amend, result } => m.apply_commit_finished(amend, result),
            StateEvent::LastCommitMessage(result) => m.apply_last_message(result),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn refresh_builds_flat_list_and_reports_branch() {
        let mut h = Harness::new();
        {
            let mut snap = h.fake.snapshot.lock();
            snap.branch.current = "main".to_string();
            snap.files = vec![
                entry("b.rs", FileStatus::Modified, false),
                entry("a.rs", FileStatus::Modified, true),
                entry("a.rs", FileStatus::Modified, false),
            ];
        }
        let (mut m, _rx, log) = manager(&h);
        m.refresh();
        assert!(m.state().loading);
        pump(&mut h, &mut m).await;

        let s = m.state();
        assert!(!s.loading);
        assert_eq!(s.flat.len(), 2);
        assert_eq!(s.flat[0].path, "a.rs");
        assert_eq!(s.flat[0].staging_state, StagingState::Partial);
        assert_eq!(*log.borrow(), vec!["branch main"]);
    }

    #[tokio::test]
    async fn stale_status_is_dropped() {
        let mut h = Harness::new();
        let (mut m, _rx, _) = manager(&h);
        m.refresh();
        m.refresh();
        pump(&mut h, &mut m).await;
        pump(&mut h, &mut m).await;
        assert!(!m.state().loading);
        m.apply_status(1, Err(GitError::QueueClosed));
        assert!(m.state().error.is_none());
    }

    #[tokio::test]
    async fn staging_is_serialized_and_refreshes() {
        let mut h = Harness::new();
        *h.fake.delay.lock() = Duration::from_millis(10);
        h.fake.snapshot.lock().files = vec![
            entry("a.rs", FileStatus::Modified, false),
            entry("b.rs", FileStatus::Modified, false),
        ];
        let (mut m, _rx, _) = manager(&h);

        m.stage(vec!["a.rs".to_string()]);
        m.stage(vec!["b.rs".to_string()]);
        assert_eq!(m.state().pending_staging, 2);

        // Two staging completions, each followed by a status refresh.
        for _ in 0..4 {
            pump(&mut h, &mut m).await;
        }
        assert_eq!(m.state().pending_staging, 0);
        assert_eq!(
            h.fake.calls(),
            vec!["start stage a.rs", "end stage a.rs", "start stage b.rs", "end stage b.rs"]
        );
        assert!(m.state().files.iter().all(|f| f.staged));
    }

    #[tokio::test]
    async fn commit_validation() {
        let h = Harness::new();
        let (mut m, _rx, _) = manager(&h);
        assert!(matches!(m.commit(), Err(GitError::Rejected(_))));
        assert_eq!(m.state().commit_error.as_deref(), Some("Commit message is empty"));

        m.edit_draft(|d| d.set_message("fix things"));
        assert!(m.state().commit_error.is_none());
        assert!(m.commit().is_err());
        assert_eq!(m.state().commit_error.as_deref(), Some("Nothing staged to commit"));
        assert_eq!(h.queue.pending(), 0);
    }

    #[tokio::test]
    async fn commit_clears_draft_and_notifies() {
        let mut h = Harness::new();
        h.fake.snapshot.lock().files = vec![entry("a.rs", FileStatus::Added, true)];
        let (mut m, _rx, log) = manager(&h);
        m.refresh();
        pump(&mut h, &mut m).await;

        m.edit_draft(|d| d.set_message("add a"));
        m.commit().unwrap();
        assert!(m.state().committing);
        pump(&mut h, &mut m).await;
        assert!(!m.state().committing);
        assert!(m.state().commit.is_blank());
        assert!(log.borrow().contains(&"commit".to_string()));

        pump(&mut h, &mut m).await;
        assert!(m.state().files.is_empty());
    }

    #[tokio::test]
    async fn amend_prefills_last_message() {
        let mut h = Harness::new();
        *h.fake.last_message.lock() = "previous subject".to_string();
        let (mut m, _rx, _) = manager(&h);

        m.toggle_amend();
        pump(&mut h, &mut m).await;
        assert!(m.state().commit.amend);
        assert_eq!(m.state().commit.message, "previous subject");

        m.toggle_amend();
        assert!(!m.state().commit.amend);
        assert!(m.state().commit.is_blank());
    }

    #[tokio::test]
    async fn diff_selection_drops_superseded_results() {
        let h = Harness::new();
        let (mut m, mut rx, _) = manager(&h);
        let a = DiffSource::File {
            path: "a.rs".to_string(),
            staged: false,
            untracked: false,
        };
        let b = DiffSource::File {
            path: "b.rs".to_string(),
            staged: true,
            untracked: false,
        };
        m.select_diff(Some(a));
        m.select_diff(Some(b.clone()));
        assert_eq!(m.state().diff_source.as_ref(), Some(&b));

        for _ in 0..2 {
            let result = rx.recv().await.unwrap();
            m.apply_diff(result);
        }
        assert!(!m.state().diff_loading);
        assert!(m.state().diff.raw.contains("b.rs"));

        m.select_diff(None);
        assert!(m.state().diff.is_empty());
    }
}
