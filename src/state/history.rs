use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::diff::{CompareDiff, ParsedDiff};
use crate::diff_loader::{DiffLoader, DiffResult, DiffSource};
use crate::emitter::{Emitter, SubscriptionId};
use crate::error::GitError;
use crate::git::CommitEntry;
use crate::git_ops::{GitBackend, HISTORY_LIMIT};

use super::{EventSender, StateEvent, spawn_read};

#[derive(Clone, Debug)]
pub struct CommitDetail {
    pub commit: CommitEntry,
    pub diff: Arc<ParsedDiff>,
}

#[derive(Clone, Debug, Default)]
pub struct HistoryState {
    pub commits: Vec<CommitEntry>,
    pub loading: bool,
    pub error: Option<String>,

    pub detail: Option<CommitDetail>,
    pub detail_loading: bool,
    pub detail_error: Option<String>,

    /// Last HEAD branch reported by status.
    pub current_branch: String,
    pub base_branch: Option<String>,
    /// Picked by the user rather than detected.
    pub base_is_explicit: bool,
    pub compare: Option<Arc<CompareDiff>>,
    pub compare_loading: bool,
    pub compare_error: Option<String>,
}

pub struct HistoryManager {
    state: HistoryState,
    emitter: Emitter<HistoryState>,
    git: Arc<dyn GitBackend>,
    events: EventSender,
    diff_loader: DiffLoader,
    history_request: u64,
    detail_request: u64,
    detail_cancel: Option<CancellationToken>,
    compare_request: u64,
}

impl HistoryManager {
    pub fn new(git: Arc<dyn GitBackend>, events: EventSender, diff_loader: DiffLoader) -> Self {
        Self {
            state: HistoryState::default(),
            emitter: Emitter::new(),
            git,
            events,
            diff_loader,
            history_request: 0,
            detail_request: 0,
            detail_cancel: None,
            compare_request: 0,
        }
    }

    pub fn state(&self) -> &HistoryState {
        &self.state
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&HistoryState) + 'static) -> SubscriptionId {
        self.emitter.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.emitter.unsubscribe(id)
    }

    fn update(&mut self, f: impl FnOnce(&mut HistoryState)) {
        let mut next = self.state.clone();
        f(&mut next);
        self.state = next;
        self.emitter.emit(&self.state);
    }

    pub fn set_backend(&mut self, git: Arc<dyn GitBackend>) {
        self.git = git;
        if let Some(token) = self.detail_cancel.take() {
            token.cancel();
        }
        self.history_request += 1;
        self.detail_request += 1;
        self.compare_request += 1;
        self.update(|s| *s = HistoryState::default());
        self.refresh();
        self.refresh_compare();
    }

    pub fn refresh(&mut self) {
        self.history_request += 1;
        let request_id = self.history_request;
        self.update(|s| s.loading = true);
        spawn_read(&self.git, &self.events, |g| g.log(HISTORY_LIMIT), move |result| {
            StateEvent::History { request_id, result }
        });
    }

    pub fn apply_history(&mut self, request_id: u64, result: Result<Vec<CommitEntry>, GitError>) {
        if request_id != self.history_request {
            return;
        }
        match result {
            Ok(commits) => self.update(|s| {
                s.loading = false;
                s.error = None;
                s.commits = commits;
            }),
            Err(e) => {
                log::warn!("log failed: {e}");
                self.update(|s| {
                    s.loading = false;
                    s.error = Some(e.to_string());
                });
            }
        }
    }

    /// Loads the detail for `commit`; re-selecting the shown commit is a no-op.
    pub fn select_commit(&mut self, commit: Option<&CommitEntry>) {
        let shown = self.state.detail.as_ref().map(|d| d.commit.hash.as_str());
        if shown == commit.map(|c| c.hash.as_str()) {
            return;
        }
        if let Some(token) = self.detail_cancel.take() {
            token.cancel();
        }
        self.detail_request += 1;

        let Some(commit) = commit.cloned() else {
            self.update(|s| {
                s.detail = None;
                s.detail_loading = false;
                s.detail_error = None;
            });
            return;
        };
        let source = DiffSource::Commit {
            hash: commit.hash.clone(),
        };
        self.detail_cancel = Some(self.diff_loader.request(Arc::clone(&self.git), source, self.detail_request));
        self.update(|s| {
            s.detail = Some(CommitDetail {
                commit,
                diff: Arc::default(),
            });
            s.detail_loading = true;
            s.detail_error = None;
        });
    }

    pub fn apply_detail(&mut self, result: DiffResult) {
        match result {
            DiffResult::Ready {
                request_id, diff, ..
            } if request_id == self.detail_request => {
                self.detail_cancel = None;
                self.update(|s| {
                    if let Some(detail) = s.detail.as_mut() {
                        detail.diff = Arc::new(diff);
                    }
                    s.detail_loading = false;
                });
            }
            DiffResult::Error {
                request_id, error, ..
            } if request_id == self.detail_request => {
                self.detail_cancel = None;
                self.update(|s| {
                    s.detail_loading = false;
                    s.detail_error = Some(error);
                });
            }
            _ => {}
        }
    }

    /// Recomputes the comparison, detecting the base branch first if none
    /// is known.
    pub fn refresh_compare(&mut self) {
        self.compare_request += 1;
        let request_id = self.compare_request;
        self.update(|s| {
            s.compare_loading = true;
            s.compare_error = None;
        });

        match self.state.base_branch.clone() {
            Some(base) => {
                spawn_read(&self.git, &self.events, move |g| g.compare(&base), move |result| {
                    StateEvent::Compare { request_id, result }
                });
            }
            None => {
                spawn_read(&self.git, &self.events, |g| g.default_base_branch(), move |result| {
                    StateEvent::BaseDetected { request_id, result }
                });
            }
        }
    }

    pub fn apply_base_detected(&mut self, request_id: u64, result: Result<Option<String>, GitError>) {
        if request_id != self.compare_request {
            return;
        }
        match result {
            Ok(Some(base)) => {
                log::debug!("detected base branch {base}");
                self.update(|s| s.base_branch = Some(base));
                self.refresh_compare();
            }
            Ok(None) => self.update(|s| {
                s.compare_loading = false;
                s.compare = None;
                s.compare_error = Some("No base branch found (tried origin/HEAD, main, master)".to_string());
            }),
            Err(e) => {
                log::warn!("base detection failed: {e}");
                self.update(|s| {
                    s.compare_loading = false;
                    s.compare_error = Some(e.to_string());
                });
            }
        }
    }

    pub fn apply_compare(&mut self, request_id: u64, result: Result<CompareDiff, GitError>) {
        if request_id != self.compare_request {
            return;
        }
        match result {
            Ok(compare) => self.update(|s| {
                s.compare_loading = false;
                s.compare_error = None;
                s.compare = Some(Arc::new(compare));
            }),
            Err(e) => {
                log::warn!("compare failed: {e}");
                self.update(|s| {
                    s.compare_loading = false;
                    s.compare = None;
                    s.compare_error = Some(e.to_string());
                });
            }
        }
    }

    /// Compares against `base` from now on, until the branch changes.
    pub fn set_base(&mut self, base: &str) {
        let base = base.to_string();
        self.update(|s| {
            s.base_branch = Some(base);
            s.base_is_explicit = true;
        });
        self.refresh_compare();
    }

    /// Records HEAD. Moving to a different branch forgets the base and
    /// reloads history and the comparison.
    pub fn observe_branch(&mut self, branch: &str) {
        if self.state.current_branch == branch {
            return;
        }
        let first = self.state.current_branch.is_empty();
        let branch = branch.to_string();
        self.update(|s| s.current_branch = branch);
        if first {
            return;
        }
        log::debug!("branch changed to {}, resetting compare base", self.state.current_branch);
        self.update(|s| {
            s.base_branch = None;
            s.base_is_explicit = false;
            s.compare = None;
        });
        self.refresh();
        self.refresh_compare();
    }
}
