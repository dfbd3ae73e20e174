//! Remote and history-rewriting operations: push, fetch, pull, stash, branch
//! switching, soft reset, cherry-pick, revert.
//!
//! At most one of these is in flight at a time. `in_progress` is set when
//! the call is queued and cleared when its completion is applied; any call
//! made in between is rejected.

use std::sync::Arc;

use crate::branch::BranchEntry;
use crate::emitter::{Emitter, SubscriptionId};
use crate::error::GitError;
use crate::git_ops::GitBackend;
use crate::queue::OperationQueue;

use super::{EventSender, StateEvent, spawn_queued};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    Push,
    Fetch,
    Pull,
    Stash,
    StashPop,
    BranchSwitch,
    BranchCreate,
    SoftReset,
    CherryPick,
    Revert,
}

impl Operation {
    pub fn label(self) -> &'static str {
        match self {
            Operation::Push => "push",
            Operation::Fetch => "fetch",
            Operation::Pull => "pull",
            Operation::Stash => "stash",
            Operation::StashPop => "stash pop",
            Operation::BranchSwitch => "switch branch",
            Operation::BranchCreate => "create branch",
            Operation::SoftReset => "soft reset",
            Operation::CherryPick => "cherry-pick",
            Operation::Revert => "revert",
        }
    }

    /// Whether a successful run moves HEAD to another branch.
    pub fn changes_branch(self) -> bool {
        matches!(self, Operation::BranchSwitch | Operation::BranchCreate)
    }

    fn success_message(self, detail: &str) -> String {
        match self {
            Operation::Push => "Pushed".to_string(),
            Operation::Fetch => "Fetched".to_string(),
            Operation::Pull => "Pulled with rebase".to_string(),
            Operation::Stash => "Stashed changes".to_string(),
            Operation::StashPop => "Popped stash".to_string(),
            Operation::BranchSwitch => format!("Switched to {detail}"),
            Operation::BranchCreate => format!("Created and switched to {detail}"),
            Operation::SoftReset => "Reset HEAD~1, changes kept staged".to_string(),
            Operation::CherryPick => format!("Cherry-picked {detail}"),
            Operation::Revert => format!("Reverted {detail}"),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OperationState {
    pub operation: Option<Operation>,
    pub in_progress: bool,
    pub error: Option<String>,
    pub last_result: Option<String>,
}

/// Effects a finished operation has on the rest of the app.
pub trait RemoteCallbacks {
    /// Working tree, index or refs may have moved.
    fn on_operation_complete(&mut self, op: Operation);
    /// HEAD now points at `branch`.
    fn on_branch_changed(&mut self, branch: &str);
}

pub struct RemoteManager {
    state: OperationState,
    emitter: Emitter<OperationState>,
    git: Arc<dyn GitBackend>,
    queue: OperationQueue,
    events: EventSender,
    callbacks: Box<dyn RemoteCallbacks>,
}

impl RemoteManager {
    pub fn new(
        git: Arc<dyn GitBackend>,
        queue: OperationQueue,
        events: EventSender,
        callbacks: Box<dyn RemoteCallbacks>,
    ) -> Self {
        Self {
            state: OperationState::default(),
            emitter: Emitter::new(),
            git,
            queue,
            events,
            callbacks,
        }
    }

    pub fn state(&self) -> &OperationState {
        &self.state
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&OperationState) + 'static) -> SubscriptionId {
        self.emitter.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.emitter.unsubscribe(id)
    }

    fn update(&mut self, f: impl FnOnce(&mut OperationState)) {
        let mut next = self.state.clone();
        f(&mut next);
        self.state = next;
        self.emitter.emit(&self.state);
    }

    pub fn set_backend(&mut self, git: Arc<dyn GitBackend>) {
        self.git = git;
        self.update(|s| {
            s.error = None;
            s.last_result = None;
        });
    }

    fn start<F>(&mut self, op: Operation, detail: String, call: F) -> Result<(), GitError>
    where
        F: FnOnce(&dyn GitBackend) -> Result<(), GitError> + Send + 'static,
    {
        if self.state.in_progress {
            let running = self.state.operation.map(Operation::label).unwrap_or("operation");
            log::warn!("rejected {} while {running} is in progress", op.label());
            return Err(GitError::Rejected(format!(
                "Cannot {} while {running} is in progress",
                op.label()
            )));
        }

        log::debug!("queueing {} {detail}", op.label());
        self.update(|s| {
            s.operation = Some(op);
            s.in_progress = true;
            s.error = None;
            s.last_result = None;
        });

        spawn_queued(&self.queue, &self.git, &self.events, call, move |result| {
            StateEvent::Remote { op, detail, result }
        });
        Ok(())
    }

    pub fn push(&mut self) -> Result<(), GitError> {
        self.start(Operation::Push, String::new(), |g| g.push())
    }

    pub fn fetch(&mut self) -> Result<(), GitError> {
        self.start(Operation::Fetch, String::new(), |g| g.fetch())
    }

    pub fn pull(&mut self) -> Result<(), GitError> {
        self.start(Operation::Pull, String::new(), |g| g.pull_rebase())
    }

    pub fn stash(&mut self) -> Result<(), GitError> {
        self.start(Operation::Stash, String::new(), |g| g.stash())
    }

    pub fn stash_pop(&mut self) -> Result<(), GitError> {
        self.start(Operation::StashPop, String::new(), |g| g.stash_pop())
    }

    pub fn switch_branch(&mut self, branch: BranchEntry) -> Result<(), GitError> {
        let local = if branch.is_remote {
            branch
                .name
                .split_once('/')
                .map(|(_, rest)| rest.to_string())
                .unwrap_or_else(|| branch.name.clone())
        } else {
            branch.name.clone()
        };
        self.start(Operation::BranchSwitch, local, move |g| g.switch_branch(&branch))
    }

    pub fn create_branch(&mut self, name: &str) -> Result<(), GitError> {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(GitError::Rejected("Branch name is empty".to_string()));
        }
        let arg = name.clone();
        self.start(Operation::BranchCreate, name, move |g| g.create_branch(&arg))
    }

    pub fn soft_reset(&mut self) -> Result<(), GitError> {
        self.start(Operation::SoftReset, String::new(), |g| g.soft_reset())
    }

    pub fn cherry_pick(&mut self, hash: &str, short: &str) -> Result<(), GitError> {
        let hash = hash.to_string();
        self.start(Operation::CherryPick, short.to_string(), move |g| g.cherry_pick(&hash))
    }

    pub fn revert(&mut self, hash: &str, short: &str) -> Result<(), GitError> {
        let hash = hash.to_string();
        self.start(Operation::Revert, short.to_string(), move |g| g.revert(&hash))
    }

    /// Applies a [`StateEvent::Remote`] completion.
    pub fn finish(&mut self, op: Operation, detail: &str, result: Result<(), GitError>) {
        match &result {
            Ok(()) => log::info!("{} finished", op.label()),
            Err(e) => log::warn!("{} failed: {e}", op.label()),
        }
        self.update(|s| {
            s.in_progress = false;
            match &result {
                Ok(()) => {
                    s.error = None;
                    s.last_result = Some(op.success_message(detail));
                }
                Err(e) => {
                    s.error = Some(e.to_string());
                    s.last_result = None;
                }
            }
        });

        // Failed switches and rebases can still leave the tree changed.
        self.callbacks.on_operation_complete(op);
        if result.is_ok() && op.changes_branch() {
            self.callbacks.on_branch_changed(detail);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::testing::Harness;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    #[derive(Default)]
    struct Recorder {
        log: Rc<RefCell<Vec<String>>>,
    }

    impl RemoteCallbacks for Recorder {
        fn on_operation_complete(&mut self, op: Operation) {
            self.log.borrow_mut().push(format!("complete {}", op.label()));
        }
        fn on_branch_changed(&mut self, branch: &str) {
            self.log.borrow_mut().push(format!("branch {branch}"));
        }
    }

    fn manager(h: &Harness) -> (RemoteManager, Rc<RefCell<Vec<String>>>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let cb = Recorder { log: Rc::clone(&log) };
        let m = RemoteManager::new(
            Arc::clone(&h.git),
            h.queue.clone(),
            h.events.clone(),
            Box::new(cb),
        );
        (m, log)
    }

    async fn apply_next(h: &mut Harness, m: &mut RemoteManager) {
        match h.next().await {
            StateEvent::Remote { op, detail, result } => m.finish(op, &detail, result),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn second_call_is_rejected_while_in_progress() {
        let mut h = Harness::new();
        *h.fake.delay.lock() = Duration::from_millis(30);
        let (mut m, _) = manager(&h);

        m.push().unwrap();
        assert!(m.state().in_progress);
        assert_eq!(m.state().operation, Some(Operation::Push));
        assert!(matches!(m.fetch(), Err(GitError::Rejected(_))));

        apply_next(&mut h, &mut m).await;
        assert!(!m.state().in_progress);
        assert_eq!(m.state().last_result.as_deref(), Some("Pushed"));
        assert_eq!(h.fake.calls(), vec!["start push", "end push"]);
    }

    #[tokio::test]
    async fn push_completes_before_fetch_starts() {
        let mut h = Harness::new();
        *h.fake.delay.lock() = Duration::from_millis(20);
        let (mut m, _) = manager(&h);

        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = Rc::clone(&seen);
        m.subscribe(move |st: &OperationState| s.borrow_mut().push((st.operation, st.in_progress)));

        m.push().unwrap();
        apply_next(&mut h, &mut m).await;
        m.fetch().unwrap();
        apply_next(&mut h, &mut m).await;

        assert_eq!(
            h.fake.calls(),
            vec!["start push", "end push", "start fetch", "end fetch"]
        );
        assert_eq!(
            *seen.borrow(),
            vec![
                (Some(Operation::Push), true),
                (Some(Operation::Push), false),
                (Some(Operation::Fetch), true),
                (Some(Operation::Fetch), false),
            ]
        );
    }

    #[tokio::test]
    async fn failure_is_recorded_and_guard_released() {
        let mut h = Harness::new();
        h.fake.fail("push");
        let (mut m, log) = manager(&h);

        m.push().unwrap();
        apply_next(&mut h, &mut m).await;
        assert!(!m.state().in_progress);
        assert!(m.state().error.as_deref().unwrap_or("").contains("push refused"));
        assert_eq!(*log.borrow(), vec!["complete push"]);

        m.fetch().unwrap();
        apply_next(&mut h, &mut m).await;
        assert!(m.state().error.is_none());
    }

    #[tokio::test]
    async fn branch_switch_notifies_with_local_name() {
        let mut h = Harness::new();
        let (mut m, log) = manager(&h);
        m.switch_branch(BranchEntry {
            name: "origin/feature".to_string(),
            is_current: false,
            is_remote: true,
            upstream: None,
            track: None,
        })
        .unwrap();
        apply_next(&mut h, &mut m).await;
        assert_eq!(
            *log.borrow(),
            vec!["complete switch branch", "branch feature"]
        );
        assert_eq!(m.state().last_result.as_deref(), Some("Switched to feature"));
    }

    #[tokio::test]
    async fn empty_branch_name_never_queues() {
        let h = Harness::new();
        let (mut m, _) = manager(&h);
        assert!(m.create_branch("  ").is_err());
        assert!(!m.state().in_progress);
        assert_eq!(h.queue.pending(), 0);
    }
}
