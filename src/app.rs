//! The orchestrator.
//!
//! `App` owns every state manager and is the only place that knows about
//! more than one of them. Background completions come in through the
//! `handle_*` methods; managers report cross-cutting effects through the
//! callback traits, which `App` implements by posting to a synchronous
//! channel that it drains before returning to the event loop. Draining
//! also reconciles derived state: selections are clamped to their lists
//! and the selected item's detail is requested.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc as std_mpsc;
use std::time::Instant;

use ratatui::layout::Rect;

use crate::branch::{BranchPicker, PickerPurpose};
use crate::commit::CommitDraft;
use crate::config::Preferences;
use crate::diff_loader::{DiffLoader, DiffResult, DiffSource};
use crate::error::GitError;
use crate::git::{CommitEntry, StagingState};
use crate::git_ops::{GitBackend, GitCli};
use crate::layout::{clamp_offset, keep_visible, max_scroll_offset, scroll_by};
use crate::mouse::{BottomView, MouseTarget, hit_test, pane_at};
use crate::panes::{
    ExplorerRow, FileItem, FileListRow, TopRows, compare_rows, explorer_rows, file_list_rows, history_rows,
    row_of_selection, selectable_count,
};
use crate::preview_loader::{PreviewLoader, PreviewResult};
use crate::queue::OperationQueue;
use crate::rows::{
    DIFF_GUTTER_WIDTH, DisplayRow, build_compare_display_rows, build_diff_display_rows,
    build_explorer_content_rows, build_history_display_rows, compare_file_offsets,
};
use crate::state::explorer::{ExplorerManager, ExplorerState};
use crate::state::history::{HistoryManager, HistoryState};
use crate::state::remote::{OperationState, RemoteCallbacks, RemoteManager};
use crate::state::status::{StatusCallbacks, StatusManager, StatusState};
use crate::state::ui::{ConfirmAction, Modal, Pane, ScrollTarget, Tab, UiManager, UiState};
use crate::state::{EventSender, Operation, StateEvent, spawn_read};
use crate::ui::{ScreenLayout, layout_for};
use crate::wrap::wrapped_row_count;

/// Reconciliation converges in two or three rounds; this only guards
/// against a listener loop.
const MAX_DRAIN_ROUNDS: usize = 8;

const SPLIT_STEP: f64 = 0.05;

#[derive(Clone, Debug, PartialEq, Eq)]
enum CrossEffect {
    CommitCreated,
    BranchObserved(String),
    OperationComplete(Operation),
    BranchChanged(String),
}

enum Signal {
    /// Some manager's state was replaced.
    Changed,
    Effect(CrossEffect),
}

/// The callback side of the managers: every call becomes a queued effect.
struct EffectSink(std_mpsc::Sender<Signal>);

impl EffectSink {
    fn post(&self, effect: CrossEffect) {
        let _ = self.0.send(Signal::Effect(effect));
    }
}

impl StatusCallbacks for EffectSink {
    fn on_commit_created(&mut self) {
        self.post(CrossEffect::CommitCreated);
    }

    fn on_branch_observed(&mut self, branch: &str) {
        self.post(CrossEffect::BranchObserved(branch.to_string()));
    }
}

impl RemoteCallbacks for EffectSink {
    fn on_operation_complete(&mut self, op: Operation) {
        self.post(CrossEffect::OperationComplete(op));
    }

    fn on_branch_changed(&mut self, branch: &str) {
        self.post(CrossEffect::BranchChanged(branch.to_string()));
    }
}

fn notify_changed<S: 'static>(tx: &std_mpsc::Sender<Signal>) -> impl FnMut(&S) + 'static {
    let tx = tx.clone();
    move |_| {
        let _ = tx.send(Signal::Changed);
    }
}

fn clamp_index(index: usize, count: usize) -> usize {
    index.min(count.saturating_sub(1))
}

fn copy_to_clipboard(text: &str) -> Result<(), String> {
    let mut cb = arboard::Clipboard::new().map_err(|e| e.to_string())?;
    cb.set_text(text.to_string()).map_err(|e| e.to_string())
}

pub struct App {
    prefs: Preferences,
    /// Where toggles are persisted; `None` keeps them in memory.
    prefs_path: Option<PathBuf>,
    git: Arc<dyn GitBackend>,
    events: EventSender,
    queue: OperationQueue,

    status: StatusManager,
    history: HistoryManager,
    remote: RemoteManager,
    explorer: ExplorerManager,
    ui: UiManager,

    signals: std_mpsc::Receiver<Signal>,
    viewport: Rect,
    /// Staged file count at the last settled status, for auto-tab.
    last_staged: Option<usize>,
    pub should_quit: bool,
}

impl App {
    pub fn new(
        git: Arc<dyn GitBackend>,
        prefs: Preferences,
        prefs_path: Option<PathBuf>,
        events: EventSender,
        diff_loader: DiffLoader,
        preview_loader: PreviewLoader,
    ) -> Self {
        let (sig_tx, signals) = std_mpsc::channel();
        let queue = OperationQueue::new();

        let mut status = StatusManager::new(
            Arc::clone(&git),
            queue.clone(),
            events.clone(),
            diff_loader.clone(),
            Box::new(EffectSink(sig_tx.clone())),
        );
        let mut history = HistoryManager::new(Arc::clone(&git), events.clone(), diff_loader);
        let mut remote = RemoteManager::new(
            Arc::clone(&git),
            queue.clone(),
            events.clone(),
            Box::new(EffectSink(sig_tx.clone())),
        );
        let mut explorer = ExplorerManager::new(git.root().to_path_buf(), events.clone(), preview_loader);
        let mut ui = UiManager::new(&prefs);

        status.subscribe(notify_changed(&sig_tx));
        history.subscribe(notify_changed(&sig_tx));
        remote.subscribe(notify_changed(&sig_tx));
        explorer.subscribe(notify_changed(&sig_tx));
        ui.subscribe(notify_changed(&sig_tx));

        Self {
            prefs,
            prefs_path,
            git,
            events,
            queue,
            status,
            history,
            remote,
            explorer,
            ui,
            signals,
            viewport: Rect::default(),
            last_staged: None,
            should_quit: false,
        }
    }

    /// Issues the initial loads.
    pub fn start(&mut self) {
        log::info!("reviewing {}", self.git.root().display());
        self.status.refresh();
        self.history.refresh();
        self.history.refresh_compare();
        self.explorer.list(self.git.root().to_path_buf());
        self.drain_signals();
    }

    pub fn root(&self) -> &Path {
        self.git.root()
    }

    pub fn queue(&self) -> &OperationQueue {
        &self.queue
    }

    pub fn status(&self) -> &StatusState {
        self.status.state()
    }

    pub fn history(&self) -> &HistoryState {
        self.history.state()
    }

    pub fn remote(&self) -> &OperationState {
        self.remote.state()
    }

    pub fn explorer(&self) -> &ExplorerState {
        self.explorer.state()
    }

    pub fn ui(&self) -> &UiState {
        self.ui.state()
    }

    // ---------------------------------------------------------------
    // Background completions
    // ---------------------------------------------------------------

    pub fn handle_state_event(&mut self, event: StateEvent) {
        match event {
            StateEvent::Status { request_id, result } => self.status.apply_status(request_id, result),
            StateEvent::StagingFinished { label, result } => self.status.apply_staging_finished(&label, result),
            StateEvent::CommitFinished { amend, result } => {
                match &result {
                    Ok(()) if amend => self.ui.flash("Amended last commit", false),
                    Ok(()) => self.ui.flash("Committed", false),
                    Err(e) => self.ui.flash(e.to_string(), true),
                }
                self.status.apply_commit_finished(amend, result);
            }
            StateEvent::LastCommitMessage(result) => self.status.apply_last_message(result),
            StateEvent::History { request_id, result } => self.history.apply_history(request_id, result),
            StateEvent::BaseDetected { request_id, result } => self.history.apply_base_detected(request_id, result),
            StateEvent::Compare { request_id, result } => self.history.apply_compare(request_id, result),
            StateEvent::Branches { purpose, result } => match result {
                Ok(branches) if branches.is_empty() => self.ui.flash("No branches found", true),
                Ok(branches) => self
                    .ui
                    .open_modal(Modal::BranchPicker(BranchPicker::new(purpose, branches))),
                Err(e) => self.ui.flash(e.to_string(), true),
            },
            StateEvent::Remote { op, detail, result } => self.remote.finish(op, &detail, result),
            StateEvent::DirListed {
                request_id,
                dir,
                result,
            } => self.explorer.apply_listing(request_id, dir, result),
        }
        self.drain_signals();
    }

    pub fn handle_diff_result(&mut self, result: DiffResult) {
        let for_commit = match &result {
            DiffResult::Ready { source, .. } | DiffResult::Error { source, .. } => {
                matches!(source, DiffSource::Commit { .. })
            }
            DiffResult::Cancelled => return,
        };
        if for_commit {
            self.history.apply_detail(result);
        } else {
            self.status.apply_diff(result);
        }
        self.drain_signals();
    }

    pub fn handle_preview_result(&mut self, result: PreviewResult) {
        self.explorer.apply_preview(result);
        self.drain_signals();
    }

    pub fn tick(&mut self, now: Instant) {
        self.ui.expire_flash(now);
        self.drain_signals();
    }

    /// Makes the repository containing `path` the active one.
    pub fn switch_repo(&mut self, path: &Path) {
        match GitCli::open(path) {
            Ok(cli) if cli.root() == self.git.root() => {}
            Ok(cli) => {
                let label = format!("Now reviewing {}", cli.root().display());
                self.set_backend(Arc::new(cli));
                self.ui.flash(label, false);
            }
            Err(e) => {
                log::warn!("cannot switch to {}: {e}", path.display());
                self.ui.flash(e.to_string(), true);
            }
        }
        self.drain_signals();
    }

    /// Replaces the backend everywhere. Scroll offsets, selections and the
    /// modal reset; tab and toggles stay.
    pub fn set_backend(&mut self, git: Arc<dyn GitBackend>) {
        let root = git.root().to_path_buf();
        log::info!("repository is now {}", root.display());
        self.git = Arc::clone(&git);
        self.last_staged = None;
        self.ui.reset_for_repo();
        self.status.set_backend(Arc::clone(&git));
        self.history.set_backend(Arc::clone(&git));
        self.remote.set_backend(git);
        self.explorer.set_root(root);
        self.drain_signals();
    }

    fn drain_signals(&mut self) {
        for _ in 0..MAX_DRAIN_ROUNDS {
            let mut changed = false;
            let mut effects: Vec<CrossEffect> = Vec::new();
            while let Ok(signal) = self.signals.try_recv() {
                match signal {
                    Signal::Changed => changed = true,
                    Signal::Effect(e) if !effects.contains(&e) => effects.push(e),
                    Signal::Effect(_) => {}
                }
            }
            if !changed && effects.is_empty() {
                return;
            }
            for effect in effects {
                self.apply_effect(effect);
            }
            self.reconcile();
        }
        log::debug!("signal drain stopped after {MAX_DRAIN_ROUNDS} rounds");
    }

    fn apply_effect(&mut self, effect: CrossEffect) {
        log::trace!("effect {effect:?}");
        match effect {
            CrossEffect::CommitCreated => {
                self.history.refresh();
                self.history.refresh_compare();
                let ui = self.ui.state();
                if ui.auto_tab && ui.tab == Tab::Commit {
                    self.ui.set_tab(Tab::Diff);
                }
            }
            CrossEffect::BranchObserved(branch) | CrossEffect::BranchChanged(branch) => {
                self.history.observe_branch(&branch);
            }
            CrossEffect::OperationComplete(_) => {
                self.status.refresh();
                self.status.reload_diff();
                self.history.refresh();
                self.history.refresh_compare();
                self.explorer.reload();
                let outcome = self.remote.state();
                match (outcome.error.clone(), outcome.last_result.clone()) {
                    (Some(error), _) => self.ui.flash(error, true),
                    (None, Some(message)) => self.ui.flash(message, false),
                    (None, None) => {}
                }
            }
        }
    }

    /// Brings selections back into range and loads what they point at.
    fn reconcile(&mut self) {
        let tab = self.ui.state().tab;

        let files = self.file_rows();
        let file_sel = clamp_index(self.ui.state().selection.file, selectable_count(&files));
        let source = row_of_selection(&files, file_sel)
            .and_then(|r| files[r].file())
            .map(FileItem::diff_source);
        self.ui.set_selection(|s| s.file = file_sel);
        self.status.select_diff(source);

        let history_sel = clamp_index(self.ui.state().selection.history, self.history.state().commits.len());
        self.ui.set_selection(|s| s.history = history_sel);
        if tab == Tab::History {
            let commit = self.history.state().commits.get(history_sel).cloned();
            self.history.select_commit(commit.as_ref());
        }

        let compare_files = self.history.state().compare.as_ref().map_or(0, |c| c.files.len());
        let compare_sel = clamp_index(self.ui.state().selection.compare, compare_files);
        self.ui.set_selection(|s| s.compare = compare_sel);

        let ex = self.explorer.state();
        let explorer_sel = clamp_index(
            self.ui.state().selection.explorer,
            explorer_rows(ex.entries.len(), ex.at_root()).len(),
        );
        self.ui.set_selection(|s| s.explorer = explorer_sel);
        if tab == Tab::Explorer {
            let path = match self.selected_explorer_row() {
                Some(ExplorerRow::Entry(i)) => self
                    .explorer
                    .state()
                    .entries
                    .get(i)
                    .filter(|e| !e.is_dir)
                    .map(|e| e.path.clone()),
                _ => None,
            };
            self.explorer.select_file(path.as_deref());
        }

        self.clamp_scroll();
        self.apply_auto_tab();
    }

    fn clamp_scroll(&mut self) {
        let tab = self.ui.state().tab;
        let top = tab.top_scroll();
        let top_offset = clamp_offset(self.ui.state().scroll.get(top), self.top_rows().len(), self.top_visible());
        self.ui.set_scroll(top, top_offset);
        if let Some(bottom) = tab.bottom_scroll() {
            let offset = clamp_offset(self.ui.state().scroll.get(bottom), self.bottom_total(), self.bottom_visible());
            self.ui.set_scroll(bottom, offset);
        }
    }

    /// Staging the first file while on Diff moves to Commit.
    fn apply_auto_tab(&mut self) {
        let status = self.status.state();
        if status.loading {
            return;
        }
        let staged = status.staged_count();
        let previous = self.last_staged.replace(staged);
        let ui = self.ui.state();
        if ui.auto_tab && ui.tab == Tab::Diff && previous == Some(0) && staged > 0 {
            log::debug!("auto-switching to the commit tab");
            self.ui.set_tab(Tab::Commit);
        }
    }

    // ---------------------------------------------------------------
    // Derived rows and geometry
    // ---------------------------------------------------------------

    pub fn set_viewport(&mut self, area: Rect) {
        if self.viewport != area {
            self.viewport = area;
            self.clamp_scroll();
            self.drain_signals();
        }
    }

    pub fn screen(&self) -> ScreenLayout {
        layout_for(self.viewport, self.top_rows().len(), self.ui.state().split_ratio)
    }

    pub fn file_rows(&self) -> Vec<FileListRow> {
        let status = self.status.state();
        let ui = self.ui.state();
        file_list_rows(&status.files, &status.flat, ui.flat_view, ui.tree_view)
    }

    pub fn top_rows(&self) -> TopRows {
        match self.ui.state().tab {
            Tab::Diff | Tab::Commit => TopRows::Files(self.file_rows()),
            Tab::History => TopRows::History(history_rows(self.history.state().commits.len())),
            Tab::Compare => TopRows::Compare(compare_rows(self.history.state().compare.as_deref())),
            Tab::Explorer => {
                let ex = self.explorer.state();
                TopRows::Explorer(explorer_rows(ex.entries.len(), ex.at_root()))
            }
        }
    }

    /// Unwrapped rows of the active tab's bottom pane. Empty for the commit
    /// panel and for binary files.
    pub fn bottom_rows(&self) -> Vec<DisplayRow> {
        match self.ui.state().tab {
            Tab::Diff => build_diff_display_rows(&self.status.state().diff),
            Tab::Commit => Vec::new(),
            Tab::History => {
                let history = self.history.state();
                match (&history.detail, self.selected_commit()) {
                    (Some(d), _) => build_history_display_rows(&d.commit, Some(&d.diff)),
                    (None, Some(c)) => build_history_display_rows(c, None),
                    (None, None) => Vec::new(),
                }
            }
            Tab::Compare => self
                .history
                .state()
                .compare
                .as_deref()
                .map(build_compare_display_rows)
                .unwrap_or_default(),
            Tab::Explorer => match &self.explorer.state().content {
                Some(c) if !c.is_binary => build_explorer_content_rows(&c.text),
                _ => Vec::new(),
            },
        }
    }

    /// Content width the bottom pane wraps diff bodies at.
    pub fn wrap_width(&self) -> usize {
        usize::from(ScreenLayout::inner(self.screen().bottom).width).saturating_sub(DIFF_GUTTER_WIDTH)
    }

    pub fn bottom_total(&self) -> usize {
        wrapped_row_count(&self.bottom_rows(), self.wrap_width(), self.ui.state().wrap)
    }

    fn top_visible(&self) -> usize {
        usize::from(ScreenLayout::inner(self.screen().top).height)
    }

    fn bottom_visible(&self) -> usize {
        usize::from(ScreenLayout::inner(self.screen().bottom).height)
    }

    /// Message rows of the commit editor; its first row is the summary line.
    pub fn commit_editor_height(&self) -> usize {
        self.bottom_visible().saturating_sub(1)
    }

    fn pane_visible(&self) -> usize {
        match self.ui.state().pane {
            Pane::Top => self.top_visible(),
            Pane::Bottom => self.bottom_visible(),
        }
    }

    // ---------------------------------------------------------------
    // Selected items
    // ---------------------------------------------------------------

    pub fn selected_file(&self) -> Option<FileItem> {
        let rows = self.file_rows();
        let row = row_of_selection(&rows, self.ui.state().selection.file)?;
        rows[row].file().cloned()
    }

    pub fn selected_commit(&self) -> Option<&CommitEntry> {
        self.history.state().commits.get(self.ui.state().selection.history)
    }

    fn selected_compare_path(&self) -> Option<String> {
        let compare = self.history.state().compare.as_ref()?;
        compare
            .files
            .get(self.ui.state().selection.compare)
            .map(|f| f.path.clone())
    }

    fn selected_explorer_row(&self) -> Option<ExplorerRow> {
        let ex = self.explorer.state();
        explorer_rows(ex.entries.len(), ex.at_root())
            .get(self.ui.state().selection.explorer)
            .copied()
    }

    // ---------------------------------------------------------------
    // Navigation
    // ---------------------------------------------------------------

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    pub fn set_tab(&mut self, tab: Tab) {
        self.ui.set_tab(tab);
        self.drain_signals();
    }

    pub fn toggle_pane(&mut self) {
        self.ui.toggle_pane();
        self.drain_signals();
    }

    pub fn focus_top(&mut self) {
        self.ui.set_pane(Pane::Top);
        self.drain_signals();
    }

    /// Moves the top selection, or scrolls the bottom pane when it has focus.
    pub fn move_selection(&mut self, delta: isize) {
        match self.ui.state().pane {
            Pane::Top => {
                let current = self.ui.state().selection.for_tab(self.ui.state().tab);
                self.select_top(current.saturating_add_signed(delta));
            }
            Pane::Bottom => self.scroll_bottom(delta),
        }
    }

    /// Selects the `index`-th selectable row of the top pane and scrolls it
    /// into view. The bottom pane starts over at the new item; for compare
    /// it jumps to the selected file instead.
    pub fn select_top(&mut self, index: usize) {
        let rows = self.top_rows();
        let count = rows.selectable_count();
        if count == 0 {
            return;
        }
        let index = index.min(count - 1);
        let tab = self.ui.state().tab;
        let changed = self.ui.state().selection.for_tab(tab) != index;
        self.ui.set_selection(|s| *s.for_tab_mut(tab) = index);

        let row = rows.row_of_selection(index).unwrap_or(0);
        let offset = keep_visible(row, self.ui.state().scroll.get(tab.top_scroll()), self.top_visible());
        self.ui.set_scroll(tab.top_scroll(), offset);

        if changed {
            match tab {
                Tab::Compare => {
                    let offset = self.compare_file_offset(index);
                    self.ui.set_scroll(ScrollTarget::CompareDiff, offset);
                }
                _ => {
                    if let Some(target) = tab.bottom_scroll() {
                        self.ui.set_scroll(target, 0);
                    }
                }
            }
        }
        self.drain_signals();
    }

    /// Wrapped row at which compare file `file` starts.
    fn compare_file_offset(&self, file: usize) -> usize {
        let Some(compare) = self.history.state().compare.as_deref() else {
            return 0;
        };
        let Some(&start) = compare_file_offsets(compare).get(file) else {
            return 0;
        };
        let rows = build_compare_display_rows(compare);
        let (width, wrap) = (self.wrap_width(), self.ui.state().wrap);
        let offset = wrapped_row_count(&rows[..start.min(rows.len())], width, wrap);
        clamp_offset(offset, wrapped_row_count(&rows, width, wrap), self.bottom_visible())
    }

    /// Compare file whose section holds wrapped bottom row `wrapped`.
    fn compare_file_at(&self, wrapped: usize) -> Option<usize> {
        let compare = self.history.state().compare.as_deref()?;
        let rows = build_compare_display_rows(compare);
        let (width, wrap) = (self.wrap_width(), self.ui.state().wrap);
        compare_file_offsets(compare)
            .iter()
            .rposition(|&start| wrapped_row_count(&rows[..start.min(rows.len())], width, wrap) <= wrapped)
    }

    /// Selects compare file `file` in the list and leaves the diff where it is.
    fn mark_compare_file(&mut self, file: usize) {
        let tab = Tab::Compare;
        self.ui.set_selection(|s| s.compare = file);
        let row = self.top_rows().row_of_selection(file).unwrap_or(0);
        let offset = keep_visible(row, self.ui.state().scroll.get(tab.top_scroll()), self.top_visible());
        self.ui.set_scroll(tab.top_scroll(), offset);
    }

    pub fn scroll_bottom(&mut self, delta: isize) {
        let Some(target) = self.ui.state().tab.bottom_scroll() else {
            return;
        };
        let current = self.ui.state().scroll.get(target);
        let next = scroll_by(current, delta, self.bottom_total(), self.bottom_visible());
        self.ui.set_scroll(target, next);
        self.drain_signals();
    }

    /// Scrolls the top list without moving its selection.
    pub fn scroll_top(&mut self, delta: isize) {
        let target = self.ui.state().tab.top_scroll();
        let current = self.ui.state().scroll.get(target);
        let next = scroll_by(current, delta, self.top_rows().len(), self.top_visible());
        self.ui.set_scroll(target, next);
        self.drain_signals();
    }

    pub fn page(&mut self, down: bool) {
        let step = self.pane_visible().max(1) as isize;
        self.move_selection(if down { step } else { -step });
    }

    /// `g` and `G`: first or last item of the focused pane.
    pub fn jump(&mut self, to_end: bool) {
        match self.ui.state().pane {
            Pane::Top => self.select_top(if to_end { usize::MAX } else { 0 }),
            Pane::Bottom => {
                let Some(target) = self.ui.state().tab.bottom_scroll() else {
                    return;
                };
                let offset = if to_end {
                    max_scroll_offset(self.bottom_total(), self.bottom_visible())
                } else {
                    0
                };
                self.ui.set_scroll(target, offset);
                self.drain_signals();
            }
        }
    }

    /// Enter: opens directories in the explorer, otherwise focuses the
    /// detail pane.
    pub fn activate(&mut self) {
        if self.ui.state().pane == Pane::Bottom {
            return;
        }
        if self.ui.state().tab == Tab::Explorer {
            match self.selected_explorer_row() {
                Some(ExplorerRow::Parent) => return self.explorer_up(),
                Some(ExplorerRow::Entry(i)) => {
                    let Some(entry) = self.explorer.state().entries.get(i).cloned() else {
                        return;
                    };
                    if entry.is_dir {
                        self.explorer.enter(&entry);
                        self.reset_explorer_position();
                        return self.drain_signals();
                    }
                }
                None => return,
            }
        }
        self.ui.set_pane(Pane::Bottom);
        self.drain_signals();
    }

    fn reset_explorer_position(&mut self) {
        self.ui.set_selection(|s| s.explorer = 0);
        self.ui.set_scroll(ScrollTarget::Explorer, 0);
        self.ui.set_scroll(ScrollTarget::ExplorerContent, 0);
    }

    pub fn explorer_up(&mut self) {
        if self.explorer.go_up() {
            self.reset_explorer_position();
        }
        self.drain_signals();
    }

    pub fn toggle_hidden(&mut self) {
        self.explorer.toggle_hidden();
        self.drain_signals();
    }

    // ---------------------------------------------------------------
    // Staging and committing
    // ---------------------------------------------------------------

    /// Partially staged files get their remaining changes staged.
    pub fn toggle_stage_selected(&mut self) {
        if !self.ui.state().tab.shows_files() {
            return;
        }
        let Some(item) = self.selected_file() else {
            return;
        };
        match item.staging {
            StagingState::Staged => self.status.unstage(vec![item.path]),
            _ => self.status.stage(vec![item.path]),
        }
        self.drain_signals();
    }

    pub fn stage_all(&mut self) {
        self.status.stage_all();
        self.drain_signals();
    }

    pub fn unstage_all(&mut self) {
        self.status.unstage_all();
        self.drain_signals();
    }

    pub fn commit(&mut self) {
        if let Err(e) = self.status.commit() {
            self.ui.flash(e.to_string(), true);
        }
        self.drain_signals();
    }

    pub fn toggle_amend(&mut self) {
        self.status.toggle_amend();
        self.drain_signals();
    }

    pub fn edit_commit(&mut self, f: impl FnOnce(&mut CommitDraft)) {
        let height = self.commit_editor_height();
        self.status.edit_draft(|d| {
            f(d);
            d.ensure_cursor_visible(height);
        });
        self.drain_signals();
    }

    // ---------------------------------------------------------------
    // Remote and history operations
    // ---------------------------------------------------------------

    fn run_remote(&mut self, f: impl FnOnce(&mut RemoteManager) -> Result<(), GitError>) {
        if let Err(e) = f(&mut self.remote) {
            self.ui.flash(e.to_string(), true);
        }
        self.drain_signals();
    }

    pub fn push(&mut self) {
        self.run_remote(RemoteManager::push);
    }

    pub fn fetch(&mut self) {
        self.run_remote(RemoteManager::fetch);
    }

    pub fn pull(&mut self) {
        self.run_remote(RemoteManager::pull);
    }

    pub fn stash(&mut self) {
        self.run_remote(RemoteManager::stash);
    }

    fn ask(&mut self, action: ConfirmAction) {
        self.ui.open_modal(Modal::Confirm(action));
        self.drain_signals();
    }

    pub fn request_stash_pop(&mut self) {
        self.ask(ConfirmAction::StashPop);
    }

    pub fn request_soft_reset(&mut self) {
        self.ask(ConfirmAction::SoftReset);
    }

    pub fn request_cherry_pick(&mut self) {
        if self.ui.state().tab != Tab::History {
            return;
        }
        if let Some(c) = self.selected_commit() {
            let action = ConfirmAction::CherryPick {
                hash: c.hash.clone(),
                short: c.short_hash.clone(),
            };
            self.ask(action);
        }
    }

    pub fn request_revert(&mut self) {
        if self.ui.state().tab != Tab::History {
            return;
        }
        if let Some(c) = self.selected_commit() {
            let action = ConfirmAction::Revert {
                hash: c.hash.clone(),
                short: c.short_hash.clone(),
            };
            self.ask(action);
        }
    }

    /// Runs the action the confirm modal asked about.
    pub fn confirm(&mut self) {
        let Some(Modal::Confirm(action)) = self.ui.state().modal.clone() else {
            return;
        };
        self.ui.close_modal();
        match action {
            ConfirmAction::SoftReset => self.run_remote(RemoteManager::soft_reset),
            ConfirmAction::StashPop => self.run_remote(RemoteManager::stash_pop),
            ConfirmAction::CherryPick { hash, short } => self.run_remote(|r| r.cherry_pick(&hash, &short)),
            ConfirmAction::Revert { hash, short } => self.run_remote(|r| r.revert(&hash, &short)),
        }
    }

    pub fn open_help(&mut self) {
        self.ui.open_modal(Modal::Help);
        self.drain_signals();
    }

    pub fn close_modal(&mut self) {
        self.ui.close_modal();
        self.drain_signals();
    }

    // ---------------------------------------------------------------
    // Branches
    // ---------------------------------------------------------------

    /// Lists branches; the picker opens when they arrive.
    pub fn open_branch_picker(&mut self, purpose: PickerPurpose) {
        spawn_read(&self.git, &self.events, |g| g.branches(), move |result| {
            StateEvent::Branches { purpose, result }
        });
    }

    pub fn edit_picker(&mut self, f: impl FnOnce(&mut BranchPicker)) {
        self.ui.edit_modal(|m| {
            if let Modal::BranchPicker(picker) = m {
                f(picker);
            }
        });
        self.drain_signals();
    }

    pub fn picker_confirm(&mut self) {
        let Some(Modal::BranchPicker(picker)) = &self.ui.state().modal else {
            return;
        };
        let purpose = picker.purpose;
        let Some(branch) = picker.selected_branch().cloned() else {
            return;
        };
        self.ui.close_modal();
        match purpose {
            PickerPurpose::Switch if branch.is_current => {
                self.ui.flash(format!("Already on {}", branch.name), false);
                self.drain_signals();
            }
            PickerPurpose::Switch => self.run_remote(|r| r.switch_branch(branch)),
            PickerPurpose::CompareBase => {
                self.history.set_base(&branch.name);
                self.ui.set_tab(Tab::Compare);
                self.ui.set_selection(|s| s.compare = 0);
                self.ui.set_scroll(ScrollTarget::Compare, 0);
                self.ui.set_scroll(ScrollTarget::CompareDiff, 0);
                self.drain_signals();
            }
        }
    }

    pub fn open_new_branch(&mut self) {
        self.ui.open_modal(Modal::NewBranch { input: String::new() });
        self.drain_signals();
    }

    pub fn edit_new_branch(&mut self, f: impl FnOnce(&mut String)) {
        self.ui.edit_modal(|m| {
            if let Modal::NewBranch { input } = m {
                f(input);
            }
        });
        self.drain_signals();
    }

    /// A blank name keeps the modal open.
    pub fn new_branch_confirm(&mut self) {
        let Some(Modal::NewBranch { input }) = &self.ui.state().modal else {
            return;
        };
        let name = input.trim().to_string();
        if name.is_empty() {
            self.ui.flash("Branch name is empty", true);
            return self.drain_signals();
        }
        self.ui.close_modal();
        self.run_remote(|r| r.create_branch(&name));
    }

    // ---------------------------------------------------------------
    // Toggles and misc
    // ---------------------------------------------------------------

    fn persist(&mut self) {
        self.prefs = self.ui.preferences(&self.prefs);
        if let Some(path) = &self.prefs_path
            && let Err(e) = self.prefs.save_to(path)
        {
            log::warn!("failed to save preferences: {e}");
        }
    }

    fn toggle(&mut self, f: impl FnOnce(&mut UiManager)) {
        f(&mut self.ui);
        self.persist();
        self.drain_signals();
    }

    pub fn toggle_wrap(&mut self) {
        self.toggle(UiManager::toggle_wrap);
    }

    pub fn toggle_mouse(&mut self) {
        self.toggle(UiManager::toggle_mouse);
    }

    pub fn toggle_auto_tab(&mut self) {
        self.toggle(UiManager::toggle_auto_tab);
        let on = self.ui.state().auto_tab;
        self.ui.flash(if on { "Auto tab on" } else { "Auto tab off" }, false);
        self.drain_signals();
    }

    pub fn toggle_flat_view(&mut self) {
        self.toggle(UiManager::toggle_flat_view);
    }

    pub fn toggle_tree_view(&mut self) {
        self.toggle(UiManager::toggle_tree_view);
    }

    pub fn cycle_theme(&mut self) {
        self.toggle(UiManager::cycle_theme);
        let label = self.ui.state().theme.label();
        self.ui.flash(format!("Theme: {label}"), false);
        self.drain_signals();
    }

    pub fn adjust_split(&mut self, grow: bool) {
        let delta = if grow { SPLIT_STEP } else { -SPLIT_STEP };
        if self.ui.adjust_split(delta) {
            self.persist();
        }
        self.drain_signals();
    }

    pub fn refresh_all(&mut self) {
        self.status.refresh();
        self.status.reload_diff();
        self.history.refresh();
        self.history.refresh_compare();
        self.explorer.reload();
        self.drain_signals();
    }

    /// Copies the selected commit hash or path.
    pub fn copy_selection(&mut self) {
        let text = match self.ui.state().tab {
            Tab::Diff | Tab::Commit => self.selected_file().map(|f| f.path),
            Tab::History => self.selected_commit().map(|c| c.hash.clone()),
            Tab::Compare => self.selected_compare_path(),
            Tab::Explorer => match self.selected_explorer_row() {
                Some(ExplorerRow::Entry(i)) => self.explorer.state().entries.get(i).map(|e| {
                    e.path
                        .strip_prefix(self.git.root())
                        .unwrap_or(&e.path)
                        .display()
                        .to_string()
                }),
                _ => None,
            },
        };
        let Some(text) = text else {
            return;
        };
        match copy_to_clipboard(&text) {
            Ok(()) => self.ui.flash(format!("Copied {text}"), false),
            Err(e) => {
                log::warn!("clipboard unavailable: {e}");
                self.ui.flash(format!("Clipboard unavailable: {e}"), true);
            }
        }
        self.drain_signals();
    }

    // ---------------------------------------------------------------
    // Mouse
    // ---------------------------------------------------------------

    fn mouse_target(&self, layout: &ScreenLayout, col: u16, row: u16) -> MouseTarget {
        let ui = self.ui.state();
        let top_offset = ui.scroll.get(ui.tab.top_scroll());
        let bottom = BottomView {
            offset: ui.tab.bottom_scroll().map_or(0, |t| ui.scroll.get(t)),
            total: self.bottom_total(),
        };
        match self.top_rows() {
            TopRows::Files(r) => hit_test(layout, &r, top_offset, bottom, col, row),
            TopRows::History(r) => hit_test(layout, &r, top_offset, bottom, col, row),
            TopRows::Compare(r) => hit_test(layout, &r, top_offset, bottom, col, row),
            TopRows::Explorer(r) => hit_test(layout, &r, top_offset, bottom, col, row),
        }
    }

    /// Clicks are ignored while a modal is open.
    pub fn click(&mut self, col: u16, row: u16) {
        if self.ui.state().modal.is_some() {
            return;
        }
        let layout = self.screen();
        match self.mouse_target(&layout, col, row) {
            MouseTarget::FooterTab(tab) => self.ui.set_tab(tab),
            MouseTarget::TopItem(index) => {
                self.ui.set_pane(Pane::Top);
                self.select_top(index);
            }
            MouseTarget::BottomRow(wrapped) => {
                self.ui.set_pane(Pane::Bottom);
                if self.ui.state().tab == Tab::Compare
                    && let Some(file) = self.compare_file_at(wrapped)
                {
                    self.mark_compare_file(file);
                }
            }
            MouseTarget::None => {
                if let Some(pane) = pane_at(&layout, col, row) {
                    self.ui.set_pane(pane);
                }
            }
        }
        self.drain_signals();
    }

    pub fn wheel(&mut self, col: u16, row: u16, delta: isize) {
        if self.ui.state().modal.is_some() {
            return;
        }
        match pane_at(&self.screen(), col, row) {
            Some(Pane::Top) => self.scroll_top(delta),
            Some(Pane::Bottom) => self.scroll_bottom(delta),
            None => {}
        }
    }
}
