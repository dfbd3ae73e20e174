//! Navigation state: active tab and pane, scroll offsets, selections,
//! toggles and the open modal.

use std::time::{Duration, Instant};

use crate::branch::BranchPicker;
use crate::config::Preferences;
use crate::emitter::{Emitter, SubscriptionId};
use crate::layout::clamp_ratio;
use crate::theme::Theme;

const FLASH_TTL: Duration = Duration::from_secs(4);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Tab {
    #[default]
    Diff,
    Commit,
    History,
    Compare,
    Explorer,
}

impl Tab {
    pub const ALL: [Tab; 5] = [Tab::Diff, Tab::Commit, Tab::History, Tab::Compare, Tab::Explorer];

    pub fn label(self) -> &'static str {
        match self {
            Tab::Diff => "Diff",
            Tab::Commit => "Commit",
            Tab::History => "History",
            Tab::Compare => "Compare",
            Tab::Explorer => "Explorer",
        }
    }

    /// `'1'..='5'` in footer order.
    pub fn from_digit(c: char) -> Option<Tab> {
        let i = c.to_digit(10)? as usize;
        Tab::ALL.get(i.checked_sub(1)?).copied()
    }

    /// Diff and Commit share the file list as their top pane.
    pub fn shows_files(self) -> bool {
        matches!(self, Tab::Diff | Tab::Commit)
    }

    pub fn top_scroll(self) -> ScrollTarget {
        match self {
            Tab::Diff | Tab::Commit => ScrollTarget::FileList,
            Tab::History => ScrollTarget::History,
            Tab::Compare => ScrollTarget::Compare,
            Tab::Explorer => ScrollTarget::Explorer,
        }
    }

    /// The commit panel is an editor and scrolls with its cursor.
    pub fn bottom_scroll(self) -> Option<ScrollTarget> {
        match self {
            Tab::Diff => Some(ScrollTarget::Diff),
            Tab::Commit => None,
            Tab::History => Some(ScrollTarget::HistoryDiff),
            Tab::Compare => Some(ScrollTarget::CompareDiff),
            Tab::Explorer => Some(ScrollTarget::ExplorerContent),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Pane {
    #[default]
    Top,
    Bottom,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScrollTarget {
    FileList,
    Diff,
    History,
    HistoryDiff,
    Compare,
    CompareDiff,
    Explorer,
    ExplorerContent,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScrollOffsets {
    pub file_list: usize,
    pub diff: usize,
    pub history: usize,
    pub history_diff: usize,
    pub compare: usize,
    pub compare_diff: usize,
    pub explorer: usize,
    pub explorer_content: usize,
}

impl ScrollOffsets {
    pub fn get(&self, target: ScrollTarget) -> usize {
        *self.slot(target)
    }

    fn slot(&self, target: ScrollTarget) -> &usize {
        match target {
            ScrollTarget::FileList => &self.file_list,
            ScrollTarget::Diff => &self.diff,
            ScrollTarget::History => &self.history,
            ScrollTarget::HistoryDiff => &self.history_diff,
            ScrollTarget::Compare => &self.compare,
            ScrollTarget::CompareDiff => &self.compare_diff,
            ScrollTarget::Explorer => &self.explorer,
            ScrollTarget::ExplorerContent => &self.explorer_content,
        }
    }

    fn slot_mut(&mut self, target: ScrollTarget) -> &mut usize {
        match target {
            ScrollTarget::FileList => &mut self.file_list,
            ScrollTarget::Diff => &mut self.diff,
            ScrollTarget::History => &mut self.history,
            ScrollTarget::HistoryDiff => &mut self.history_diff,
            ScrollTarget::Compare => &mut self.compare,
            ScrollTarget::CompareDiff => &mut self.compare_diff,
            ScrollTarget::Explorer => &mut self.explorer,
            ScrollTarget::ExplorerContent => &mut self.explorer_content,
        }
    }
}

/// Selected row index per list pane. Indices count selectable rows only.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Selections {
    pub file: usize,
    pub history: usize,
    pub compare: usize,
    pub explorer: usize,
}

impl Selections {
    /// Selection of `tab`'s top pane.
    pub fn for_tab(&self, tab: Tab) -> usize {
        match tab {
            Tab::Diff | Tab::Commit => self.file,
            Tab::History => self.history,
            Tab::Compare => self.compare,
            Tab::Explorer => self.explorer,
        }
    }

    pub fn for_tab_mut(&mut self, tab: Tab) -> &mut usize {
        match tab {
            Tab::Diff | Tab::Commit => &mut self.file,
            Tab::History => &mut self.history,
            Tab::Compare => &mut self.compare,
            Tab::Explorer => &mut self.explorer,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfirmAction {
    SoftReset,
    CherryPick { hash: String, short: String },
    Revert { hash: String, short: String },
    StashPop,
}

impl ConfirmAction {
    pub fn prompt(&self) -> String {
        match self {
            ConfirmAction::SoftReset => "Undo the last commit, keeping its changes staged?".to_string(),
            ConfirmAction::CherryPick { short, .. } => format!("Cherry-pick {short} onto the current branch?"),
            ConfirmAction::Revert { short, .. } => format!("Revert {short}?"),
            ConfirmAction::StashPop => "Pop the latest stash onto the working tree?".to_string(),
        }
    }
}

#[derive(Clone, Debug)]
pub enum Modal {
    Help,
    BranchPicker(BranchPicker),
    NewBranch { input: String },
    Confirm(ConfirmAction),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Flash {
    pub text: String,
    pub is_error: bool,
    pub at: Instant,
}

#[derive(Clone, Debug)]
pub struct UiState {
    pub tab: Tab,
    pub pane: Pane,
    pub scroll: ScrollOffsets,
    pub selection: Selections,
    pub wrap: bool,
    pub auto_tab: bool,
    pub mouse: bool,
    pub flat_view: bool,
    pub tree_view: bool,
    pub split_ratio: f64,
    pub theme: Theme,
    pub modal: Option<Modal>,
    pub flash: Option<Flash>,
}

impl UiState {
    fn from_preferences(prefs: &Preferences) -> Self {
        Self {
            tab: Tab::default(),
            pane: Pane::default(),
            scroll: ScrollOffsets::default(),
            selection: Selections::default(),
            wrap: prefs.wrap,
            auto_tab: prefs.auto_tab,
            mouse: prefs.mouse,
            flat_view: prefs.flat_view,
            tree_view: prefs.tree_view,
            split_ratio: clamp_ratio(prefs.split_ratio),
            theme: prefs.theme,
            modal: None,
            flash: None,
        }
    }
}

pub struct UiManager {
    state: UiState,
    emitter: Emitter<UiState>,
}

impl UiManager {
    pub fn new(prefs: &Preferences) -> Self {
        Self {
            state: UiState::from_preferences(prefs),
            emitter: Emitter::new(),
        }
    }

    pub fn state(&self) -> &UiState {
        &self.state
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&UiState) + 'static) -> SubscriptionId {
        self.emitter.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.emitter.unsubscribe(id)
    }

    fn update(&mut self, f: impl FnOnce(&mut UiState)) {
        let mut next = self.state.clone();
        f(&mut next);
        self.state = next;
        self.emitter.emit(&self.state);
    }

    /// The persisted subset, merged over `base`.
    pub fn preferences(&self, base: &Preferences) -> Preferences {
        Preferences {
            wrap: self.state.wrap,
            mouse: self.state.mouse,
            auto_tab: self.state.auto_tab,
            split_ratio: self.state.split_ratio,
            flat_view: self.state.flat_view,
            tree_view: self.state.tree_view,
            theme: self.state.theme,
            follow_file: base.follow_file.clone(),
        }
    }

    /// Switching tabs keeps every scroll offset and selection.
    pub fn set_tab(&mut self, tab: Tab) {
        if self.state.tab == tab {
            return;
        }
        self.update(|s| {
            s.tab = tab;
            s.pane = Pane::Top;
        });
    }

    pub fn set_pane(&mut self, pane: Pane) {
        if self.state.pane != pane {
            self.update(|s| s.pane = pane);
        }
    }

    pub fn toggle_pane(&mut self) {
        let pane = match self.state.pane {
            Pane::Top => Pane::Bottom,
            Pane::Bottom => Pane::Top,
        };
        self.set_pane(pane);
    }

    pub fn set_scroll(&mut self, target: ScrollTarget, offset: usize) {
        if self.state.scroll.get(target) != offset {
            self.update(|s| *s.scroll.slot_mut(target) = offset);
        }
    }

    pub fn set_selection(&mut self, f: impl FnOnce(&mut Selections)) {
        let mut next = self.state.selection;
        f(&mut next);
        if next != self.state.selection {
            self.update(|s| s.selection = next);
        }
    }

    pub fn toggle_wrap(&mut self) {
        self.update(|s| {
            s.wrap = !s.wrap;
            // Row counts change under wrapping; start detail panes over.
            s.scroll.diff = 0;
            s.scroll.history_diff = 0;
            s.scroll.compare_diff = 0;
            s.scroll.explorer_content = 0;
        });
    }

    pub fn toggle_auto_tab(&mut self) {
        self.update(|s| s.auto_tab = !s.auto_tab);
    }

    pub fn toggle_mouse(&mut self) {
        self.update(|s| s.mouse = !s.mouse);
    }

    pub fn toggle_flat_view(&mut self) {
        self.update(|s| {
            s.flat_view = !s.flat_view;
            s.selection.file = 0;
            s.scroll.file_list = 0;
        });
    }

    pub fn toggle_tree_view(&mut self) {
        self.update(|s| {
            s.tree_view = !s.tree_view;
            s.selection.file = 0;
            s.scroll.file_list = 0;
        });
    }

    pub fn cycle_theme(&mut self) {
        self.update(|s| s.theme = s.theme.next());
    }

    /// Returns false when the ratio was already at its bound.
    pub fn adjust_split(&mut self, delta: f64) -> bool {
        let next = clamp_ratio(self.state.split_ratio + delta);
        if (next - self.state.split_ratio).abs() < f64::EPSILON {
            return false;
        }
        self.update(|s| s.split_ratio = next);
        true
    }

    pub fn open_modal(&mut self, modal: Modal) {
        self.update(|s| s.modal = Some(modal));
    }

    pub fn close_modal(&mut self) {
        if self.state.modal.is_some() {
            self.update(|s| s.modal = None);
        }
    }

    pub fn edit_modal(&mut self, f: impl FnOnce(&mut Modal)) {
        if self.state.modal.is_some() {
            self.update(|s| {
                if let Some(m) = s.modal.as_mut() {
                    f(m);
                }
            });
        }
    }

    pub fn flash(&mut self, text: impl Into<String>, is_error: bool) {
        let text = text.into();
        self.update(|s| {
            s.flash = Some(Flash {
                text,
                is_error,
                at: Instant::now(),
            })
        });
    }

    /// Clears the flash once it has been shown long enough.
    pub fn expire_flash(&mut self, now: Instant) {
        let expired = self
            .state
            .flash
            .as_ref()
            .is_some_and(|f| now.duration_since(f.at) >= FLASH_TTL);
        if expired {
            self.update(|s| s.flash = None);
        }
    }

    /// Back to the top of every pane after the repository changed. Tab and
    /// toggles survive.
    pub fn reset_for_repo(&mut self) {
        self.update(|s| {
            s.scroll = ScrollOffsets::default();
            s.selection = Selections::default();
            s.modal = None;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn manager() -> UiManager {
        UiManager::new(&Preferences::default())
    }

    #[test]
    fn digits_map_to_tabs() {
        assert_eq!(Tab::from_digit('1'), Some(Tab::Diff));
        assert_eq!(Tab::from_digit('5'), Some(Tab::Explorer));
        assert_eq!(Tab::from_digit('0'), None);
        assert_eq!(Tab::from_digit('6'), None);
        assert_eq!(Tab::from_digit('x'), None);
    }

    #[test]
    fn tab_switch_keeps_scroll() {
        let mut m = manager();
        m.set_scroll(ScrollTarget::Diff, 12);
        m.set_selection(|s| s.file = 3);
        m.set_tab(Tab::History);
        m.set_tab(Tab::Diff);
        assert_eq!(m.state().scroll.diff, 12);
        assert_eq!(m.state().selection.file, 3);
    }

    #[test]
    fn diff_and_commit_share_the_file_selection() {
        let mut sel = Selections::default();
        *sel.for_tab_mut(Tab::Commit) = 4;
        assert_eq!(sel.for_tab(Tab::Diff), 4);
        assert_eq!(Tab::Commit.top_scroll(), ScrollTarget::FileList);
        assert_eq!(Tab::Commit.bottom_scroll(), None);
        assert_eq!(Tab::History.bottom_scroll(), Some(ScrollTarget::HistoryDiff));
    }

    #[test]
    fn repo_reset_is_restricted() {
        let mut m = manager();
        m.set_tab(Tab::Compare);
        m.toggle_wrap();
        m.set_scroll(ScrollTarget::CompareDiff, 40);
        m.set_selection(|s| s.compare = 2);
        m.open_modal(Modal::Help);

        m.reset_for_repo();
        let s = m.state();
        assert_eq!(s.scroll, ScrollOffsets::default());
        assert_eq!(s.selection, Selections::default());
        assert!(s.modal.is_none());
        assert_eq!(s.tab, Tab::Compare);
        assert!(s.wrap);
    }

    #[test]
    fn unchanged_values_do_not_notify() {
        let mut m = manager();
        let count = Rc::new(Cell::new(0));
        let c = Rc::clone(&count);
        m.subscribe(move |_| c.set(c.get() + 1));

        m.set_scroll(ScrollTarget::Diff, 0);
        m.set_tab(Tab::Diff);
        m.set_selection(|s| s.file = 0);
        m.close_modal();
        assert_eq!(count.get(), 0);

        m.set_scroll(ScrollTarget::Diff, 5);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn unsubscribed_listener_stops_hearing_changes() {
        let mut m = manager();
        let count = Rc::new(Cell::new(0));
        let c = Rc::clone(&count);
        let id = m.subscribe(move |_| c.set(c.get() + 1));

        m.set_scroll(ScrollTarget::Diff, 3);
        assert!(m.unsubscribe(id));
        m.set_scroll(ScrollTarget::Diff, 7);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn split_ratio_stays_in_bounds() {
        let mut m = manager();
        for _ in 0..20 {
            m.adjust_split(0.05);
        }
        assert!((m.state().split_ratio - 0.8).abs() < 1e-9);
        assert!(!m.adjust_split(0.05));
        let prefs = m.preferences(&Preferences::default());
        assert!((prefs.split_ratio - 0.8).abs() < 1e-9);
    }

    #[test]
    fn flash_expires() {
        let mut m = manager();
        m.flash("Pushed", false);
        let at = m.state().flash.as_ref().unwrap().at;
        m.expire_flash(at + Duration::from_secs(1));
        assert!(m.state().flash.is_some());
        m.expire_flash(at + FLASH_TTL);
        assert!(m.state().flash.is_none());
    }
}
