//! Keyboard and mouse input.
//!
//! Every binding calls one named `App` action. An open modal takes all
//! keys; the commit editor takes typing while it has focus.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};

use crate::app::App;
use crate::branch::PickerPurpose;
use crate::state::ui::{Modal, Pane, Tab};

/// Wheel notches scroll this many rows.
const WHEEL_STEP: isize = 3;

/// Key bindings as listed in the help modal.
pub const KEY_HELP: &[(&str, &str)] = &[
    ("1-5", "switch tab"),
    ("Tab", "switch pane"),
    ("j/k ↑/↓", "move or scroll"),
    ("PgUp/PgDn g/G", "page, first, last"),
    ("space", "stage or unstage file"),
    ("A / U", "stage all / unstage all"),
    ("c", "write commit message"),
    ("Ctrl+S", "commit (Ctrl+A amend)"),
    ("P f p", "push, fetch, pull --rebase"),
    ("z / Z", "stash / pop stash"),
    ("b / n", "switch branch / new branch"),
    ("B", "pick compare base"),
    ("C R X", "cherry-pick, revert, undo last commit"),
    ("h/l Enter .", "explorer up, open, hidden files"),
    ("y", "copy path or hash"),
    ("w m a", "wrap, mouse, auto tab"),
    ("v t T", "flat view, tree view, theme"),
    ("+ / -", "resize panes"),
    ("r", "refresh"),
    ("q", "quit"),
];

fn plain(key: &KeyEvent) -> bool {
    !key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
}

pub fn handle_key_event(app: &mut App, key: KeyEvent) {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        app.quit();
        return;
    }

    match &app.ui().modal {
        Some(Modal::Help) => return app.close_modal(),
        Some(Modal::BranchPicker(_)) => return handle_branch_picker_key(app, key),
        Some(Modal::NewBranch { .. }) => return handle_new_branch_key(app, key),
        Some(Modal::Confirm(_)) => return handle_confirm_key(app, key),
        None => {}
    }

    let ui = app.ui();
    if ui.tab == Tab::Commit && ui.pane == Pane::Bottom && handle_commit_editor_key(app, key) {
        return;
    }
    handle_global_key(app, key);
}

fn handle_branch_picker_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.close_modal(),
        KeyCode::Enter => app.picker_confirm(),
        KeyCode::Down => app.edit_picker(|p| p.move_selection(1)),
        KeyCode::Up => app.edit_picker(|p| p.move_selection(-1)),
        KeyCode::PageDown => app.edit_picker(|p| p.move_selection(10)),
        KeyCode::PageUp => app.edit_picker(|p| p.move_selection(-10)),
        KeyCode::Backspace => app.edit_picker(|p| p.pop_query()),
        KeyCode::Char(ch) if plain(&key) => app.edit_picker(|p| p.push_query(ch)),
        _ => {}
    }
}

fn handle_new_branch_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.close_modal(),
        KeyCode::Enter => app.new_branch_confirm(),
        KeyCode::Backspace => app.edit_new_branch(|s| {
            s.pop();
        }),
        KeyCode::Char(ch) if plain(&key) && !ch.is_whitespace() => app.edit_new_branch(|s| s.push(ch)),
        _ => {}
    }
}

fn handle_confirm_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Enter | KeyCode::Char('y') | KeyCode::Char('Y') => app.confirm(),
        KeyCode::Esc | KeyCode::Char('n') | KeyCode::Char('N') => app.close_modal(),
        _ => {}
    }
}

/// Returns false for keys the editor leaves to the global map.
fn handle_commit_editor_key(app: &mut App, key: KeyEvent) -> bool {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('s') | KeyCode::Enter if ctrl => app.commit(),
        KeyCode::Char('a') if ctrl => app.toggle_amend(),
        KeyCode::Esc => app.focus_top(),
        KeyCode::Tab => return false,
        _ if app.status().committing => {}
        KeyCode::Left => app.edit_commit(|d| d.move_left()),
        KeyCode::Right => app.edit_commit(|d| d.move_right()),
        KeyCode::Up => app.edit_commit(|d| d.move_up()),
        KeyCode::Down => app.edit_commit(|d| d.move_down()),
        KeyCode::Home => app.edit_commit(|d| d.move_home()),
        KeyCode::End => app.edit_commit(|d| d.move_end()),
        KeyCode::Backspace => app.edit_commit(|d| d.backspace()),
        KeyCode::Delete => app.edit_commit(|d| d.delete()),
        KeyCode::Enter => app.edit_commit(|d| d.insert_char('\n')),
        KeyCode::Char(ch) if plain(&key) => app.edit_commit(|d| d.insert_char(ch)),
        _ => return false,
    }
    true
}

fn handle_global_key(app: &mut App, key: KeyEvent) {
    if !plain(&key) {
        return;
    }
    let tab = app.ui().tab;
    match key.code {
        KeyCode::Char('q') => app.quit(),
        KeyCode::Char('?') => app.open_help(),
        KeyCode::Char(c @ '1'..='5') => {
            if let Some(tab) = Tab::from_digit(c) {
                app.set_tab(tab);
            }
        }
        KeyCode::Tab | KeyCode::BackTab => app.toggle_pane(),
        KeyCode::Esc => app.focus_top(),

        KeyCode::Char('j') | KeyCode::Down => app.move_selection(1),
        KeyCode::Char('k') | KeyCode::Up => app.move_selection(-1),
        KeyCode::PageDown => app.page(true),
        KeyCode::PageUp => app.page(false),
        KeyCode::Char('g') | KeyCode::Home => app.jump(false),
        KeyCode::Char('G') | KeyCode::End => app.jump(true),

        KeyCode::Char('w') => app.toggle_wrap(),
        KeyCode::Char('m') => app.toggle_mouse(),
        KeyCode::Char('a') => app.toggle_auto_tab(),
        KeyCode::Char('v') => app.toggle_flat_view(),
        KeyCode::Char('t') => app.toggle_tree_view(),
        KeyCode::Char('T') => app.cycle_theme(),
        KeyCode::Char('+') | KeyCode::Char('=') => app.adjust_split(true),
        KeyCode::Char('-') => app.adjust_split(false),
        KeyCode::Char('r') => app.refresh_all(),
        KeyCode::Char('y') => app.copy_selection(),

        KeyCode::Char('P') => app.push(),
        KeyCode::Char('f') => app.fetch(),
        KeyCode::Char('p') => app.pull(),
        KeyCode::Char('z') => app.stash(),
        KeyCode::Char('Z') => app.request_stash_pop(),
        KeyCode::Char('b') => app.open_branch_picker(PickerPurpose::Switch),
        KeyCode::Char('B') => app.open_branch_picker(PickerPurpose::CompareBase),
        KeyCode::Char('n') => app.open_new_branch(),
        KeyCode::Char('X') => app.request_soft_reset(),

        KeyCode::Char(' ') if tab.shows_files() => app.toggle_stage_selected(),
        KeyCode::Char('A') if tab.shows_files() => app.stage_all(),
        KeyCode::Char('U') if tab.shows_files() => app.unstage_all(),
        KeyCode::Char('c') => {
            app.set_tab(Tab::Commit);
            if app.ui().pane != Pane::Bottom {
                app.toggle_pane();
            }
        }

        KeyCode::Char('C') => app.request_cherry_pick(),
        KeyCode::Char('R') => app.request_revert(),

        KeyCode::Char('h') | KeyCode::Backspace | KeyCode::Left if tab == Tab::Explorer => app.explorer_up(),
        KeyCode::Char('l') | KeyCode::Right if tab == Tab::Explorer => app.activate(),
        KeyCode::Char('.') if tab == Tab::Explorer => app.toggle_hidden(),
        KeyCode::Enter => app.activate(),
        _ => {}
    }
}

/// Ignored while mouse support is switched off.
pub fn handle_mouse_event(app: &mut App, mouse: MouseEvent) {
    if !app.ui().mouse {
        return;
    }
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => app.click(mouse.column, mouse.row),
        MouseEventKind::ScrollDown => app.wheel(mouse.column, mouse.row, WHEEL_STEP),
        MouseEventKind::ScrollUp => app.wheel(mouse.column, mouse.row, -WHEEL_STEP),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::testing::{fixture, settle};
    use crate::config::Preferences;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(ch: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(ch), KeyModifiers::CONTROL)
    }

    fn type_text(app: &mut App, text: &str) {
        for ch in text.chars() {
            handle_key_event(app, key(KeyCode::Char(ch)));
        }
    }

    #[tokio::test]
    async fn digits_switch_tabs_and_keep_scroll() {
        let mut f = fixture(Preferences::default());
        settle(&mut f).await;
        handle_key_event(&mut f.app, key(KeyCode::Char('3')));
        assert_eq!(f.app.ui().tab, Tab::History);
        handle_key_event(&mut f.app, key(KeyCode::Char('j')));
        handle_key_event(&mut f.app, key(KeyCode::Char('1')));
        handle_key_event(&mut f.app, key(KeyCode::Char('3')));
        assert_eq!(f.app.ui().selection.history, 1);
    }

    #[tokio::test]
    async fn commit_editor_captures_letters() {
        let mut f = fixture(Preferences::default());
        settle(&mut f).await;
        handle_key_event(&mut f.app, key(KeyCode::Char('c')));
        assert_eq!(f.app.ui().tab, Tab::Commit);
        assert_eq!(f.app.ui().pane, Pane::Bottom);

        // `q` and `w` are text here, not quit and wrap.
        type_text(&mut f.app, "qw");
        handle_key_event(&mut f.app, key(KeyCode::Enter));
        type_text(&mut f.app, "x");
        assert!(!f.app.should_quit);
        assert!(!f.app.ui().wrap);
        assert_eq!(f.app.status().commit.message, "qw\nx");

        handle_key_event(&mut f.app, key(KeyCode::Esc));
        assert_eq!(f.app.ui().pane, Pane::Top);
        handle_key_event(&mut f.app, key(KeyCode::Char('q')));
        assert!(f.app.should_quit);
    }

    #[tokio::test]
    async fn ctrl_s_commits_staged_changes() {
        let mut f = fixture(Preferences::default());
        settle(&mut f).await;
        handle_key_event(&mut f.app, key(KeyCode::Char(' ')));
        settle(&mut f).await;
        handle_key_event(&mut f.app, key(KeyCode::Char('c')));
        type_text(&mut f.app, "Add a");
        handle_key_event(&mut f.app, ctrl('s'));
        settle(&mut f).await;
        assert!(f.fake.calls().contains(&"start commit Add a".to_string()));
    }

    #[tokio::test]
    async fn modal_takes_every_key() {
        let mut f = fixture(Preferences::default());
        settle(&mut f).await;
        handle_key_event(&mut f.app, key(KeyCode::Char('n')));
        type_text(&mut f.app, "feat q");
        assert!(!f.app.should_quit);
        match &f.app.ui().modal {
            Some(Modal::NewBranch { input }) => assert_eq!(input, "featq"),
            other => panic!("unexpected modal {other:?}"),
        }
        handle_key_event(&mut f.app, key(KeyCode::Esc));
        assert!(f.app.ui().modal.is_none());

        handle_key_event(&mut f.app, key(KeyCode::Char('?')));
        assert!(matches!(f.app.ui().modal, Some(Modal::Help)));
        handle_key_event(&mut f.app, key(KeyCode::Char('x')));
        assert!(f.app.ui().modal.is_none());
    }

    #[tokio::test]
    async fn mouse_is_ignored_when_disabled() {
        let prefs = Preferences {
            mouse: false,
            ..Preferences::default()
        };
        let mut f = fixture(prefs);
        settle(&mut f).await;
        let footer = f.app.screen().footer;
        let event = MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column: footer.x + 12,
            row: footer.y,
            modifiers: KeyModifiers::NONE,
        };
        handle_mouse_event(&mut f.app, event);
        assert_eq!(f.app.ui().tab, Tab::Diff);

        handle_key_event(&mut f.app, key(KeyCode::Char('m')));
        handle_mouse_event(&mut f.app, event);
        assert_eq!(f.app.ui().tab, Tab::Commit);
    }
}
