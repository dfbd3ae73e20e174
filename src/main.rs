use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture, Event, EventStream, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures::StreamExt;
use ratatui::{Terminal, backend::CrosstermBackend, layout::Rect};
use std::{
    env,
    io::{self, Stdout},
    path::PathBuf,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::mpsc;

mod app;
mod branch;
mod commit;
mod config;
mod diff;
mod diff_loader;
mod emitter;
mod error;
mod events;
mod file_tree;
mod git;
mod git_ops;
mod highlight;
mod layout;
mod logging;
mod mouse;
mod panes;
mod preview_cache;
mod preview_loader;
mod queue;
mod rows;
mod state;
mod theme;
mod ui;
mod watcher;
mod wrap;

use app::App;
use config::Preferences;
use diff_loader::{DiffLoader, DiffResult};
use git_ops::GitCli;
use preview_loader::{PreviewLoader, PreviewResult};
use state::StateEvent;
use watcher::{FollowChange, FollowWatcher};

const VERSION: &str = env!("CARGO_PKG_VERSION");
const TICK: Duration = Duration::from_millis(100);

const USAGE: &str = "usage: stagepane [PATH] [--follow [FILE]]

  PATH             repository to review (default: current directory)
  --follow [FILE]  switch repositories when FILE names a new one
  -V, --version    print version";

#[derive(Debug, Default, PartialEq, Eq)]
struct Args {
    path: Option<PathBuf>,
    /// `Some(None)` when `--follow` was given without a file.
    follow: Option<Option<PathBuf>>,
    version: bool,
    help: bool,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Args, String> {
    let mut out = Args::default();
    let mut it = args.into_iter().peekable();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--version" | "-V" => out.version = true,
            "--help" | "-h" => out.help = true,
            "--follow" => {
                let file = it.next_if(|next| !next.starts_with('-')).map(PathBuf::from);
                out.follow = Some(file);
            }
            _ if arg.starts_with("--follow=") => {
                let file = &arg["--follow=".len()..];
                out.follow = Some((!file.is_empty()).then(|| PathBuf::from(file)));
            }
            _ if arg.starts_with('-') => return Err(format!("unknown option: {arg}")),
            _ if out.path.is_some() => return Err(format!("unexpected argument: {arg}")),
            _ => out.path = Some(PathBuf::from(arg)),
        }
    }
    Ok(out)
}

/// Marker file for follow mode: explicit, then preferences, then the state dir.
fn follow_marker(requested: Option<PathBuf>, prefs: &Preferences) -> Option<PathBuf> {
    requested
        .or_else(|| prefs.follow_file.clone())
        .or_else(|| config::state_dir().map(|d| d.join("follow")))
}

fn restore_terminal() {
    let _ = disable_raw_mode();
    let _ = execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture);
}

fn setup_terminal(mouse: bool) -> io::Result<Terminal<CrosstermBackend<Stdout>>> {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        restore_terminal();
        default_hook(info);
    }));

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    if mouse {
        execute!(stdout, EnableMouseCapture)?;
    }
    Terminal::new(CrosstermBackend::new(stdout))
}

async fn next_follow(watcher: &mut Option<FollowWatcher>) -> Option<FollowChange> {
    match watcher {
        Some(w) => w.rx.recv().await,
        None => std::future::pending().await,
    }
}

#[tokio::main]
async fn main() -> io::Result<()> {
    let args = match parse_args(env::args().skip(1)) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("stagepane: {e}\n\n{USAGE}");
            std::process::exit(2);
        }
    };
    if args.version {
        println!("stagepane {VERSION}");
        return Ok(());
    }
    if args.help {
        println!("{USAGE}");
        return Ok(());
    }

    logging::init();
    let prefs = Preferences::load();

    let path = match args.path {
        Some(p) => p,
        None => env::current_dir()?,
    };
    let git = match GitCli::open(&path) {
        Ok(git) => git,
        Err(e) => {
            eprintln!("stagepane: {}: {e}", path.display());
            std::process::exit(1);
        }
    };

    let follow = match args.follow.map(|f| follow_marker(f, &prefs)) {
        Some(Some(marker)) => match FollowWatcher::start(marker.clone()) {
            Ok(w) => Some(w),
            Err(e) => {
                eprintln!("stagepane: cannot follow {}: {e}", marker.display());
                std::process::exit(1);
            }
        },
        Some(None) => {
            eprintln!("stagepane: --follow needs a FILE (no state directory available)");
            std::process::exit(2);
        }
        None => None,
    };

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let (diff_loader, diff_rx) = DiffLoader::new();
    let (preview_loader, preview_rx) = PreviewLoader::new();

    let mut app = App::new(
        Arc::new(git),
        prefs,
        config::preferences_path(),
        events_tx,
        diff_loader,
        preview_loader,
    );
    app.start();

    let mouse = app.ui().mouse;
    let mut terminal = match setup_terminal(mouse) {
        Ok(terminal) => terminal,
        Err(e) => {
            restore_terminal();
            return Err(e);
        }
    };
    let mut inputs = Inputs {
        events: events_rx,
        diff: diff_rx,
        preview: preview_rx,
        follow,
    };

    let result = with_restore(run(&mut app, &mut terminal, &mut inputs), restore_terminal).await;
    if let Err(e) = &result {
        log::error!("terminal session failed: {e}");
    }
    result.and_then(|()| terminal.show_cursor())
}

/// Everything the event loop waits on besides the terminal.
struct Inputs {
    events: mpsc::UnboundedReceiver<StateEvent>,
    diff: mpsc::Receiver<DiffResult>,
    preview: mpsc::Receiver<PreviewResult>,
    follow: Option<FollowWatcher>,
}

/// Awaits `session`, then runs `restore` whether it succeeded or not.
async fn with_restore(session: impl Future<Output = io::Result<()>>, restore: impl FnOnce()) -> io::Result<()> {
    let result = session.await;
    restore();
    result
}

async fn run(app: &mut App, terminal: &mut Terminal<CrosstermBackend<Stdout>>, inputs: &mut Inputs) -> io::Result<()> {
    let mut mouse_captured = app.ui().mouse;
    let mut event_stream = EventStream::new();

    loop {
        if app.ui().mouse != mouse_captured {
            mouse_captured = app.ui().mouse;
            if mouse_captured {
                execute!(terminal.backend_mut(), EnableMouseCapture)?;
            } else {
                execute!(terminal.backend_mut(), DisableMouseCapture)?;
            }
        }

        let size = terminal.size()?;
        app.set_viewport(Rect::new(0, 0, size.width, size.height));
        terminal.draw(|f| ui::draw(f, app))?;

        tokio::select! {
            maybe_event = event_stream.next() => match maybe_event {
                Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                    events::handle_key_event(app, key);
                }
                Some(Ok(Event::Mouse(mouse))) => events::handle_mouse_event(app, mouse),
                Some(Ok(_)) => {}
                Some(Err(e)) => log::warn!("terminal event error: {e}"),
                None => return Ok(()),
            },
            Some(event) = inputs.events.recv() => app.handle_state_event(event),
            Some(result) = inputs.diff.recv() => app.handle_diff_result(result),
            Some(result) = inputs.preview.recv() => app.handle_preview_result(result),
            Some(change) = next_follow(&mut inputs.follow) => {
                log::info!("follow: {} -> {}", change.source_file.display(), change.path.display());
                app.switch_repo(&change.path);
            }
            _ = tokio::time::sleep(TICK) => app.tick(Instant::now()),
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Args, String> {
        parse_args(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn no_arguments_reviews_the_current_directory() {
        assert_eq!(parse(&[]).unwrap(), Args::default());
    }

    #[test]
    fn follow_takes_an_optional_file() {
        let args = parse(&["repo", "--follow"]).unwrap();
        assert_eq!(args.path, Some(PathBuf::from("repo")));
        assert_eq!(args.follow, Some(None));

        let args = parse(&["--follow", "/tmp/marker"]).unwrap();
        assert_eq!(args.follow, Some(Some(PathBuf::from("/tmp/marker"))));
        assert_eq!(args.path, None);

        let args = parse(&["--follow", "-V"]).unwrap();
        assert_eq!(args.follow, Some(None));
        assert!(args.version);

        let args = parse(&["--follow=/tmp/m"]).unwrap();
        assert_eq!(args.follow, Some(Some(PathBuf::from("/tmp/m"))));
    }

    #[test]
    fn rejects_unknown_flags_and_extra_paths() {
        assert!(parse(&["--bogus"]).is_err());
        assert!(parse(&["a", "b"]).is_err());
    }

    #[test]
    fn explicit_follow_file_beats_preferences() {
        let prefs = Preferences {
            follow_file: Some(PathBuf::from("/from/prefs")),
            ..Preferences::default()
        };
        assert_eq!(
            follow_marker(Some(PathBuf::from("/explicit")), &prefs),
            Some(PathBuf::from("/explicit"))
        );
        assert_eq!(follow_marker(None, &prefs), Some(PathBuf::from("/from/prefs")));
    }

    #[tokio::test]
    async fn terminal_is_restored_when_the_session_fails() {
        let restored = std::cell::Cell::new(false);
        let result = with_restore(async { Err::<(), _>(io::Error::other("draw failed")) }, || restored.set(true)).await;
        assert!(result.is_err());
        assert!(restored.get());
    }

    #[tokio::test]
    async fn terminal_is_restored_on_quit() {
        let restored = std::cell::Cell::new(false);
        let result = with_restore(async { Ok::<(), io::Error>(()) }, || restored.set(true)).await;
        assert!(result.is_ok());
        assert!(restored.get());
    }
}
