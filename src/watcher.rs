//! Follow mode: watches a marker file that another process writes a
//! repository path into.

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::sync::mpsc;

const DEBOUNCE: Duration = Duration::from_millis(100);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FollowChange {
    /// Repository path named by the marker file.
    pub path: PathBuf,
    pub raw_content: String,
    pub last_update: SystemTime,
    pub source_file: PathBuf,
}

pub struct FollowWatcher {
    _watcher: RecommendedWatcher,
    pub rx: mpsc::UnboundedReceiver<FollowChange>,
}

impl FollowWatcher {
    /// Watches `marker`'s directory so the file may be created or replaced
    /// after startup. The current content, if any, is reported once.
    pub fn start(marker: PathBuf) -> notify::Result<Self> {
        let dir = marker
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        let (raw_tx, raw_rx) = mpsc::unbounded_channel::<()>();
        let (tx, rx) = mpsc::unbounded_channel();

        // Only `dir` is watched, so a matching file name is the marker.
        let name = marker.file_name().map(|n| n.to_os_string());
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if event.paths.iter().any(|p| p.file_name() == name.as_deref()) => {
                    let _ = raw_tx.send(());
                }
                Ok(_) => {}
                Err(e) => log::debug!("follow watcher error: {e}"),
            },
            Config::default(),
        )?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;
        log::info!("following {}", marker.display());

        tokio::spawn(debounce_task(marker, raw_rx, tx));
        Ok(Self {
            _watcher: watcher,
            rx,
        })
    }
}

async fn debounce_task(marker: PathBuf, mut raw: mpsc::UnboundedReceiver<()>, tx: mpsc::UnboundedSender<FollowChange>) {
    if let Some(change) = read_marker(&marker).await {
        let _ = tx.send(change);
    }
    while raw.recv().await.is_some() {
        // Collapse the burst an editor or `echo >` produces into one read.
        loop {
            match tokio::time::timeout(DEBOUNCE, raw.recv()).await {
                Ok(Some(())) => continue,
                Ok(None) => return,
                Err(_) => break,
            }
        }
        if let Some(change) = read_marker(&marker).await
            && tx.send(change).is_err()
        {
            return;
        }
    }
}

async fn read_marker(marker: &Path) -> Option<FollowChange> {
    let raw_content = match tokio::fs::read_to_string(marker).await {
        Ok(c) => c,
        Err(e) => {
            log::debug!("could not read {}: {e}", marker.display());
            return None;
        }
    };
    let path = parse_marker(&raw_content)?;
    let last_update = tokio::fs::metadata(marker)
        .await
        .and_then(|m| m.modified())
        .unwrap_or_else(|_| SystemTime::now());
    Some(FollowChange {
        path,
        raw_content,
        last_update,
        source_file: marker.to_path_buf(),
    })
}

/// First non-blank line, with a leading `~/` expanded.
pub fn parse_marker(content: &str) -> Option<PathBuf> {
    let line = content.lines().map(str::trim).find(|l| !l.is_empty())?;
    if let Some(rest) = line.strip_prefix("~/")
        && let Some(home) = std::env::home_dir()
    {
        return Some(home.join(rest));
    }
    Some(PathBuf::from(line))
}
