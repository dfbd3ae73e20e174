use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::emitter::{Emitter, SubscriptionId};
use crate::git::natural_cmp;
use crate::preview_cache::{PreviewCache, PreviewContent};
use crate::preview_loader::{PreviewLoader, PreviewResult};

use super::{EventSender, StateEvent};

const CACHE_CAPACITY: usize = 64;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExplorerEntry {
    pub name: String,
    pub path: PathBuf,
    pub is_dir: bool,
}

#[derive(Clone, Debug, Default)]
pub struct ExplorerState {
    pub root: PathBuf,
    pub dir: PathBuf,
    pub entries: Vec<ExplorerEntry>,
    pub show_hidden: bool,
    pub loading: bool,
    pub error: Option<String>,

    pub content_path: Option<PathBuf>,
    pub content: Option<PreviewContent>,
    pub content_loading: bool,
    pub content_error: Option<String>,
}

impl ExplorerState {
    pub fn at_root(&self) -> bool {
        self.dir == self.root
    }

    /// `dir` relative to the root, for titles.
    pub fn relative_dir(&self) -> String {
        match self.dir.strip_prefix(&self.root) {
            Ok(rel) if rel.as_os_str().is_empty() => ".".to_string(),
            Ok(rel) => rel.display().to_string(),
            Err(_) => self.dir.display().to_string(),
        }
    }
}

pub struct ExplorerManager {
    state: ExplorerState,
    emitter: Emitter<ExplorerState>,
    events: EventSender,
    loader: PreviewLoader,
    cache: Arc<PreviewCache>,
    list_request: u64,
    preview_request: u64,
    preview_cancel: Option<CancellationToken>,
}

impl ExplorerManager {
    pub fn new(root: PathBuf, events: EventSender, loader: PreviewLoader) -> Self {
        Self {
            state: ExplorerState {
                dir: root.clone(),
                root,
                ..ExplorerState::default()
            },
            emitter: Emitter::new(),
            events,
            loader,
            cache: Arc::new(PreviewCache::new(CACHE_CAPACITY)),
            list_request: 0,
            preview_request: 0,
            preview_cancel: None,
        }
    }

    pub fn state(&self) -> &ExplorerState {
        &self.state
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&ExplorerState) + 'static) -> SubscriptionId {
        self.emitter.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.emitter.unsubscribe(id)
    }

    fn update(&mut self, f: impl FnOnce(&mut ExplorerState)) {
        let mut next = self.state.clone();
        f(&mut next);
        self.state = next;
        self.emitter.emit(&self.state);
    }

    pub fn set_root(&mut self, root: PathBuf) {
        self.cancel_preview();
        self.cache.clear();
        let show_hidden = self.state.show_hidden;
        self.update(|s| {
            *s = ExplorerState {
                dir: root.clone(),
                root,
                show_hidden,
                ..ExplorerState::default()
            }
        });
        self.list(self.state.dir.clone());
    }

    /// Lists `dir`, which must lie inside the root.
    pub fn list(&mut self, dir: PathBuf) {
        if !dir.starts_with(&self.state.root) {
            log::warn!("refusing to list {} outside {}", dir.display(), self.state.root.display());
            return;
        }
        self.list_request += 1;
        let request_id = self.list_request;
        let show_hidden = self.state.show_hidden;
        // Rows index into `entries`, so the old listing must not outlive `dir`.
        self.update(|s| {
            s.dir = dir.clone();
            s.entries.clear();
            s.loading = true;
            s.error = None;
        });

        let events = self.events.clone();
        tokio::spawn(async move {
            let d = dir.clone();
            let result = tokio::task::spawn_blocking(move || read_dir_sorted(&d, show_hidden))
                .await
                .unwrap_or_else(|e| Err(e.to_string()));
            let _ = events.send(StateEvent::DirListed {
                request_id,
                dir,
                result,
            });
        });
    }

    pub fn apply_listing(&mut self, request_id: u64, dir: PathBuf, result: Result<Vec<ExplorerEntry>, String>) {
        if request_id != self.list_request || dir != self.state.dir {
            return;
        }
        match result {
            Ok(entries) => self.update(|s| {
                s.loading = false;
                s.error = None;
                s.entries = entries;
            }),
            Err(e) => {
                log::debug!("listing {} failed: {e}", dir.display());
                self.update(|s| {
                    s.loading = false;
                    s.entries.clear();
                    s.error = Some(e);
                });
            }
        }
    }

    pub fn enter(&mut self, entry: &ExplorerEntry) {
        if entry.is_dir {
            self.list(entry.path.clone());
        }
    }

    /// Moves to the parent directory. Returns false at the root.
    pub fn go_up(&mut self) -> bool {
        if self.state.at_root() {
            return false;
        }
        match self.state.dir.parent() {
            Some(parent) => {
                self.list(parent.to_path_buf());
                true
            }
            None => false,
        }
    }

    pub fn toggle_hidden(&mut self) {
        self.update(|s| s.show_hidden = !s.show_hidden);
        self.list(self.state.dir.clone());
    }

    /// Shows `path`'s content, from the cache when possible.
    pub fn select_file(&mut self, path: Option<&Path>) {
        if self.state.content_path.as_deref() == path {
            return;
        }
        self.cancel_preview();
        self.preview_request += 1;

        let Some(path) = path.map(Path::to_path_buf) else {
            self.update(|s| {
                s.content_path = None;
                s.content = None;
                s.content_loading = false;
                s.content_error = None;
            });
            return;
        };

        if let Some(hit) = self.cache.get(&path) {
            self.update(|s| {
                s.content_path = Some(path);
                s.content = Some(hit);
                s.content_loading = false;
                s.content_error = None;
            });
            return;
        }

        self.preview_cancel = Some(self.loader.request(path.clone(), self.preview_request));
        self.update(|s| {
            s.content_path = Some(path);
            s.content = None;
            s.content_loading = true;
            s.content_error = None;
        });
    }

    pub fn apply_preview(&mut self, result: PreviewResult) {
        match result {
            PreviewResult::Ready {
                request_id,
                path,
                content,
            } if request_id == self.preview_request => {
                self.preview_cancel = None;
                self.cache.insert(path, content.clone());
                self.update(|s| {
                    s.content = Some(content);
                    s.content_loading = false;
                });
            }
            PreviewResult::Error {
                request_id, error, ..
            } if request_id == self.preview_request => {
                self.preview_cancel = None;
                self.update(|s| {
                    s.content_loading = false;
                    s.content_error = Some(error);
                });
            }
            _ => {}
        }
    }

    /// Drops cached content and reloads the listing and the shown file.
    pub fn reload(&mut self) {
        self.cache.clear();
        self.list(self.state.dir.clone());
        if let Some(path) = self.state.content_path.clone() {
            self.update(|s| s.content_path = None);
            self.select_file(Some(&path));
        }
    }

    fn cancel_preview(&mut self) {
        if let Some(token) = self.preview_cancel.take() {
            token.cancel();
        }
    }
}

/// Directories first, then natural name order. `.git` is never listed.
fn read_dir_sorted(dir: &Path, show_hidden: bool) -> Result<Vec<ExplorerEntry>, String> {
    let rd = fs::read_dir(dir).map_err(|e| format!("Could not read {}: {e}", dir.display()))?;
    let mut entries: Vec<ExplorerEntry> = rd
        .filter_map(Result::ok)
        .filter_map(|e| {
            let name = e.file_name().to_string_lossy().into_owned();
            if name == ".git" || (!show_hidden && name.starts_with('.')) {
                return None;
            }
            let is_dir = e.file_type().map(|t| t.is_dir()).unwrap_or(false);
            Some(ExplorerEntry {
                name,
                path: e.path(),
                is_dir,
            })
        })
        .collect();
    entries.sort_by(|a, b| match (a.is_dir, b.is_dir) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => natural_cmp(&a.name, &b.name),
    });
    Ok(entries)
}
