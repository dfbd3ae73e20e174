use lru::LruCache;
use parking_lot::RwLock;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::highlight::StyledLine;

const DEFAULT_CAPACITY: NonZeroUsize = NonZeroUsize::new(64).unwrap();

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreviewContent {
    pub text: String,
    pub is_binary: bool,
    /// Cut at the size or line cap.
    pub truncated: bool,
    pub highlighted: Option<Arc<Vec<StyledLine>>>,
}

pub struct PreviewCache {
    cache: RwLock<LruCache<PathBuf, PreviewContent>>,
}

impl PreviewCache {
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(DEFAULT_CAPACITY);
        Self {
            cache: RwLock::new(LruCache::new(cap)),
        }
    }

    /// Takes the write lock: a hit updates recency.
    pub fn get(&self, path: &Path) -> Option<PreviewContent> {
        self.cache.write().get(path).cloned()
    }

    pub fn insert(&self, path: PathBuf, content: PreviewContent) {
        self.cache.write().put(path, content);
    }

    pub fn clear(&self) {
        self.cache.write().clear();
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.cache.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content(text: &str) -> PreviewContent {
        PreviewContent {
            text: text.to_string(),
            is_binary: false,
            truncated: false,
            highlighted: None,
        }
    }

    #[test]
    fn evicts_least_recently_used() {
        let cache = PreviewCache::new(2);
        cache.insert(PathBuf::from("a"), content("a"));
        cache.insert(PathBuf::from("b"), content("b"));
        assert!(cache.get(Path::new("a")).is_some());
        cache.insert(PathBuf::from("c"), content("c"));
        assert!(cache.get(Path::new("b")).is_none());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn zero_capacity_falls_back_and_clear_empties() {
        let cache = PreviewCache::new(0);
        cache.insert(PathBuf::from("a"), content("a"));
        cache.insert(PathBuf::from("b"), content("b"));
        assert_eq!(cache.len(), 2);
        cache.clear();
        assert_eq!(cache.len(), 0);
    }
}
