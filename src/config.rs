//! User preferences persisted across runs.
//!
//! This is the only state that survives a restart. Every field is optional
//! on disk so old or hand-edited files keep loading.

use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::{Path, PathBuf},
};

use crate::error::ConfigError;
use crate::layout::{DEFAULT_SPLIT_RATIO, clamp_ratio};
use crate::theme::Theme;

const APP_DIR: &str = "stagepane";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub wrap: bool,
    pub mouse: bool,
    pub auto_tab: bool,
    pub split_ratio: f64,
    pub flat_view: bool,
    pub tree_view: bool,
    pub theme: Theme,
    pub follow_file: Option<PathBuf>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            wrap: false,
            mouse: true,
            auto_tab: false,
            split_ratio: DEFAULT_SPLIT_RATIO,
            flat_view: false,
            tree_view: false,
            theme: Theme::default(),
            follow_file: None,
        }
    }
}

impl Preferences {
    /// Reads `path`; a missing file is not an error.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let data = match fs::read_to_string(path) {
            Ok(d) => d,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        let mut prefs: Preferences = serde_json::from_str(&data).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        prefs.split_ratio = clamp_ratio(prefs.split_ratio);
        Ok(prefs)
    }

    /// Loads from the default location, falling back to defaults on any error.
    pub fn load() -> Self {
        let Some(path) = preferences_path() else {
            log::warn!("{}", ConfigError::NoHome);
            return Self::default();
        };
        match Self::load_from(&path) {
            Ok(p) => p,
            Err(e) => {
                log::warn!("using default preferences: {e}");
                Self::default()
            }
        }
    }

    /// Writes atomically through a sibling temp file.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        let content = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let tmp = path.with_extension("tmp");
        if let Err(e) = fs::write(&tmp, content).and_then(|_| fs::rename(&tmp, path)) {
            let _ = fs::remove_file(&tmp);
            return Err(io_err(e));
        }
        Ok(())
    }
}

fn xdg_dir(var: &str, fallback: &[&str]) -> Option<PathBuf> {
    if let Some(base) = env::var_os(var).filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(base));
    }
    let mut home = env::home_dir()?;
    home.extend(fallback);
    Some(home)
}

pub fn preferences_path() -> Option<PathBuf> {
    xdg_dir("XDG_CONFIG_HOME", &[".config"]).map(|d| d.join(APP_DIR).join("config.json"))
}

pub fn state_dir() -> Option<PathBuf> {
    xdg_dir("XDG_STATE_HOME", &[".local", "state"]).map(|d| d.join(APP_DIR))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let prefs = Preferences::load_from(&dir.path().join("nope.json")).unwrap();
        assert_eq!(prefs, Preferences::default());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"wrap": true, "theme": "nord", "split_ratio": 5.0}"#).unwrap();
        let prefs = Preferences::load_from(&path).unwrap();
        assert!(prefs.wrap);
        assert!(prefs.mouse);
        assert_eq!(prefs.theme, Theme::Nord);
        assert_eq!(prefs.split_ratio, crate::layout::MAX_SPLIT_RATIO);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            Preferences::load_from(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let prefs = Preferences {
            tree_view: true,
            follow_file: Some(PathBuf::from("/tmp/marker")),
            ..Preferences::default()
        };
        prefs.save_to(&path).unwrap();
        assert_eq!(Preferences::load_from(&path).unwrap(), prefs);
        assert!(!path.with_extension("tmp").exists());
    }
}
