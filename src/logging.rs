//! File-backed `env_logger` setup.
//!
//! The terminal is in raw mode on the alternate screen for the whole run, so
//! records go to `$XDG_STATE_HOME/stagepane/stagepane.log` instead of stderr.

use std::fs::{self, OpenOptions};
use std::path::PathBuf;

use env_logger::{Builder, Env, Target};

use crate::config::state_dir;

pub const LOG_ENV: &str = "STAGEPANE_LOG";

/// Installs the global logger. Returns the log file path when one could be
/// opened; otherwise logging is disabled.
pub fn init() -> Option<PathBuf> {
    let env = Env::new().filter_or(LOG_ENV, "warn");
    let mut builder = Builder::from_env(env);
    builder.format_timestamp_millis();

    let path = state_dir().map(|d| d.join("stagepane.log"));
    let file = path.as_ref().and_then(|p| {
        fs::create_dir_all(p.parent()?).ok()?;
        OpenOptions::new().create(true).append(true).open(p).ok()
    });

    match file {
        Some(file) => {
            builder.target(Target::Pipe(Box::new(file)));
            let _ = builder.try_init();
            path
        }
        None => {
            builder.filter_level(log::LevelFilter::Off);
            let _ = builder.try_init();
            None
        }
    }
}
