//! Process-wide `tracing` setup for the `braid` binary.
//!
//! Events go to `$XDG_STATE_HOME/braid/braid.log` (appended across runs). Worker
//! threads are named `braid-range-<i>`, so thread names are included to tell
//! ranges apart. `RUST_LOG` overrides [`DEFAULT_FILTER`].

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "info,braid=debug,braid_core=debug";

const LOG_FILE: &str = "braid.log";

fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Location of the log file, creating its directory if needed.
pub fn log_file_path() -> Result<PathBuf> {
    let dirs = xdg::BaseDirectories::with_prefix("braid")?;
    dirs.place_state_file(LOG_FILE)
        .context("cannot create braid state directory")
}

/// Log to the state file. Returns the file's path.
///
/// Fails if the state directory or file is unusable or a global subscriber is
/// already installed; the caller then falls back to [`init_logging_stderr`].
pub fn init_logging() -> Result<PathBuf> {
    let path = log_file_path()?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("cannot open log file {}", path.display()))?;

    // `&File` is `Write`, so every event writes through the one shared handle.
    tracing_subscriber::fmt()
        .with_env_filter(filter())
        .with_writer(Arc::new(file))
        .with_thread_names(true)
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow!("cannot install log subscriber: {}", e))?;

    tracing::info!(path = %path.display(), "braid logging started");
    Ok(path)
}

/// Log to stderr instead. A no-op if a subscriber is already installed.
pub fn init_logging_stderr() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter())
        .with_writer(std::io::stderr)
        .with_thread_names(true)
        .with_ansi(false)
        .try_init();
}
