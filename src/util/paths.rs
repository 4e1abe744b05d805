//! Path utilities for keymux data directories

use std::path::PathBuf;
use std::sync::OnceLock;

/// Global storage for custom data directory path
static DATA_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Initialize the data directory with an optional custom path.
/// Must be called early in main() before any other path functions are used.
/// If custom_path is None, the `KEYMUX_DATA_DIR` environment variable is
/// consulted before falling back to the default ~/.keymux location.
pub fn init_data_dir(custom_path: Option<PathBuf>) {
    let path = custom_path
        .or_else(|| std::env::var_os("KEYMUX_DATA_DIR").map(PathBuf::from))
        .unwrap_or_else(default_data_dir);
    if DATA_DIR.set(path.clone()).is_err() {
        let existing = DATA_DIR
            .get()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<unknown>".to_string());
        tracing::debug!(
            path = %path.display(),
            existing = %existing,
            "Data directory already initialized"
        );
    }
}

/// Get the default data directory path (~/.keymux)
fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".keymux"))
        .unwrap_or_else(|| PathBuf::from(".keymux"))
}

/// Get the base keymux data directory.
/// Returns the custom path if set via init_data_dir(), otherwise ~/.keymux
pub fn data_dir() -> PathBuf {
    DATA_DIR.get().cloned().unwrap_or_else(default_data_dir)
}

/// Get the database file path (~/.keymux/keymux.db)
pub fn database_path() -> PathBuf {
    data_dir().join("keymux.db")
}

/// Get the logs directory (~/.keymux/logs)
pub fn logs_dir() -> PathBuf {
    data_dir().join("logs")
}

/// Get the default log file path (~/.keymux/logs/keymux.log)
pub fn log_file_path() -> PathBuf {
    logs_dir().join("keymux.log")
}

/// Get the managed worktree root (~/.keymux/worktrees)
pub fn worktrees_dir() -> PathBuf {
    data_dir().join("worktrees")
}

/// Get the config file path (~/.keymux/config.toml)
pub fn config_path() -> PathBuf {
    data_dir().join("config.toml")
}
