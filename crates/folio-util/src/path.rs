//! Platform directories for folio.

use std::path::PathBuf;

/// Fallback directory when the platform gives us nothing.
const FALLBACK_DIR: &str = ".folio";

/// Get the folio configuration directory.
///
/// On Unix, `~/.config/folio` is preferred when it exists (common for CLI
/// tools); otherwise the platform config directory is used.
pub fn config_dir() -> Option<PathBuf> {
    #[cfg(unix)]
    {
        if let Some(home) = dirs::home_dir() {
            let xdg_config = home.join(".config").join("folio");
            if xdg_config.exists() {
                return Some(xdg_config);
            }
        }
    }

    dirs::config_dir().map(|p| p.join("folio"))
}

/// Get the folio data directory (`~/.local/share/folio` on Linux).
pub fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|p| p.join("folio"))
        .unwrap_or_else(|| PathBuf::from(FALLBACK_DIR))
}

/// Default location of the JSON document store.
pub fn default_store_dir() -> PathBuf {
    data_dir().join("data")
}

/// Get the log directory.
///
/// - macOS: `~/Library/Logs/folio`
/// - Linux: `~/.local/state/folio/logs`
/// - elsewhere: the local data directory
pub fn logs_dir() -> PathBuf {
    #[cfg(target_os = "macos")]
    {
        if let Some(home) = dirs::home_dir() {
            return home.join("Library/Logs/folio");
        }
    }

    #[cfg(target_os = "linux")]
    {
        if let Some(state_dir) = dirs::state_dir() {
            return state_dir.join("folio/logs");
        }
    }

    data_dir().join("logs")
}
