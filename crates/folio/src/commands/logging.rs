//! Logging initialization.
//!
//! `serve` logs to stdout. Other commands print their results to stdout, so
//! their logs go to a file in the standard log directory instead.

use folio_core::Config;
use folio_util::log::{self, LogConfig, LogLevel};
use std::path::PathBuf;

/// Initialize logging. Returns the log file path if logging to a file.
pub fn init_logging(config: &Config, verbose: bool, headless: bool) -> Option<PathBuf> {
    let level = if verbose {
        LogLevel::Debug
    } else {
        config.log_level.map(LogLevel::from).unwrap_or_default()
    };

    let file = (!headless).then(log::default_log_path);
    let log_config = LogConfig {
        print: headless,
        level,
        include_location: verbose,
        file: file.clone(),
    };

    match log::init(log_config) {
        Ok(()) => file,
        Err(e) => {
            eprintln!("Warning: Could not open log file: {e}");
            None
        }
    }
}
