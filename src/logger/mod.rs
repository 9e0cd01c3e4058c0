//! Structured logging for nft-inventory
//!
//! Tagged, levelled logging with per-tag debug control:
//! - Standard log levels (Error/Warning/Info/Debug/Verbose)
//! - Per-tag debug control via `--debug-<tag>` flags or `logging.debug_tags`
//! - Colored console output plus optional file persistence
//!
//! ## Usage
//!
//! ```rust
//! use nft_inventory::logger::{self, LogTag};
//!
//! logger::info(LogTag::Sync, "Wallet synchronized");
//! logger::debug(LogTag::Cache, "Cache row loaded"); // Only with --debug-cache
//! ```

mod config;
mod core;
mod file;
mod format;
mod levels;
mod tags;

pub use config::{
    config_from_args, get_logger_config, init_from_args, set_logger_config, LoggerConfig,
};
pub use levels::LogLevel;
pub use tags::LogTag;

use std::path::Path;

/// Initialize the logger from command-line flags
pub fn init() {
    config::init_from_args();
}

/// Mirror log output into a file
pub fn init_file(path: &Path) -> std::io::Result<()> {
    file::init_file_logging(path)
}

/// Log at ERROR level (always shown)
pub fn error(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Error, message);
}

/// Log at WARNING level
pub fn warning(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Warning, message);
}

/// Log at INFO level
pub fn info(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Info, message);
}

/// Log at DEBUG level, only shown when debug is enabled for `tag`
pub fn debug(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Debug, message);
}

/// Log at VERBOSE level, only shown with `--verbose`
pub fn verbose(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Verbose, message);
}

/// Force flush pending file writes
pub fn flush() {
    file::flush_file_logging();
}
