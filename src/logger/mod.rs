//! Structured console logging for clusterwatch
//!
//! - Standard levels (Error/Warning/Info/Debug/Verbose)
//! - Per-subsystem debug control via `--debug-<tag>` flags
//! - `log` crate records from dependencies routed through the same output
//!
//! ## Usage
//!
//! ```rust
//! use clusterwatch::logger::{self, LogTag};
//!
//! logger::info(LogTag::Connection, "Connected to upstream");
//! logger::debug(LogTag::Router, "Applied node_status"); // Only if --debug-router
//! ```

mod bridge;
mod config;
mod core;
mod format;
mod levels;
mod tags;

pub use config::{
    config_from_args, get_logger_config, init_from_args, set_logger_config, update_logger_config,
    LoggerConfig,
};
pub use levels::LogLevel;
pub use tags::LogTag;

/// Initialize the logger system
///
/// Parses command-line debug flags and installs the `log` bridge.
/// Call once in main before starting the engine.
pub fn init() {
    config::init_from_args();
    bridge::install();
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

/// Log at DEBUG level (only with --debug-<tag>)
pub fn debug(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Debug, message);
}

/// Log at VERBOSE level (only with --verbose or --verbose-<tag>)
pub fn verbose(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Verbose, message);
}

/// Whether a DEBUG message for `tag` would be shown.
///
/// Use to skip building expensive messages.
pub fn is_debug_enabled(tag: &LogTag) -> bool {
    core::should_log(tag, LogLevel::Debug)
}
