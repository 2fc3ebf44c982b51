/// Logger configuration and command-line flag parsing
///
/// Recognized flags:
/// - `--debug-<tag>`   enable DEBUG output for one tag
/// - `--verbose`       enable VERBOSE output for every tag
/// - `--verbose-<tag>` enable VERBOSE output for one tag
/// - `--quiet`         only show errors
use once_cell::sync::Lazy;
use std::collections::HashSet;
use std::sync::RwLock;

use super::levels::LogLevel;
use super::tags::LogTag;
use crate::arguments::get_cmd_args;

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// Minimum level shown (Debug/Verbose still need per-tag flags)
    pub min_level: LogLevel,

    /// Tags with DEBUG output enabled
    pub debug_tags: HashSet<String>,

    /// Tags with VERBOSE output enabled
    pub verbose_tags: HashSet<String>,

    /// If non-empty, only these tags are shown (errors always pass)
    pub enabled_tags: HashSet<String>,

    /// Disable ANSI colors (piped output, tests)
    pub plain: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            min_level: LogLevel::Info,
            debug_tags: HashSet::new(),
            verbose_tags: HashSet::new(),
            enabled_tags: HashSet::new(),
            plain: false,
        }
    }
}

static LOGGER_CONFIG: Lazy<RwLock<LoggerConfig>> =
    Lazy::new(|| RwLock::new(LoggerConfig::default()));

/// Get a copy of the current logger configuration
pub fn get_logger_config() -> LoggerConfig {
    match LOGGER_CONFIG.read() {
        Ok(cfg) => cfg.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    }
}

/// Replace the logger configuration
pub fn set_logger_config(config: LoggerConfig) {
    match LOGGER_CONFIG.write() {
        Ok(mut cfg) => *cfg = config,
        Err(poisoned) => *poisoned.into_inner() = config,
    }
}

/// Modify the logger configuration in place
pub fn update_logger_config<F>(f: F)
where
    F: FnOnce(&mut LoggerConfig),
{
    match LOGGER_CONFIG.write() {
        Ok(mut cfg) => f(&mut cfg),
        Err(poisoned) => f(&mut poisoned.into_inner()),
    }
}

/// Build a configuration from an explicit argument list
pub fn config_from_args(args: &[String]) -> LoggerConfig {
    let mut config = LoggerConfig::default();

    for arg in args {
        if arg == "--quiet" {
            config.min_level = LogLevel::Error;
        } else if arg == "--verbose" {
            config.min_level = LogLevel::Verbose;
        } else if arg == "--no-color" {
            config.plain = true;
        } else if let Some(tag) = arg.strip_prefix("--debug-") {
            config.debug_tags.insert(tag.to_lowercase());
        } else if let Some(tag) = arg.strip_prefix("--verbose-") {
            config.verbose_tags.insert(tag.to_lowercase());
            // Verbose for a tag implies debug for it
            config.debug_tags.insert(tag.to_lowercase());
        } else if let Some(tags) = arg.strip_prefix("--log-tags=") {
            config.enabled_tags = tags
                .split(',')
                .map(|t| t.trim().to_lowercase())
                .filter(|t| !t.is_empty())
                .collect();
        }
    }

    // --quiet wins over --verbose when both are given
    if args.iter().any(|a| a == "--quiet") {
        config.min_level = LogLevel::Error;
    }

    config
}

/// Initialize configuration from the process command line
pub fn init_from_args() {
    set_logger_config(config_from_args(&get_cmd_args()));
}

pub fn is_debug_enabled_for_tag(tag: &LogTag) -> bool {
    let config = get_logger_config();
    config.min_level == LogLevel::Verbose || config.debug_tags.contains(&tag.to_debug_key())
}

pub fn is_verbose_enabled_for_tag(tag: &LogTag) -> bool {
    get_logger_config()
        .verbose_tags
        .contains(&tag.to_debug_key())
}
