/// Core logging implementation with automatic filtering
use super::config::{get_logger_config, LoggerConfig};
use super::levels::LogLevel;
use super::tags::LogTag;

/// Check if a log message should be displayed
///
/// Filtering rules:
/// 1. Errors are always shown
/// 2. Levels above the minimum threshold are dropped
/// 3. Debug requires --debug-<tag> (or --verbose)
/// 4. Verbose requires --verbose or --verbose-<tag>
/// 5. If enabled_tags is non-empty, tag must be in the set
pub fn should_log(tag: &LogTag, level: LogLevel) -> bool {
    should_log_with(&get_logger_config(), tag, level)
}

pub(crate) fn should_log_with(config: &LoggerConfig, tag: &LogTag, level: LogLevel) -> bool {
    if level == LogLevel::Error {
        return true;
    }

    let key = tag.to_debug_key();

    match level {
        LogLevel::Debug => {
            if config.min_level < LogLevel::Info {
                return false;
            }
            if config.min_level != LogLevel::Verbose && !config.debug_tags.contains(&key) {
                return false;
            }
        }
        LogLevel::Verbose => {
            if config.min_level != LogLevel::Verbose && !config.verbose_tags.contains(&key) {
                return false;
            }
        }
        _ => {
            if level > config.min_level {
                return false;
            }
        }
    }

    config.enabled_tags.is_empty() || config.enabled_tags.contains(&key)
}

/// Internal logging entry point
pub fn log_internal(tag: LogTag, level: LogLevel, message: &str) {
    if !should_log(&tag, level) {
        return;
    }

    super::format::format_and_log(&tag, level, message);
}
