//! Log formatting and console output
//!
//! Lines look like:
//! `12:04:31 [CONN      ] [WARNING ] Connect attempt 3 failed: timed out`

use super::config::get_logger_config;
use super::levels::LogLevel;
use super::tags::LogTag;
use chrono::Local;
use colored::*;
use std::io::{stderr, stdout, ErrorKind, Write};

const TAG_WIDTH: usize = 10;
const LEVEL_WIDTH: usize = 8;

/// Format and output a log message
pub fn format_and_log(tag: &LogTag, level: LogLevel, message: &str) {
    let time = Local::now().format("%H:%M:%S").to_string();
    let line = if get_logger_config().plain {
        format_plain(&time, tag, level, message)
    } else {
        format!(
            "{} [{}] [{}] {}",
            time.dimmed(),
            format_tag(tag),
            format_level(level),
            message
        )
    };

    if level == LogLevel::Error {
        let _ = writeln!(stderr(), "{}", line);
    } else {
        print_stdout_safe(&line);
    }
}

pub(crate) fn format_plain(time: &str, tag: &LogTag, level: LogLevel, message: &str) -> String {
    format!(
        "{} [{:<tag_w$}] [{:<lvl_w$}] {}",
        time,
        tag.to_plain_string(),
        level.as_str(),
        message,
        tag_w = TAG_WIDTH,
        lvl_w = LEVEL_WIDTH
    )
}

fn format_tag(tag: &LogTag) -> ColoredString {
    let label = format!("{:<width$}", tag.to_plain_string(), width = TAG_WIDTH);
    match tag {
        LogTag::System => label.bright_yellow().bold(),
        LogTag::Config => label.bright_white().bold(),
        LogTag::Connection => label.bright_cyan().bold(),
        LogTag::Transport => label.bright_blue().bold(),
        LogTag::Router => label.bright_green().bold(),
        LogTag::Simulator => label.bright_magenta().bold(),
        LogTag::Throttle => label.bright_purple().bold(),
        LogTag::Sync => label.bright_green().bold(),
        LogTag::Test => label.bright_blue().bold(),
        LogTag::Other(_) => label.white().bold(),
    }
}

fn format_level(level: LogLevel) -> ColoredString {
    let label = format!("{:<width$}", level.as_str(), width = LEVEL_WIDTH);
    match level {
        LogLevel::Error => label.bright_red().bold(),
        LogLevel::Warning => label.bright_yellow().bold(),
        LogLevel::Info => label.white().bold(),
        LogLevel::Debug | LogLevel::Verbose => label.dimmed(),
    }
}

/// Print to stdout but ignore broken pipe errors
fn print_stdout_safe(message: &str) {
    if let Err(e) = writeln!(stdout(), "{}", message) {
        if e.kind() == ErrorKind::BrokenPipe {
            std::process::exit(0);
        }
        let _ = writeln!(stderr(), "Logger stdout error: {}", e);
    }
    if let Err(e) = stdout().flush() {
        if e.kind() == ErrorKind::BrokenPipe {
            std::process::exit(0);
        }
    }
}
