//! Bridge from the `log` facade into the tagged logger.
//!
//! Dependencies such as `tungstenite` emit records through `log`; those are
//! routed under `LogTag::Transport` so they obey the same `--debug-transport`
//! and `--verbose-transport` switches as our own messages.

use super::core::log_internal;
use super::levels::LogLevel;
use super::tags::LogTag;

struct LogBridge;

static BRIDGE: LogBridge = LogBridge;

impl log::Log for LogBridge {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        super::core::should_log(&tag_for_target(metadata.target()), metadata.level().into())
    }

    fn log(&self, record: &log::Record) {
        let level: LogLevel = record.level().into();
        let tag = tag_for_target(record.target());
        log_internal(tag, level, &format!("{}", record.args()));
    }

    fn flush(&self) {}
}

fn tag_for_target(target: &str) -> LogTag {
    if target.starts_with("clusterwatch") {
        LogTag::Sync
    } else {
        LogTag::Transport
    }
}

/// Install the bridge as the global `log` logger. Safe to call more than once.
pub fn install() {
    if log::set_logger(&BRIDGE).is_ok() {
        log::set_max_level(log::LevelFilter::Trace);
    }
}
