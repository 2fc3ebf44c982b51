/// Log tags identify which subsystem produced a message.
///
/// Every tag has a debug key (used by `--debug-<key>` / `--verbose-<key>`)
/// and a fixed-width console label.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LogTag {
    System,
    Config,
    Connection,
    Transport,
    Router,
    Simulator,
    Throttle,
    Sync,
    Test,
    Other(String),
}

impl LogTag {
    /// Key used by command-line debug flags
    pub fn to_debug_key(&self) -> String {
        match self {
            LogTag::System => "system".to_string(),
            LogTag::Config => "config".to_string(),
            LogTag::Connection => "connection".to_string(),
            LogTag::Transport => "transport".to_string(),
            LogTag::Router => "router".to_string(),
            LogTag::Simulator => "simulator".to_string(),
            LogTag::Throttle => "throttle".to_string(),
            LogTag::Sync => "sync".to_string(),
            LogTag::Test => "test".to_string(),
            LogTag::Other(name) => name.to_lowercase(),
        }
    }

    /// Uncolored label used in plain output
    pub fn to_plain_string(&self) -> String {
        match self {
            LogTag::System => "SYSTEM".to_string(),
            LogTag::Config => "CONFIG".to_string(),
            LogTag::Connection => "CONN".to_string(),
            LogTag::Transport => "TRANSPORT".to_string(),
            LogTag::Router => "ROUTER".to_string(),
            LogTag::Simulator => "SIM".to_string(),
            LogTag::Throttle => "THROTTLE".to_string(),
            LogTag::Sync => "SYNC".to_string(),
            LogTag::Test => "TEST".to_string(),
            LogTag::Other(name) => name.to_uppercase(),
        }
    }

    /// Resolve a tag from its debug key
    pub fn from_debug_key(key: &str) -> LogTag {
        match key.to_lowercase().as_str() {
            "system" => LogTag::System,
            "config" => LogTag::Config,
            "connection" => LogTag::Connection,
            "transport" => LogTag::Transport,
            "router" => LogTag::Router,
            "simulator" => LogTag::Simulator,
            "throttle" => LogTag::Throttle,
            "sync" => LogTag::Sync,
            "test" => LogTag::Test,
            other => LogTag::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for LogTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_plain_string())
    }
}
