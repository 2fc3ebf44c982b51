/// Error types for clusterwatch
///
/// None of these cross the `TelemetrySync` facade: transport errors drive the
/// reconnect state machine, decode errors are counted and dropped, config
/// errors stop the binary before the engine starts.
use thiserror::Error;

// =============================================================================
// TRANSPORT ERRORS
// =============================================================================

#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("invalid endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("connection to {endpoint} timed out after {timeout_ms}ms")]
    ConnectTimeout { endpoint: String, timeout_ms: u64 },

    #[error("connection to {endpoint} failed: {reason}")]
    ConnectFailed { endpoint: String, reason: String },

    #[error("connection closed: {reason}")]
    Closed { reason: String },

    #[error("send failed: {reason}")]
    SendFailed { reason: String },

    #[error("protocol error: {reason}")]
    Protocol { reason: String },
}

impl TransportError {
    /// Fatal errors are not retried; the connection goes to `disconnected`
    pub fn is_fatal(&self) -> bool {
        matches!(self, TransportError::InvalidEndpoint { .. })
    }
}

// =============================================================================
// DECODE ERRORS
// =============================================================================

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("unknown message type '{0}'")]
    UnknownType(String),
}

// =============================================================================
// CONFIG ERRORS
// =============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("failed to write config file '{path}': {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}
