use crate::config_struct;
use crate::errors::ConfigError;
use std::time::Duration;

/// Floor for every engine timer; a zero period would panic the publish ticker
/// or re-arm a deadline in the past forever
const MIN_TIMER_MS: u64 = 1;

// ============================================================================
// SYNC ENGINE CONFIGURATION
// ============================================================================

config_struct! {
    /// Connection lifecycle, retry and publication timing
    pub struct SyncConfig {
        /// Upstream telemetry WebSocket endpoint
        endpoint: String = "ws://127.0.0.1:8080/ws/telemetry".to_string(),

        /// Reconnect attempts before falling back to simulated data
        max_reconnect_attempts: u32 = 10,

        /// When false, the first failure hands off to simulated data
        auto_reconnect: bool = true,

        /// First backoff delay
        backoff_base_ms: u64 = 1_000,

        /// Backoff ceiling
        backoff_max_ms: u64 = 30_000,

        /// Growth factor between attempts
        backoff_multiplier: f64 = 2.0,

        /// Upper bound for a single connect attempt
        connect_timeout_ms: u64 = 5_000,

        /// Heartbeat send interval while connected
        heartbeat_interval_ms: u64 = 10_000,

        /// Consecutive unacknowledged heartbeats before the link is declared dead
        missed_heartbeat_limit: u32 = 2,

        /// Throttle window for snapshot publication
        publish_interval_ms: u64 = 100,

        /// Simulated generator tick
        simulated_tick_ms: u64 = 2_000,

        /// Maximum retained throughput history points
        max_history_points: usize = 200,

        /// Inbound frame queue between the socket pump and the owner task
        event_queue_capacity: usize = 1_024,
    }
}

impl SyncConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms.max(MIN_TIMER_MS))
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms.max(MIN_TIMER_MS))
    }

    pub fn publish_interval(&self) -> Duration {
        Duration::from_millis(self.publish_interval_ms.max(MIN_TIMER_MS))
    }

    pub fn simulated_tick(&self) -> Duration {
        Duration::from_millis(self.simulated_tick_ms.max(MIN_TIMER_MS))
    }

    /// Reject values that would stall or spin the engine
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive_ms = [
            ("sync.backoff_base_ms", self.backoff_base_ms),
            ("sync.backoff_max_ms", self.backoff_max_ms),
            ("sync.connect_timeout_ms", self.connect_timeout_ms),
            ("sync.heartbeat_interval_ms", self.heartbeat_interval_ms),
            ("sync.publish_interval_ms", self.publish_interval_ms),
            ("sync.simulated_tick_ms", self.simulated_tick_ms),
        ];
        for (field, value) in positive_ms {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "must be greater than zero".to_string(),
                });
            }
        }

        if self.max_reconnect_attempts == 0 {
            return Err(ConfigError::Invalid {
                field: "sync.max_reconnect_attempts",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.missed_heartbeat_limit == 0 {
            return Err(ConfigError::Invalid {
                field: "sync.missed_heartbeat_limit",
                reason: "must be at least 1".to_string(),
            });
        }
        if !(self.backoff_multiplier >= 1.0) {
            return Err(ConfigError::Invalid {
                field: "sync.backoff_multiplier",
                reason: format!("{} is below 1.0", self.backoff_multiplier),
            });
        }
        if self.backoff_max_ms < self.backoff_base_ms {
            return Err(ConfigError::Invalid {
                field: "sync.backoff_max_ms",
                reason: format!(
                    "{} is below backoff_base_ms ({})",
                    self.backoff_max_ms, self.backoff_base_ms
                ),
            });
        }
        if self.max_history_points == 0 || self.event_queue_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "sync.max_history_points",
                reason: "history and queue sizes must be non-zero".to_string(),
            });
        }

        Ok(())
    }
}

// ============================================================================
// SIMULATOR CONFIGURATION
// ============================================================================

config_struct! {
    /// Synthetic telemetry used while the live link is unavailable
    pub struct SimulatorConfig {
        /// Fixed seed for reproducible output (entropy when unset)
        seed: Option<u64> = None,

        /// Number of simulated GPU nodes
        node_count: usize = 8,

        /// Chance per tick of emitting an alert
        alert_probability: f64 = 0.05,

        /// Points kept in the simulated throughput window
        history_points: usize = 60,
    }
}

impl SimulatorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.alert_probability) {
            return Err(ConfigError::Invalid {
                field: "simulator.alert_probability",
                reason: format!("{} is outside 0.0..=1.0", self.alert_probability),
            });
        }
        if self.node_count == 0 || self.history_points == 0 {
            return Err(ConfigError::Invalid {
                field: "simulator.node_count",
                reason: "node_count and history_points must be non-zero".to_string(),
            });
        }
        Ok(())
    }
}

// ============================================================================
// LOGGING CONFIGURATION
// ============================================================================

config_struct! {
    /// Logging defaults merged with command-line flags at startup
    pub struct LoggingConfig {
        /// Tags with debug output enabled by default
        debug_tags: Vec<String> = Vec::new(),

        /// Plain (uncolored) output
        plain: bool = false,
    }
}

// ============================================================================
// ROOT CONFIGURATION
// ============================================================================

config_struct! {
    /// Root configuration structure containing all sub-configurations
    pub struct Config {
        /// Sync engine configuration
        sync: SyncConfig = SyncConfig::default(),

        /// Simulator configuration
        simulator: SimulatorConfig = SimulatorConfig::default(),

        /// Logging configuration
        logging: LoggingConfig = LoggingConfig::default(),
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.sync.validate()?;
        self.simulator.validate()
    }
}
