/// Heartbeat liveness tracking for the live link
///
/// A heartbeat goes out every interval. Each time the interval elapses with the
/// previous heartbeat still unacknowledged it counts as missed; reaching the
/// missed limit declares the link dead.
use std::time::Duration;
use tokio::time::Instant;

use crate::config::SyncConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthConfig {
    pub heartbeat_interval: Duration,
    pub missed_limit: u32,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(10),
            missed_limit: 2,
        }
    }
}

impl HealthConfig {
    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            heartbeat_interval: config.heartbeat_interval(),
            missed_limit: config.missed_heartbeat_limit.max(1),
        }
    }
}

/// What to do when the heartbeat deadline passes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatAction {
    Send,
    Expired,
}

#[derive(Debug, Clone)]
pub struct HeartbeatTracker {
    config: HealthConfig,
    next_beat: Instant,
    awaiting_ack: bool,
    missed: u32,
    last_ack: Option<Instant>,
}

impl HeartbeatTracker {
    /// Start tracking a freshly opened link
    pub fn new(config: HealthConfig, now: Instant) -> Self {
        Self {
            config,
            next_beat: now + config.heartbeat_interval,
            awaiting_ack: false,
            missed: 0,
            last_ack: None,
        }
    }

    pub fn deadline(&self) -> Instant {
        self.next_beat
    }

    pub fn record_ack(&mut self, now: Instant) {
        self.awaiting_ack = false;
        self.missed = 0;
        self.last_ack = Some(now);
    }

    /// Called when `deadline()` has passed
    pub fn on_due(&mut self, now: Instant) -> HeartbeatAction {
        if self.awaiting_ack {
            self.missed += 1;
        }
        if self.missed >= self.config.missed_limit {
            return HeartbeatAction::Expired;
        }
        self.awaiting_ack = true;
        self.next_beat = now + self.config.heartbeat_interval;
        HeartbeatAction::Send
    }

    pub fn missed(&self) -> u32 {
        self.missed
    }

    pub fn since_last_ack(&self, now: Instant) -> Option<Duration> {
        self.last_ack.map(|at| now.saturating_duration_since(at))
    }
}
