/// Connection manager - lifecycle state machine for the upstream link
///
/// The manager performs no I/O. It owns the connection state, the reconnect
/// counter and one deadline per timer (heartbeat, backoff, simulated tick),
/// and answers every input with the `Directive`s the engine must execute.
/// All timing takes `now` as a parameter.
use std::time::Duration;
use tokio::time::Instant;

use super::backoff::BackoffPolicy;
use super::health::{HealthConfig, HeartbeatAction, HeartbeatTracker};
use super::types::{format_sync_time, ConnectionState, ReconnectState, SyncStatus};
use crate::config::SyncConfig;
use crate::errors::TransportError;
use crate::logger::{self, LogTag};

/// Side effects requested by the manager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    /// Start connect attempt `generation`
    Connect { generation: u64 },
    /// Abort the in-flight connect attempt
    CancelAttempt,
    /// Send a heartbeat on the live session
    SendHeartbeat,
    /// Tear down the live session
    CloseSession,
    /// Run one simulated generator tick
    SimulatedTick,
    /// Simulation ended; reset the generator
    StopSimulator,
}

#[derive(Debug, Clone)]
pub struct ConnectionPolicy {
    pub max_attempts: u32,
    pub auto_reconnect: bool,
    pub backoff: BackoffPolicy,
    pub health: HealthConfig,
    pub simulated_tick: Duration,
}

impl ConnectionPolicy {
    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            max_attempts: config.max_reconnect_attempts.max(1),
            auto_reconnect: config.auto_reconnect,
            backoff: BackoffPolicy::from_config(config),
            health: HealthConfig::from_config(config),
            simulated_tick: config.simulated_tick(),
        }
    }
}

impl Default for ConnectionPolicy {
    fn default() -> Self {
        Self::from_config(&SyncConfig::default())
    }
}

#[derive(Debug)]
pub struct ConnectionManager {
    policy: ConnectionPolicy,
    state: ConnectionState,
    reconnect: ReconnectState,

    /// Bumped for every connect attempt; a session inherits its attempt's number
    generation: u64,
    pending_attempt: Option<u64>,
    live_session: Option<u64>,

    heartbeat: Option<HeartbeatTracker>,
    backoff_deadline: Option<Instant>,
    simulated_deadline: Option<Instant>,
}

impl ConnectionManager {
    pub fn new(policy: ConnectionPolicy) -> Self {
        Self {
            policy,
            state: ConnectionState::Connecting,
            reconnect: ReconnectState::default(),
            generation: 0,
            pending_attempt: None,
            live_session: None,
            heartbeat: None,
            backoff_deadline: None,
            simulated_deadline: None,
        }
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn reconnect_count(&self) -> u32 {
        self.reconnect.attempts
    }

    pub fn last_sync_time(&self) -> Option<&str> {
        self.reconnect.last_sync_time.as_deref()
    }

    pub fn status(&self) -> SyncStatus {
        SyncStatus {
            state: self.state,
            reconnect_count: self.reconnect.attempts,
            last_sync_time: self.reconnect.last_sync_time.clone(),
        }
    }

    /// Generation of the in-flight connect attempt, if any
    pub fn pending_attempt(&self) -> Option<u64> {
        self.pending_attempt
    }

    /// Generation of the live session, if any
    pub fn live_session(&self) -> Option<u64> {
        self.live_session
    }

    pub fn is_current_session(&self, generation: u64) -> bool {
        self.live_session == Some(generation)
    }

    /// Earliest armed timer
    pub fn next_deadline(&self) -> Option<Instant> {
        let heartbeat = match self.state {
            ConnectionState::Connected => self.heartbeat.as_ref().map(|h| h.deadline()),
            _ => None,
        };
        [heartbeat, self.backoff_deadline, self.simulated_deadline]
            .into_iter()
            .flatten()
            .min()
    }

    // ------------------------------------------------------------------------
    // Inputs
    // ------------------------------------------------------------------------

    /// Open the first connection
    pub fn start(&mut self) -> Vec<Directive> {
        vec![self.begin_attempt()]
    }

    /// Connect attempt `generation` produced a session.
    ///
    /// Returns false for a superseded attempt; the caller must close that
    /// session instead of using it.
    pub fn on_connected(&mut self, generation: u64, now: Instant) -> bool {
        if self.pending_attempt != Some(generation) {
            return false;
        }

        self.pending_attempt = None;
        self.live_session = Some(generation);
        self.state = ConnectionState::Connected;
        self.reconnect.attempts = 0;
        self.touch_sync_time();
        self.heartbeat = Some(HeartbeatTracker::new(self.policy.health, now));

        logger::info(
            LogTag::Connection,
            &format!("Connected (attempt generation {})", generation),
        );
        true
    }

    /// Connect attempt `generation` failed. Stale failures are ignored.
    pub fn on_connect_failed(
        &mut self,
        generation: u64,
        error: &TransportError,
        now: Instant,
    ) -> Vec<Directive> {
        if self.pending_attempt != Some(generation) {
            return Vec::new();
        }
        self.pending_attempt = None;

        if error.is_fatal() {
            logger::error(
                LogTag::Connection,
                &format!("Connect failed permanently: {}", error),
            );
            self.state = ConnectionState::Disconnected;
            return Vec::new();
        }

        logger::warning(LogTag::Connection, &format!("Connect failed: {}", error));
        self.enter_reconnecting(now)
    }

    /// The live session closed or errored
    pub fn on_session_closed(&mut self, generation: u64, now: Instant) -> Vec<Directive> {
        if !self.is_current_session(generation) {
            return Vec::new();
        }

        logger::warning(LogTag::Connection, "Live session closed by upstream");
        self.live_session = None;
        self.heartbeat = None;
        self.enter_reconnecting(now)
    }

    /// A heartbeat_ack arrived on the live session
    pub fn on_heartbeat_ack(&mut self, generation: u64, now: Instant) {
        if !self.is_current_session(generation) {
            return;
        }
        if let Some(tracker) = self.heartbeat.as_mut() {
            tracker.record_ack(now);
        }
        self.touch_sync_time();
    }

    /// Fire every timer whose deadline has passed
    pub fn poll_timers(&mut self, now: Instant) -> Vec<Directive> {
        let mut directives = Vec::new();

        let heartbeat_action = match self.heartbeat.as_mut() {
            Some(tracker) if self.state == ConnectionState::Connected && tracker.deadline() <= now => {
                Some((tracker.on_due(now), tracker.since_last_ack(now)))
            }
            _ => None,
        };
        match heartbeat_action {
            Some((HeartbeatAction::Send, _)) => directives.push(Directive::SendHeartbeat),
            Some((HeartbeatAction::Expired, since_ack)) => {
                let last_ack = match since_ack {
                    Some(elapsed) => format!("last ack {}ms ago", elapsed.as_millis()),
                    None => "no ack received".to_string(),
                };
                logger::warning(
                    LogTag::Connection,
                    &format!(
                        "Heartbeat acknowledgments missed, link considered dead ({})",
                        last_ack
                    ),
                );
                self.live_session = None;
                self.heartbeat = None;
                directives.push(Directive::CloseSession);
                directives.extend(self.enter_reconnecting(now));
            }
            None => {}
        }

        if self.backoff_deadline.map_or(false, |d| d <= now) {
            self.backoff_deadline = None;
            directives.push(self.begin_attempt());
        }

        if self.state == ConnectionState::Simulated
            && self.simulated_deadline.map_or(false, |d| d <= now)
        {
            self.simulated_deadline = Some(now + self.policy.simulated_tick);
            directives.push(Directive::SimulatedTick);
        }

        directives
    }

    /// User-requested reconnect; valid from any state
    pub fn manual_reconnect(&mut self) -> Vec<Directive> {
        self.reconnect.attempts = 0;

        if self.state == ConnectionState::Connecting && self.pending_attempt.is_some() {
            logger::debug(
                LogTag::Connection,
                "Manual reconnect while an attempt is in flight, counter reset only",
            );
            return Vec::new();
        }

        logger::info(
            LogTag::Connection,
            &format!("Manual reconnect requested (was {})", self.state),
        );

        let mut directives = self.cancel_all();
        directives.push(self.begin_attempt());
        directives
    }

    /// User-requested disconnect; nothing runs until a manual reconnect
    pub fn disconnect(&mut self) -> Vec<Directive> {
        let directives = self.cancel_all();
        self.state = ConnectionState::Disconnected;
        logger::info(LogTag::Connection, "Disconnected on request");
        directives
    }

    // ------------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------------

    fn begin_attempt(&mut self) -> Directive {
        self.generation += 1;
        self.pending_attempt = Some(self.generation);
        self.state = ConnectionState::Connecting;

        logger::debug(
            LogTag::Connection,
            &format!(
                "Connect attempt generation {} (failures so far: {})",
                self.generation, self.reconnect.attempts
            ),
        );
        Directive::Connect {
            generation: self.generation,
        }
    }

    fn enter_reconnecting(&mut self, now: Instant) -> Vec<Directive> {
        self.state = ConnectionState::Reconnecting;
        self.reconnect.attempts = (self.reconnect.attempts + 1).min(self.policy.max_attempts);

        if !self.policy.auto_reconnect || self.reconnect.attempts >= self.policy.max_attempts {
            return self.enter_simulated(now);
        }

        let delay = self.policy.backoff.delay(self.reconnect.attempts);
        self.backoff_deadline = Some(now + delay);

        logger::info(
            LogTag::Connection,
            &format!(
                "Reconnecting in {}ms (attempt {}/{})",
                delay.as_millis(),
                self.reconnect.attempts,
                self.policy.max_attempts
            ),
        );
        Vec::new()
    }

    fn enter_simulated(&mut self, now: Instant) -> Vec<Directive> {
        logger::warning(
            LogTag::Connection,
            &format!(
                "Live link unavailable after {} attempt(s), switching to simulated data",
                self.reconnect.attempts
            ),
        );
        self.state = ConnectionState::Simulated;
        self.backoff_deadline = None;
        self.simulated_deadline = Some(now);
        Vec::new()
    }

    /// Cancel the attempt, the session and every timer
    fn cancel_all(&mut self) -> Vec<Directive> {
        let mut directives = Vec::new();

        if self.pending_attempt.take().is_some() {
            directives.push(Directive::CancelAttempt);
        }
        if self.live_session.take().is_some() {
            directives.push(Directive::CloseSession);
        }
        if self.simulated_deadline.take().is_some() {
            directives.push(Directive::StopSimulator);
        }
        self.heartbeat = None;
        self.backoff_deadline = None;

        directives
    }

    fn touch_sync_time(&mut self) {
        self.reconnect.last_sync_time = Some(format_sync_time(chrono::Local::now()));
    }
}
