/// Engine metrics collection
///
/// Counters are shared between the owner task and the facade, so reads never
/// go through the engine's command channel.
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::throttle::ThrottleStats;

// ============================================================================
// ENGINE METRICS
// ============================================================================

#[derive(Debug, Default)]
pub struct EngineMetrics {
    /// Messages applied to the snapshot (live + simulated)
    messages_applied: AtomicU64,

    /// Frames dropped as malformed or of unknown type
    messages_dropped: AtomicU64,

    /// Frames discarded because they came from a superseded session
    stale_frames: AtomicU64,

    /// Connection attempts started
    connect_attempts: AtomicU64,

    /// Connection attempts that failed
    connect_failures: AtomicU64,

    /// Heartbeats sent upstream
    heartbeats_sent: AtomicU64,

    /// Links declared dead after missed heartbeats
    heartbeat_timeouts: AtomicU64,

    /// Simulated generator ticks
    simulated_ticks: AtomicU64,

    /// Snapshot publications
    publications: AtomicU64,

    /// Publications forced outside the throttle window
    forced_publications: AtomicU64,

    /// Publish ticks with nothing to release
    idle_ticks: AtomicU64,

    /// Mutations folded into a single publication
    coalesced_mutations: AtomicU64,
}

impl EngineMetrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn message_applied(&self) {
        self.messages_applied.fetch_add(1, Ordering::Relaxed);
    }

    pub fn message_dropped(&self) {
        self.messages_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stale_frame(&self) {
        self.stale_frames.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connect_attempt(&self) {
        self.connect_attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connect_failure(&self) {
        self.connect_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn heartbeat_sent(&self) {
        self.heartbeats_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn heartbeat_timeout(&self) {
        self.heartbeat_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn simulated_tick(&self) {
        self.simulated_ticks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn publication(&self) {
        self.publications.fetch_add(1, Ordering::Relaxed);
    }

    /// Mirror the throttle gate counters after a tick or forced release
    pub fn record_throttle(&self, stats: &ThrottleStats) {
        self.forced_publications.store(stats.forced, Ordering::Relaxed);
        self.idle_ticks.store(stats.idle_ticks, Ordering::Relaxed);
        self.coalesced_mutations.store(stats.coalesced, Ordering::Relaxed);
    }

    /// Get snapshot for reporting
    pub fn snapshot(&self) -> EngineMetricsSnapshot {
        EngineMetricsSnapshot {
            messages_applied: self.messages_applied.load(Ordering::Relaxed),
            messages_dropped: self.messages_dropped.load(Ordering::Relaxed),
            stale_frames: self.stale_frames.load(Ordering::Relaxed),
            connect_attempts: self.connect_attempts.load(Ordering::Relaxed),
            connect_failures: self.connect_failures.load(Ordering::Relaxed),
            heartbeats_sent: self.heartbeats_sent.load(Ordering::Relaxed),
            heartbeat_timeouts: self.heartbeat_timeouts.load(Ordering::Relaxed),
            simulated_ticks: self.simulated_ticks.load(Ordering::Relaxed),
            publications: self.publications.load(Ordering::Relaxed),
            forced_publications: self.forced_publications.load(Ordering::Relaxed),
            idle_ticks: self.idle_ticks.load(Ordering::Relaxed),
            coalesced_mutations: self.coalesced_mutations.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot (serializable)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EngineMetricsSnapshot {
    pub messages_applied: u64,
    pub messages_dropped: u64,
    pub stale_frames: u64,
    pub connect_attempts: u64,
    pub connect_failures: u64,
    pub heartbeats_sent: u64,
    pub heartbeat_timeouts: u64,
    pub simulated_ticks: u64,
    pub publications: u64,
    pub forced_publications: u64,
    pub idle_ticks: u64,
    pub coalesced_mutations: u64,
}
