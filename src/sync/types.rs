/// Snapshot data model shared by the router, simulator and facade
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// CONNECTION STATE
// ============================================================================

/// Connection lifecycle state. Exactly one value at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Connecting,
    Connected,
    Disconnected,
    Reconnecting,
    Simulated,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Reconnecting => "reconnecting",
            ConnectionState::Simulated => "simulated",
        }
    }

    /// Only a connected link carries ground-truth telemetry
    pub fn is_live(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// TELEMETRY TYPES
// ============================================================================

/// A live scalar with its trend (signed percent change vs. previous value)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LiveMetric {
    pub value: f64,
    pub trend: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    Active,
    Warning,
    Inactive,
}

/// Per-node health as pushed by the upstream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeData {
    pub id: String,
    pub status: NodeStatus,
    /// GPU utilization, 0-100
    pub gpu_util: f64,
    /// Memory utilization, 0-100
    pub mem_util: f64,
    /// Degrees Celsius
    pub temperature: f64,
    pub model: String,
    pub active_tasks: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThroughputPoint {
    pub time: String,
    pub qps: f64,
    pub latency: f64,
    pub tokens: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Info,
    Warning,
    Error,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub level: AlertLevel,
    pub message: String,
    pub source: String,
    pub timestamp: String,
}

/// Aggregate cluster statistics
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SystemStats {
    pub active_nodes: u32,
    /// Cluster-wide GPU utilization, 0-100
    pub gpu_util: f64,
    /// Tokens per second
    pub token_throughput: f64,
    /// Storage used, percent of capacity
    pub storage_used: f64,
}

// ============================================================================
// SNAPSHOT
// ============================================================================

/// The single aggregate of all telemetry fields exposed to consumers.
///
/// Only the router mutates it; consumers receive published clones.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Snapshot {
    pub qps: LiveMetric,
    pub latency: LiveMetric,
    pub nodes: Vec<NodeData>,
    /// Oldest first, bounded by the configured maximum
    pub throughput_history: Vec<ThroughputPoint>,
    /// Newest first, cleared only on request
    pub alerts: Vec<Alert>,
    pub system_stats: SystemStats,
}

impl Snapshot {
    pub fn node(&self, id: &str) -> Option<&NodeData> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn nodes_with_status(&self, status: NodeStatus) -> usize {
        self.nodes.iter().filter(|n| n.status == status).count()
    }
}

/// A snapshot as released by the throttle gate
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PublishedSnapshot {
    /// Increments by one per publication
    pub version: u64,
    pub snapshot: Snapshot,
}

// ============================================================================
// RECONNECT / STATUS
// ============================================================================

/// Reconnect bookkeeping
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ReconnectState {
    /// 0..=max attempts
    pub attempts: u32,
    /// Local time of the last successful sync, `HH:MM:SS`
    pub last_sync_time: Option<String>,
}

/// Connection status as seen by consumers; published on every change
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncStatus {
    pub state: ConnectionState,
    pub reconnect_count: u32,
    pub last_sync_time: Option<String>,
}

impl Default for SyncStatus {
    fn default() -> Self {
        Self {
            state: ConnectionState::Connecting,
            reconnect_count: 0,
            last_sync_time: None,
        }
    }
}

/// Format a local timestamp the way the dashboard shows last-sync time
pub fn format_sync_time(time: chrono::DateTime<chrono::Local>) -> String {
    time.format("%H:%M:%S").to_string()
}
