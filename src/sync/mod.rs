//! Realtime telemetry synchronization
//!
//! One owner task per `TelemetrySync` keeps the live link (or the simulated
//! fallback) flowing into a single snapshot and publishes it at a bounded rate.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use clusterwatch::config::Config;
//! use clusterwatch::sync::{TelemetrySync, WebSocketTransport};
//!
//! # async fn run() {
//! let sync = TelemetrySync::start(&Config::default(), Arc::new(WebSocketTransport::new()));
//! let mut updates = sync.subscribe();
//! while updates.changed().await.is_ok() {
//!     let published = updates.borrow().clone();
//!     println!("v{}: {} nodes", published.version, published.snapshot.nodes.len());
//! }
//! # }
//! ```

pub mod backoff;
pub mod connection;
mod engine;
pub mod facade;
pub mod health;
pub mod message;
pub mod metrics;
pub mod router;
pub mod simulator;
pub mod throttle;
pub mod transport;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;
mod tests;

pub use backoff::BackoffPolicy;
pub use connection::{ConnectionManager, ConnectionPolicy, Directive};
pub use facade::TelemetrySync;
pub use message::{decode_message, InboundMessage, OutboundMessage};
pub use metrics::{EngineMetrics, EngineMetricsSnapshot};
pub use router::{MessageRouter, RouteOutcome};
pub use simulator::{SimulatedFeed, TelemetryGenerator};
pub use throttle::{ThrottleGate, ThrottleStats};
pub use transport::{Transport, TransportSession, WebSocketTransport};
pub use types::{
    Alert, AlertLevel, ConnectionState, LiveMetric, NodeData, NodeStatus, PublishedSnapshot,
    Snapshot, SyncStatus, SystemStats, ThroughputPoint,
};
