/// Message router - applies one decoded message to the snapshot
///
/// The router is synchronous and owns no state besides the history limit, so
/// a message is always applied as a whole before anything can read the
/// snapshot.
use std::collections::HashSet;

use super::message::InboundMessage;
use super::types::{NodeData, Snapshot};

/// What applying a message did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Telemetry fields changed; the snapshot is dirty
    Updated,
    /// Heartbeat acknowledgment; no telemetry field changed
    HeartbeatAck,
}

#[derive(Debug, Clone)]
pub struct MessageRouter {
    max_history_points: usize,
}

impl MessageRouter {
    pub fn new(max_history_points: usize) -> Self {
        Self {
            max_history_points: max_history_points.max(1),
        }
    }

    /// Apply one message to the snapshot
    pub fn apply(&self, snapshot: &mut Snapshot, message: InboundMessage) -> RouteOutcome {
        match message {
            InboundMessage::QpsUpdate(metric) => {
                snapshot.qps = metric;
            }
            InboundMessage::LatencyUpdate(metric) => {
                snapshot.latency = metric;
            }
            InboundMessage::NodeStatus(nodes) => {
                snapshot.nodes = dedupe_nodes(nodes);
            }
            InboundMessage::Alert(alert) => {
                snapshot.alerts.insert(0, alert);
            }
            InboundMessage::ThroughputHistory(mut points) => {
                if points.len() > self.max_history_points {
                    points.drain(..points.len() - self.max_history_points);
                }
                snapshot.throughput_history = points;
            }
            InboundMessage::SystemStats(stats) => {
                snapshot.system_stats = stats;
            }
            InboundMessage::HeartbeatAck(_) => return RouteOutcome::HeartbeatAck,
        }

        RouteOutcome::Updated
    }
}

/// Keep the first entry for each node id
fn dedupe_nodes(nodes: Vec<NodeData>) -> Vec<NodeData> {
    let mut seen = HashSet::with_capacity(nodes.len());
    if nodes.iter().all(|n| seen.insert(n.id.clone())) {
        return nodes;
    }

    seen.clear();
    nodes
        .into_iter()
        .filter(|n| seen.insert(n.id.clone()))
        .collect()
}
