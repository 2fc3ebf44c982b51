/// Wire schema for telemetry frames
///
/// Every frame is a JSON object `{"type": "<tag>", "data": <payload>}`.
/// Inbound frames are decoded in two steps (envelope, then payload by tag) so
/// an unknown tag is reported distinctly from a malformed payload.
use serde::{Deserialize, Serialize};

use super::types::{Alert, LiveMetric, NodeData, SystemStats, ThroughputPoint};
use crate::errors::DecodeError;

// ============================================================================
// INBOUND (upstream → engine)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HeartbeatAck {
    /// Echo of the heartbeat timestamp (unix ms), when the upstream sends it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

/// One decoded telemetry message. Exactly one tag per message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum InboundMessage {
    QpsUpdate(LiveMetric),
    LatencyUpdate(LiveMetric),
    NodeStatus(Vec<NodeData>),
    Alert(Alert),
    ThroughputHistory(Vec<ThroughputPoint>),
    SystemStats(SystemStats),
    HeartbeatAck(HeartbeatAck),
}

impl InboundMessage {
    /// Wire tag of this message
    pub fn kind(&self) -> &'static str {
        match self {
            InboundMessage::QpsUpdate(_) => "qps_update",
            InboundMessage::LatencyUpdate(_) => "latency_update",
            InboundMessage::NodeStatus(_) => "node_status",
            InboundMessage::Alert(_) => "alert",
            InboundMessage::ThroughputHistory(_) => "throughput_history",
            InboundMessage::SystemStats(_) => "system_stats",
            InboundMessage::HeartbeatAck(_) => "heartbeat_ack",
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[derive(Deserialize)]
struct RawFrame {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: serde_json::Value,
}

/// Decode one text frame
pub fn decode_message(text: &str) -> Result<InboundMessage, DecodeError> {
    let raw: RawFrame = serde_json::from_str(text)?;
    let data = raw.data;

    let message = match raw.kind.as_str() {
        "qps_update" => InboundMessage::QpsUpdate(serde_json::from_value(data)?),
        "latency_update" => InboundMessage::LatencyUpdate(serde_json::from_value(data)?),
        "node_status" => InboundMessage::NodeStatus(serde_json::from_value(data)?),
        "alert" => InboundMessage::Alert(serde_json::from_value(data)?),
        "throughput_history" => InboundMessage::ThroughputHistory(serde_json::from_value(data)?),
        "system_stats" => InboundMessage::SystemStats(serde_json::from_value(data)?),
        // The ack payload is informational; any shape still proves liveness
        "heartbeat_ack" => {
            InboundMessage::HeartbeatAck(serde_json::from_value(data).unwrap_or_default())
        }
        other => return Err(DecodeError::UnknownType(other.to_string())),
    };

    Ok(message)
}

// ============================================================================
// OUTBOUND (engine → upstream)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum OutboundMessage {
    Heartbeat { timestamp: i64 },
}

impl OutboundMessage {
    pub fn heartbeat_now() -> Self {
        OutboundMessage::Heartbeat {
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
