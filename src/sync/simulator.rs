/// Simulated data generator
///
/// Produces plausible cluster telemetry while the live link is unavailable.
/// Every value follows a bounded random walk so consecutive ticks look like a
/// running cluster instead of noise.
use chrono::{DateTime, Local};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;

use super::message::InboundMessage;
use super::types::{
    format_sync_time, Alert, AlertLevel, LiveMetric, NodeData, NodeStatus, SystemStats,
    ThroughputPoint,
};
use crate::config::SimulatorConfig;

/// Source of synthetic telemetry driven by the engine's simulated tick
pub trait TelemetryGenerator: Send {
    /// Messages for one tick, applied in order
    fn tick(&mut self, now: DateTime<Local>) -> Vec<InboundMessage>;

    /// Forget all walk state; the next tick starts a fresh session
    fn reset(&mut self);
}

const MODELS: [&str; 4] = ["llama-3-70b", "qwen-72b", "mixtral-8x7b", "deepseek-v2"];

const QPS_RANGE: (f64, f64) = (200.0, 5_000.0);
const LATENCY_RANGE: (f64, f64) = (5.0, 500.0);
const TEMPERATURE_RANGE: (f64, f64) = (30.0, 95.0);
const TOKENS_PER_QUERY: f64 = 180.0;

/// Temperature above which a node reports `warning`
const WARN_TEMPERATURE: f64 = 83.0;
/// GPU utilization above which a node reports `warning`
const WARN_GPU_UTIL: f64 = 95.0;

#[derive(Debug, Clone)]
struct SimNode {
    id: String,
    model: &'static str,
    gpu_util: f64,
    mem_util: f64,
    temperature: f64,
    offline: bool,
}

impl SimNode {
    fn status(&self) -> NodeStatus {
        if self.offline {
            NodeStatus::Inactive
        } else if self.temperature > WARN_TEMPERATURE || self.gpu_util > WARN_GPU_UTIL {
            NodeStatus::Warning
        } else {
            NodeStatus::Active
        }
    }

    fn to_data(&self) -> NodeData {
        NodeData {
            id: self.id.clone(),
            status: self.status(),
            gpu_util: round1(self.gpu_util),
            mem_util: round1(self.mem_util),
            temperature: round1(self.temperature),
            model: self.model.to_string(),
            active_tasks: if self.offline {
                0
            } else {
                (self.gpu_util / 6.0).round() as u32
            },
        }
    }
}

pub struct SimulatedFeed {
    config: SimulatorConfig,
    rng: StdRng,
    nodes: Vec<SimNode>,
    qps: f64,
    latency: f64,
    storage_used: f64,
    history: VecDeque<ThroughputPoint>,
    alert_seq: u64,
}

impl SimulatedFeed {
    pub fn new(config: SimulatorConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut feed = Self {
            config,
            rng,
            nodes: Vec::new(),
            qps: 0.0,
            latency: 0.0,
            storage_used: 0.0,
            history: VecDeque::new(),
            alert_seq: 0,
        };
        feed.init_walk();
        feed
    }

    fn init_walk(&mut self) {
        let count = self.config.node_count.max(1);
        self.nodes = (0..count)
            .map(|i| SimNode {
                id: format!("gpu-node-{:02}", i + 1),
                model: MODELS[i % MODELS.len()],
                gpu_util: self.rng.gen_range(45.0..80.0),
                mem_util: self.rng.gen_range(35.0..70.0),
                temperature: self.rng.gen_range(55.0..72.0),
                offline: false,
            })
            .collect();
        self.qps = self.rng.gen_range(900.0..1_500.0);
        self.latency = self.rng.gen_range(30.0..60.0);
        self.storage_used = self.rng.gen_range(40.0..60.0);
        self.history.clear();
        self.alert_seq = 0;
    }

    /// One bounded random-walk step: `value * (1 ± max_step)` clamped to range
    fn walk(&mut self, value: f64, max_step: f64, range: (f64, f64)) -> f64 {
        let factor = 1.0 + self.rng.gen_range(-max_step..=max_step);
        (value * factor).clamp(range.0, range.1)
    }

    fn step_nodes(&mut self) {
        for i in 0..self.nodes.len() {
            let toggle = self.rng.gen_bool(0.02);
            let gpu_step = self.rng.gen_range(-6.0..=6.0);
            let mem_step = self.rng.gen_range(-3.0..=3.0);
            let noise = self.rng.gen_range(-1.5..=1.5);

            let node = &mut self.nodes[i];
            if toggle {
                node.offline = !node.offline;
            }
            if node.offline {
                node.gpu_util = 0.0;
                node.temperature = (node.temperature - 4.0).max(TEMPERATURE_RANGE.0);
                continue;
            }

            node.gpu_util = (node.gpu_util + gpu_step).clamp(5.0, 100.0);
            node.mem_util = (node.mem_util + mem_step).clamp(10.0, 98.0);
            // Temperature chases the load
            let target = 35.0 + node.gpu_util * 0.5;
            node.temperature = (node.temperature + (target - node.temperature) * 0.3 + noise)
                .clamp(TEMPERATURE_RANGE.0, TEMPERATURE_RANGE.1);
        }
    }

    fn next_alert(&mut self, time: &str) -> Option<Alert> {
        if !self.rng.gen_bool(self.config.alert_probability.clamp(0.0, 1.0)) {
            return None;
        }
        let node = self.nodes.choose(&mut self.rng)?.clone();
        let (level, message) = match self.rng.gen_range(0..5) {
            0 => (
                AlertLevel::Info,
                format!("{} finished rolling restart", node.id),
            ),
            1 => (
                AlertLevel::Warning,
                format!("GPU temperature {:.0}°C on {}", node.temperature, node.id),
            ),
            2 => (
                AlertLevel::Warning,
                format!("Inference queue backlog for {}", node.model),
            ),
            3 => (
                AlertLevel::Error,
                format!("ECC memory error reported by {}", node.id),
            ),
            _ => (AlertLevel::Critical, format!("{} stopped responding", node.id)),
        };

        self.alert_seq += 1;
        Some(Alert {
            id: format!("sim-alert-{}", self.alert_seq),
            level,
            message,
            source: node.id,
            timestamp: time.to_string(),
        })
    }
}

impl TelemetryGenerator for SimulatedFeed {
    fn tick(&mut self, now: DateTime<Local>) -> Vec<InboundMessage> {
        let time = format_sync_time(now);

        self.step_nodes();

        let previous_qps = self.qps;
        let previous_latency = self.latency;
        self.qps = self.walk(self.qps, 0.06, QPS_RANGE);
        self.latency = self.walk(self.latency, 0.08, LATENCY_RANGE);
        self.storage_used = (self.storage_used + self.rng.gen_range(0.0..0.05)).min(95.0);

        let tokens = self.qps * TOKENS_PER_QUERY * self.rng.gen_range(0.9..1.1);
        self.history.push_back(ThroughputPoint {
            time: time.clone(),
            qps: round1(self.qps),
            latency: round1(self.latency),
            tokens: tokens.round(),
        });
        while self.history.len() > self.config.history_points.max(1) {
            self.history.pop_front();
        }

        let online: Vec<&SimNode> = self.nodes.iter().filter(|n| !n.offline).collect();
        let gpu_util = if online.is_empty() {
            0.0
        } else {
            online.iter().map(|n| n.gpu_util).sum::<f64>() / online.len() as f64
        };
        let stats = SystemStats {
            active_nodes: online.len() as u32,
            gpu_util: round1(gpu_util),
            token_throughput: tokens.round(),
            storage_used: round1(self.storage_used),
        };

        let mut messages = vec![
            InboundMessage::NodeStatus(self.nodes.iter().map(SimNode::to_data).collect()),
            InboundMessage::QpsUpdate(LiveMetric {
                value: round1(self.qps),
                trend: trend(previous_qps, self.qps),
            }),
            InboundMessage::LatencyUpdate(LiveMetric {
                value: round1(self.latency),
                trend: trend(previous_latency, self.latency),
            }),
            InboundMessage::ThroughputHistory(self.history.iter().cloned().collect()),
            InboundMessage::SystemStats(stats),
        ];
        if let Some(alert) = self.next_alert(&time) {
            messages.push(InboundMessage::Alert(alert));
        }
        messages
    }

    fn reset(&mut self) {
        if let Some(seed) = self.config.seed {
            self.rng = StdRng::seed_from_u64(seed);
        }
        self.init_walk();
    }
}

/// Signed percent change from `previous` to `current`, one decimal
fn trend(previous: f64, current: f64) -> f64 {
    if previous.abs() < f64::EPSILON {
        return 0.0;
    }
    round1((current - previous) / previous * 100.0)
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn seeded(seed: u64) -> SimulatedFeed {
        SimulatedFeed::new(SimulatorConfig {
            seed: Some(seed),
            ..SimulatorConfig::default()
        })
    }

    fn at(second: u32) -> DateTime<Local> {
        Local
            .with_ymd_and_hms(2026, 3, 14, 10, 0, second)
            .single()
            .expect("valid local time")
    }

    #[test]
    fn test_tick_emits_every_telemetry_kind() {
        let mut feed = seeded(7);
        let kinds: Vec<&str> = feed.tick(at(0)).iter().map(|m| m.kind()).collect();
        assert_eq!(
            &kinds[..5],
            &[
                "node_status",
                "qps_update",
                "latency_update",
                "throughput_history",
                "system_stats"
            ]
        );
    }

    #[test]
    fn test_same_seed_same_output() {
        let mut a = seeded(42);
        let mut b = seeded(42);
        for s in 0..20 {
            assert_eq!(a.tick(at(s)), b.tick(at(s)));
        }
    }

    #[test]
    fn test_values_stay_in_range() {
        let mut feed = SimulatedFeed::new(SimulatorConfig {
            seed: Some(3),
            history_points: 30,
            ..SimulatorConfig::default()
        });

        for s in 0..500u32 {
            for message in feed.tick(at(s % 60)) {
                match message {
                    InboundMessage::NodeStatus(nodes) => {
                        assert_eq!(nodes.len(), 8);
                        for node in nodes {
                            assert!((0.0..=100.0).contains(&node.gpu_util));
                            assert!((0.0..=100.0).contains(&node.mem_util));
                            assert!((30.0..=95.0).contains(&node.temperature));
                        }
                    }
                    InboundMessage::QpsUpdate(m) => assert!((200.0..=5_000.0).contains(&m.value)),
                    InboundMessage::LatencyUpdate(m) => assert!((5.0..=500.0).contains(&m.value)),
                    InboundMessage::ThroughputHistory(points) => assert!(points.len() <= 30),
                    InboundMessage::SystemStats(stats) => assert!(stats.active_nodes <= 8),
                    _ => {}
                }
            }
        }
    }

    #[test]
    fn test_node_ids_unique() {
        let mut feed = seeded(11);
        for message in feed.tick(at(0)) {
            if let InboundMessage::NodeStatus(nodes) = message {
                let mut ids: Vec<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
                ids.sort_unstable();
                ids.dedup();
                assert_eq!(ids.len(), nodes.len());
                assert_eq!(nodes[0].id, "gpu-node-01");
            }
        }
    }

    #[test]
    fn test_reset_restarts_the_walk() {
        let mut feed = seeded(99);
        let first: Vec<_> = (0..5).map(|s| feed.tick(at(s))).collect();
        feed.reset();
        let again: Vec<_> = (0..5).map(|s| feed.tick(at(s))).collect();
        assert_eq!(first, again);
    }

    #[test]
    fn test_alert_probability_bounds() {
        let mut always = SimulatedFeed::new(SimulatorConfig {
            seed: Some(5),
            alert_probability: 1.0,
            ..SimulatorConfig::default()
        });
        let mut never = SimulatedFeed::new(SimulatorConfig {
            seed: Some(5),
            alert_probability: 0.0,
            ..SimulatorConfig::default()
        });

        for s in 0..10 {
            assert!(always.tick(at(s)).iter().any(|m| m.kind() == "alert"));
            assert!(!never.tick(at(s)).iter().any(|m| m.kind() == "alert"));
        }
    }

    #[test]
    fn test_trend_is_signed_percent() {
        assert_eq!(trend(100.0, 110.0), 10.0);
        assert_eq!(trend(200.0, 150.0), -25.0);
        assert_eq!(trend(0.0, 50.0), 0.0);
    }
}
