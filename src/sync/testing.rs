//! Test doubles for the transport seam and the generator.

use async_trait::async_trait;
use chrono::{DateTime, Local};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

use super::message::InboundMessage;
use super::simulator::TelemetryGenerator;
use super::transport::{Transport, TransportSession};
use crate::errors::TransportError;

// ============================================================================
// MOCK TRANSPORT
// ============================================================================

/// How one connect attempt ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectOutcome {
    Accept,
    Refuse,
    /// Never completes; only the connect timeout ends it
    Hang,
    InvalidEndpoint,
}

pub struct MockTransport {
    script: Mutex<VecDeque<ConnectOutcome>>,
    fallback: ConnectOutcome,
    auto_ack: bool,
    attempts: AtomicU32,
    sessions: Mutex<Vec<MockSessionHandle>>,
}

impl MockTransport {
    /// Every attempt ends with `fallback` unless scripted otherwise
    pub fn new(fallback: ConnectOutcome) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback,
            auto_ack: false,
            attempts: AtomicU32::new(0),
            sessions: Mutex::new(Vec::new()),
        }
    }

    /// Outcomes for the first attempts, in order
    pub fn with_script(self, outcomes: impl IntoIterator<Item = ConnectOutcome>) -> Self {
        self.script.lock().extend(outcomes);
        self
    }

    /// Sessions answer every heartbeat with a heartbeat_ack
    pub fn with_auto_ack(mut self) -> Self {
        self.auto_ack = true;
        self
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn session(&self, index: usize) -> MockSessionHandle {
        self.sessions
            .lock()
            .get(index)
            .cloned()
            .unwrap_or_else(|| panic!("no session #{}", index))
    }

    pub fn session_count(&self) -> usize {
        self.sessions.lock().len()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&self, endpoint: &str) -> Result<Box<dyn TransportSession>, TransportError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let outcome = self.script.lock().pop_front().unwrap_or(self.fallback);

        match outcome {
            ConnectOutcome::Accept => {
                let (session, handle) = MockSession::new(self.auto_ack);
                self.sessions.lock().push(handle);
                Ok(Box::new(session))
            }
            ConnectOutcome::Refuse => Err(TransportError::ConnectFailed {
                endpoint: endpoint.to_string(),
                reason: "connection refused".to_string(),
            }),
            ConnectOutcome::Hang => std::future::pending().await,
            ConnectOutcome::InvalidEndpoint => Err(TransportError::InvalidEndpoint {
                endpoint: endpoint.to_string(),
                reason: "rejected by mock".to_string(),
            }),
        }
    }
}

enum Feed {
    Frame(String),
    Close,
}

struct MockSession {
    feed_rx: mpsc::UnboundedReceiver<Feed>,
    feed_tx: mpsc::UnboundedSender<Feed>,
    auto_ack: bool,
    sent: Arc<Mutex<Vec<String>>>,
    closed: Arc<AtomicBool>,
}

impl MockSession {
    fn new(auto_ack: bool) -> (Self, MockSessionHandle) {
        let (feed_tx, feed_rx) = mpsc::unbounded_channel();
        let sent = Arc::new(Mutex::new(Vec::new()));
        let closed = Arc::new(AtomicBool::new(false));
        let handle = MockSessionHandle {
            feed: feed_tx.clone(),
            sent: sent.clone(),
            closed: closed.clone(),
        };
        (
            Self {
                feed_rx,
                feed_tx,
                auto_ack,
                sent,
                closed,
            },
            handle,
        )
    }
}

#[async_trait]
impl TransportSession for MockSession {
    async fn send(&mut self, text: String) -> Result<(), TransportError> {
        if self.auto_ack && text.contains("\"heartbeat\"") {
            let _ = self
                .feed_tx
                .send(Feed::Frame(r#"{"type":"heartbeat_ack"}"#.to_string()));
        }
        self.sent.lock().push(text);
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<String, TransportError>> {
        match self.feed_rx.recv().await {
            Some(Feed::Frame(text)) => Some(Ok(text)),
            Some(Feed::Close) | None => None,
        }
    }

    async fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Test-side control of one accepted session
#[derive(Clone)]
pub struct MockSessionHandle {
    feed: mpsc::UnboundedSender<Feed>,
    sent: Arc<Mutex<Vec<String>>>,
    closed: Arc<AtomicBool>,
}

impl MockSessionHandle {
    pub fn push(&self, message: &InboundMessage) {
        let text = message.to_json().expect("encode test frame");
        self.push_raw(&text);
    }

    pub fn push_raw(&self, text: &str) {
        let _ = self.feed.send(Feed::Frame(text.to_string()));
    }

    /// Upstream closes the session
    pub fn close(&self) {
        let _ = self.feed.send(Feed::Close);
    }

    /// Frames the engine sent upstream
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().clone()
    }

    pub fn heartbeats_sent(&self) -> usize {
        self.sent
            .lock()
            .iter()
            .filter(|frame| frame.contains("\"heartbeat\""))
            .count()
    }

    /// Whether the engine closed this session
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

// ============================================================================
// FIXED GENERATOR
// ============================================================================

/// Emits the same messages on every tick and counts ticks/resets
pub struct FixedGenerator {
    messages: Vec<InboundMessage>,
    counters: GeneratorCounters,
}

#[derive(Debug, Clone, Default)]
pub struct GeneratorCounters {
    ticks: Arc<AtomicUsize>,
    resets: Arc<AtomicUsize>,
}

impl GeneratorCounters {
    pub fn ticks(&self) -> usize {
        self.ticks.load(Ordering::SeqCst)
    }

    pub fn resets(&self) -> usize {
        self.resets.load(Ordering::SeqCst)
    }
}

impl FixedGenerator {
    pub fn new(messages: Vec<InboundMessage>) -> Self {
        Self {
            messages,
            counters: GeneratorCounters::default(),
        }
    }

    pub fn counters(&self) -> GeneratorCounters {
        self.counters.clone()
    }
}

impl TelemetryGenerator for FixedGenerator {
    fn tick(&mut self, _now: DateTime<Local>) -> Vec<InboundMessage> {
        self.counters.ticks.fetch_add(1, Ordering::SeqCst);
        self.messages.clone()
    }

    fn reset(&mut self) {
        self.counters.resets.fetch_add(1, Ordering::SeqCst);
    }
}
