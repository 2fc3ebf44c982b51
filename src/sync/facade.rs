/// Synchronization facade - the only object the rest of the application touches
///
/// Reads come from watch channels and never wait on the engine. Commands are
/// forwarded to the owner task and resolve once applied; after shutdown they
/// are silent no-ops.
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use super::engine::{Command, SyncEngine};
use super::metrics::{EngineMetrics, EngineMetricsSnapshot};
use super::simulator::{SimulatedFeed, TelemetryGenerator};
use super::transport::Transport;
use super::types::{ConnectionState, PublishedSnapshot, SyncStatus};
use crate::config::{Config, SyncConfig};
use crate::logger::{self, LogTag};

pub struct TelemetrySync {
    commands: mpsc::Sender<Command>,
    snapshot_rx: watch::Receiver<Arc<PublishedSnapshot>>,
    status_rx: watch::Receiver<SyncStatus>,
    metrics: Arc<EngineMetrics>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl TelemetrySync {
    /// Start a session with the simulated feed configured in `config`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(config: &Config, transport: Arc<dyn Transport>) -> Self {
        let generator = SimulatedFeed::new(config.simulator.clone());
        Self::start_with_generator(config.sync.clone(), transport, Box::new(generator))
    }

    /// Start a session with a caller-provided generator
    ///
    /// An invalid config is not refused: zero timer periods run at the 1 ms
    /// floor and the problem is logged.
    pub fn start_with_generator(
        config: SyncConfig,
        transport: Arc<dyn Transport>,
        generator: Box<dyn TelemetryGenerator>,
    ) -> Self {
        if let Err(e) = config.validate() {
            logger::warning(
                LogTag::Config,
                &format!("Starting with an invalid sync config: {}", e),
            );
        }

        let handle = SyncEngine::spawn(config, transport, generator);
        Self {
            commands: handle.commands,
            snapshot_rx: handle.snapshot,
            status_rx: handle.status,
            metrics: handle.metrics,
            task: Mutex::new(Some(handle.task)),
        }
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Latest published snapshot
    pub fn snapshot(&self) -> Arc<PublishedSnapshot> {
        self.snapshot_rx.borrow().clone()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.status_rx.borrow().state
    }

    pub fn reconnect_count(&self) -> u32 {
        self.status_rx.borrow().reconnect_count
    }

    pub fn last_sync_time(&self) -> Option<String> {
        self.status_rx.borrow().last_sync_time.clone()
    }

    pub fn status(&self) -> SyncStatus {
        self.status_rx.borrow().clone()
    }

    /// Receiver notified on every snapshot publication
    pub fn subscribe(&self) -> watch::Receiver<Arc<PublishedSnapshot>> {
        self.snapshot_rx.clone()
    }

    /// Receiver notified on every connection status change
    pub fn subscribe_status(&self) -> watch::Receiver<SyncStatus> {
        self.status_rx.clone()
    }

    pub fn metrics(&self) -> EngineMetricsSnapshot {
        self.metrics.snapshot()
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Drop whatever is running and connect again with a fresh counter
    pub async fn manual_reconnect(&self) {
        self.request(Command::ManualReconnect).await;
    }

    /// Empty the alert list and publish immediately
    pub async fn clear_alerts(&self) {
        self.request(Command::ClearAlerts).await;
    }

    /// Close the link and stop all timers until the next manual reconnect
    pub async fn disconnect(&self) {
        self.request(Command::Disconnect).await;
    }

    /// Stop the engine and wait for its task to finish
    pub async fn shutdown(&self) {
        self.request(Command::Shutdown).await;

        let task = self.task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                logger::warning(LogTag::Sync, &format!("Engine task ended abnormally: {}", e));
            }
        }
    }

    async fn request(&self, make: fn(oneshot::Sender<()>) -> Command) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.commands.send(make(ack_tx)).await.is_err() {
            return;
        }
        let _ = ack_rx.await;
    }
}
