/// Sync engine - the single owner task
///
/// Owns the snapshot, the connection manager, the throttle gate and the
/// generator. Everything that touches them arrives as a message: facade
/// commands, connect results, inbound frames and session closure. Connect
/// attempts and the session pump run as spawned tasks tagged with the attempt
/// generation, so results from a cancelled attempt are discarded on arrival.
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep_until, Instant, MissedTickBehavior};

use super::connection::{ConnectionManager, ConnectionPolicy, Directive};
use super::message::{decode_message, OutboundMessage};
use super::metrics::EngineMetrics;
use super::router::{MessageRouter, RouteOutcome};
use super::simulator::TelemetryGenerator;
use super::throttle::ThrottleGate;
use super::transport::{Transport, TransportSession};
use super::types::{PublishedSnapshot, Snapshot, SyncStatus};
use crate::config::SyncConfig;
use crate::errors::TransportError;
use crate::logger::{self, LogTag};

/// Outbound frames waiting for the session pump
const OUTBOUND_QUEUE_CAPACITY: usize = 16;

/// Facade → engine requests. Each carries an ack resolved once applied.
#[derive(Debug)]
pub(crate) enum Command {
    ManualReconnect(oneshot::Sender<()>),
    ClearAlerts(oneshot::Sender<()>),
    Disconnect(oneshot::Sender<()>),
    Shutdown(oneshot::Sender<()>),
}

enum Event {
    Connected {
        generation: u64,
        session: Box<dyn TransportSession>,
    },
    ConnectFailed {
        generation: u64,
        error: TransportError,
    },
    Frame {
        generation: u64,
        text: String,
    },
    SessionClosed {
        generation: u64,
        reason: Option<TransportError>,
    },
}

struct LiveSession {
    generation: u64,
    outbound: mpsc::Sender<String>,
    _pump: JoinHandle<()>,
}

/// Everything the facade keeps after spawning the engine
pub(crate) struct EngineHandle {
    pub commands: mpsc::Sender<Command>,
    pub snapshot: watch::Receiver<Arc<PublishedSnapshot>>,
    pub status: watch::Receiver<SyncStatus>,
    pub metrics: Arc<EngineMetrics>,
    pub task: JoinHandle<()>,
}

pub(crate) struct SyncEngine {
    config: SyncConfig,
    transport: Arc<dyn Transport>,
    generator: Box<dyn TelemetryGenerator>,

    manager: ConnectionManager,
    router: MessageRouter,
    throttle: ThrottleGate,
    snapshot: Snapshot,
    version: u64,

    snapshot_tx: watch::Sender<Arc<PublishedSnapshot>>,
    status_tx: watch::Sender<SyncStatus>,
    metrics: Arc<EngineMetrics>,

    commands: mpsc::Receiver<Command>,
    events_tx: mpsc::Sender<Event>,
    events_rx: mpsc::Receiver<Event>,

    connect_task: Option<JoinHandle<()>>,
    session: Option<LiveSession>,
}

impl SyncEngine {
    fn new(
        config: SyncConfig,
        transport: Arc<dyn Transport>,
        generator: Box<dyn TelemetryGenerator>,
    ) -> (Self, mpsc::Sender<Command>) {
        let (commands_tx, commands_rx) = mpsc::channel(32);
        let (events_tx, events_rx) = mpsc::channel(config.event_queue_capacity.max(1));
        let (snapshot_tx, _) = watch::channel(Arc::new(PublishedSnapshot::default()));
        let (status_tx, _) = watch::channel(SyncStatus::default());

        let engine = SyncEngine {
            manager: ConnectionManager::new(ConnectionPolicy::from_config(&config)),
            router: MessageRouter::new(config.max_history_points),
            throttle: ThrottleGate::new(),
            snapshot: Snapshot::default(),
            version: 0,
            config,
            transport,
            generator,
            snapshot_tx,
            status_tx,
            metrics: EngineMetrics::new(),
            commands: commands_rx,
            events_tx,
            events_rx,
            connect_task: None,
            session: None,
        };

        (engine, commands_tx)
    }

    /// Spawn the owner task on the current runtime
    pub(crate) fn spawn(
        config: SyncConfig,
        transport: Arc<dyn Transport>,
        generator: Box<dyn TelemetryGenerator>,
    ) -> EngineHandle {
        let (engine, commands) = Self::new(config, transport, generator);
        let snapshot = engine.snapshot_tx.subscribe();
        let status = engine.status_tx.subscribe();
        let metrics = engine.metrics.clone();

        let task = tokio::spawn(engine.run());

        EngineHandle {
            commands,
            snapshot,
            status,
            metrics,
            task,
        }
    }

    async fn run(mut self) {
        logger::info(
            LogTag::Sync,
            &format!("Sync engine started (endpoint={})", self.config.endpoint),
        );

        let directives = self.manager.start();
        self.execute(directives);
        self.publish_status();

        let period = self.config.publish_interval();
        let mut publish_ticker = interval_at(Instant::now() + period, period);
        publish_ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            let deadline = self.manager.next_deadline();

            tokio::select! {
                biased;

                command = self.commands.recv() => match command {
                    Some(Command::Shutdown(ack)) => {
                        self.teardown();
                        let _ = ack.send(());
                        break;
                    }
                    Some(command) => self.handle_command(command),
                    None => {
                        logger::debug(LogTag::Sync, "Facade dropped, stopping engine");
                        self.teardown();
                        break;
                    }
                },

                // Ahead of events so a saturated queue cannot hold back publication
                _ = publish_ticker.tick() => self.on_publish_tick(),

                _ = wait_until(deadline) => self.on_deadline(),

                Some(event) = self.events_rx.recv() => self.handle_event(event),
            }

            self.publish_status();
        }

        logger::info(LogTag::Sync, "Sync engine stopped");
    }

    fn on_publish_tick(&mut self) {
        if self.throttle.on_tick() {
            self.publish_snapshot();
        }
        self.metrics.record_throttle(&self.throttle.stats());
    }

    fn on_deadline(&mut self) {
        // Frames already queued (a late heartbeat_ack in particular) are
        // applied before the deadline is judged
        self.drain_ready_events();

        let was_connected = self.manager.live_session().is_some();
        let directives = self.manager.poll_timers(Instant::now());
        if was_connected && directives.contains(&Directive::CloseSession) {
            self.metrics.heartbeat_timeout();
        }
        self.execute(directives);
    }

    fn drain_ready_events(&mut self) {
        for _ in 0..self.config.event_queue_capacity.max(1) {
            match self.events_rx.try_recv() {
                Ok(event) => self.handle_event(event),
                Err(_) => break,
            }
        }
    }

    // ------------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------------

    fn handle_command(&mut self, command: Command) {
        let ack = match command {
            Command::ManualReconnect(ack) => {
                let directives = self.manager.manual_reconnect();
                self.execute(directives);
                ack
            }
            Command::ClearAlerts(ack) => {
                let cleared = self.snapshot.alerts.len();
                self.snapshot.alerts.clear();
                self.throttle.force();
                self.publish_snapshot();
                self.metrics.record_throttle(&self.throttle.stats());
                logger::debug(LogTag::Sync, &format!("Cleared {} alert(s)", cleared));
                ack
            }
            Command::Disconnect(ack) => {
                let directives = self.manager.disconnect();
                self.execute(directives);
                ack
            }
            Command::Shutdown(ack) => ack,
        };

        // Status must be visible by the time the caller resumes
        self.publish_status();
        let _ = ack.send(());
    }

    fn teardown(&mut self) {
        let directives = self.manager.disconnect();
        self.execute(directives);
        if let Some(task) = self.connect_task.take() {
            task.abort();
        }
        self.publish_status();
    }

    // ------------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------------

    fn handle_event(&mut self, event: Event) {
        let now = Instant::now();

        match event {
            Event::Connected {
                generation,
                mut session,
            } => {
                if !self.manager.on_connected(generation, now) {
                    logger::debug(
                        LogTag::Transport,
                        &format!("Discarding session from superseded attempt {}", generation),
                    );
                    tokio::spawn(async move { session.close().await });
                    return;
                }
                self.connect_task = None;
                self.start_session(generation, session);
            }

            Event::ConnectFailed { generation, error } => {
                if self.manager.pending_attempt() == Some(generation) {
                    self.connect_task = None;
                    self.metrics.connect_failure();
                }
                let directives = self.manager.on_connect_failed(generation, &error, now);
                self.execute(directives);
            }

            Event::Frame { generation, text } => {
                if !self.manager.is_current_session(generation) {
                    self.metrics.stale_frame();
                    return;
                }

                match decode_message(&text) {
                    Ok(message) => match self.router.apply(&mut self.snapshot, message) {
                        RouteOutcome::Updated => {
                            self.throttle.mark_dirty();
                            self.metrics.message_applied();
                        }
                        RouteOutcome::HeartbeatAck => {
                            self.manager.on_heartbeat_ack(generation, now);
                        }
                    },
                    Err(e) => {
                        self.metrics.message_dropped();
                        logger::debug(LogTag::Router, &format!("Dropped frame: {}", e));
                    }
                }
            }

            Event::SessionClosed { generation, reason } => {
                if !self.manager.is_current_session(generation) {
                    return;
                }
                if let Some(reason) = reason {
                    logger::warning(LogTag::Transport, &format!("Session error: {}", reason));
                }
                self.session = None;
                let directives = self.manager.on_session_closed(generation, now);
                self.execute(directives);
            }
        }
    }

    // ------------------------------------------------------------------------
    // Directives
    // ------------------------------------------------------------------------

    fn execute(&mut self, directives: Vec<Directive>) {
        for directive in directives {
            match directive {
                Directive::Connect { generation } => self.spawn_connect(generation),
                Directive::CancelAttempt => {
                    if let Some(task) = self.connect_task.take() {
                        task.abort();
                    }
                }
                Directive::SendHeartbeat => self.send_heartbeat(),
                Directive::CloseSession => {
                    // Dropping the outbound sender makes the pump close the session
                    if let Some(session) = self.session.take() {
                        logger::debug(
                            LogTag::Transport,
                            &format!("Releasing session {}", session.generation),
                        );
                    }
                }
                Directive::SimulatedTick => self.simulated_tick(),
                Directive::StopSimulator => {
                    self.generator.reset();
                    logger::info(LogTag::Simulator, "Simulated data stopped");
                }
            }
        }
    }

    fn spawn_connect(&mut self, generation: u64) {
        if let Some(previous) = self.connect_task.take() {
            previous.abort();
        }
        self.metrics.connect_attempt();

        let transport = self.transport.clone();
        let endpoint = self.config.endpoint.clone();
        let timeout = self.config.connect_timeout();
        let events = self.events_tx.clone();

        self.connect_task = Some(tokio::spawn(async move {
            let result = tokio::time::timeout(timeout, transport.connect(&endpoint)).await;
            let event = match result {
                Ok(Ok(session)) => Event::Connected {
                    generation,
                    session,
                },
                Ok(Err(error)) => Event::ConnectFailed { generation, error },
                Err(_) => Event::ConnectFailed {
                    generation,
                    error: TransportError::ConnectTimeout {
                        endpoint,
                        timeout_ms: timeout.as_millis() as u64,
                    },
                },
            };
            let _ = events.send(event).await;
        }));
    }

    fn start_session(&mut self, generation: u64, session: Box<dyn TransportSession>) {
        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);
        let pump = tokio::spawn(run_session_pump(
            generation,
            session,
            outbound_rx,
            self.events_tx.clone(),
        ));
        self.session = Some(LiveSession {
            generation,
            outbound: outbound_tx,
            _pump: pump,
        });
    }

    fn send_heartbeat(&mut self) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        let frame = match OutboundMessage::heartbeat_now().to_json() {
            Ok(frame) => frame,
            Err(e) => {
                logger::error(LogTag::Sync, &format!("Failed to encode heartbeat: {}", e));
                return;
            }
        };
        match session.outbound.try_send(frame) {
            Ok(()) => self.metrics.heartbeat_sent(),
            Err(e) => logger::debug(LogTag::Transport, &format!("Heartbeat not queued: {}", e)),
        }
    }

    fn simulated_tick(&mut self) {
        let messages = self.generator.tick(chrono::Local::now());
        self.metrics.simulated_tick();

        for message in messages {
            if self.router.apply(&mut self.snapshot, message) == RouteOutcome::Updated {
                self.throttle.mark_dirty();
                self.metrics.message_applied();
            }
        }
    }

    // ------------------------------------------------------------------------
    // Publication
    // ------------------------------------------------------------------------

    fn publish_snapshot(&mut self) {
        self.version += 1;
        self.snapshot_tx.send_replace(Arc::new(PublishedSnapshot {
            version: self.version,
            snapshot: self.snapshot.clone(),
        }));
        self.metrics.publication();

        if logger::is_debug_enabled(&LogTag::Throttle) {
            logger::debug(
                LogTag::Throttle,
                &format!(
                    "Published snapshot v{} ({} nodes, {} alerts)",
                    self.version,
                    self.snapshot.nodes.len(),
                    self.snapshot.alerts.len()
                ),
            );
        }
    }

    fn publish_status(&mut self) {
        let status = self.manager.status();
        self.status_tx.send_if_modified(|current| {
            if *current == status {
                return false;
            }
            if current.state != status.state {
                logger::info(
                    LogTag::Sync,
                    &format!("Connection state: {} -> {}", current.state, status.state),
                );
            }
            *current = status;
            true
        });
    }
}

/// Resolves at `deadline`, never when there is none
async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Moves frames between one session and the engine until either side stops
async fn run_session_pump(
    generation: u64,
    mut session: Box<dyn TransportSession>,
    mut outbound: mpsc::Receiver<String>,
    events: mpsc::Sender<Event>,
) {
    let reason = loop {
        tokio::select! {
            frame = session.recv() => match frame {
                Some(Ok(text)) => {
                    if events.send(Event::Frame { generation, text }).await.is_err() {
                        return;
                    }
                }
                Some(Err(e)) => break Some(e),
                None => break None,
            },
            message = outbound.recv() => match message {
                Some(text) => {
                    if let Err(e) = session.send(text).await {
                        break Some(e);
                    }
                }
                None => {
                    // Engine released this session
                    session.close().await;
                    return;
                }
            },
        }
    };

    let _ = events.send(Event::SessionClosed { generation, reason }).await;
}
