/// End-to-end scenarios for the sync engine
/// Runs the real owner task against the mock transport on paused tokio time

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::{sleep, timeout, Instant};

    use crate::config::SyncConfig;
    use crate::sync::message::InboundMessage;
    use crate::sync::testing::{ConnectOutcome, FixedGenerator, GeneratorCounters, MockTransport};
    use crate::sync::types::{
        Alert, AlertLevel, ConnectionState, LiveMetric, NodeData, NodeStatus, SyncStatus,
    };
    use crate::sync::TelemetrySync;

    fn test_config() -> SyncConfig {
        SyncConfig {
            endpoint: "ws://mock.cluster.local/ws/telemetry".to_string(),
            connect_timeout_ms: 500,
            backoff_base_ms: 100,
            backoff_max_ms: 1_000,
            heartbeat_interval_ms: 1_000,
            missed_heartbeat_limit: 2,
            publish_interval_ms: 100,
            simulated_tick_ms: 200,
            ..SyncConfig::default()
        }
    }

    fn node(id: &str) -> NodeData {
        NodeData {
            id: id.to_string(),
            status: NodeStatus::Active,
            gpu_util: 64.0,
            mem_util: 48.0,
            temperature: 66.0,
            model: "qwen-72b".to_string(),
            active_tasks: 9,
        }
    }

    fn alert(seq: usize) -> InboundMessage {
        InboundMessage::Alert(Alert {
            id: format!("alert-{}", seq),
            level: AlertLevel::Warning,
            message: format!("queue backlog #{}", seq),
            source: "scheduler".to_string(),
            timestamp: "12:00:00".to_string(),
        })
    }

    fn qps(value: f64) -> InboundMessage {
        InboundMessage::QpsUpdate(LiveMetric { value, trend: 1.5 })
    }

    fn generator() -> (Box<FixedGenerator>, GeneratorCounters) {
        let generator = FixedGenerator::new(vec![
            InboundMessage::NodeStatus(vec![node("sim-node-1"), node("sim-node-2")]),
            qps(900.0),
        ]);
        let counters = generator.counters();
        (Box::new(generator), counters)
    }

    fn start(transport: &Arc<MockTransport>) -> (TelemetrySync, GeneratorCounters) {
        let (generator, counters) = generator();
        let sync = TelemetrySync::start_with_generator(test_config(), transport.clone(), generator);
        (sync, counters)
    }

    async fn wait_for_state(sync: &TelemetrySync, state: ConnectionState) -> SyncStatus {
        let mut status_rx = sync.subscribe_status();
        let result = timeout(
            Duration::from_secs(600),
            status_rx.wait_for(|status| status.state == state),
        )
        .await;
        match result {
            Ok(Ok(status)) => status.clone(),
            _ => panic!("engine never reached {}", state),
        }
    }

    /// Let the pump and the engine drain queued frames without moving time
    async fn wait_for_applied(sync: &TelemetrySync, applied: u64) {
        let started = Instant::now();
        while sync.metrics().messages_applied < applied {
            tokio::task::yield_now().await;
        }
        assert_eq!(Instant::now(), started);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ten_failures_fall_back_to_simulated() {
        let transport = Arc::new(MockTransport::new(ConnectOutcome::Refuse));
        let (sync, counters) = start(&transport);

        let status = wait_for_state(&sync, ConnectionState::Simulated).await;
        assert_eq!(status.reconnect_count, 10);
        assert_eq!(transport.attempts(), 10);

        // Terminal until a manual reconnect
        sleep(Duration::from_secs(30)).await;
        assert_eq!(sync.connection_state(), ConnectionState::Simulated);
        assert_eq!(sync.reconnect_count(), 10);
        assert_eq!(transport.attempts(), 10);

        // Simulated data reaches consumers through the same snapshot
        assert!(counters.ticks() > 100);
        let published = sync.snapshot();
        assert_eq!(published.snapshot.nodes.len(), 2);
        assert_eq!(published.snapshot.qps.value, 900.0);

        let metrics = sync.metrics();
        assert_eq!(metrics.connect_attempts, 10);
        assert_eq!(metrics.connect_failures, 10);

        sync.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_unresponsive_upstream_then_manual_reconnect() {
        let transport = Arc::new(MockTransport::new(ConnectOutcome::Hang));
        let (sync, counters) = start(&transport);

        wait_for_state(&sync, ConnectionState::Simulated).await;
        sleep(Duration::from_secs(1)).await;
        assert!(counters.ticks() > 0);
        assert_eq!(counters.resets(), 0);

        sync.manual_reconnect().await;
        assert_eq!(sync.connection_state(), ConnectionState::Connecting);
        assert_eq!(sync.reconnect_count(), 0);
        assert_eq!(counters.resets(), 1);

        // Generator stays stopped while the new attempt is pending
        let ticks = counters.ticks();
        sleep(Duration::from_millis(400)).await;
        assert_eq!(counters.ticks(), ticks);
        assert_eq!(sync.connection_state(), ConnectionState::Connecting);

        // The timed-out attempt counts as the first failure again
        let status = wait_for_state(&sync, ConnectionState::Reconnecting).await;
        assert_eq!(status.reconnect_count, 1);

        sync.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_missed_heartbeats_trigger_reconnect() {
        let transport = Arc::new(
            MockTransport::new(ConnectOutcome::Refuse).with_script([ConnectOutcome::Accept]),
        );
        let (sync, _) = start(&transport);

        let connected = wait_for_state(&sync, ConnectionState::Connected).await;
        assert_eq!(connected.reconnect_count, 0);
        assert!(connected.last_sync_time.is_some());

        let status = wait_for_state(&sync, ConnectionState::Reconnecting).await;
        assert_eq!(status.reconnect_count, 1);

        sleep(Duration::from_millis(10)).await;
        let session = transport.session(0);
        assert_eq!(session.heartbeats_sent(), 2);
        assert!(session.is_closed());
        assert_eq!(sync.metrics().heartbeat_timeouts, 1);

        sync.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_acknowledged_heartbeats_keep_the_link() {
        let transport = Arc::new(MockTransport::new(ConnectOutcome::Accept).with_auto_ack());
        let (sync, _) = start(&transport);

        wait_for_state(&sync, ConnectionState::Connected).await;
        sleep(Duration::from_secs(10)).await;

        assert_eq!(sync.connection_state(), ConnectionState::Connected);
        assert_eq!(transport.attempts(), 1);
        assert!(transport.session(0).heartbeats_sent() >= 9);
        assert_eq!(sync.metrics().heartbeat_timeouts, 0);

        sync.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_is_published_once() {
        let transport = Arc::new(MockTransport::new(ConnectOutcome::Accept));
        let (sync, _) = start(&transport);
        wait_for_state(&sync, ConnectionState::Connected).await;

        let mut snapshots = sync.subscribe();
        snapshots.borrow_and_update();
        let before = sync.snapshot().version;

        let session = transport.session(0);
        for i in 0..25 {
            session.push(&alert(i));
        }
        for i in 0..24 {
            session.push(&qps(1_000.0 + i as f64));
        }
        session.push(&InboundMessage::NodeStatus(vec![node("gpu-node-01"), node("gpu-node-02")]));
        wait_for_applied(&sync, 50).await;

        // Nothing is visible before the window closes
        assert_eq!(sync.snapshot().version, before);

        sleep(Duration::from_millis(250)).await;
        let published = sync.snapshot();
        assert_eq!(published.version, before + 1);
        assert!(snapshots.has_changed().unwrap_or(false));

        let metrics = sync.metrics();
        assert_eq!(metrics.coalesced_mutations, 49);
        assert_eq!(metrics.forced_publications, 0);
        assert!(metrics.idle_ticks >= 1);

        let snapshot = &published.snapshot;
        assert_eq!(snapshot.alerts.len(), 25);
        assert_eq!(snapshot.alerts[0].id, "alert-24");
        assert_eq!(snapshot.alerts[24].id, "alert-0");
        assert_eq!(snapshot.qps.value, 1_023.0);
        assert_eq!(snapshot.nodes.len(), 2);

        sync.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_publish_interval_still_publishes() {
        let transport = Arc::new(MockTransport::new(ConnectOutcome::Accept));
        let (generator, _) = generator();
        let config = SyncConfig {
            publish_interval_ms: 0,
            simulated_tick_ms: 0,
            ..test_config()
        };
        let sync = TelemetrySync::start_with_generator(config, transport.clone(), generator);
        wait_for_state(&sync, ConnectionState::Connected).await;

        transport.session(0).push(&qps(1_400.0));
        sleep(Duration::from_millis(5)).await;
        assert_eq!(sync.snapshot().snapshot.qps.value, 1_400.0);

        // The owner task is alive and still takes commands
        sync.manual_reconnect().await;
        wait_for_state(&sync, ConnectionState::Connected).await;
        assert_eq!(transport.attempts(), 2);

        sync.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_simulated_tick_does_not_starve_the_engine() {
        let transport = Arc::new(MockTransport::new(ConnectOutcome::Refuse));
        let (generator, counters) = generator();
        let config = SyncConfig {
            auto_reconnect: false,
            publish_interval_ms: 0,
            simulated_tick_ms: 0,
            ..test_config()
        };
        let sync = TelemetrySync::start_with_generator(config, transport.clone(), generator);
        wait_for_state(&sync, ConnectionState::Simulated).await;

        sleep(Duration::from_millis(50)).await;
        assert!(counters.ticks() > 40);
        assert_eq!(sync.snapshot().snapshot.nodes.len(), 2);
        assert!(sync.metrics().publications > 0);

        sync.disconnect().await;
        assert_eq!(sync.connection_state(), ConnectionState::Disconnected);
        assert_eq!(counters.resets(), 1);

        sync.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_alerts_publishes_immediately() {
        let transport = Arc::new(MockTransport::new(ConnectOutcome::Accept));
        let (sync, _) = start(&transport);
        wait_for_state(&sync, ConnectionState::Connected).await;

        let session = transport.session(0);
        for i in 0..3 {
            session.push(&alert(i));
        }
        sleep(Duration::from_millis(150)).await;
        let published = sync.snapshot();
        assert_eq!(published.snapshot.alerts.len(), 3);

        // Mid-window mutations followed by a clear
        session.push(&alert(3));
        session.push(&qps(1_250.0));
        wait_for_applied(&sync, 5).await;

        let cleared_at = Instant::now();
        sync.clear_alerts().await;
        assert_eq!(Instant::now(), cleared_at);

        let cleared = sync.snapshot();
        assert_eq!(cleared.version, published.version + 1);
        assert!(cleared.snapshot.alerts.is_empty());
        assert_eq!(cleared.snapshot.qps.value, 1_250.0);

        // The forced publication consumed the window
        sleep(Duration::from_millis(300)).await;
        assert_eq!(sync.snapshot().version, cleared.version);

        sync.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_frames_are_dropped() {
        let transport = Arc::new(MockTransport::new(ConnectOutcome::Accept));
        let (sync, _) = start(&transport);
        wait_for_state(&sync, ConnectionState::Connected).await;

        let session = transport.session(0);
        session.push_raw("not json at all");
        session.push_raw(r#"{"type":"gpu_temperature","data":{"node":"gpu-node-01"}}"#);
        session.push_raw(r#"{"type":"qps_update","data":{"value":"fast"}}"#);
        session.push(&qps(777.0));
        wait_for_applied(&sync, 1).await;

        let metrics = sync.metrics();
        assert_eq!(metrics.messages_dropped, 3);
        assert_eq!(metrics.messages_applied, 1);

        sleep(Duration::from_millis(150)).await;
        assert_eq!(sync.snapshot().snapshot.qps.value, 777.0);
        assert_eq!(sync.connection_state(), ConnectionState::Connected);

        sync.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_session_recovers_with_counter_reset() {
        let transport = Arc::new(MockTransport::new(ConnectOutcome::Accept).with_script([
            ConnectOutcome::Accept,
            ConnectOutcome::Refuse,
        ]));
        let (sync, _) = start(&transport);
        wait_for_state(&sync, ConnectionState::Connected).await;

        transport.session(0).close();
        let status = wait_for_state(&sync, ConnectionState::Reconnecting).await;
        assert_eq!(status.reconnect_count, 1);

        let status = wait_for_state(&sync, ConnectionState::Connected).await;
        assert_eq!(status.reconnect_count, 0);
        assert_eq!(transport.attempts(), 3);
        assert_eq!(transport.session_count(), 2);

        sync.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_stops_everything_until_reconnect() {
        let transport = Arc::new(MockTransport::new(ConnectOutcome::Accept));
        let (sync, counters) = start(&transport);
        wait_for_state(&sync, ConnectionState::Connected).await;

        sync.disconnect().await;
        assert_eq!(sync.connection_state(), ConnectionState::Disconnected);

        sleep(Duration::from_secs(60)).await;
        assert_eq!(sync.connection_state(), ConnectionState::Disconnected);
        assert_eq!(transport.attempts(), 1);
        assert_eq!(counters.ticks(), 0);
        assert!(transport.session(0).is_closed());

        sync.manual_reconnect().await;
        wait_for_state(&sync, ConnectionState::Connected).await;
        assert_eq!(transport.attempts(), 2);

        sync.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_endpoint_is_not_retried() {
        let transport = Arc::new(MockTransport::new(ConnectOutcome::InvalidEndpoint));
        let (sync, _) = start(&transport);

        let status = wait_for_state(&sync, ConnectionState::Disconnected).await;
        assert_eq!(status.reconnect_count, 0);

        sleep(Duration::from_secs(60)).await;
        assert_eq!(transport.attempts(), 1);

        sync.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_reconnect_disabled_goes_offline_on_first_failure() {
        let transport = Arc::new(MockTransport::new(ConnectOutcome::Refuse));
        let (generator, counters) = generator();
        let config = SyncConfig {
            auto_reconnect: false,
            ..test_config()
        };
        let sync = TelemetrySync::start_with_generator(config, transport.clone(), generator);

        let status = wait_for_state(&sync, ConnectionState::Simulated).await;
        assert_eq!(status.reconnect_count, 1);
        sleep(Duration::from_secs(1)).await;
        assert_eq!(transport.attempts(), 1);
        assert!(counters.ticks() > 0);

        sync.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_commands_after_shutdown_are_noops() {
        let transport = Arc::new(MockTransport::new(ConnectOutcome::Accept));
        let (sync, _) = start(&transport);
        wait_for_state(&sync, ConnectionState::Connected).await;

        sync.shutdown().await;
        assert_eq!(sync.connection_state(), ConnectionState::Disconnected);

        sync.manual_reconnect().await;
        sync.clear_alerts().await;
        sync.shutdown().await;
        assert_eq!(sync.connection_state(), ConnectionState::Disconnected);
        assert_eq!(transport.attempts(), 1);
    }
}
