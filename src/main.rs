use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;

use clusterwatch::{
    arguments::{self, print_help},
    config::{self, Config, CONFIG_FILE_PATH},
    logger::{self, LogTag},
    sync::{NodeStatus, TelemetrySync, WebSocketTransport},
};

/// Interval between console summaries of the published snapshot
const SUMMARY_INTERVAL: Duration = Duration::from_secs(5);

/// Main entry point for clusterwatch
///
/// Loads configuration, starts the sync engine against the configured upstream
/// and logs a compact summary of the published snapshot until Ctrl-C/SIGTERM.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logger::init();

    if arguments::is_help_requested() {
        print_help();
        return Ok(());
    }

    logger::info(LogTag::System, "clusterwatch starting up...");

    let config = load_runtime_config()?;
    apply_logging_config(&config);

    logger::info(
        LogTag::System,
        &format!(
            "Upstream {} (max {} reconnect attempts, auto reconnect {})",
            config.sync.endpoint, config.sync.max_reconnect_attempts, config.sync.auto_reconnect
        ),
    );

    let sync = Arc::new(TelemetrySync::start(
        &config,
        Arc::new(WebSocketTransport::new()),
    ));

    let reporter = tokio::spawn(report_snapshots(sync.clone()));

    wait_for_shutdown_signal().await;
    logger::info(LogTag::System, "Shutdown signal received");

    reporter.abort();
    sync.shutdown().await;

    match serde_json::to_string(&sync.metrics()) {
        Ok(metrics) => logger::info(LogTag::System, &format!("Final metrics: {}", metrics)),
        Err(e) => logger::warning(LogTag::System, &format!("Metrics unavailable: {}", e)),
    }
    logger::info(LogTag::System, "clusterwatch stopped");
    Ok(())
}

/// Config file plus command-line overrides
fn load_runtime_config() -> anyhow::Result<Config> {
    let path = arguments::config_path().unwrap_or_else(|| CONFIG_FILE_PATH.to_string());
    config::load_config_from_path(&path)
        .with_context(|| format!("failed to load configuration from '{}'", path))?;

    let mut config = config::get_config_clone();
    if let Some(endpoint) = arguments::endpoint_override() {
        config.sync.endpoint = endpoint;
    }
    if let Some(seed) = arguments::seed_override() {
        config.simulator.seed = Some(seed);
    }
    if arguments::is_offline_enabled() {
        config.sync.auto_reconnect = false;
    }

    config
        .validate()
        .context("invalid configuration after command-line overrides")?;
    Ok(config)
}

/// Merge config-file logging defaults with the command-line flags
fn apply_logging_config(config: &Config) {
    logger::update_logger_config(|logger_config| {
        for tag in &config.logging.debug_tags {
            logger_config.debug_tags.insert(tag.to_lowercase());
        }
        if config.logging.plain {
            logger_config.plain = true;
        }
    });
}

async fn report_snapshots(sync: Arc<TelemetrySync>) {
    let mut ticker = tokio::time::interval(SUMMARY_INTERVAL);
    let mut last_version = 0;

    loop {
        ticker.tick().await;

        let published = sync.snapshot();
        if published.version == last_version {
            continue;
        }
        last_version = published.version;

        let snapshot = &published.snapshot;
        logger::info(
            LogTag::Sync,
            &format!(
                "[{}] v{} qps={:.1} ({:+.1}%) latency={:.1}ms ({:+.1}%) nodes={} active/{} warning/{} inactive alerts={} last_sync={}",
                sync.connection_state(),
                published.version,
                snapshot.qps.value,
                snapshot.qps.trend,
                snapshot.latency.value,
                snapshot.latency.trend,
                snapshot.nodes_with_status(NodeStatus::Active),
                snapshot.nodes_with_status(NodeStatus::Warning),
                snapshot.nodes_with_status(NodeStatus::Inactive),
                snapshot.alerts.len(),
                sync.last_sync_time().unwrap_or_else(|| "never".to_string()),
            ),
        );
    }
}

/// Resolves on Ctrl-C, or SIGTERM on unix
async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
                return;
            }
            Err(e) => {
                logger::warning(
                    LogTag::System,
                    &format!("SIGTERM handler unavailable ({}), waiting for Ctrl-C only", e),
                );
            }
        }
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        logger::error(LogTag::System, &format!("Failed to listen for Ctrl-C: {}", e));
    }
}
