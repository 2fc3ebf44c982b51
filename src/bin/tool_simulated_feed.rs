/// Simulated Telemetry Feed Tool
///
/// Prints the frames the simulated generator produces, one JSON object per
/// line, in the same `{"type": ..., "data": ...}` shape the upstream sends:
/// - Reproducible output with --seed
/// - Optional pacing with --interval-ms to feed a test upstream in real time
///
/// Usage:
///   cargo run --bin tool_simulated_feed -- [--seed N] [--ticks N] [--nodes N] [--interval-ms MS]
use clap::Parser;
use std::io::Write;
use std::time::Duration;

use clusterwatch::{
    config::SimulatorConfig,
    logger::{self, LogTag},
    sync::{SimulatedFeed, TelemetryGenerator},
};

#[derive(Parser, Debug)]
#[command(name = "tool_simulated_feed", about = "Print simulated cluster telemetry as JSON lines")]
struct Args {
    /// Seed for reproducible output
    #[arg(long)]
    seed: Option<u64>,

    /// Number of generator ticks to emit
    #[arg(long, default_value_t = 10)]
    ticks: u32,

    /// Number of simulated GPU nodes
    #[arg(long, default_value_t = 8)]
    nodes: usize,

    /// Chance per tick of emitting an alert
    #[arg(long, default_value_t = 0.05)]
    alert_probability: f64,

    /// Delay between ticks; 0 prints everything at once
    #[arg(long, default_value_t = 0)]
    interval_ms: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logger::init();

    let args = Args::parse();
    let config = SimulatorConfig {
        seed: args.seed,
        node_count: args.nodes,
        alert_probability: args.alert_probability,
        ..SimulatorConfig::default()
    };
    config.validate()?;

    logger::debug(
        LogTag::Simulator,
        &format!("Emitting {} tick(s) for {} node(s)", args.ticks, args.nodes),
    );

    let mut feed = SimulatedFeed::new(config);
    let stdout = std::io::stdout();

    for tick in 0..args.ticks {
        if tick > 0 && args.interval_ms > 0 {
            tokio::time::sleep(Duration::from_millis(args.interval_ms)).await;
        }

        let mut out = stdout.lock();
        for message in feed.tick(chrono::Local::now()) {
            writeln!(out, "{}", message.to_json()?)?;
        }
        out.flush()?;
    }

    Ok(())
}
