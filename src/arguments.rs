/// Centralized argument handling for clusterwatch
///
/// - Process-wide CMD_ARGS storage with thread-safe access
/// - Flag/value helpers used by main and the logger
/// - Help text
use once_cell::sync::Lazy;
use std::env;
use std::sync::Mutex;

/// Global command-line arguments storage
pub static CMD_ARGS: Lazy<Mutex<Vec<String>>> = Lazy::new(|| Mutex::new(env::args().collect()));

/// Sets the global command-line arguments
/// Used by tests to override the default env::args() collection
pub fn set_cmd_args(args: Vec<String>) {
    if let Ok(mut cmd_args) = CMD_ARGS.lock() {
        *cmd_args = args;
    }
}

/// Gets a copy of the current command-line arguments
pub fn get_cmd_args() -> Vec<String> {
    match CMD_ARGS.lock() {
        Ok(args) => args.clone(),
        Err(_) => env::args().collect(),
    }
}

/// Checks if a specific argument is present in the command line
pub fn has_arg(arg: &str) -> bool {
    get_cmd_args().iter().any(|a| a == arg)
}

/// Gets the value that follows a flag (`--flag value` or `--flag=value`)
pub fn get_arg_value(flag: &str) -> Option<String> {
    arg_value_in(&get_cmd_args(), flag)
}

fn arg_value_in(args: &[String], flag: &str) -> Option<String> {
    let prefix = format!("{}=", flag);
    for (i, arg) in args.iter().enumerate() {
        if let Some(value) = arg.strip_prefix(&prefix) {
            return Some(value.to_string());
        }
        if arg == flag && i + 1 < args.len() && !args[i + 1].starts_with("--") {
            return Some(args[i + 1].clone());
        }
    }
    None
}

// =============================================================================
// APPLICATION FLAGS
// =============================================================================

pub fn is_help_requested() -> bool {
    has_arg("--help") || has_arg("-h")
}

/// Disable automatic reconnects: first failure hands off to simulated data
pub fn is_offline_enabled() -> bool {
    has_arg("--offline")
}

/// Config file override
pub fn config_path() -> Option<String> {
    get_arg_value("--config")
}

/// Upstream endpoint override
pub fn endpoint_override() -> Option<String> {
    get_arg_value("--endpoint")
}

/// Simulator seed override
pub fn seed_override() -> Option<u64> {
    get_arg_value("--seed").and_then(|s| s.parse().ok())
}

pub fn print_help() {
    println!("clusterwatch - realtime telemetry sync for the GPU inference cluster dashboard");
    println!();
    println!("USAGE:");
    println!("    clusterwatch [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    --config <path>       Config file (default: data/config.toml)");
    println!("    --endpoint <url>      Upstream telemetry WebSocket URL");
    println!("    --seed <n>            Seed for simulated telemetry");
    println!("    --offline             Skip reconnect attempts, fall back to simulated data");
    println!("    --debug-<tag>         Debug logs for a tag (connection, transport, router,");
    println!("                          simulator, throttle, sync, config)");
    println!("    --verbose             Verbose logs for every tag");
    println!("    --verbose-<tag>       Verbose logs for one tag");
    println!("    --quiet               Errors only");
    println!("    --no-color            Plain log output");
    println!("    -h, --help            Show this help");
}
