/// Configuration utilities - loading, saving, and access helpers
///
/// The global CONFIG is only used by the binaries. The sync engine itself
/// takes a `SyncConfig` value, so independent sessions (tests, embedded use)
/// never share state through it.
use super::schemas::{Config, LoggingConfig, SimulatorConfig, SyncConfig};
use crate::errors::ConfigError;
use crate::logger::{self, LogTag};
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use std::path::Path;

/// Global configuration instance
pub static CONFIG: OnceCell<RwLock<Config>> = OnceCell::new();

/// Default configuration file path
pub const CONFIG_FILE_PATH: &str = "data/config.toml";

/// Parse and validate configuration text
///
/// Keys no section declares are logged and ignored.
pub fn parse_config(contents: &str, path: &str) -> Result<Config, ConfigError> {
    let parse_error = |source: toml::de::Error| ConfigError::Parse {
        path: path.to_string(),
        source,
    };

    let table = toml::from_str::<toml::Table>(contents).map_err(parse_error)?;
    for key in unknown_keys(&table) {
        logger::warning(
            LogTag::Config,
            &format!("Ignoring unknown config key '{}' in '{}'", key, path),
        );
    }

    let config: Config = toml::Value::Table(table).try_into().map_err(parse_error)?;
    config.validate()?;
    Ok(config)
}

/// Dotted paths of keys in `table` that match no schema field
pub fn unknown_keys(table: &toml::Table) -> Vec<String> {
    let mut unknown = Vec::new();

    for (section, value) in table {
        let accepted = match section.as_str() {
            "sync" => SyncConfig::KEYS,
            "simulator" => SimulatorConfig::KEYS,
            "logging" => LoggingConfig::KEYS,
            _ => {
                unknown.push(section.clone());
                continue;
            }
        };
        if let Some(keys) = value.as_table() {
            unknown.extend(
                keys.keys()
                    .filter(|key| !accepted.contains(&key.as_str()))
                    .map(|key| format!("{}.{}", section, key)),
            );
        }
    }

    unknown.sort();
    unknown
}

/// Read a configuration file, falling back to defaults when it is absent
pub fn read_config_file(path: &str) -> Result<Config, ConfigError> {
    if !Path::new(path).exists() {
        logger::warning(
            LogTag::Config,
            &format!("Config file '{}' not found, using default values", path),
        );
        return Ok(Config::default());
    }

    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_string(),
        source,
    })?;
    parse_config(&contents, path)
}

/// Load configuration from the default path into the global CONFIG
pub fn load_config() -> Result<(), ConfigError> {
    load_config_from_path(CONFIG_FILE_PATH)
}

/// Load configuration from a specific path into the global CONFIG
///
/// A second call replaces the loaded configuration.
pub fn load_config_from_path(path: &str) -> Result<(), ConfigError> {
    let config = read_config_file(path)?;
    set_config(config);
    logger::debug(LogTag::Config, &format!("Configuration loaded from '{}'", path));
    Ok(())
}

/// Install a configuration value directly
pub fn set_config(config: Config) {
    match CONFIG.get() {
        Some(lock) => *lock.write() = config,
        None => {
            if let Err(cell_value) = CONFIG.set(RwLock::new(config)) {
                // Lost an initialization race; overwrite the winner
                if let Some(lock) = CONFIG.get() {
                    *lock.write() = cell_value.into_inner();
                }
            }
        }
    }
}

/// Execute a function with read access to the configuration
///
/// Uses defaults when nothing has been loaded yet.
pub fn with_config<F, R>(f: F) -> R
where
    F: FnOnce(&Config) -> R,
{
    let lock = CONFIG.get_or_init(|| RwLock::new(Config::default()));
    let config = lock.read();
    f(&config)
}

/// Get a clone of the entire configuration
pub fn get_config_clone() -> Config {
    with_config(|cfg| cfg.clone())
}

/// Save the current configuration to disk
pub fn save_config(path: Option<&str>) -> Result<(), ConfigError> {
    let path = path.unwrap_or(CONFIG_FILE_PATH);
    let config_str = with_config(|cfg| toml::to_string_pretty(cfg))?;

    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: path.to_string(),
                source,
            })?;
        }
    }

    std::fs::write(path, config_str).map_err(|source| ConfigError::Write {
        path: path.to_string(),
        source,
    })
}
