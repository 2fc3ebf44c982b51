//! Configuration: schema definitions with embedded defaults, TOML loading,
//! and global access helpers for the binaries.

#[macro_use]
mod macros;
mod schemas;
mod utils;

pub use schemas::{Config, LoggingConfig, SimulatorConfig, SyncConfig};
pub use utils::{
    get_config_clone, load_config, load_config_from_path, parse_config, read_config_file,
    save_config, set_config, with_config, CONFIG, CONFIG_FILE_PATH,
};
