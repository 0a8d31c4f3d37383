//! vdl-config — layered TOML configuration for the variable viewer.

pub mod config;
pub mod error;
pub mod load;
pub mod merge;
pub mod validate;

pub use config::{ChaseConfig, Config, LogConfig, LogLevel, TreeConfig};
pub use error::ConfigError;
pub use load::{default_config_dir, load_config};
