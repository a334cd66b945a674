//! Configuration for the Terra planet renderer.
//!
//! Settings persist to disk as RON, with every section optional so older
//! files keep loading. Command-line flags override what was loaded.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{
    CameraConfig, Config, DebugConfig, PlanetConfig, TileSourceConfig, TilesConfig,
    default_config_dir,
};
pub use error::ConfigError;
pub use terra_lod::{LodConfig, RequestOrder};
