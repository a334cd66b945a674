//! Configuration sections, their defaults, and RON persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use terra_lod::{LodConfig, Planet};

use crate::error::ConfigError;

const FILE_NAME: &str = "terra.ron";

/// `<platform config dir>/terra`, or `./terra` when the platform has none.
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("terra")
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Quadtree refinement.
    pub lod: LodConfig,
    pub planet: PlanetConfig,
    /// Demo camera and viewport.
    pub camera: CameraConfig,
    /// Tile fetching.
    pub tiles: TilesConfig,
    pub debug: DebugConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlanetConfig {
    /// Planet radius in meters.
    pub radius_m: f64,
    /// Planet centre in world space.
    pub position: [f64; 3],
}

impl PlanetConfig {
    /// The engine's view of this section.
    pub fn to_planet(&self) -> Planet {
        Planet {
            radius: self.radius_m,
            position: self.position.into(),
        }
    }
}

impl Default for PlanetConfig {
    fn default() -> Self {
        Self {
            radius_m: 6_371_000.0,
            position: [0.0; 3],
        }
    }
}

/// Orbit camera used by the headless demo.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CameraConfig {
    /// Vertical field of view.
    pub fov_y_degrees: f64,
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// Starting distance from the planet centre, in planet radii.
    pub start_distance_radii: f64,
    /// Orbit speed around the planet's polar axis.
    pub orbit_degrees_per_frame: f64,
    /// Elevation of the orbit above the equator.
    pub pitch_degrees: f64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_y_degrees: 45.0,
            viewport_width: 1280,
            viewport_height: 720,
            start_distance_radii: 3.0,
            orbit_degrees_per_frame: 0.25,
            pitch_degrees: 20.0,
        }
    }
}

/// Where tile imagery comes from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum TileSourceConfig {
    /// Generated imagery.
    Procedural { seed: u32, graticule_degrees: f64 },
    /// Image files on disk.
    Directory {
        path: PathBuf,
        /// Name files by quadkey instead of `<lod>/<x>_<y>`.
        quadkey_layout: bool,
        extension: String,
    },
    /// Web-mercator tiles on disk, resampled onto the cube.
    Mercator {
        path: PathBuf,
        /// Name files by quadkey instead of `<level>/<x>/<y>`.
        quadkey_layout: bool,
        extension: String,
        /// Deepest level present under `path`.
        max_level: u8,
    },
}

impl Default for TileSourceConfig {
    fn default() -> Self {
        Self::Procedural {
            seed: 0,
            graticule_degrees: 15.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TilesConfig {
    /// Fetch threads; 0 picks one per spare core.
    pub worker_threads: usize,
    /// Fetches queued before new ones are deferred.
    pub queue_capacity: usize,
    /// Attempts before a tile is given up on; `None` retries forever.
    pub max_attempts: Option<u32>,
    pub base_backoff_ms: u64,
    pub max_backoff_ms: u64,
    /// Released tiles kept in memory for reuse.
    pub retain_capacity: usize,
    pub source: TileSourceConfig,
}

impl Default for TilesConfig {
    fn default() -> Self {
        Self {
            worker_threads: 0,
            queue_capacity: 64,
            max_attempts: Some(5),
            base_backoff_ms: 100,
            max_backoff_ms: 5_000,
            retain_capacity: 128,
            source: TileSourceConfig::default(),
        }
    }
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
    /// Directory for the JSON log file; the config directory when unset.
    pub log_dir: Option<PathBuf>,
    /// Frames the demo runs before exiting.
    pub frames: u64,
    /// Sleep between frames, giving tile workers time to finish.
    pub frame_interval_ms: u64,
    /// Log cube statistics every this many frames; 0 disables.
    pub report_every: u64,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_dir: None,
            frames: 600,
            frame_interval_ms: 16,
            report_every: 60,
        }
    }
}

impl Config {
    /// Load `terra.ron` from `config_dir`, writing the defaults there first
    /// if it does not exist. The result is validated.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(FILE_NAME);

        if config_path.exists() {
            let config = Self::read(&config_path)?;
            config.validate()?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save to `config_dir/terra.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        let config_path = config_dir.join(FILE_NAME);
        let write_error = |source| ConfigError::WriteError {
            path: config_path.clone(),
            source,
        };
        std::fs::create_dir_all(config_dir).map_err(write_error)?;

        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .enumerate_arrays(false);
        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;

        std::fs::write(&config_path, serialized).map_err(write_error)?;
        log::debug!("Saved config to {}", config_path.display());
        Ok(())
    }

    /// Re-read the file; `Some` only if it differs from `self`.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let new_config = Self::read(&config_dir.join(FILE_NAME))?;
        if &new_config == self {
            return Ok(None);
        }
        new_config.validate()?;
        log::info!("Config reloaded with changes");
        Ok(Some(new_config))
    }

    /// Check the settings the engine cannot run with: the LOD section and
    /// the planet's size and placement.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.lod.validate()?;
        self.planet.to_planet().validate()?;
        Ok(())
    }

    fn read(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        ron::from_str(&contents).map_err(|source| ConfigError::ParseError {
            path: path.to_path_buf(),
            source,
        })
    }
}
