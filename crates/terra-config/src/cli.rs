//! Command-line flags for the Terra demo.

use std::path::PathBuf;

use clap::Parser;

use crate::{Config, TileSourceConfig};

/// Terra headless planet renderer.
///
/// Flags override settings loaded from `terra.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "terra", about = "Adaptive cube-sphere planet renderer")]
pub struct CliArgs {
    /// Frames to run before exiting.
    #[arg(long)]
    pub frames: Option<u64>,

    /// Camera distance from the planet centre, in planet radii.
    #[arg(long)]
    pub distance: Option<f64>,

    /// Vertical field of view in degrees.
    #[arg(long)]
    pub fov: Option<f64>,

    /// Viewport height in pixels.
    #[arg(long)]
    pub height: Option<u32>,

    /// Deepest quadtree level.
    #[arg(long)]
    pub lod_limit: Option<u8>,

    /// Read tiles from this directory instead of generating them. A
    /// configured web-mercator source keeps its kind and layout.
    #[arg(long)]
    pub tile_dir: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(frames) = args.frames {
            self.debug.frames = frames;
        }
        if let Some(distance) = args.distance {
            self.camera.start_distance_radii = distance;
        }
        if let Some(fov) = args.fov {
            self.camera.fov_y_degrees = fov;
        }
        if let Some(height) = args.height {
            self.camera.viewport_height = height;
        }
        if let Some(lod_limit) = args.lod_limit {
            self.lod.lod_limit = lod_limit;
        }
        if let Some(ref path) = args.tile_dir {
            self.tiles.source = match &self.tiles.source {
                TileSourceConfig::Directory {
                    quadkey_layout,
                    extension,
                    ..
                } => TileSourceConfig::Directory {
                    path: path.clone(),
                    quadkey_layout: *quadkey_layout,
                    extension: extension.clone(),
                },
                TileSourceConfig::Mercator {
                    quadkey_layout,
                    extension,
                    max_level,
                    ..
                } => TileSourceConfig::Mercator {
                    path: path.clone(),
                    quadkey_layout: *quadkey_layout,
                    extension: extension.clone(),
                    max_level: *max_level,
                },
                TileSourceConfig::Procedural { .. } => TileSourceConfig::Directory {
                    path: path.clone(),
                    quadkey_layout: false,
                    extension: "png".to_string(),
                },
            };
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_override() {
        let mut config = Config::default();
        let args = CliArgs {
            frames: Some(10),
            distance: Some(1.5),
            lod_limit: Some(6),
            log_level: Some("debug".to_string()),
            ..CliArgs::default()
        };
        config.apply_cli_overrides(&args);
        assert_eq!(config.debug.frames, 10);
        assert_eq!(config.camera.start_distance_radii, 1.5);
        assert_eq!(config.lod.lod_limit, 6);
        assert_eq!(config.debug.log_level, "debug");
        // Non-overridden fields retain defaults
        assert_eq!(config.camera.fov_y_degrees, 45.0);
        assert_eq!(config.tiles.source, TileSourceConfig::default());
    }

    #[test]
    fn test_cli_no_override() {
        let original = Config::default();
        let mut config = Config::default();
        config.apply_cli_overrides(&CliArgs::default());
        assert_eq!(config, original);
    }

    #[test]
    fn test_tile_dir_keeps_directory_layout() {
        let mut config = Config::default();
        config.tiles.source = TileSourceConfig::Directory {
            path: PathBuf::from("/old"),
            quadkey_layout: true,
            extension: "jpg".to_string(),
        };
        let args = CliArgs {
            tile_dir: Some(PathBuf::from("/new")),
            ..CliArgs::default()
        };
        config.apply_cli_overrides(&args);
        assert_eq!(
            config.tiles.source,
            TileSourceConfig::Directory {
                path: PathBuf::from("/new"),
                quadkey_layout: true,
                extension: "jpg".to_string(),
            }
        );
    }

    #[test]
    fn test_tile_dir_keeps_mercator_source() {
        let mut config = Config::default();
        config.tiles.source = TileSourceConfig::Mercator {
            path: PathBuf::from("/old"),
            quadkey_layout: false,
            extension: "png".to_string(),
            max_level: 9,
        };
        let args = CliArgs {
            tile_dir: Some(PathBuf::from("/osm")),
            ..CliArgs::default()
        };
        config.apply_cli_overrides(&args);
        assert_eq!(
            config.tiles.source,
            TileSourceConfig::Mercator {
                path: PathBuf::from("/osm"),
                quadkey_layout: false,
                extension: "png".to_string(),
                max_level: 9,
            }
        );
    }

    #[test]
    fn test_flags_parse() {
        let args = CliArgs::parse_from([
            "terra",
            "--frames",
            "30",
            "--fov",
            "60",
            "--height",
            "1080",
            "--tile-dir",
            "tiles",
        ]);
        assert_eq!(args.frames, Some(30));
        assert_eq!(args.fov, Some(60.0));
        assert_eq!(args.height, Some(1080));
        assert_eq!(args.tile_dir, Some(PathBuf::from("tiles")));
        assert!(args.config.is_none());
    }
}
