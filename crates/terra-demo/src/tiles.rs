//! Tile store wiring from configuration.

use std::time::Duration;

use terra_config::{Config, TileSourceConfig};
use terra_tiles::{
    DirectorySource, MercatorDirectory, MercatorLayout, MercatorSource, ProceduralSource,
    RetryPolicy, StoreConfig, TileError, TileLayout, TileSource, TileStore,
};

pub type DemoStore = TileStore<Box<dyn TileSource>>;

pub fn source_from_config(config: &Config) -> Box<dyn TileSource> {
    match &config.tiles.source {
        TileSourceConfig::Procedural {
            seed,
            graticule_degrees,
        } => Box::new(
            ProceduralSource::new(config.lod.texture_size, *seed)
                .with_graticule(*graticule_degrees),
        ),
        TileSourceConfig::Directory {
            path,
            quadkey_layout,
            extension,
        } => {
            let layout = if *quadkey_layout {
                TileLayout::Quadkey
            } else {
                TileLayout::LodXy
            };
            Box::new(DirectorySource::new(path, layout).with_extension(extension))
        }
        TileSourceConfig::Mercator {
            path,
            quadkey_layout,
            extension,
            max_level,
        } => {
            let layout = if *quadkey_layout {
                MercatorLayout::Quadkey
            } else {
                MercatorLayout::Slippy
            };
            let tiles = MercatorDirectory::new(path, layout).with_extension(extension);
            Box::new(
                MercatorSource::new(tiles, config.lod.texture_size).with_max_level(*max_level),
            )
        }
    }
}

pub fn store_config(config: &Config) -> StoreConfig {
    let tiles = &config.tiles;
    StoreConfig {
        worker_threads: tiles.worker_threads,
        queue_capacity: tiles.queue_capacity,
        retry: RetryPolicy {
            max_attempts: tiles.max_attempts,
            base_backoff: Duration::from_millis(tiles.base_backoff_ms),
            max_backoff: Duration::from_millis(tiles.max_backoff_ms),
        },
        retain_capacity: tiles.retain_capacity,
    }
}

pub fn build_store(config: &Config) -> Result<DemoStore, TileError> {
    TileStore::new(source_from_config(config), store_config(config))
}

#[cfg(test)]
mod tests {
    use terra_cubesphere::{CubeFace, TileAddress};

    use super::*;

    #[test]
    fn test_store_config_maps_retry_settings() {
        let mut config = Config::default();
        config.tiles.max_attempts = None;
        config.tiles.base_backoff_ms = 7;
        config.tiles.max_backoff_ms = 70;
        let store = store_config(&config);
        assert_eq!(store.retry.max_attempts, None);
        assert_eq!(store.retry.base_backoff, Duration::from_millis(7));
        assert_eq!(store.retry.max_backoff, Duration::from_millis(70));
        assert_eq!(store.retain_capacity, config.tiles.retain_capacity);
    }

    #[test]
    fn test_procedural_tiles_match_texture_size() {
        let mut config = Config::default();
        config.lod.texture_size = 32;
        let source = source_from_config(&config);
        let tile = source
            .fetch(TileAddress::root(CubeFace::PosZ).child(1))
            .unwrap();
        assert_eq!(tile.dimensions(), (32, 32));
    }

    #[test]
    fn test_mercator_source_reads_configured_directory() {
        let dir = tempfile::tempdir().unwrap();
        let tiles = MercatorDirectory::new(dir.path(), MercatorLayout::Quadkey);
        for (x, y) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
            let path = tiles.path_for(x, y, 1);
            image::RgbaImage::from_pixel(2, 2, image::Rgba([9, 9, 9, 255]))
                .save(&path)
                .unwrap();
        }

        let mut config = Config::default();
        config.lod.texture_size = 16;
        config.tiles.source = TileSourceConfig::Mercator {
            path: dir.path().to_path_buf(),
            quadkey_layout: true,
            extension: "png".to_string(),
            max_level: 1,
        };
        let tile = source_from_config(&config)
            .fetch(TileAddress::root(CubeFace::PosX))
            .unwrap();
        assert_eq!(tile.dimensions(), (16, 16));
        assert!(tile.pixels().all(|p| p.0 == [9, 9, 9, 255]));
    }
}
