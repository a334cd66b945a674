//! Cube tiles resampled from web-mercator imagery.

use std::collections::hash_map::Entry;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use image::{Rgba, RgbaImage};
use rustc_hash::FxHashMap;
use terra_cubesphere::TileAddress;
use tracing::trace;

use crate::mercator::{self, MAX_LEVEL, TILE_SIZE};
use crate::{TileError, TileSource};

/// Serves web-mercator tiles by tile coordinates and level.
pub trait MercatorTiles: Send + Sync + 'static {
    fn fetch(&self, x: u32, y: u32, level: u8) -> Result<RgbaImage, TileError>;
}

/// File naming of a web-mercator tile directory.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MercatorLayout {
    /// `<root>/<level>/<x>/<y>.<ext>`
    #[default]
    Slippy,
    /// `<root>/<quadkey>.<ext>`
    Quadkey,
}

/// Web-mercator tiles read from disk.
#[derive(Clone, Debug)]
pub struct MercatorDirectory {
    root: PathBuf,
    layout: MercatorLayout,
    extension: String,
}

impl MercatorDirectory {
    pub fn new(root: impl Into<PathBuf>, layout: MercatorLayout) -> Self {
        Self {
            root: root.into(),
            layout,
            extension: "png".to_owned(),
        }
    }

    pub fn with_extension(mut self, extension: &str) -> Self {
        self.extension = extension.trim_start_matches('.').to_owned();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File that holds tile `(x, y)` at `level`.
    pub fn path_for(&self, x: u32, y: u32, level: u8) -> PathBuf {
        match self.layout {
            MercatorLayout::Slippy => self
                .root
                .join(level.to_string())
                .join(x.to_string())
                .join(format!("{y}.{}", self.extension)),
            MercatorLayout::Quadkey => {
                let key = mercator::tile_xy_to_quadkey(x, y, level);
                self.root.join(format!("{key}.{}", self.extension))
            }
        }
    }
}

impl MercatorTiles for MercatorDirectory {
    fn fetch(&self, x: u32, y: u32, level: u8) -> Result<RgbaImage, TileError> {
        let path = self.path_for(x, y, level);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(TileError::MercatorMissing { level, x, y });
            }
            Err(e) => return Err(TileError::Io(e)),
        };
        Ok(image::load_from_memory(&bytes)?.into_rgba8())
    }
}

/// Builds each cube tile pixel by pixel from the web-mercator tiles under
/// it, at the mercator level closest to the cube tile's own resolution.
///
/// Covering tiles are found per pixel, so tiles across the antimeridian or
/// around a pole are picked up without special cases. Polar caps beyond
/// the mercator latitude limit repeat the map's edge rows.
pub struct MercatorSource<M> {
    tiles: M,
    size: u32,
    max_level: u8,
}

impl<M: MercatorTiles> MercatorSource<M> {
    /// Cube tiles of `size`×`size` pixels composited from `tiles`.
    pub fn new(tiles: M, size: u32) -> Self {
        Self {
            tiles,
            size: size.max(1),
            max_level: MAX_LEVEL,
        }
    }

    /// Deepest mercator level the provider serves.
    pub fn with_max_level(mut self, level: u8) -> Self {
        self.max_level = level.clamp(1, MAX_LEVEL);
        self
    }

    pub fn tiles(&self) -> &M {
        &self.tiles
    }

    pub fn tile_size(&self) -> u32 {
        self.size
    }

    /// Mercator level sampled for `address`.
    pub fn level_for(&self, address: TileAddress) -> u8 {
        mercator::cube_tile_level(address.lod, self.size).min(self.max_level)
    }
}

impl<M: MercatorTiles> TileSource for MercatorSource<M> {
    fn fetch(&self, address: TileAddress) -> Result<RgbaImage, TileError> {
        let level = self.level_for(address);
        let (origin_s, origin_t) = address.face_origin();
        let pixel_scale = address.face_scale() / f64::from(self.size);
        let tile_size = u64::from(TILE_SIZE);

        let mut loaded: FxHashMap<(u32, u32), RgbaImage> = FxHashMap::default();
        let mut composite = RgbaImage::new(self.size, self.size);
        for (i, j, pixel) in composite.enumerate_pixels_mut() {
            let s = origin_s + pixel_scale * (f64::from(i) + 0.5);
            let t = origin_t + pixel_scale * (f64::from(j) + 0.5);
            let geo = mercator::cube_point_to_geo(address.face, s, t);
            let (map_x, map_y) = mercator::geo_to_pixel_xy(geo, level);
            let (x, y) = ((map_x / tile_size) as u32, (map_y / tile_size) as u32);

            let tile = match loaded.entry((x, y)) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => {
                    let tile = self.tiles.fetch(x, y, level)?;
                    if tile.width() == 0 || tile.height() == 0 {
                        return Err(TileError::EmptyMercatorTile { level, x, y });
                    }
                    entry.insert(tile)
                }
            };
            *pixel = sample(tile, map_x % tile_size, map_y % tile_size);
        }

        trace!(%address, level, tiles = loaded.len(), "Composited mercator tile");
        Ok(composite)
    }
}

/// Nearest texel of `tile` for a pixel offset within a [`TILE_SIZE`] tile.
/// Providers serving other tile sizes are scaled.
fn sample(tile: &RgbaImage, x: u64, y: u64) -> Rgba<u8> {
    let scale = |offset: u64, extent: u32| {
        let texel = offset * u64::from(extent) / u64::from(TILE_SIZE);
        texel.min(u64::from(extent - 1)) as u32
    };
    *tile.get_pixel(scale(x, tile.width()), scale(y, tile.height()))
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use terra_cubesphere::CubeFace;

    use super::*;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const GREEN: Rgba<u8> = Rgba([0, 255, 0, 255]);
    const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);
    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

    /// Solid tiles coloured by position, recording every request.
    #[derive(Default)]
    struct SolidTiles {
        requests: Mutex<Vec<(u32, u32, u8)>>,
    }

    impl MercatorTiles for SolidTiles {
        fn fetch(&self, x: u32, y: u32, level: u8) -> Result<RgbaImage, TileError> {
            self.requests.lock().unwrap().push((x, y, level));
            Ok(RgbaImage::from_pixel(2, 2, Rgba([x as u8, y as u8, level, 255])))
        }
    }

    fn write_level_one(dir: &Path) {
        let directory = MercatorDirectory::new(dir, MercatorLayout::Slippy);
        for (x, y, colour) in [(0, 0, RED), (1, 0, GREEN), (0, 1, BLUE), (1, 1, WHITE)] {
            let path = directory.path_for(x, y, 1);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            RgbaImage::from_pixel(4, 4, colour).save(&path).unwrap();
        }
    }

    #[test]
    fn test_directory_paths() {
        let slippy = MercatorDirectory::new("/osm", MercatorLayout::Slippy);
        assert_eq!(slippy.path_for(3, 5, 4), PathBuf::from("/osm/4/3/5.png"));
        let quadkey = MercatorDirectory::new("/bing", MercatorLayout::Quadkey).with_extension(".jpg");
        assert_eq!(quadkey.path_for(3, 5, 3), PathBuf::from("/bing/213.jpg"));
    }

    #[test]
    fn test_face_tile_samples_covering_quadrants() {
        let dir = tempfile::tempdir().unwrap();
        write_level_one(dir.path());
        let source =
            MercatorSource::new(MercatorDirectory::new(dir.path(), MercatorLayout::Slippy), 8)
                .with_max_level(1);

        // +Z is centred on the equator and prime meridian; `s` runs west
        // and `t` north.
        let tile = source.fetch(TileAddress::root(CubeFace::PosZ)).unwrap();
        assert_eq!(tile.dimensions(), (8, 8));
        assert_eq!(tile.get_pixel(0, 0), &WHITE, "south-east");
        assert_eq!(tile.get_pixel(0, 7), &GREEN, "north-east");
        assert_eq!(tile.get_pixel(7, 0), &BLUE, "south-west");
        assert_eq!(tile.get_pixel(7, 7), &RED, "north-west");
    }

    #[test]
    fn test_missing_mercator_tile_fails_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let source =
            MercatorSource::new(MercatorDirectory::new(dir.path(), MercatorLayout::Slippy), 4)
                .with_max_level(1);
        let result = source.fetch(TileAddress::root(CubeFace::NegX));
        assert!(matches!(
            result,
            Err(TileError::MercatorMissing { level: 1, .. })
        ));
    }

    #[test]
    fn test_pole_tile_wraps_all_longitudes_once() {
        let source = MercatorSource::new(SolidTiles::default(), 16).with_max_level(1);
        source.fetch(TileAddress::root(CubeFace::PosY)).unwrap();

        let requests = source.tiles().requests.lock().unwrap().clone();
        let mut unique = requests.clone();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), requests.len(), "each tile fetched once");
        assert_eq!(unique, vec![(0, 0, 1), (1, 0, 1)], "northern row across the antimeridian");
    }

    #[test]
    fn test_level_tracks_cube_resolution() {
        let source = MercatorSource::new(SolidTiles::default(), 256);
        let root = TileAddress::root(CubeFace::PosX);
        assert_eq!(source.level_for(root), 2);
        assert_eq!(source.level_for(root.child(0).child(0)), 4);

        let capped = MercatorSource::new(SolidTiles::default(), 256).with_max_level(3);
        assert_eq!(capped.level_for(root.child(0).child(0)), 3);
    }

    #[test]
    fn test_tile_colour_comes_from_covering_tile() {
        let source = MercatorSource::new(SolidTiles::default(), 4);
        let address = TileAddress::root(CubeFace::NegZ).child(2).child(1);
        let level = source.level_for(address);
        let tile = source.fetch(address).unwrap();
        assert!(tile.pixels().all(|p| p.0[2] == level && p.0[3] == 255));
    }
}
