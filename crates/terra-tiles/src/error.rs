use terra_cubesphere::TileAddress;
use thiserror::Error;

/// Failure to produce the imagery of one tile.
#[derive(Debug, Error)]
pub enum TileError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to decode tile image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("no imagery for tile {0}")]
    Missing(TileAddress),
    #[error("web-mercator tile {level}/{x}/{y} is missing")]
    MercatorMissing { level: u8, x: u32, y: u32 },
    #[error("web-mercator tile {level}/{x}/{y} has no pixels")]
    EmptyMercatorTile { level: u8, x: u32, y: u32 },
    #[error("tile source error: {0}")]
    Source(String),
}
