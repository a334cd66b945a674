//! Cube-sphere geometry: the six face transforms, tile addressing within a face,
//! and projection from cube-face coordinates onto the sphere.

mod cube_face;
mod error;
mod projection;
mod tile_address;

pub use cube_face::CubeFace;
pub use error::{CubeFaceError, QuadkeyError};
pub use projection::{GeoCoord, cube_point, cube_to_sphere, sphere_to_geo};
pub use tile_address::TileAddress;
