//! Adaptive level of detail for a cube-projected planet.
//!
//! Six face quadtrees decide every frame which tiles to split, merge,
//! texture or draw. Work per frame is bounded to the requests queued when the
//! frame began. Decisions use horizon and frustum visibility and projected
//! screen-space error.

mod cube;
mod frustum;
mod handlers;
mod horizon_culling;
mod node;
mod params;
mod render;
mod renderable;
mod request;
mod tile_cache;
mod traversal;
mod tree;

pub use cube::{CubeStats, PlanetCube};
pub use frustum::{Aabb, Frustum};
pub use horizon_culling::HorizonCone;
pub use node::{NodeArena, NodeId, QuadtreeNode};
pub use params::{CameraView, LodConfig, LodConfigError, LodParams, Planet, RequestOrder};
pub use render::{DrawList, TileDraw, TileRenderer, TileUniforms};
pub use renderable::{Renderable, sphere_error};
pub use request::{Request, RequestKind, RequestQueue};
pub use tile_cache::{MapTile, TileCache};
pub use tree::FaceTree;

#[cfg(test)]
mod test_support;
