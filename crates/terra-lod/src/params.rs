//! Tunables for the quadtree and the per-frame camera-derived LOD parameters.

use glam::DVec3;
use serde::{Deserialize, Serialize};
use terra_cubesphere::TileAddress;

/// Order in which a drained batch of requests is handled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestOrder {
    /// Queue order (priority pushes first, then insertion order).
    #[default]
    Fifo,
    /// Nodes facing the camera first; ties keep queue order.
    ViewPriority,
}

/// Static configuration of the LOD engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LodConfig {
    /// Vertices per tile edge.
    pub grid_size: u32,
    /// Deepest level a node may split to.
    pub lod_limit: u8,
    /// Edge length of a map tile in texels.
    pub texture_size: u32,
    /// Geometric detail divisor; larger means coarser geometry.
    pub geo_detail: f64,
    /// Texel detail divisor; larger means coarser imagery.
    pub tex_detail: f64,
    /// Frames a split node must stay unopened before it may merge.
    pub merge_holdoff_frames: u64,
    /// Also clip against the view frustum, not only the horizon.
    pub frustum_culling: bool,
    /// Release the map tiles of recursed-through nodes.
    pub page_out: bool,
    /// Handling order within a drained batch.
    pub request_order: RequestOrder,
}

impl Default for LodConfig {
    fn default() -> Self {
        Self {
            grid_size: 17,
            lod_limit: 12,
            texture_size: 256,
            geo_detail: 6.0,
            tex_detail: 3.0,
            merge_holdoff_frames: 100,
            frustum_culling: false,
            page_out: false,
            request_order: RequestOrder::Fifo,
        }
    }
}

/// Rejected [`LodConfig`] values.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LodConfigError {
    /// Fewer than two vertices per edge.
    #[error("grid_size must be at least 2, got {0}")]
    GridTooSmall(u32),

    /// A map tile smaller than one grid cell per texel.
    #[error("texture_size {texture_size} must be at least grid_size - 1 ({cells})")]
    TextureTooSmall {
        /// Configured texture size.
        texture_size: u32,
        /// Grid cells per edge.
        cells: u32,
    },

    /// Level cap beyond what a tile address can represent.
    #[error("lod_limit {0} is deeper than a tile address can split")]
    LodLimitTooDeep(u8),

    /// A detail divisor that is not a finite number.
    #[error("detail factor {0} is not finite")]
    NonFiniteDetail(f64),

    /// A planet radius that is zero, negative or not a number.
    #[error("planet radius {0} must be positive and finite")]
    InvalidRadius(f64),

    /// A planet centre with a coordinate that is not finite.
    #[error("planet position {0} is not finite")]
    NonFinitePosition(DVec3),
}

impl LodConfig {
    /// Check the configuration for values the engine cannot work with.
    pub fn validate(&self) -> Result<(), LodConfigError> {
        if self.grid_size < 2 {
            return Err(LodConfigError::GridTooSmall(self.grid_size));
        }
        let cells = self.grid_size - 1;
        if self.texture_size < cells {
            return Err(LodConfigError::TextureTooSmall {
                texture_size: self.texture_size,
                cells,
            });
        }
        if self.lod_limit >= TileAddress::MAX_LOD {
            return Err(LodConfigError::LodLimitTooDeep(self.lod_limit));
        }
        for detail in [self.geo_detail, self.tex_detail] {
            if !detail.is_finite() {
                return Err(LodConfigError::NonFiniteDetail(detail));
            }
        }
        Ok(())
    }

    /// How many levels below a map tile's owner a renderable may still
    /// sample it: the halvings of `texture_size / (grid_size - 1)` down to 1.
    #[must_use]
    pub fn max_lod_ratio(&self) -> u8 {
        let mut ratio = self.texture_size / (self.grid_size - 1).max(1);
        let mut levels = 0;
        while ratio > 1 {
            ratio >>= 1;
            levels += 1;
        }
        levels
    }
}

/// Size and placement of the planet.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Planet {
    /// Sphere radius in world units.
    pub radius: f64,
    /// Centre of the planet in world space.
    pub position: DVec3,
}

impl Planet {
    /// A planet of the given radius centred at the origin.
    #[must_use]
    pub fn new(radius: f64) -> Self {
        Self {
            radius,
            position: DVec3::ZERO,
        }
    }

    /// Reject planets every distance metric would turn into NaN.
    pub fn validate(&self) -> Result<(), LodConfigError> {
        if !(self.radius.is_finite() && self.radius > 0.0) {
            return Err(LodConfigError::InvalidRadius(self.radius));
        }
        if !self.position.is_finite() {
            return Err(LodConfigError::NonFinitePosition(self.position));
        }
        Ok(())
    }
}

/// Camera pose handed to [`crate::PlanetCube::update`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraView {
    /// World-space eye position.
    pub position: DVec3,
    /// Unit view direction.
    pub forward: DVec3,
}

impl CameraView {
    /// Camera at `position` looking at `target`.
    #[must_use]
    pub fn looking_at(position: DVec3, target: DVec3) -> Self {
        Self {
            position,
            forward: (target - position).normalize_or_zero(),
        }
    }
}

/// Camera-derived values shared by every renderable during a frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LodParams {
    /// Screen-space scale for geometric error.
    pub geo_factor: f64,
    /// Screen-space scale for texel size.
    pub tex_factor: f64,
    /// Camera position relative to the planet centre.
    pub camera_position: DVec3,
    /// Camera forward direction.
    pub camera_front: DVec3,
    /// Length of `camera_position`.
    pub camera_distance: f64,
}

impl Default for LodParams {
    fn default() -> Self {
        Self {
            geo_factor: 1.0,
            tex_factor: 1.0,
            camera_position: DVec3::ZERO,
            camera_front: DVec3::NEG_Z,
            camera_distance: 0.0,
        }
    }
}

impl LodParams {
    /// Recompute the detail factors for a vertical field of view (radians)
    /// and viewport height (pixels).
    pub fn set_projection(&mut self, config: &LodConfig, fovy: f64, viewport_height: f64) {
        let fov = 2.0 * (0.5 * fovy).tan();
        self.geo_factor = viewport_height / (config.geo_detail.max(1.0) * fov);
        self.tex_factor = viewport_height / (config.tex_detail.max(1.0) * fov);
    }

    /// Move the camera, expressed relative to the planet.
    pub fn set_camera(&mut self, camera: &CameraView, planet: &Planet) {
        self.camera_position = camera.position - planet.position;
        self.camera_front = camera.forward;
        self.camera_distance = self.camera_position.length();
    }
}
