//! Draw submission for visible tiles.

use bytemuck::{Pod, Zeroable};
use glam::{DMat3, Vec4};
use static_assertions::assert_eq_size;
use terra_cubesphere::TileAddress;

use crate::MapTile;

/// Per-tile shader constants, laid out for a std140 uniform block.
///
/// The face transform is stored as three columns padded to `vec4`.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct TileUniforms {
    /// Face-position scale (xy) and texture scale (zw).
    pub stuv_scale: [f32; 4],
    /// Face-position offset (xy) and texture offset (zw).
    pub stuv_position: [f32; 4],
    /// Columns of the face rotation.
    pub face_transform: [[f32; 4]; 3],
    /// Tint colour.
    pub color: [f32; 4],
    /// Depth of the skirt hanging from the tile edges.
    pub skirt_height: f32,
    pub _padding: [f32; 3],
}

assert_eq_size!(TileUniforms, [u8; 112]);

impl TileUniforms {
    /// Pack per-tile constants.
    pub fn new(
        stuv_scale: Vec4,
        stuv_position: Vec4,
        face_transform: DMat3,
        color: Vec4,
        skirt_height: f64,
    ) -> Self {
        let column = |c: glam::DVec3| [c.x as f32, c.y as f32, c.z as f32, 0.0];
        Self {
            stuv_scale: stuv_scale.to_array(),
            stuv_position: stuv_position.to_array(),
            face_transform: [
                column(face_transform.x_axis),
                column(face_transform.y_axis),
                column(face_transform.z_axis),
            ],
            color: color.to_array(),
            skirt_height: skirt_height as f32,
            _padding: [0.0; 3],
        }
    }
}

/// One draw of the shared tile mesh.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TileDraw {
    /// Node being drawn.
    pub address: TileAddress,
    /// Map tile bound to texture unit 0.
    pub texture: TileAddress,
    /// Shader constants.
    pub uniforms: TileUniforms,
}

/// Receives the cube's draw stream.
pub trait TileRenderer<T> {
    /// Bind `tile`'s texture to sampler `unit`.
    fn bind_texture(&mut self, tile: &T, unit: u32);

    /// Draw the tile mesh with the bound texture.
    fn draw_tile(&mut self, draw: &TileDraw);
}

/// Renderer that records draws instead of issuing them.
#[derive(Debug, Default)]
pub struct DrawList {
    bound: Option<TileAddress>,
    draws: Vec<TileDraw>,
}

impl DrawList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Draws recorded since the last [`DrawList::clear`].
    pub fn draws(&self) -> &[TileDraw] {
        &self.draws
    }

    /// Texture bound to unit 0, if any.
    pub fn bound_texture(&self) -> Option<TileAddress> {
        self.bound
    }

    pub fn clear(&mut self) {
        self.bound = None;
        self.draws.clear();
    }
}

impl<T: MapTile> TileRenderer<T> for DrawList {
    fn bind_texture(&mut self, tile: &T, unit: u32) {
        if unit == 0 {
            self.bound = Some(tile.address());
        }
    }

    fn draw_tile(&mut self, draw: &TileDraw) {
        self.draws.push(*draw);
    }
}
