//! Per-node visibility and error state.
//!
//! A [`Renderable`] is derived entirely from the node address, the map tile
//! it samples and the planet, so it can be dropped and rebuilt at any time.

use std::f64::consts::PI;

use glam::{DVec3, Vec4};
use terra_cubesphere::{TileAddress, cube_to_sphere};

use crate::{Aabb, Frustum, HorizonCone, LodParams, NodeId, Planet};

/// Geometric error multiplier applied to the chord sag of one grid cell.
const ERROR_SCALE: f64 = 1.4;

/// Footprint and LOD state of a drawable node.
#[derive(Clone, Debug)]
pub struct Renderable {
    address: TileAddress,
    tile_node: NodeId,
    tile_address: TileAddress,

    bounding_box: Aabb,
    center: DVec3,
    cone: HorizonCone,
    distance: f64,
    child_distance: f64,

    stuv_scale: Vec4,
    stuv_position: Vec4,
    color: Vec4,

    lod_priority: f64,
    in_lod_range: bool,
    in_mip_range: bool,
    clipped: bool,
    far_away: bool,
}

impl Renderable {
    /// Build the renderable of the node at `address`, textured from the map
    /// tile owned by `tile_node` (the node itself or an ancestor).
    ///
    /// # Panics
    ///
    /// Panics if `tile_address` does not contain `address`.
    pub fn new(
        address: TileAddress,
        tile_node: NodeId,
        tile_address: TileAddress,
        planet: &Planet,
        grid_size: u32,
    ) -> Self {
        assert!(
            tile_address.contains(&address),
            "map tile {tile_address} does not cover {address}"
        );

        let inv_scale = address.face_scale();
        let (position_x, position_y) = address.face_origin();
        let face = address.face;
        let radius = planet.radius;

        // Sample the tile grid on the sphere.
        let mut bounds = Aabb::empty();
        let mut center = DVec3::ZERO;
        let last = f64::from(grid_size - 1);
        for j in 0..grid_size {
            let t = position_y + inv_scale * f64::from(j) / last;
            for i in 0..grid_size {
                let s = position_x + inv_scale * f64::from(i) / last;
                let point = cube_to_sphere(face, s, t) * radius;
                center += point;
                bounds.grow(point);
            }
        }
        center /= f64::from(grid_size * grid_size);
        let surface_normal = center.normalize();

        let corners = [(0.0, 0.0), (0.0, 1.0), (1.0, 0.0), (1.0, 1.0)].map(|(u, v)| {
            cube_to_sphere(face, position_x + u * inv_scale, position_y + v * inv_scale)
        });
        let cone = HorizonCone::enclosing(surface_normal, corners);

        let relative_lod = address.lod - tile_address.lod;
        let inv_tex_scale = 1.0 / (1u64 << relative_lod) as f64;
        let texture_x =
            inv_tex_scale * (address.x as f64 - ((tile_address.x as u64) << relative_lod) as f64);
        let texture_y =
            inv_tex_scale * (address.y as f64 - ((tile_address.y as u64) << relative_lod) as f64);

        Self {
            address,
            tile_node,
            tile_address,
            bounding_box: bounds.translated(planet.position),
            center,
            cone,
            distance: sphere_error(address.lod, grid_size, radius),
            child_distance: 0.0,
            stuv_scale: Vec4::new(
                inv_scale as f32,
                inv_scale as f32,
                inv_tex_scale as f32,
                inv_tex_scale as f32,
            ),
            stuv_position: Vec4::new(
                position_x as f32,
                position_y as f32,
                texture_x as f32,
                texture_y as f32,
            ),
            color: Vec4::ONE,
            lod_priority: 0.0,
            in_lod_range: false,
            in_mip_range: false,
            clipped: false,
            far_away: false,
        }
    }

    /// Re-classify against the current camera.
    ///
    /// `frustum` is only consulted when frustum culling is enabled.
    pub fn set_frame_of_reference(
        &mut self,
        params: &LodParams,
        frustum: Option<&Frustum>,
        radius: f64,
        texture_size: u32,
    ) {
        let frustum_clipped = frustum.is_some_and(|f| !f.intersects(&self.bounding_box));

        let camera = params.camera_position;
        let normal = self.cone.axis;
        self.far_away = self.cone.is_far_away(camera, params.camera_distance, radius);
        self.clipped = frustum_clipped || self.far_away;

        // Approximate the grid point nearest the camera by sliding from the
        // centroid towards the camera, at most a fraction of the tile width.
        let position_offset = camera - self.center;
        let reference_length = PI * 0.375 * radius / (1u64 << self.address.lod) as f64;
        let mut reference_offset = position_offset - normal * position_offset.dot(normal);
        if reference_offset.length_squared() > reference_length * reference_length {
            reference_offset = reference_offset.normalize() * reference_length;
        }

        let near_position_offset = position_offset - reference_offset;
        let near_distance = near_position_offset.length();
        let to_camera = if near_distance > 0.0 {
            near_position_offset / near_distance
        } else {
            normal
        };
        let nearest_point_normal = (reference_offset + self.center).normalize();

        self.lod_priority = -to_camera.dot(params.camera_front);
        self.in_lod_range = self.lod_distance() * params.geo_factor < near_distance;

        // Texel footprint at the near point, foreshortened by incidence.
        let cos_angle = nearest_point_normal.dot(to_camera);
        let face_size = cos_angle * radius * PI * 0.5;
        let cube_side_pixels = f64::from(texture_size) * (1u64 << self.tile_address.lod) as f64;
        let texel_size = face_size / cube_side_pixels;
        self.in_mip_range = texel_size * params.tex_factor < near_distance;
    }

    /// Node owning the map tile this renderable samples.
    pub fn tile_node(&self) -> NodeId {
        self.tile_node
    }

    /// Address of the sampled map tile.
    pub fn tile_address(&self) -> TileAddress {
        self.tile_address
    }

    /// Address of the node this renderable belongs to.
    pub fn address(&self) -> TileAddress {
        self.address
    }

    pub fn bounding_box(&self) -> &Aabb {
        &self.bounding_box
    }

    /// Centroid of the sampled grid, planet-relative.
    pub fn center(&self) -> DVec3 {
        self.center
    }

    pub fn surface_normal(&self) -> DVec3 {
        self.cone.axis
    }

    pub fn cone(&self) -> &HorizonCone {
        &self.cone
    }

    /// Own geometric error; also used as skirt height.
    pub fn distance(&self) -> f64 {
        self.distance
    }

    /// Largest LOD distance among the children's renderables.
    pub fn child_lod_distance(&self) -> f64 {
        self.child_distance
    }

    /// Error bound of this node including any renderable descendants.
    pub fn lod_distance(&self) -> f64 {
        self.distance.max(self.child_distance)
    }

    pub(crate) fn set_child_lod_distance(&mut self, distance: f64) {
        self.child_distance = distance;
    }

    /// Face-position scale (xy) and texture scale (zw).
    pub fn stuv_scale(&self) -> Vec4 {
        self.stuv_scale
    }

    /// Face-position offset (xy) and texture offset (zw).
    pub fn stuv_position(&self) -> Vec4 {
        self.stuv_position
    }

    pub fn color(&self) -> Vec4 {
        self.color
    }

    /// Queue priority; higher when the node lies ahead of the camera.
    pub fn lod_priority(&self) -> f64 {
        self.lod_priority
    }

    /// Geometry is fine enough for the current view.
    pub fn is_in_lod_range(&self) -> bool {
        self.in_lod_range
    }

    /// Imagery is fine enough for the current view.
    pub fn is_in_mip_range(&self) -> bool {
        self.in_mip_range
    }

    /// Outside the view (horizon or frustum).
    pub fn is_clipped(&self) -> bool {
        self.clipped
    }

    /// Behind the horizon.
    pub fn is_far_away(&self) -> bool {
        self.far_away
    }
}

/// Chord sag of one grid cell at `lod`, scaled into a conservative error.
///
/// Levels 0 and 1 share a value since a face root already spans a quarter
/// circle.
#[must_use]
pub fn sphere_error(lod: u8, grid_size: u32, radius: f64) -> f64 {
    let divisions = f64::from(grid_size) * (1u64 << lod.saturating_sub(1)) as f64;
    let angle = PI / divisions;
    (1.0 - angle.cos()) * ERROR_SCALE * radius
}

#[cfg(test)]
mod tests {
    use super::*;
    use terra_cubesphere::CubeFace;

    const RADIUS: f64 = 6_371_000.0;

    fn dummy_id() -> NodeId {
        let mut arena = crate::NodeArena::new();
        arena.insert(())
    }

    fn params_at(camera: DVec3) -> LodParams {
        let mut params = LodParams::default();
        params.set_projection(&crate::LodConfig::default(), 45f64.to_radians(), 720.0);
        params.camera_position = camera;
        params.camera_distance = camera.length();
        params.camera_front = -camera.normalize();
        params
    }

    #[test]
    fn test_sphere_error_halves_roughly_per_level() {
        let e0 = sphere_error(0, 17, RADIUS);
        let e1 = sphere_error(1, 17, RADIUS);
        let e2 = sphere_error(2, 17, RADIUS);
        let e3 = sphere_error(3, 17, RADIUS);
        assert_eq!(e0, e1);
        assert!(e2 < e1 && e3 < e2);
        // Sag scales with angle squared.
        assert!((e2 / e3 - 4.0).abs() < 0.05, "ratio {}", e2 / e3);
    }

    #[test]
    fn test_root_renderable_geometry() {
        let addr = TileAddress::root(CubeFace::PosY);
        let r = Renderable::new(addr, dummy_id(), addr, &Planet::new(RADIUS), 17);
        assert!((r.surface_normal() - DVec3::Y).length() < 1e-9);
        // Face corners sit 54.7° from the face centre.
        let expected_cos = 1.0 / 3f64.sqrt();
        assert!((r.cone().cos_half_angle - expected_cos).abs() < 1e-9);
        assert!(r.bounding_box().max.y <= RADIUS + 1e-6);
        assert!(r.bounding_box().min.y > 0.0);
        assert_eq!(r.stuv_scale(), Vec4::new(2.0, 2.0, 1.0, 1.0));
        assert_eq!(r.stuv_position(), Vec4::new(-1.0, -1.0, 0.0, 0.0));
    }

    #[test]
    fn test_texture_offsets_into_ancestor_tile() {
        let tile = TileAddress::new(CubeFace::PosX, 1, 1, 0);
        let addr = tile.child(3).child(2); // lod 3, x = 6, y = 3
        assert_eq!((addr.x, addr.y), (6, 3));
        let r = Renderable::new(addr, dummy_id(), tile, &Planet::new(RADIUS), 17);
        let scale = r.stuv_scale();
        let pos = r.stuv_position();
        assert_eq!(scale.z, 0.25);
        assert_eq!(pos.z, 0.5); // (6 - 1*4) / 4
        assert_eq!(pos.w, 0.75); // (3 - 0*4) / 4
        assert_eq!(pos.x, -1.0 + 0.25 * 6.0);
    }

    #[test]
    fn test_bounding_box_is_offset_by_planet_position() {
        let addr = TileAddress::root(CubeFace::PosZ);
        let offset = DVec3::new(1.0e9, 0.0, 0.0);
        let planet = Planet {
            radius: RADIUS,
            position: offset,
        };
        let at_origin = Renderable::new(addr, dummy_id(), addr, &Planet::new(RADIUS), 9);
        let moved = Renderable::new(addr, dummy_id(), addr, &planet, 9);
        assert_eq!(moved.bounding_box().min, at_origin.bounding_box().min + offset);
        assert_eq!(moved.center(), at_origin.center());
    }

    #[test]
    fn test_far_camera_is_in_range_and_near_camera_is_not() {
        let addr = TileAddress::root(CubeFace::PosY);
        let mut r = Renderable::new(addr, dummy_id(), addr, &Planet::new(RADIUS), 17);

        r.set_frame_of_reference(&params_at(DVec3::Y * RADIUS * 50.0), None, RADIUS, 256);
        assert!(r.is_in_lod_range());
        assert!(r.is_in_mip_range());
        assert!(!r.is_clipped());
        assert!(r.lod_priority() > 0.99, "facing tile should have high priority");

        r.set_frame_of_reference(&params_at(DVec3::Y * RADIUS * 1.01), None, RADIUS, 256);
        assert!(!r.is_in_lod_range());
        assert!(!r.is_in_mip_range());
    }

    #[test]
    fn test_opposite_side_is_far_away() {
        let addr = TileAddress::root(CubeFace::PosY);
        let mut r = Renderable::new(addr, dummy_id(), addr, &Planet::new(RADIUS), 17);
        r.set_frame_of_reference(&params_at(DVec3::NEG_Y * RADIUS * 3.0), None, RADIUS, 256);
        assert!(r.is_far_away());
        assert!(r.is_clipped());
    }

    #[test]
    fn test_child_distance_raises_lod_distance() {
        let addr = TileAddress::new(CubeFace::NegX, 4, 3, 9);
        let mut r = Renderable::new(addr, dummy_id(), addr, &Planet::new(RADIUS), 17);
        let own = r.distance();
        assert_eq!(r.lod_distance(), own);
        r.set_child_lod_distance(own * 2.0);
        assert_eq!(r.lod_distance(), own * 2.0);
        r.set_child_lod_distance(own * 0.5);
        assert_eq!(r.lod_distance(), own);
    }

    #[test]
    #[should_panic(expected = "does not cover")]
    fn test_unrelated_tile_panics() {
        let addr = TileAddress::new(CubeFace::PosX, 2, 0, 0);
        let tile = TileAddress::new(CubeFace::PosX, 1, 1, 1);
        let _ = Renderable::new(addr, dummy_id(), tile, &Planet::new(RADIUS), 17);
    }
}
