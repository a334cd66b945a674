//! Horizon culling for spherical tiles.
//!
//! A tile's footprint is bounded by a cone from the planet centre around the
//! tile's surface normal. The tile is behind the horizon when even the cone
//! edge tilted furthest towards the camera cannot see it.

use glam::DVec3;

/// Above this cosine between camera direction and tile normal the tile is
/// always visible. Guards the degenerate collinear case below.
const COS_ALWAYS_VISIBLE: f64 = 0.99;

/// Below this cosine the tile faces away from the camera entirely.
const COS_ALWAYS_HIDDEN: f64 = -0.9;

/// Angular bound of a tile as seen from the planet centre.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HorizonCone {
    /// Unit surface normal at the tile centroid.
    pub axis: DVec3,
    /// Cosine of the cone half-angle.
    pub cos_half_angle: f64,
    /// Sine of the cone half-angle.
    pub sin_half_angle: f64,
}

impl HorizonCone {
    /// Smallest cone around `axis` containing every direction in `corners`.
    ///
    /// Corner directions must be unit length. A tile never spans more than a
    /// quarter turn from its centroid so the sine is the positive root.
    pub fn enclosing(axis: DVec3, corners: impl IntoIterator<Item = DVec3>) -> Self {
        let cos_half_angle = corners
            .into_iter()
            .map(|corner| corner.dot(axis))
            .fold(1.0_f64, f64::min);
        Self {
            axis,
            cos_half_angle,
            sin_half_angle: (1.0 - cos_half_angle * cos_half_angle).max(0.0).sqrt(),
        }
    }

    /// Whether the whole cone lies beyond the horizon of a camera at
    /// `camera` (planet-relative, `camera_distance` from the centre) above a
    /// sphere of `radius`.
    pub fn is_far_away(&self, camera: DVec3, camera_distance: f64, radius: f64) -> bool {
        if camera_distance <= 0.0 {
            return false;
        }
        let point_dot_n = camera.dot(self.axis);
        let cos_camera_angle = point_dot_n / camera_distance;

        if cos_camera_angle > COS_ALWAYS_VISIBLE {
            return false;
        }
        if cos_camera_angle < COS_ALWAYS_HIDDEN {
            return true;
        }
        if cos_camera_angle > self.cos_half_angle {
            // Camera is above the footprint.
            return false;
        }

        // Tilt the axis by the half-angle towards the camera and test whether
        // the camera is above the tangent plane there.
        let side = (camera - point_dot_n * self.axis).normalize_or_zero();
        let edge = self.axis * self.cos_half_angle + side * self.sin_half_angle;
        camera.dot(edge) <= radius
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RADIUS: f64 = 6_371_000.0;

    fn cone(half_angle_deg: f64) -> HorizonCone {
        let c = half_angle_deg.to_radians().cos();
        HorizonCone {
            axis: DVec3::Y,
            cos_half_angle: c,
            sin_half_angle: (1.0 - c * c).sqrt(),
        }
    }

    fn camera_at(angle_from_axis_deg: f64, distance: f64) -> DVec3 {
        let a = angle_from_axis_deg.to_radians();
        DVec3::new(a.sin(), a.cos(), 0.0) * distance
    }

    #[test]
    fn test_enclosing_takes_widest_corner() {
        let corners = [
            DVec3::new(0.1, 1.0, 0.0).normalize(),
            DVec3::new(-0.3, 1.0, 0.0).normalize(),
            DVec3::new(0.0, 1.0, 0.2).normalize(),
        ];
        let cone = HorizonCone::enclosing(DVec3::Y, corners);
        let expected = DVec3::new(-0.3, 1.0, 0.0).normalize().y;
        assert!((cone.cos_half_angle - expected).abs() < 1e-12);
        assert!(
            (cone.cos_half_angle.powi(2) + cone.sin_half_angle.powi(2) - 1.0).abs() < 1e-12
        );
    }

    /// Nearly overhead cameras are always visible, whatever the cone.
    #[test]
    fn test_overhead_camera_always_visible() {
        for half_angle in [0.5, 10.0, 45.0] {
            let c = cone(half_angle);
            let camera = camera_at(5.0, RADIUS * 1.0001);
            assert!(
                !c.is_far_away(camera, camera.length(), RADIUS),
                "cone {half_angle}° should be visible from overhead"
            );
        }
    }

    /// Cameras on the far side are always hidden, whatever the cone.
    #[test]
    fn test_far_side_camera_always_hidden() {
        for half_angle in [0.5, 10.0, 45.0, 80.0] {
            let c = cone(half_angle);
            let camera = camera_at(160.0, RADIUS * 50.0);
            assert!(
                c.is_far_away(camera, camera.length(), RADIUS),
                "cone {half_angle}° should be hidden from the far side"
            );
        }
    }

    #[test]
    fn test_camera_inside_cone_is_visible() {
        let c = cone(30.0);
        let camera = camera_at(20.0, RADIUS * 1.01);
        assert!(!c.is_far_away(camera, camera.length(), RADIUS));
    }

    #[test]
    fn test_low_orbit_cannot_see_past_horizon() {
        // From 1% altitude the horizon is ~8° away; a 1° tile 60° off is hidden.
        let c = cone(1.0);
        let camera = camera_at(60.0, RADIUS * 1.01);
        assert!(c.is_far_away(camera, camera.length(), RADIUS));
    }

    #[test]
    fn test_high_orbit_sees_limb() {
        // From 10 radii the horizon is ~84° away; a tile 80° off is visible.
        let c = cone(1.0);
        let camera = camera_at(80.0, RADIUS * 10.0);
        assert!(!c.is_far_away(camera, camera.length(), RADIUS));
    }

    #[test]
    fn test_camera_at_centre_is_not_far_away() {
        let c = cone(10.0);
        assert!(!c.is_far_away(DVec3::ZERO, 0.0, RADIUS));
    }
}
