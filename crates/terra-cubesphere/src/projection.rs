//! Cube-to-sphere projection and geographic coordinates.

use glam::DVec3;

use crate::CubeFace;

/// Map face-local `(s, t)` in `[-1, 1]` to a point on the `[-1, 1]` cube.
#[inline]
#[must_use]
pub fn cube_point(face: CubeFace, s: f64, t: f64) -> DVec3 {
    face.face_transform() * DVec3::new(s, t, 1.0)
}

/// Project face-local `(s, t)` onto the unit sphere by normalization.
#[inline]
#[must_use]
pub fn cube_to_sphere(face: CubeFace, s: f64, t: f64) -> DVec3 {
    cube_point(face, s, t).normalize()
}

/// Latitude/longitude in degrees.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeoCoord {
    /// Degrees north of the equator, `[-90, 90]`. +Y is the north pole.
    pub latitude: f64,
    /// Degrees east, `(-180, 180]`, measured from +Z towards +X.
    pub longitude: f64,
}

/// Convert a direction from the planet centre to latitude/longitude.
///
/// The input need not be normalized.
#[must_use]
pub fn sphere_to_geo(direction: DVec3) -> GeoCoord {
    let n = direction.normalize();
    GeoCoord {
        latitude: n.y.clamp(-1.0, 1.0).asin().to_degrees(),
        longitude: n.x.atan2(n.z).to_degrees(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sphere_points_are_unit_length() {
        for face in CubeFace::ALL {
            for &(s, t) in &[(0.0, 0.0), (-1.0, -1.0), (1.0, 0.3), (-0.7, 1.0)] {
                let p = cube_to_sphere(face, s, t);
                assert!(
                    (p.length() - 1.0).abs() < 1e-12,
                    "{face:?} ({s}, {t}) gave non-unit {p:?}"
                );
            }
        }
    }

    /// Shared edges between faces must project to the same sphere points.
    #[test]
    fn test_adjacent_faces_share_edges() {
        // +X at s = 1 meets +Z at s = -1.
        let a = cube_point(CubeFace::PosX, 1.0, 0.5);
        let b = cube_point(CubeFace::PosZ, -1.0, 0.5);
        assert!((a - b).length() < 1e-12, "{a:?} != {b:?}");

        let c = cube_point(CubeFace::PosY, 0.25, 1.0);
        let d = cube_point(CubeFace::PosZ, -0.25, 1.0);
        assert!((c - d).length() < 1e-12, "{c:?} != {d:?}");
    }

    #[test]
    fn test_geo_of_axes() {
        let north = sphere_to_geo(DVec3::Y);
        assert!((north.latitude - 90.0).abs() < 1e-9);

        let origin = sphere_to_geo(DVec3::Z * 5.0);
        assert!(origin.latitude.abs() < 1e-9);
        assert!(origin.longitude.abs() < 1e-9);

        let east = sphere_to_geo(DVec3::X);
        assert!((east.longitude - 90.0).abs() < 1e-9);
    }
}
