//! Web-mercator tile math, for sources that serve imagery in the
//! web-mercator tiling scheme.

use std::f64::consts::PI;

use terra_cubesphere::{CubeFace, GeoCoord, QuadkeyError, cube_to_sphere, sphere_to_geo};

/// Latitude limit of the square web-mercator map, in degrees.
pub const MAX_LATITUDE: f64 = 85.051_128_78;
/// Tile edge in pixels.
pub const TILE_SIZE: u32 = 256;
/// Deepest level of detail served by common providers.
pub const MAX_LEVEL: u8 = 23;

const EARTH_RADIUS_M: f64 = 6_378_137.0;
const METRES_PER_DEGREE: f64 = 2.0 * PI * EARTH_RADIUS_M / 360.0;
/// Arc spanned by a cube face along the equator.
const FACE_DEGREES: f64 = 90.0;

/// Edge of the whole map in pixels at `level`.
pub fn map_size(level: u8) -> u64 {
    u64::from(TILE_SIZE) << level
}

/// Pixel containing a point in the whole map at `level`. Latitudes beyond
/// [`MAX_LATITUDE`] land on the top or bottom row.
pub fn geo_to_pixel_xy(geo: GeoCoord, level: u8) -> (u64, u64) {
    let latitude = geo.latitude.clamp(-MAX_LATITUDE, MAX_LATITUDE);
    let longitude = geo.longitude.clamp(-180.0, 180.0);

    let x = (longitude + 180.0) / 360.0;
    let sin_latitude = latitude.to_radians().sin();
    let y = 0.5 - ((1.0 + sin_latitude) / (1.0 - sin_latitude)).ln() / (4.0 * PI);

    let size = map_size(level) as f64;
    let pixel_x = (x * size + 0.5).clamp(0.0, size - 1.0);
    let pixel_y = (y * size + 0.5).clamp(0.0, size - 1.0);
    (pixel_x as u64, pixel_y as u64)
}

/// Metres covered by one pixel at `latitude` and `level`.
pub fn ground_resolution(latitude: f64, level: u8) -> f64 {
    let latitude = latitude.clamp(-MAX_LATITUDE, MAX_LATITUDE);
    latitude.to_radians().cos() * 2.0 * PI * EARTH_RADIUS_M / map_size(level) as f64
}

/// Coarsest level whose equatorial pixel is no larger than `metres_per_pixel`.
pub fn optimal_level(metres_per_pixel: f64) -> u8 {
    (1..=MAX_LEVEL)
        .find(|&level| ground_resolution(0.0, level) <= metres_per_pixel)
        .unwrap_or(MAX_LEVEL)
}

/// Mercator level whose pixels best match a `tile_size` cube tile at `lod`.
pub fn cube_tile_level(lod: u8, tile_size: u32) -> u8 {
    let degrees_per_pixel =
        FACE_DEGREES / 2f64.powi(i32::from(lod)) / f64::from(tile_size.max(1));
    // Slack so pixels of equal size compare equal after rounding.
    optimal_level(degrees_per_pixel * METRES_PER_DEGREE * (1.0 + 1e-9))
}

/// Geographic position of a cube-face point.
pub fn cube_point_to_geo(face: CubeFace, s: f64, t: f64) -> GeoCoord {
    sphere_to_geo(cube_to_sphere(face, s, t))
}

/// Quadkey of a web-mercator tile.
pub fn tile_xy_to_quadkey(x: u32, y: u32, level: u8) -> String {
    (1..=level)
        .rev()
        .map(|bit| {
            let mask = 1u32 << (bit - 1);
            let digit = u8::from(x & mask != 0) + 2 * u8::from(y & mask != 0);
            char::from(b'0' + digit)
        })
        .collect()
}

/// Tile coordinates and level encoded by a quadkey.
pub fn quadkey_to_tile_xy(key: &str) -> Result<(u32, u32, u8), QuadkeyError> {
    let level = key.len();
    if level > usize::from(MAX_LEVEL) {
        return Err(QuadkeyError::TooLong(level));
    }
    let (mut x, mut y) = (0u32, 0u32);
    for (position, digit) in key.chars().enumerate() {
        let mask = 1u32 << (level - position - 1);
        match digit {
            '0' => {}
            '1' => x |= mask,
            '2' => y |= mask,
            '3' => {
                x |= mask;
                y |= mask;
            }
            _ => return Err(QuadkeyError::InvalidDigit { digit, position }),
        }
    }
    Ok((x, y, level as u8))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quadkey_matches_reference_tile() {
        // Tile (3, 5) at level 3 is the classic "213".
        assert_eq!(tile_xy_to_quadkey(3, 5, 3), "213");
        assert_eq!(quadkey_to_tile_xy("213"), Ok((3, 5, 3)));
        assert_eq!(tile_xy_to_quadkey(0, 0, 0), "");
    }

    #[test]
    fn test_quadkey_rejects_bad_digit() {
        assert_eq!(
            quadkey_to_tile_xy("0142"),
            Err(QuadkeyError::InvalidDigit {
                digit: '4',
                position: 2
            })
        );
        assert!(matches!(
            quadkey_to_tile_xy(&"0".repeat(24)),
            Err(QuadkeyError::TooLong(24))
        ));
    }

    #[test]
    fn test_geo_to_pixel_corners() {
        let north_west = GeoCoord {
            latitude: 90.0,
            longitude: -180.0,
        };
        let south_east = GeoCoord {
            latitude: -90.0,
            longitude: 180.0,
        };
        assert_eq!(geo_to_pixel_xy(north_west, 4), (0, 0));
        assert_eq!(geo_to_pixel_xy(south_east, 4), (4095, 4095));

        let origin = GeoCoord {
            latitude: -0.001,
            longitude: 0.001,
        };
        let (x, y) = geo_to_pixel_xy(origin, 1);
        assert_eq!((x / u64::from(TILE_SIZE), y / u64::from(TILE_SIZE)), (1, 1));
    }

    #[test]
    fn test_cube_tile_level_follows_lod() {
        // A 256 pixel face tile spans a quarter of the equator.
        assert_eq!(cube_tile_level(0, 256), 2);
        assert_eq!(cube_tile_level(3, 256), 5);
        assert_eq!(cube_tile_level(3, 512), 6);
        assert_eq!(cube_tile_level(0, 8), 1, "never coarser than level 1");
        assert_eq!(cube_tile_level(30, 256), MAX_LEVEL);
    }

    #[test]
    fn test_ground_resolution_halves_per_level() {
        let coarse = ground_resolution(0.0, 3);
        let fine = ground_resolution(0.0, 4);
        assert!((coarse / fine - 2.0).abs() < 1e-12);
        assert!(ground_resolution(60.0, 3) < coarse, "shrinks towards the poles");
    }

    #[test]
    fn test_optimal_level_is_clamped() {
        assert_eq!(optimal_level(1e9), 1);
        assert_eq!(optimal_level(0.0), MAX_LEVEL);
        let level = optimal_level(ground_resolution(0.0, 10));
        assert_eq!(level, 10);
    }

    #[test]
    fn test_cube_point_to_geo_face_centres() {
        let north = cube_point_to_geo(CubeFace::PosY, 0.0, 0.0);
        assert!((north.latitude - 90.0).abs() < 1e-9);
        let meridian = cube_point_to_geo(CubeFace::PosZ, 0.0, 0.0);
        assert!(meridian.latitude.abs() < 1e-9);
        assert!(meridian.longitude.abs() < 1e-9);
    }
}
