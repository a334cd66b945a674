//! Identity of a quadtree tile on the cube.

use crate::{CubeFace, QuadkeyError};

/// Uniquely identifies a tile on the cube.
///
/// - `face`: which of the 6 cube faces this tile belongs to.
/// - `lod`: subdivision level. LOD 0 is the whole face; every level halves the
///   tile edge.
/// - `x`, `y`: integer coordinates within the face at this level, in
///   `0..tiles_per_side()`. `x` grows along the face tangent and `y` along the
///   bitangent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileAddress {
    /// Which cube face this tile belongs to.
    pub face: CubeFace,
    /// Subdivision level (0 = whole face).
    pub lod: u8,
    /// Horizontal coordinate within the face at this level.
    pub x: u32,
    /// Vertical coordinate within the face at this level.
    pub y: u32,
}

impl TileAddress {
    /// Deepest supported level; keeps `x` and `y` inside a `u32`.
    pub const MAX_LOD: u8 = 31;

    /// Construct an address, validating the coordinates for the level.
    ///
    /// # Panics
    ///
    /// Panics if `lod` exceeds [`Self::MAX_LOD`] or `x`/`y` are out of range.
    #[must_use]
    pub fn new(face: CubeFace, lod: u8, x: u32, y: u32) -> Self {
        assert!(
            lod <= Self::MAX_LOD,
            "LOD {lod} exceeds MAX_LOD {}",
            Self::MAX_LOD
        );
        let size = 1u64 << lod;
        assert!(
            u64::from(x) < size,
            "x={x} out of range for LOD {lod} (max {size})"
        );
        assert!(
            u64::from(y) < size,
            "y={y} out of range for LOD {lod} (max {size})"
        );
        Self { face, lod, x, y }
    }

    /// The single tile covering a whole face.
    #[must_use]
    pub fn root(face: CubeFace) -> Self {
        Self {
            face,
            lod: 0,
            x: 0,
            y: 0,
        }
    }

    /// Number of tiles along one edge of the face at this level.
    #[must_use]
    pub fn tiles_per_side(&self) -> u64 {
        1u64 << self.lod
    }

    /// The child in quadrant `quadrant` (0 = SW, 1 = SE, 2 = NW, 3 = NE).
    ///
    /// # Panics
    ///
    /// Panics if `quadrant > 3` or the child would exceed [`Self::MAX_LOD`].
    #[must_use]
    pub fn child(&self, quadrant: usize) -> TileAddress {
        assert!(quadrant < 4, "quadrant {quadrant} out of range");
        assert!(
            self.lod < Self::MAX_LOD,
            "cannot subdivide past MAX_LOD {}",
            Self::MAX_LOD
        );
        TileAddress {
            face: self.face,
            lod: self.lod + 1,
            x: self.x * 2 + (quadrant % 2) as u32,
            y: self.y * 2 + (quadrant / 2) as u32,
        }
    }

    /// All four children in quadrant order.
    #[must_use]
    pub fn children(&self) -> [TileAddress; 4] {
        [self.child(0), self.child(1), self.child(2), self.child(3)]
    }

    /// The tile one level up, or `None` for a face root.
    #[must_use]
    pub fn parent(&self) -> Option<TileAddress> {
        if self.lod == 0 {
            return None;
        }
        Some(TileAddress {
            face: self.face,
            lod: self.lod - 1,
            x: self.x / 2,
            y: self.y / 2,
        })
    }

    /// Which quadrant of its parent this tile occupies.
    #[must_use]
    pub fn quadrant(&self) -> usize {
        (self.x % 2 + (self.y % 2) * 2) as usize
    }

    /// Whether `other` lies inside this tile (or is this tile).
    #[must_use]
    pub fn contains(&self, other: &TileAddress) -> bool {
        if self.face != other.face || other.lod < self.lod {
            return false;
        }
        let shift = other.lod - self.lod;
        other.x >> shift == self.x && other.y >> shift == self.y
    }

    /// Edge length of the tile in face-local `[-1, 1]` units.
    #[must_use]
    pub fn face_scale(&self) -> f64 {
        2.0 / self.tiles_per_side() as f64
    }

    /// Lower-left corner of the tile in face-local `[-1, 1]` units.
    #[must_use]
    pub fn face_origin(&self) -> (f64, f64) {
        let scale = self.face_scale();
        (-1.0 + scale * self.x as f64, -1.0 + scale * self.y as f64)
    }

    /// The tile's quadkey: one base-4 digit per level, most significant
    /// first, each digit `x_bit + 2 * y_bit`. The face root has an empty key.
    #[must_use]
    pub fn quadkey(&self) -> String {
        (1..=self.lod)
            .rev()
            .map(|level| {
                let mask = 1u32 << (level - 1);
                let mut digit = 0u8;
                if self.x & mask != 0 {
                    digit += 1;
                }
                if self.y & mask != 0 {
                    digit += 2;
                }
                char::from(b'0' + digit)
            })
            .collect()
    }

    /// Decode a quadkey produced by [`Self::quadkey`] on the given face.
    pub fn from_quadkey(face: CubeFace, key: &str) -> Result<TileAddress, QuadkeyError> {
        let lod = key.chars().count();
        if lod > Self::MAX_LOD as usize {
            return Err(QuadkeyError::TooLong(lod));
        }
        let (mut x, mut y) = (0u32, 0u32);
        for (position, digit) in key.chars().enumerate() {
            let mask = 1u32 << (lod - 1 - position);
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
        Ok(TileAddress {
            face,
            lod: lod as u8,
            x,
            y,
        })
    }
}

impl std::fmt::Display for TileAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "face{}/lod{}/({}, {})",
            self.face.index(),
            self.lod,
            self.x,
            self.y
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_coordinates_derive_from_parent() {
        let parent = TileAddress::new(CubeFace::PosZ, 3, 5, 2);
        let children = parent.children();
        let expected = [(10, 4), (11, 4), (10, 5), (11, 5)];
        for (i, (child, (x, y))) in children.iter().zip(expected).enumerate() {
            assert_eq!(child.lod, parent.lod + 1, "child {i} has wrong lod");
            assert_eq!((child.x, child.y), (x, y), "child {i} has wrong coords");
            assert_eq!(child.quadrant(), i);
            assert_eq!(child.parent(), Some(parent));
        }
    }

    #[test]
    fn test_root_has_no_parent() {
        let root = TileAddress::root(CubeFace::NegY);
        assert_eq!(root.parent(), None);
        assert_eq!(root.tiles_per_side(), 1);
        assert_eq!(root.quadkey(), "");
    }

    #[test]
    fn test_face_rect_covers_face() {
        let root = TileAddress::root(CubeFace::PosX);
        assert_eq!(root.face_origin(), (-1.0, -1.0));
        assert_eq!(root.face_scale(), 2.0);

        let ne = root.child(3);
        assert_eq!(ne.face_origin(), (0.0, 0.0));
        assert_eq!(ne.face_scale(), 1.0);
    }

    #[test]
    fn test_quadkey_digits() {
        let addr = TileAddress::new(CubeFace::PosX, 3, 3, 5);
        // x = 011, y = 101 -> digits (0+2, 1+0, 1+2)
        assert_eq!(addr.quadkey(), "213");
    }

    #[test]
    fn test_quadkey_roundtrip() {
        let addr = TileAddress::new(CubeFace::NegZ, 7, 93, 41);
        let key = addr.quadkey();
        assert_eq!(key.len(), 7);
        assert_eq!(TileAddress::from_quadkey(CubeFace::NegZ, &key), Ok(addr));
    }

    #[test]
    fn test_quadkey_rejects_bad_digit() {
        let err = TileAddress::from_quadkey(CubeFace::PosX, "0142").unwrap_err();
        assert_eq!(
            err,
            QuadkeyError::InvalidDigit {
                digit: '4',
                position: 2
            }
        );
    }

    #[test]
    fn test_contains() {
        let parent = TileAddress::new(CubeFace::PosY, 2, 1, 3);
        let grandchild = parent.child(2).child(1);
        assert!(parent.contains(&grandchild));
        assert!(parent.contains(&parent));
        assert!(!grandchild.contains(&parent));
        assert!(!TileAddress::new(CubeFace::PosY, 2, 0, 3).contains(&grandchild));
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_new_rejects_out_of_range() {
        let _ = TileAddress::new(CubeFace::PosX, 2, 4, 0);
    }
}
