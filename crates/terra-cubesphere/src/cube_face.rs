//! The six faces of the cube and their local-to-world transforms.

use glam::{DMat3, DVec3};

use crate::CubeFaceError;

/// The six faces of the cube that forms the planet.
///
/// A face maps local coordinates `(s, t, 1)`, with `s, t` in `[-1, 1]`, onto
/// the cube surface through [`CubeFace::face_transform`]. The discriminant is
/// the face index used in tile paths and quadtree identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum CubeFace {
    /// +X face
    PosX = 0,
    /// −X face
    NegX = 1,
    /// +Y face
    PosY = 2,
    /// −Y face
    NegY = 3,
    /// +Z face
    PosZ = 4,
    /// −Z face
    NegZ = 5,
}

impl CubeFace {
    /// All six faces in index order.
    pub const ALL: [CubeFace; 6] = [
        CubeFace::PosX,
        CubeFace::NegX,
        CubeFace::PosY,
        CubeFace::NegY,
        CubeFace::PosZ,
        CubeFace::NegZ,
    ];

    /// Look up a face by its index.
    pub fn from_index(index: u8) -> Result<CubeFace, CubeFaceError> {
        Self::ALL
            .get(index as usize)
            .copied()
            .ok_or(CubeFaceError(index))
    }

    /// The face index, `0..6`.
    #[must_use]
    pub fn index(self) -> u8 {
        self as u8
    }

    /// The opposite face (e.g., `PosX` → `NegX`).
    #[must_use]
    pub fn opposite(self) -> CubeFace {
        match self {
            CubeFace::PosX => CubeFace::NegX,
            CubeFace::NegX => CubeFace::PosX,
            CubeFace::PosY => CubeFace::NegY,
            CubeFace::NegY => CubeFace::PosY,
            CubeFace::PosZ => CubeFace::NegZ,
            CubeFace::NegZ => CubeFace::PosZ,
        }
    }

    /// Rotation taking local `(s, t, 1)` to the cube surface.
    ///
    /// | face | `(s, t, 1)` maps to |
    /// |------|---------------------|
    /// | +X   | `(1, t, s)`         |
    /// | −X   | `(−1, t, −s)`       |
    /// | +Y   | `(s, 1, t)`         |
    /// | −Y   | `(s, −1, −t)`       |
    /// | +Z   | `(−s, t, 1)`        |
    /// | −Z   | `(s, t, −1)`        |
    #[must_use]
    pub fn face_transform(self) -> DMat3 {
        match self {
            CubeFace::PosX => DMat3::from_cols(DVec3::Z, DVec3::Y, DVec3::X),
            CubeFace::NegX => DMat3::from_cols(DVec3::NEG_Z, DVec3::Y, DVec3::NEG_X),
            CubeFace::PosY => DMat3::from_cols(DVec3::X, DVec3::Z, DVec3::Y),
            CubeFace::NegY => DMat3::from_cols(DVec3::X, DVec3::NEG_Z, DVec3::NEG_Y),
            CubeFace::PosZ => DMat3::from_cols(DVec3::NEG_X, DVec3::Y, DVec3::Z),
            CubeFace::NegZ => DMat3::from_cols(DVec3::X, DVec3::Y, DVec3::NEG_Z),
        }
    }

    /// Outward-pointing unit normal for this face.
    #[must_use]
    pub fn normal(self) -> DVec3 {
        self.face_transform().z_axis
    }

    /// Direction of increasing `s` on this face.
    #[must_use]
    pub fn tangent(self) -> DVec3 {
        self.face_transform().x_axis
    }

    /// Direction of increasing `t` on this face.
    #[must_use]
    pub fn bitangent(self) -> DVec3 {
        self.face_transform().y_axis
    }
}

impl std::fmt::Display for CubeFace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CubeFace::PosX => "+X",
            CubeFace::NegX => "-X",
            CubeFace::PosY => "+Y",
            CubeFace::NegY => "-Y",
            CubeFace::PosZ => "+Z",
            CubeFace::NegZ => "-Z",
        };
        f.write_str(name)
    }
}
