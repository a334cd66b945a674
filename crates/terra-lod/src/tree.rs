//! One quadtree per cube face.

use terra_cubesphere::CubeFace;

use crate::NodeId;

/// Root of the quadtree covering one face.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FaceTree {
    face: CubeFace,
    root: NodeId,
}

impl FaceTree {
    pub(crate) fn new(face: CubeFace, root: NodeId) -> Self {
        Self { face, root }
    }

    pub fn face(&self) -> CubeFace {
        self.face
    }

    pub fn root(&self) -> NodeId {
        self.root
    }
}
