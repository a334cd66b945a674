//! Tile cache doubles for exercising the cube without I/O.

use rustc_hash::FxHashSet;
use terra_cubesphere::TileAddress;

use crate::{MapTile, NodeId, TileCache};

#[derive(Debug)]
pub(crate) struct MockTile {
    node: NodeId,
    address: TileAddress,
}

impl MapTile for MockTile {
    fn node(&self) -> NodeId {
        self.node
    }

    fn address(&self) -> TileAddress {
        self.address
    }
}

/// How a [`MockCache`] answers readiness polls.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Readiness {
    Always,
    Never,
}

pub(crate) struct MockCache {
    readiness: Readiness,
    failed: FxHashSet<TileAddress>,
    pub(crate) polls: usize,
    pub(crate) finalized: Vec<TileAddress>,
    pub(crate) deleted: Vec<TileAddress>,
}

impl MockCache {
    pub(crate) fn new(readiness: Readiness) -> Self {
        Self {
            readiness,
            failed: FxHashSet::default(),
            polls: 0,
            finalized: Vec::new(),
            deleted: Vec::new(),
        }
    }

    pub(crate) fn ready() -> Self {
        Self::new(Readiness::Always)
    }

    pub(crate) fn never_ready() -> Self {
        Self::new(Readiness::Never)
    }

    /// Make `address` permanently unavailable.
    pub(crate) fn fail(mut self, address: TileAddress) -> Self {
        self.failed.insert(address);
        self
    }
}

impl TileCache for MockCache {
    type Tile = MockTile;

    fn prepare_tile(&mut self, _node: NodeId, address: TileAddress) -> bool {
        self.polls += 1;
        !self.failed.contains(&address) && self.readiness == Readiness::Always
    }

    fn finalize_tile(&mut self, node: NodeId, address: TileAddress) -> MockTile {
        assert!(
            self.readiness == Readiness::Always && !self.failed.contains(&address),
            "finalize before ready"
        );
        self.finalized.push(address);
        MockTile { node, address }
    }

    fn delete_node(&mut self, _node: NodeId, address: TileAddress) {
        self.deleted.push(address);
    }

    fn has_failed(&self, address: TileAddress) -> bool {
        self.failed.contains(&address)
    }
}
