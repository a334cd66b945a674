//! Contract between the quadtree and whatever supplies map tile imagery.

use terra_cubesphere::TileAddress;

use crate::NodeId;

/// A finalized map tile bound to one node.
///
/// The cube owns the handle for as long as the node keeps its tile; dropping
/// the handle releases the binding.
pub trait MapTile {
    /// Node the tile was finalized for.
    fn node(&self) -> NodeId;

    /// Address of the imagery.
    fn address(&self) -> TileAddress;
}

/// Source of map tiles, polled from the frame loop.
///
/// Implementations may fetch in the background, but every method must return
/// without blocking on I/O.
pub trait TileCache {
    /// Handle produced by [`TileCache::finalize_tile`].
    type Tile: MapTile;

    /// Whether the tile for `node` is ready to finalize. Starts a fetch on
    /// first call; repeated calls only poll.
    fn prepare_tile(&mut self, node: NodeId, address: TileAddress) -> bool;

    /// Produce the tile handle.
    ///
    /// # Panics
    ///
    /// Implementations panic if called before `prepare_tile` returned `true`.
    fn finalize_tile(&mut self, node: NodeId, address: TileAddress) -> Self::Tile;

    /// Release everything held for `node`, cancelling any fetch in flight.
    fn delete_node(&mut self, node: NodeId, address: TileAddress);

    /// Whether the tile at `address` can never be produced.
    fn has_failed(&self, _address: TileAddress) -> bool {
        false
    }
}
