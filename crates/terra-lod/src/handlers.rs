//! Request handlers and the structural operations they perform.

use tracing::{debug, trace, warn};

use crate::{NodeId, PlanetCube, QuadtreeNode, Renderable, RequestKind, TileCache};

impl<C: TileCache> PlanetCube<C> {
    /// Give the node a renderable textured from the nearest map tile at most
    /// `max_lod_ratio` levels up; otherwise ask for the node's own tile.
    pub(crate) fn handle_renderable(&mut self, id: NodeId) {
        let lod = self.nodes[id].address.lod;

        let mut ancestor = id;
        while self.nodes[ancestor].map_tile.is_none() {
            match self.nodes[ancestor].parent {
                Some(parent) => ancestor = parent,
                None => break,
            }
        }

        let tile_lod = self.nodes[ancestor].address.lod;
        if self.nodes[ancestor].map_tile.is_some() && lod - tile_lod <= self.max_lod_ratio {
            self.destroy_renderable(id);
            self.create_renderable(id, ancestor);
            self.nodes[id].request_renderable = false;
            trace!(address = %self.nodes[id].address, tile_lod, "Built renderable");
        }

        let node = &mut self.nodes[id];
        if node.request_renderable && node.map_tile.is_none() && !node.request_map_tile {
            node.request_map_tile = true;
            self.request(id, RequestKind::MapTile, true);
        }
    }

    /// Poll the cache; once the tile is ready, bind it and rebuild every
    /// renderable that was sampling the coarser tile it replaces.
    pub(crate) fn handle_map_tile(&mut self, id: NodeId) {
        let address = self.nodes[id].address;
        if !self.cache.prepare_tile(id, address) {
            if self.cache.has_failed(address) {
                // request_map_tile stays set so the node keeps its ancestor's imagery.
                warn!(%address, "Map tile unavailable, keeping coarser imagery");
                return;
            }
            self.request(id, RequestKind::MapTile, true);
            return;
        }

        self.create_map_tile(id);
        let node = &mut self.nodes[id];
        node.request_map_tile = false;
        let previous_tile = node.renderable.as_ref().map(Renderable::tile_node);
        // Pushed even if a renderable request is outstanding: one may be
        // parked waiting on exactly this tile.
        node.request_renderable = true;
        self.request(id, RequestKind::Renderable, true);
        debug!(%address, "Map tile ready");

        if let Some(previous_tile) = previous_tile {
            self.refresh_map_tile(id, previous_tile);
        }
    }

    /// Re-request renderables below `id` that sample `tile_node`'s tile.
    fn refresh_map_tile(&mut self, id: NodeId, tile_node: NodeId) {
        let children = self.nodes[id].children;
        for child in children.into_iter().flatten() {
            let node = &mut self.nodes[child];
            let uses_tile = node
                .renderable
                .as_ref()
                .is_some_and(|r| r.tile_node() == tile_node);
            if !uses_tile {
                continue;
            }
            node.request_renderable = true;
            self.request(child, RequestKind::Renderable, true);
            self.refresh_map_tile(child, tile_node);
        }
    }

    pub(crate) fn handle_split(&mut self, id: NodeId) {
        // Past the limit the flag stays set so the split is never re-requested.
        if self.nodes[id].address.lod < self.config.lod_limit {
            self.split(id);
            self.nodes[id].request_split = false;
        }
    }

    pub(crate) fn handle_merge(&mut self, id: NodeId) {
        self.merge(id);
        self.nodes[id].request_merge = false;
    }

    /// Create the four children of a leaf and make it a merge candidate.
    ///
    /// Returns `false` if the node already has children.
    pub fn split(&mut self, id: NodeId) -> bool {
        if self.nodes[id].has_children {
            return false;
        }
        if let Some(parent) = self.nodes[id].parent {
            self.open_nodes.remove(&parent);
        }
        self.open_nodes.insert(id);

        let address = self.nodes[id].address;
        let frame = self.frame_counter;
        let children = address
            .children()
            .map(|child| Some(self.nodes.insert(QuadtreeNode::new(child, Some(id), frame))));
        let node = &mut self.nodes[id];
        node.children = children;
        node.has_children = true;
        debug!(%address, "Split node");
        true
    }

    /// Destroy the children of a node. The parent becomes a merge candidate
    /// again once none of its children is split.
    pub fn merge(&mut self, id: NodeId) {
        let children = self.nodes[id].children;
        for child in children.into_iter().flatten() {
            self.destroy_node(child);
        }
        let node = &mut self.nodes[id];
        node.children = [None; 4];
        node.has_children = false;
        let parent = node.parent;
        debug!(address = %node.address, "Merged node");

        self.open_nodes.remove(&id);
        if let Some(parent) = parent {
            let sibling_split = self.nodes[parent]
                .children
                .into_iter()
                .flatten()
                .any(|sibling| self.nodes[sibling].has_children);
            if !sibling_split {
                self.open_nodes.insert(parent);
            }
        }
    }

    /// Tear down a subtree, releasing requests and cache entries.
    pub(crate) fn destroy_node(&mut self, id: NodeId) {
        self.unrequest(id);

        let address = self.nodes[id].address;
        if let Some(parent) = self.nodes[id].parent
            && let Some(parent) = self.nodes.get_mut(parent)
        {
            parent.children[address.quadrant()] = None;
            parent.recompute_has_children();
        }

        self.cache.delete_node(id, address);
        self.destroy_map_tile(id);
        self.destroy_renderable(id);
        self.open_nodes.remove(&id);

        let children = self.nodes[id].children;
        for child in children.into_iter().flatten() {
            self.destroy_node(child);
        }
        self.nodes.remove(id);
    }

    /// # Panics
    ///
    /// Panics if the node already has a renderable.
    pub(crate) fn create_renderable(&mut self, id: NodeId, tile_node: NodeId) {
        let tile_address = self.nodes[tile_node].address;
        let node = &mut self.nodes[id];
        if node.renderable.is_some() {
            panic!("renderable already exists for {}", node.address);
        }
        node.page_out = false;
        node.renderable = Some(Renderable::new(
            node.address,
            tile_node,
            tile_address,
            &self.planet,
            self.config.grid_size,
        ));
        self.propagate_lod_distances(id);
    }

    pub(crate) fn destroy_renderable(&mut self, id: NodeId) {
        self.nodes[id].renderable = None;
        self.propagate_lod_distances(id);
    }

    /// # Panics
    ///
    /// Panics if the node already has a map tile.
    fn create_map_tile(&mut self, id: NodeId) {
        let address = self.nodes[id].address;
        if self.nodes[id].map_tile.is_some() {
            panic!("map tile already exists for {address}");
        }
        let tile = self.cache.finalize_tile(id, address);
        self.nodes[id].map_tile = Some(tile);
    }

    pub(crate) fn destroy_map_tile(&mut self, id: NodeId) {
        self.nodes[id].map_tile = None;
    }

    /// Push the largest child LOD distance into each renderable from `id`
    /// up to the root.
    fn propagate_lod_distances(&mut self, id: NodeId) {
        let mut current = Some(id);
        while let Some(id) = current {
            let node = &self.nodes[id];
            if node.renderable.is_some() {
                let max_child_distance = node
                    .children
                    .into_iter()
                    .flatten()
                    .filter_map(|child| self.nodes[child].renderable.as_ref())
                    .map(Renderable::lod_distance)
                    .fold(0.0, f64::max);
                if let Some(renderable) = self.nodes[id].renderable.as_mut() {
                    renderable.set_child_lod_distance(max_child_distance);
                }
            }
            current = self.nodes[id].parent;
        }
    }
}
