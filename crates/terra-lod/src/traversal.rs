//! Per-frame recursive walk of a face tree.

use tracing::trace;

use crate::{NodeId, PlanetCube, RequestKind, TileCache, TileDraw, TileRenderer, TileUniforms};

impl<C: TileCache> PlanetCube<C> {
    /// Whether the node can be drawn (or recursed through) this frame.
    /// Queues a renderable request if it cannot.
    pub(crate) fn will_render(&mut self, id: NodeId) -> bool {
        let frame = self.frame_counter;
        let node = &mut self.nodes[id];
        if node.renderable.is_some() {
            return true;
        }
        node.last_opened = frame;
        node.last_rendered = frame;

        if node.page_out && node.has_children {
            return true;
        }
        if !node.request_renderable {
            node.request_renderable = true;
            self.request(id, RequestKind::Renderable, false);
        }
        false
    }

    /// Draw the node or its descendants. Returns the depth of the shallowest
    /// drawn level below and including this node: 1 when the node drew
    /// itself or is clipped, 0 when it has nothing to draw.
    pub(crate) fn render_node<R: TileRenderer<C::Tile>>(
        &mut self,
        id: NodeId,
        renderer: &mut R,
    ) -> u32 {
        let frame = self.frame_counter;

        if self.nodes[id].page_out && self.nodes[id].has_children {
            self.nodes[id].last_opened = frame;
            let min_level = self.render_children(id, renderer);
            let node = &mut self.nodes[id];
            if !node.request_renderable && min_level <= 1 {
                node.request_renderable = true;
                self.request(id, RequestKind::Renderable, false);
            }
            return min_level + 1;
        }

        let node = &mut self.nodes[id];
        let Some(renderable) = node.renderable.as_mut() else {
            return 0;
        };
        renderable.set_frame_of_reference(
            &self.params,
            self.frustum.as_ref(),
            self.planet.radius,
            self.config.texture_size,
        );
        if renderable.is_clipped() {
            return 1;
        }

        let in_mip_range = renderable.is_in_mip_range();
        let in_lod_range = renderable.is_in_lod_range();
        let uses_own_tile = renderable.tile_node() == id;
        let mut recurse = false;

        // Imagery too coarse: recurse if the native tile is already in use,
        // otherwise fetch it unless a coarser fetch is already under way.
        if !in_mip_range {
            if node.map_tile.is_some() {
                recurse = uses_own_tile;
            } else if !self.ancestor_request_pending(id) {
                self.nodes[id].request_map_tile = true;
                self.request(id, RequestKind::MapTile, false);
            }
        }

        let node = &self.nodes[id];
        if (node.has_children || !node.request_map_tile) && !in_lod_range {
            recurse = true;
        }

        if recurse {
            self.nodes[id].last_opened = frame;
            let node = &self.nodes[id];
            if node.has_children {
                // Ask every child so all four are queued in the same frame.
                let mut children_ready = true;
                for child in node.children {
                    let ready = match child {
                        Some(child) => self.will_render(child),
                        None => false,
                    };
                    children_ready &= ready;
                }
                if children_ready {
                    let min_level = self.render_children(id, renderer);
                    if self.config.page_out && min_level > 1 {
                        self.try_page_out(id);
                    }
                    return min_level + 1;
                }
            } else if !node.request_split {
                self.nodes[id].request_split = true;
                self.request(id, RequestKind::Split, false);
            }
        }

        self.nodes[id].last_rendered = frame;
        self.render_self(id, renderer);
        1
    }

    fn render_children<R: TileRenderer<C::Tile>>(&mut self, id: NodeId, renderer: &mut R) -> u32 {
        let children = self.nodes[id].children;
        let mut min_level = u32::MAX;
        for child in children {
            let level = match child {
                Some(child) => self.render_node(child, renderer),
                None => 0,
            };
            min_level = min_level.min(level);
        }
        min_level
    }

    /// Whether this node or an ancestor below the nearest tile owner is
    /// already waiting for a map tile or renderable.
    fn ancestor_request_pending(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(ancestor) = current {
            let node = &self.nodes[ancestor];
            if node.map_tile.is_some() || node.page_out {
                return false;
            }
            if node.request_map_tile || node.request_renderable {
                return true;
            }
            current = node.parent;
        }
        false
    }

    /// Drop the node's own tile and renderable while its descendants cover
    /// it, provided no descendant samples that tile.
    fn try_page_out(&mut self, id: NodeId) {
        let node = &self.nodes[id];
        if node.map_tile.is_none() || self.tile_used_below(id, id) {
            return;
        }
        let address = node.address;
        self.nodes[id].page_out = true;
        self.destroy_renderable(id);
        self.destroy_map_tile(id);
        self.cache.delete_node(id, address);
        trace!(%address, "Paged out node");
    }

    fn tile_used_below(&self, id: NodeId, tile_node: NodeId) -> bool {
        self.nodes[id].children.into_iter().flatten().any(|child| {
            let node = &self.nodes[child];
            node.renderable
                .as_ref()
                .is_some_and(|r| r.tile_node() == tile_node)
                || self.tile_used_below(child, tile_node)
        })
    }

    fn render_self<R: TileRenderer<C::Tile>>(&self, id: NodeId, renderer: &mut R) {
        let node = &self.nodes[id];
        let Some(renderable) = node.renderable.as_ref() else {
            return;
        };
        let tile_node = renderable.tile_node();
        let Some(tile) = self.nodes.get(tile_node).and_then(|n| n.map_tile.as_ref()) else {
            panic!(
                "renderable of {} samples a released map tile",
                node.address
            );
        };

        let uniforms = TileUniforms::new(
            renderable.stuv_scale(),
            renderable.stuv_position(),
            node.address.face.face_transform(),
            renderable.color(),
            renderable.distance(),
        );
        renderer.bind_texture(tile, 0);
        renderer.draw_tile(&TileDraw {
            address: node.address,
            texture: renderable.tile_address(),
            uniforms,
        });
    }
}
