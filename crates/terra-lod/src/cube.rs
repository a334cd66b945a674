//! The planet cube: six face quadtrees driven by a deferred request loop.
//!
//! Each frame, [`PlanetCube::update`] handles pending map tile requests,
//! schedules merges for over-detailed subtrees and then handles structural
//! requests. [`PlanetCube::render`] walks the trees; every node decides from
//! its own renderable whether to draw itself, recurse, or ask for more data.
//! All tree mutation happens inside `update`, bounded to the requests that
//! were queued when the frame began.

use glam::{DMat4, DVec3};
use rustc_hash::FxHashSet;
use terra_cubesphere::{CubeFace, TileAddress};
use tracing::{debug, trace};

use crate::{
    CameraView, FaceTree, Frustum, LodConfig, LodConfigError, LodParams, NodeArena, NodeId,
    Planet, QuadtreeNode, Request, RequestKind, RequestOrder, RequestQueue, TileCache,
    TileRenderer,
};

/// Which of the two request queues to handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum QueueKind {
    /// Map tile requests, handled even when the tree is frozen.
    Render,
    /// Renderable, split and merge requests.
    Inline,
}

/// Snapshot of cube bookkeeping for diagnostics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CubeStats {
    /// Frames rendered so far.
    pub frame: u64,
    /// Live quadtree nodes across all faces.
    pub nodes: usize,
    /// Nodes whose children are all leaves.
    pub open_nodes: usize,
    /// Nodes holding a renderable.
    pub renderables: usize,
    /// Nodes holding their own map tile.
    pub map_tiles: usize,
    /// Nodes paged out.
    pub paged_out: usize,
    /// Deepest live level.
    pub max_lod: u8,
    /// Queued map tile requests.
    pub render_requests: usize,
    /// Queued renderable, split and merge requests.
    pub inline_requests: usize,
}

/// Six face quadtrees over a cube-projected sphere.
pub struct PlanetCube<C: TileCache> {
    pub(crate) config: LodConfig,
    pub(crate) planet: Planet,
    pub(crate) max_lod_ratio: u8,

    pub(crate) faces: [FaceTree; 6],
    pub(crate) nodes: NodeArena<QuadtreeNode<C::Tile>>,
    pub(crate) cache: C,

    pub(crate) render_requests: RequestQueue,
    pub(crate) inline_requests: RequestQueue,
    pub(crate) open_nodes: FxHashSet<NodeId>,

    pub(crate) params: LodParams,
    pub(crate) frustum: Option<Frustum>,
    pub(crate) frame_counter: u64,
    lod_freeze: bool,
    tree_freeze: bool,
}

impl<C: TileCache> PlanetCube<C> {
    /// Create the six face roots for `planet`, fetching imagery from `cache`.
    pub fn new(config: LodConfig, planet: Planet, cache: C) -> Result<Self, LodConfigError> {
        config.validate()?;
        planet.validate()?;
        let mut nodes = NodeArena::new();
        let faces = CubeFace::ALL.map(|face| {
            let root = nodes.insert(QuadtreeNode::new(TileAddress::root(face), None, 0));
            FaceTree::new(face, root)
        });
        debug!(
            radius = planet.radius,
            grid_size = config.grid_size,
            lod_limit = config.lod_limit,
            "Created planet cube"
        );
        Ok(Self {
            max_lod_ratio: config.max_lod_ratio(),
            config,
            planet,
            faces,
            nodes,
            cache,
            render_requests: RequestQueue::new(),
            inline_requests: RequestQueue::new(),
            open_nodes: FxHashSet::default(),
            params: LodParams::default(),
            frustum: None,
            frame_counter: 0,
            lod_freeze: false,
            tree_freeze: false,
        })
    }

    /// Set the vertical field of view (radians) and viewport height (pixels)
    /// that scale screen-space error.
    pub fn set_parameters(&mut self, fovy: f64, viewport_height: f64) {
        self.params
            .set_projection(&self.config, fovy, viewport_height);
    }

    /// Supply the view-projection matrix used when frustum culling is on.
    pub fn set_view_projection(&mut self, view_projection: &DMat4) {
        if self.config.frustum_culling {
            self.frustum = Some(Frustum::from_view_projection(view_projection));
        }
    }

    /// Stop following the camera; LOD decisions keep the last camera.
    pub fn set_lod_freeze(&mut self, freeze: bool) {
        self.lod_freeze = freeze;
    }

    /// Stop splitting, merging and rebuilding renderables. Map tile
    /// requests are still handled.
    pub fn set_tree_freeze(&mut self, freeze: bool) {
        self.tree_freeze = freeze;
    }

    /// Advance the tree towards the detail wanted from `camera`.
    pub fn update(&mut self, camera: &CameraView) {
        if !self.lod_freeze {
            self.params.set_camera(camera, &self.planet);
        }

        self.handle_requests(QueueKind::Render);

        if !self.tree_freeze {
            self.prune_tree();
            self.handle_requests(QueueKind::Inline);
        }
    }

    /// Walk all six trees, drawing visible tiles and queueing work for
    /// tiles that need more detail.
    pub fn render<R: TileRenderer<C::Tile>>(&mut self, renderer: &mut R) {
        for tree in self.faces {
            let root = tree.root();
            if self.will_render(root) {
                self.render_node(root, renderer);
            }
        }
        self.frame_counter += 1;
    }

    pub(crate) fn request(&mut self, node: NodeId, kind: RequestKind, priority: bool) {
        trace!(node = %node, kind = ?kind, priority, "Queued request");
        let request = Request { node, kind };
        match kind {
            RequestKind::MapTile => self.render_requests.push(request, priority),
            _ => self.inline_requests.push(request, priority),
        }
    }

    pub(crate) fn unrequest(&mut self, node: NodeId) {
        self.render_requests.unrequest(node);
        self.inline_requests.unrequest(node);
    }

    fn handle_requests(&mut self, queue: QueueKind) {
        let mut batch = match queue {
            QueueKind::Render => self.render_requests.take_batch(),
            QueueKind::Inline => self.inline_requests.take_batch(),
        };
        if batch.is_empty() {
            return;
        }
        if self.config.request_order == RequestOrder::ViewPriority {
            let mut keyed: Vec<(f64, Request)> = batch
                .drain(..)
                .map(|request| (self.node_priority(request.node), request))
                .collect();
            keyed.sort_by(|a, b| b.0.total_cmp(&a.0));
            batch.extend(keyed.into_iter().map(|(_, request)| request));
        }

        for request in batch {
            // Destroyed since it was queued.
            if !self.nodes.contains(request.node) {
                continue;
            }
            match request.kind {
                RequestKind::Renderable => self.handle_renderable(request.node),
                RequestKind::MapTile => self.handle_map_tile(request.node),
                RequestKind::Split => self.handle_split(request.node),
                RequestKind::Merge => self.handle_merge(request.node),
            }
        }
    }

    /// Schedule merges for open nodes that have not needed their children
    /// for longer than the holdoff. Stale paged-out nodes are asked to
    /// rebuild their renderable first.
    fn prune_tree(&mut self) {
        let frame = self.frame_counter;
        let holdoff = self.config.merge_holdoff_frames;
        let candidates: Vec<NodeId> = self.open_nodes.iter().copied().collect();
        for id in candidates {
            let node = &mut self.nodes[id];
            if node.request_merge || frame.saturating_sub(node.last_opened) <= holdoff {
                continue;
            }
            // No longer reached by the walk: restore its renderable so it
            // can be judged like any other merge candidate.
            if node.page_out {
                if !node.request_renderable {
                    node.request_renderable = true;
                    self.request(id, RequestKind::Renderable, true);
                }
                continue;
            }
            let Some(renderable) = node.renderable.as_mut() else {
                continue;
            };
            renderable.set_frame_of_reference(
                &self.params,
                self.frustum.as_ref(),
                self.planet.radius,
                self.config.texture_size,
            );
            // Children must be too detailed, not merely invisible.
            let coarse_enough = renderable.is_far_away()
                || (renderable.is_in_lod_range() && renderable.is_in_mip_range());
            if coarse_enough {
                node.request_merge = true;
                self.request(id, RequestKind::Merge, true);
            } else {
                node.last_opened = frame;
            }
        }
    }

    /// Ordering key of a node: its renderable's priority, else the nearest
    /// ancestor's, else zero.
    pub fn node_priority(&self, id: NodeId) -> f64 {
        let mut current = self.nodes.get(id);
        while let Some(node) = current {
            if let Some(renderable) = &node.renderable {
                return renderable.lod_priority();
            }
            current = node.parent.and_then(|parent| self.nodes.get(parent));
        }
        0.0
    }

    pub fn config(&self) -> &LodConfig {
        &self.config
    }

    pub fn planet(&self) -> &Planet {
        &self.planet
    }

    /// Camera-derived parameters of the current frame.
    pub fn lod_params(&self) -> &LodParams {
        &self.params
    }

    /// Camera position relative to the planet centre.
    pub fn camera_position(&self) -> DVec3 {
        self.params.camera_position
    }

    /// Frames rendered so far.
    pub fn frame_counter(&self) -> u64 {
        self.frame_counter
    }

    /// The six face trees in face order.
    pub fn faces(&self) -> &[FaceTree; 6] {
        &self.faces
    }

    /// Root node of `face`.
    pub fn root(&self, face: CubeFace) -> NodeId {
        self.faces[face.index() as usize].root()
    }

    /// Look up a live node.
    pub fn node(&self, id: NodeId) -> Option<&QuadtreeNode<C::Tile>> {
        self.nodes.get(id)
    }

    /// All live nodes.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &QuadtreeNode<C::Tile>)> {
        self.nodes.iter()
    }

    /// Merge candidates: nodes whose children are all leaves.
    pub fn open_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.open_nodes.iter().copied()
    }

    /// Queued map tile requests.
    pub fn render_queue(&self) -> &RequestQueue {
        &self.render_requests
    }

    /// Queued renderable, split and merge requests.
    pub fn inline_queue(&self) -> &RequestQueue {
        &self.inline_requests
    }

    /// Queued requests for `node` across both queues.
    pub fn pending_requests(&self, node: NodeId) -> usize {
        self.render_requests.count_for(node) + self.inline_requests.count_for(node)
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut C {
        &mut self.cache
    }

    /// Gather bookkeeping counts.
    pub fn stats(&self) -> CubeStats {
        let mut stats = CubeStats {
            frame: self.frame_counter,
            nodes: self.nodes.len(),
            open_nodes: self.open_nodes.len(),
            render_requests: self.render_requests.len(),
            inline_requests: self.inline_requests.len(),
            ..CubeStats::default()
        };
        for (_, node) in self.nodes.iter() {
            stats.renderables += usize::from(node.renderable.is_some());
            stats.map_tiles += usize::from(node.map_tile.is_some());
            stats.paged_out += usize::from(node.page_out);
            stats.max_lod = stats.max_lod.max(node.address.lod);
        }
        stats
    }
}

impl<C: TileCache> Drop for PlanetCube<C> {
    fn drop(&mut self) {
        for tree in self.faces {
            if self.nodes.contains(tree.root()) {
                self.destroy_node(tree.root());
            }
        }
    }
}
