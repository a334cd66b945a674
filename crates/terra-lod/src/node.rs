//! Quadtree nodes and the generational arena that owns them.

use std::ops::{Index, IndexMut};

use terra_cubesphere::TileAddress;

use crate::Renderable;

/// Handle to a node in a [`NodeArena`].
///
/// A slot index plus a generation. Freeing a slot bumps its generation, so a
/// handle kept by a request or a tile fetch never aliases a node created
/// later in the same slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl NodeId {
    /// Slot index, stable for the node's lifetime.
    #[must_use]
    pub fn index(self) -> u32 {
        self.index
    }

    /// Generation of the slot when this node was created.
    #[must_use]
    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

struct Slot<N> {
    generation: u32,
    value: Option<N>,
}

/// Slot storage with free-list reuse and generation checks.
pub struct NodeArena<N> {
    slots: Vec<Slot<N>>,
    free: Vec<u32>,
    len: usize,
}

impl<N> Default for NodeArena<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N> NodeArena<N> {
    /// Create an empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
        }
    }

    /// Store `value`, reusing a freed slot when one exists.
    pub fn insert(&mut self, value: N) -> NodeId {
        self.len += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.generation = slot.generation.wrapping_add(1);
            slot.value = Some(value);
            return NodeId {
                index,
                generation: slot.generation,
            };
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 1,
            value: Some(value),
        });
        NodeId {
            index,
            generation: 1,
        }
    }

    /// Remove and return the node, or `None` if `id` is stale.
    pub fn remove(&mut self, id: NodeId) -> Option<N> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let value = slot.value.take()?;
        self.free.push(id.index);
        self.len -= 1;
        Some(value)
    }

    /// Look up a live node.
    pub fn get(&self, id: NodeId) -> Option<&N> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.value.as_ref())
    }

    /// Look up a live node mutably.
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut N> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.value.as_mut())
    }

    /// Whether `id` refers to a live node.
    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the arena holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Iterate over live nodes in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &N)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.value.as_ref().map(|value| {
                (
                    NodeId {
                        index: index as u32,
                        generation: slot.generation,
                    },
                    value,
                )
            })
        })
    }
}

impl<N> Index<NodeId> for NodeArena<N> {
    type Output = N;

    /// # Panics
    ///
    /// Panics if `id` is stale. Tree links always point at live nodes.
    fn index(&self, id: NodeId) -> &N {
        match self.get(id) {
            Some(node) => node,
            None => panic!("stale node handle {id}"),
        }
    }
}

impl<N> IndexMut<NodeId> for NodeArena<N> {
    fn index_mut(&mut self, id: NodeId) -> &mut N {
        match self.get_mut(id) {
            Some(node) => node,
            None => panic!("stale node handle {id}"),
        }
    }
}

/// One tile of a face quadtree.
///
/// Identity is the tile address; the tree links (`parent`, `children`) are
/// arena handles. The `request_*` flags are set while a request for the node
/// is outstanding so it is queued at most once.
pub struct QuadtreeNode<T> {
    pub(crate) address: TileAddress,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: [Option<NodeId>; 4],
    pub(crate) has_children: bool,

    pub(crate) renderable: Option<Renderable>,
    pub(crate) map_tile: Option<T>,

    pub(crate) last_rendered: u64,
    pub(crate) last_opened: u64,

    pub(crate) page_out: bool,
    pub(crate) request_renderable: bool,
    pub(crate) request_map_tile: bool,
    pub(crate) request_split: bool,
    pub(crate) request_merge: bool,
}

impl<T> QuadtreeNode<T> {
    pub(crate) fn new(address: TileAddress, parent: Option<NodeId>, frame: u64) -> Self {
        Self {
            address,
            parent,
            children: [None; 4],
            has_children: false,
            renderable: None,
            map_tile: None,
            last_rendered: frame,
            last_opened: frame,
            page_out: false,
            request_renderable: false,
            request_map_tile: false,
            request_split: false,
            request_merge: false,
        }
    }

    /// Face, level and coordinates of this node.
    pub fn address(&self) -> TileAddress {
        self.address
    }

    /// Level of detail; 0 for a face root.
    pub fn lod(&self) -> u8 {
        self.address.lod
    }

    /// Parent handle, `None` for a face root.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Child handles in quadrant order (SW, SE, NW, NE).
    pub fn children(&self) -> [Option<NodeId>; 4] {
        self.children
    }

    /// Whether any child slot is occupied.
    pub fn has_children(&self) -> bool {
        self.has_children
    }

    /// Visibility state, present while the node can be drawn.
    pub fn renderable(&self) -> Option<&Renderable> {
        self.renderable.as_ref()
    }

    /// The node's own map tile, if one has been finalized.
    pub fn map_tile(&self) -> Option<&T> {
        self.map_tile.as_ref()
    }

    /// Frame the node was last drawn or asked to draw.
    pub fn last_rendered(&self) -> u64 {
        self.last_rendered
    }

    /// Frame the node last recursed into its children.
    pub fn last_opened(&self) -> u64 {
        self.last_opened
    }

    /// Whether the node dropped its own tile and always recurses.
    pub fn is_paged_out(&self) -> bool {
        self.page_out
    }

    pub fn requested_renderable(&self) -> bool {
        self.request_renderable
    }

    pub fn requested_map_tile(&self) -> bool {
        self.request_map_tile
    }

    pub fn requested_split(&self) -> bool {
        self.request_split
    }

    pub fn requested_merge(&self) -> bool {
        self.request_merge
    }

    pub(crate) fn recompute_has_children(&mut self) {
        self.has_children = self.children.iter().any(Option::is_some);
    }
}
