//! Deferred per-node work items.

use std::collections::VecDeque;

use crate::NodeId;

/// What a queued request asks the cube to do for a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RequestKind {
    /// Build (or rebuild) the node's renderable.
    Renderable,
    /// Fetch the node's own map tile.
    MapTile,
    /// Create the node's four children.
    Split,
    /// Destroy the node's children.
    Merge,
}

/// A node handle paired with the work requested for it.
///
/// Requests reference nodes without owning them; a request whose node has
/// been destroyed is skipped when handled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Request {
    /// Target node.
    pub node: NodeId,
    /// Requested work.
    pub kind: RequestKind,
}

/// FIFO queue of requests, with front insertion for priority work.
#[derive(Debug, Default)]
pub struct RequestQueue {
    entries: VecDeque<Request>,
}

impl RequestQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue `request` at the front if `priority`, else at the back.
    pub fn push(&mut self, request: Request, priority: bool) {
        if priority {
            self.entries.push_front(request);
        } else {
            self.entries.push_back(request);
        }
    }

    /// Take every queued request, leaving the queue empty.
    ///
    /// A frame handles exactly this batch; anything pushed while the batch is
    /// being handled stays queued for the next frame.
    pub fn take_batch(&mut self) -> VecDeque<Request> {
        std::mem::take(&mut self.entries)
    }

    /// Remove every request for `node`. Returns how many were removed.
    pub fn unrequest(&mut self, node: NodeId) -> usize {
        let before = self.entries.len();
        self.entries.retain(|request| request.node != node);
        before - self.entries.len()
    }

    /// Number of queued requests for `node`.
    pub fn count_for(&self, node: NodeId) -> usize {
        self.entries
            .iter()
            .filter(|request| request.node == node)
            .count()
    }

    /// Queued requests, front first.
    pub fn iter(&self) -> impl Iterator<Item = &Request> {
        self.entries.iter()
    }

    /// Number of queued requests.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
