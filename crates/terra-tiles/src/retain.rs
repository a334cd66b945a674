//! Recently released tiles kept for reuse.

use std::collections::VecDeque;
use std::sync::Arc;

use image::RgbaImage;
use terra_cubesphere::TileAddress;

/// Bounded least-recently-used set of decoded tiles.
///
/// When a node is merged away its imagery lands here, so splitting the same
/// node again does not refetch it.
#[derive(Debug)]
pub struct RetainedTiles {
    capacity: usize,
    entries: VecDeque<(TileAddress, Arc<RgbaImage>)>,
}

impl RetainedTiles {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    /// Retain `image`, evicting the least recently retained tile when full.
    pub fn insert(&mut self, address: TileAddress, image: Arc<RgbaImage>) {
        if self.capacity == 0 {
            return;
        }
        self.entries.retain(|(retained, _)| *retained != address);
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back((address, image));
    }

    /// Remove and return the tile for `address`.
    pub fn take(&mut self, address: TileAddress) -> Option<Arc<RgbaImage>> {
        let position = self
            .entries
            .iter()
            .position(|(retained, _)| *retained == address)?;
        self.entries.remove(position).map(|(_, image)| image)
    }

    pub fn contains(&self, address: TileAddress) -> bool {
        self.entries.iter().any(|(retained, _)| *retained == address)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
