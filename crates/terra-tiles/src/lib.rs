//! Map tile imagery for the planet cube.
//!
//! [`TileStore`] implements [`terra_lod::TileCache`] on top of any
//! [`TileSource`], fetching tiles on a pool of worker threads. Sources
//! generate imagery, read pre-cut cube tiles, or resample web-mercator
//! tiles with [`MercatorSource`].

mod error;
pub mod mercator;
mod mercator_source;
mod retain;
mod retry;
mod source;
mod store;

pub use error::TileError;
pub use mercator_source::{MercatorDirectory, MercatorLayout, MercatorSource, MercatorTiles};
pub use retain::RetainedTiles;
pub use retry::RetryPolicy;
pub use source::{DirectorySource, ProceduralSource, TileLayout, TileSource};
pub use store::{EntryState, StoreConfig, StoreStats, TileHandle, TileStore};
