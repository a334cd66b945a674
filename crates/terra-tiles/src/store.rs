//! Asynchronous tile cache backed by a worker pool.
//!
//! Fetches run on background threads and report through a channel that is
//! drained whenever the cube polls a tile, so completions never touch the
//! tree directly. Failures back off according to a [`RetryPolicy`] and are
//! marked failed once it is exhausted.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded, unbounded};
use image::RgbaImage;
use rustc_hash::FxHashMap;
use terra_cubesphere::TileAddress;
use terra_lod::{MapTile, NodeId, TileCache};
use tracing::{debug, trace, warn};

use crate::{RetainedTiles, RetryPolicy, TileError, TileSource};

/// Worker pool and retention settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StoreConfig {
    /// Worker threads; zero picks one per spare core.
    pub worker_threads: usize,
    /// Jobs waiting for a worker before submissions are deferred.
    pub queue_capacity: usize,
    pub retry: RetryPolicy,
    /// Released tiles kept for reuse.
    pub retain_capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            worker_threads: 0,
            queue_capacity: 64,
            retry: RetryPolicy::default(),
            retain_capacity: 128,
        }
    }
}

/// Lifecycle of one tile in the store.
#[derive(Clone, Debug)]
pub enum EntryState {
    /// Submitted to the workers.
    Queued,
    /// Waiting to be submitted, after a failure or a full queue.
    Backoff { until: Instant },
    Ready(Arc<RgbaImage>),
    /// Retry policy exhausted.
    Failed,
}

/// Counters for diagnostics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Jobs handed to workers.
    pub submitted: u64,
    /// Tiles that became ready from a fetch.
    pub completed: u64,
    /// Fetch attempts that failed.
    pub failures: u64,
    /// Tiles served from the retained set.
    pub reused: u64,
    /// Live entries.
    pub entries: usize,
    /// Tiles retained for reuse.
    pub retained: usize,
}

/// Decoded imagery bound to the node that requested it.
#[derive(Clone, Debug)]
pub struct TileHandle {
    node: NodeId,
    address: TileAddress,
    image: Arc<RgbaImage>,
}

impl TileHandle {
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }
}

impl MapTile for TileHandle {
    fn node(&self) -> NodeId {
        self.node
    }

    fn address(&self) -> TileAddress {
        self.address
    }
}

struct Job {
    address: TileAddress,
    cancelled: Arc<AtomicBool>,
}

struct Completion {
    address: TileAddress,
    result: Result<RgbaImage, TileError>,
}

struct Entry {
    node: NodeId,
    state: EntryState,
    failures: u32,
    cancelled: Arc<AtomicBool>,
}

/// [`TileCache`] that fetches from a [`TileSource`] on worker threads.
pub struct TileStore<S: TileSource> {
    source: Arc<S>,
    jobs: Option<Sender<Job>>,
    completions: Receiver<Completion>,
    workers: Vec<JoinHandle<()>>,
    entries: FxHashMap<TileAddress, Entry>,
    retained: RetainedTiles,
    retry: RetryPolicy,
    stats: StoreStats,
}

impl<S: TileSource> TileStore<S> {
    /// Spawn the worker pool.
    pub fn new(source: S, config: StoreConfig) -> Result<Self, TileError> {
        let threads = match config.worker_threads {
            0 => num_cpus::get().saturating_sub(2).max(1),
            n => n,
        };
        let source = Arc::new(source);
        let (job_sender, job_receiver) = bounded::<Job>(config.queue_capacity.max(1));
        let (completion_sender, completions) = unbounded::<Completion>();

        let mut workers = Vec::with_capacity(threads);
        for index in 0..threads {
            let receiver = job_receiver.clone();
            let sender = completion_sender.clone();
            let source = Arc::clone(&source);
            let handle = std::thread::Builder::new()
                .name(format!("tile-worker-{index}"))
                .spawn(move || {
                    while let Ok(job) = receiver.recv() {
                        if job.cancelled.load(Ordering::Relaxed) {
                            continue;
                        }
                        let result = source.fetch(job.address);
                        if job.cancelled.load(Ordering::Relaxed) {
                            continue;
                        }
                        if sender
                            .send(Completion {
                                address: job.address,
                                result,
                            })
                            .is_err()
                        {
                            break;
                        }
                    }
                })?;
            workers.push(handle);
        }
        debug!(threads, queue = config.queue_capacity, "Started tile workers");

        Ok(Self {
            source,
            jobs: Some(job_sender),
            completions,
            workers,
            entries: FxHashMap::default(),
            retained: RetainedTiles::new(config.retain_capacity),
            retry: config.retry,
            stats: StoreStats::default(),
        })
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// State of the entry for `address`, if one is live.
    pub fn state(&self, address: TileAddress) -> Option<&EntryState> {
        self.entries.get(&address).map(|entry| &entry.state)
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            entries: self.entries.len(),
            retained: self.retained.len(),
            ..self.stats
        }
    }

    /// Apply every completion the workers have reported so far.
    pub fn poll(&mut self) {
        let now = Instant::now();
        while let Ok(Completion { address, result }) = self.completions.try_recv() {
            // Deleted while in flight.
            let Some(entry) = self.entries.get_mut(&address) else {
                continue;
            };
            if !matches!(entry.state, EntryState::Queued) {
                continue;
            }
            match result {
                Ok(image) => {
                    entry.state = EntryState::Ready(Arc::new(image));
                    entry.failures = 0;
                    self.stats.completed += 1;
                    trace!(%address, "Tile fetched");
                }
                Err(error) => {
                    entry.failures += 1;
                    self.stats.failures += 1;
                    if self.retry.exhausted(entry.failures) {
                        warn!(%address, %error, attempts = entry.failures, "Giving up on tile");
                        entry.state = EntryState::Failed;
                    } else {
                        let delay = self.retry.backoff(entry.failures);
                        debug!(%address, %error, ?delay, "Tile fetch failed, retrying");
                        entry.state = EntryState::Backoff { until: now + delay };
                    }
                }
            }
        }
    }

    fn submit(&mut self, address: TileAddress) {
        let Some(jobs) = &self.jobs else {
            return;
        };
        let Some(entry) = self.entries.get_mut(&address) else {
            return;
        };
        let job = Job {
            address,
            cancelled: Arc::clone(&entry.cancelled),
        };
        match jobs.try_send(job) {
            Ok(()) => {
                entry.state = EntryState::Queued;
                self.stats.submitted += 1;
            }
            Err(TrySendError::Full(_)) => {
                entry.state = EntryState::Backoff {
                    until: Instant::now(),
                };
            }
            Err(TrySendError::Disconnected(_)) => {
                warn!(%address, "Tile workers are gone");
                entry.state = EntryState::Failed;
            }
        }
    }
}

impl<S: TileSource> TileCache for TileStore<S> {
    type Tile = TileHandle;

    fn prepare_tile(&mut self, node: NodeId, address: TileAddress) -> bool {
        self.poll();

        if !self.entries.contains_key(&address) {
            let state = match self.retained.take(address) {
                Some(image) => {
                    self.stats.reused += 1;
                    trace!(%address, "Reusing retained tile");
                    EntryState::Ready(image)
                }
                None => EntryState::Backoff {
                    until: Instant::now(),
                },
            };
            self.entries.insert(
                address,
                Entry {
                    node,
                    state,
                    failures: 0,
                    cancelled: Arc::new(AtomicBool::new(false)),
                },
            );
        }

        let due = match &self.entries[&address].state {
            EntryState::Ready(_) => return true,
            EntryState::Queued | EntryState::Failed => false,
            EntryState::Backoff { until } => Instant::now() >= *until,
        };
        if due {
            self.submit(address);
        }
        false
    }

    fn finalize_tile(&mut self, node: NodeId, address: TileAddress) -> TileHandle {
        let Some(Entry {
            state: EntryState::Ready(image),
            ..
        }) = self.entries.get(&address)
        else {
            panic!("finalize_tile called before {address} was ready");
        };
        TileHandle {
            node,
            address,
            image: Arc::clone(image),
        }
    }

    fn delete_node(&mut self, node: NodeId, address: TileAddress) {
        let Some(entry) = self.entries.remove(&address) else {
            return;
        };
        if entry.node != node {
            trace!(%address, "Releasing tile requested by an earlier node");
        }
        entry.cancelled.store(true, Ordering::Relaxed);
        if let EntryState::Ready(image) = entry.state {
            self.retained.insert(address, image);
        }
    }

    fn has_failed(&self, address: TileAddress) -> bool {
        matches!(
            self.entries.get(&address).map(|entry| &entry.state),
            Some(EntryState::Failed)
        )
    }
}

impl<S: TileSource> Drop for TileStore<S> {
    fn drop(&mut self) {
        for entry in self.entries.values() {
            entry.cancelled.store(true, Ordering::Relaxed);
        }
        // Closing the job channel ends every worker loop.
        self.jobs = None;
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                warn!("Tile worker panicked");
            }
        }
    }
}
