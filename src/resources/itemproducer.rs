//! Time-gated, concurrency-guarded fetch-and-spawn state machine.
//!
//! The [`ItemProducer`] resource owns the buffer of ready items and the
//! in-flight fetch cycle. [`ItemProducer::update`] is called once per frame
//! by [`item_producer_system`](crate::systems::itemproducer::item_producer_system)
//! and advances at most one transition:
//!
//! 1. less than `spawn_interval` since the last spawn: wait
//! 2. a fetch cycle is in flight: wait for it
//! 3. buffer empty: start a fetch cycle (at most one per `spawn_interval`)
//! 4. otherwise: pop the most recently fetched item and request a spawn
//!
//! Fetch cycles run on a worker thread ([`fetch_cycle`]) and report back over
//! a one-shot channel that is polled without blocking at the top of every
//! update.
//!
//! [`fetch_cycle`]: crate::systems::itemproducer::fetch_cycle

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use bevy_ecs::prelude::Resource;
use crossbeam_channel::{Receiver, RecvTimeoutError, TryRecvError, bounded};
use fastrand::Rng;
use log::{debug, error, info};

use crate::error::FeedError;
use crate::events::feed::{FeedMessage, ReadyItem, RemoteItem};
use crate::feed::source::ItemSource;
use crate::resources::assetcache::AssetCache;
use crate::resources::feedconfig::FeedConfig;
use crate::systems::itemproducer::fetch_cycle;

/// Coarse producer state, derived from the buffer and the in-flight cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProducerState {
    /// No fetch in flight and nothing buffered.
    Idle,
    /// A fetch cycle is in flight.
    Fetching,
    /// At least one item is buffered and no fetch is in flight.
    Ready,
}

/// Everything needed to materialize one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnRequest {
    pub item: RemoteItem,
    pub image_path: PathBuf,
    pub speed: f32,
}

/// What a single [`ItemProducer::update`] call did.
#[derive(Debug, Clone, PartialEq)]
pub enum ProducerStep {
    /// Inside the cadence window (or the fetch retry window); nothing happened.
    Waiting,
    /// A fetch cycle is still in flight; nothing happened.
    Fetching,
    /// A new fetch cycle was started.
    FetchStarted,
    /// An item was taken from the buffer and should be spawned.
    Spawn(SpawnRequest),
}

#[derive(Resource)]
pub struct ItemProducer {
    spawn_interval: f32,
    min_speed: f32,
    max_speed: f32,
    asset_timeout: Duration,
    last_spawn_time: f32,
    last_fetch_time: Option<f32>,
    buffer: Vec<ReadyItem>,
    in_flight: Option<Receiver<FeedMessage>>,
    cycles_started: u64,
    source: Arc<dyn ItemSource>,
    cache: AssetCache,
    rng: Rng,
}

impl ItemProducer {
    pub fn new(config: &FeedConfig, source: Arc<dyn ItemSource>, cache: AssetCache) -> Self {
        let rng = match config.seed {
            Some(seed) => Rng::with_seed(seed),
            None => Rng::new(),
        };
        Self {
            spawn_interval: config.spawn_interval,
            min_speed: config.min_speed,
            max_speed: config.max_speed,
            asset_timeout: config.request_timeout,
            last_spawn_time: 0.0,
            last_fetch_time: None,
            buffer: Vec::new(),
            in_flight: None,
            cycles_started: 0,
            source,
            cache,
            rng,
        }
    }

    /// Replace the speed generator, e.g. with a seeded one.
    pub fn with_rng(mut self, rng: Rng) -> Self {
        self.rng = rng;
        self
    }

    pub fn state(&self) -> ProducerState {
        if self.in_flight.is_some() {
            ProducerState::Fetching
        } else if self.buffer.is_empty() {
            ProducerState::Idle
        } else {
            ProducerState::Ready
        }
    }

    pub fn is_fetching(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn last_spawn_time(&self) -> f32 {
        self.last_spawn_time
    }

    pub fn spawn_interval(&self) -> f32 {
        self.spawn_interval
    }

    /// Number of fetch cycles started since construction.
    pub fn cycles_started(&self) -> u64 {
        self.cycles_started
    }

    pub fn asset_cache(&self) -> &AssetCache {
        &self.cache
    }

    /// Append ready items to the buffer; the last one pushed spawns first.
    pub fn push_ready(&mut self, items: impl IntoIterator<Item = ReadyItem>) {
        self.buffer.extend(items);
    }

    /// Advance the state machine for the frame at `current_time`.
    pub fn update(&mut self, current_time: f32) -> ProducerStep {
        self.poll_cycle();

        if current_time - self.last_spawn_time < self.spawn_interval {
            return ProducerStep::Waiting;
        }
        if self.in_flight.is_some() {
            return ProducerStep::Fetching;
        }

        let Some(ready) = self.buffer.pop() else {
            if let Some(started) = self.last_fetch_time {
                if current_time - started < self.spawn_interval {
                    return ProducerStep::Waiting;
                }
            }
            self.start_fetch(current_time);
            return ProducerStep::FetchStarted;
        };

        let speed = self.random_speed();
        self.last_spawn_time = current_time;
        debug!(
            "spawning item from @{} at t={} (speed {:.3}, {} left)",
            ready.item.author.screen_name,
            current_time,
            speed,
            self.buffer.len()
        );
        ProducerStep::Spawn(SpawnRequest {
            item: ready.item,
            image_path: ready.image_path,
            speed,
        })
    }

    /// Start a fetch cycle unless one is already in flight.
    ///
    /// Returns whether a cycle was started. Called by [`update`](Self::update)
    /// and once at startup to prefetch the first batch.
    pub fn start_fetch(&mut self, current_time: f32) -> bool {
        if self.in_flight.is_some() {
            return false;
        }
        self.last_fetch_time = Some(current_time);

        let (tx, rx) = bounded(1);
        let source = Arc::clone(&self.source);
        let cache = self.cache.clone();
        let asset_timeout = self.asset_timeout;
        let spawned = std::thread::Builder::new()
            .name("fetch-cycle".to_string())
            .spawn(move || fetch_cycle(source.as_ref(), &cache, asset_timeout, tx));

        match spawned {
            Ok(_) => {
                self.cycles_started += 1;
                self.in_flight = Some(rx);
                info!("fetch cycle #{} started at t={}", self.cycles_started, current_time);
                true
            }
            Err(e) => {
                error!("could not start fetch worker: {}", e);
                false
            }
        }
    }

    /// Block until the in-flight cycle settles or `timeout` passes.
    ///
    /// Returns `true` when a cycle settled. The frame loop never calls this;
    /// it exists for shutdown and for tests that need a settled producer.
    pub fn join_cycle(&mut self, timeout: Duration) -> bool {
        let Some(rx) = &self.in_flight else {
            return false;
        };
        let received = rx.recv_timeout(timeout);
        match received {
            Ok(message) => {
                self.finish_cycle(message);
                true
            }
            Err(RecvTimeoutError::Timeout) => false,
            Err(RecvTimeoutError::Disconnected) => {
                self.finish_cycle(FeedMessage::CycleFailed {
                    error: FeedError::WorkerLost,
                });
                true
            }
        }
    }

    fn poll_cycle(&mut self) {
        let Some(rx) = &self.in_flight else {
            return;
        };
        let received = rx.try_recv();
        match received {
            Ok(message) => self.finish_cycle(message),
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => self.finish_cycle(FeedMessage::CycleFailed {
                error: FeedError::WorkerLost,
            }),
        }
    }

    fn finish_cycle(&mut self, message: FeedMessage) {
        self.in_flight = None;
        match message {
            FeedMessage::CycleFinished { items, dropped } => {
                info!(
                    "fetch cycle finished: {} items ready, {} dropped",
                    items.len(),
                    dropped
                );
                self.buffer.extend(items);
            }
            FeedMessage::CycleFailed { error } => {
                error!("fetch cycle failed: {}", error);
            }
        }
    }

    fn random_speed(&mut self) -> f32 {
        self.min_speed + self.rng.f32() * (self.max_speed - self.min_speed)
    }
}
