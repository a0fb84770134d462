//! Per-frame driving loop.
//!
//! The [`Scheduler`] owns the [`ComponentStore`] and a schedule that runs the
//! [`item_producer_system`] and then the [`motion_system`], in that order,
//! once per external tick. Neither system blocks: fetch cycles run on worker
//! threads, so motion keeps advancing while a fetch is in flight or failing.

use bevy_ecs::prelude::*;

use crate::resources::assetcache::AssetCache;
use crate::resources::feedconfig::FeedConfig;
use crate::resources::itemproducer::ItemProducer;
use crate::resources::scene::SceneBridge;
use crate::resources::worldtime::WorldTime;
use crate::store::ComponentStore;
use crate::systems::itemproducer::item_producer_system;
use crate::systems::motion::motion_system;
use crate::systems::time::update_world_time;

pub struct Scheduler {
    store: ComponentStore,
    update: Schedule,
    /// Accumulated in f64; an f32 sum stops advancing after a few days of ticks.
    elapsed: f64,
}

impl Scheduler {
    /// Build a scheduler around a producer and a scene.
    pub fn new(config: FeedConfig, producer: ItemProducer, cache: AssetCache, scene: SceneBridge) -> Self {
        let mut store = ComponentStore::new();
        store.insert_resource(WorldTime::default());
        store.insert_resource(config);
        store.insert_resource(cache);
        store.insert_resource(producer);
        store.insert_resource(scene);
        Self::from_store(store)
    }

    /// Build a scheduler over a store that already holds [`WorldTime`],
    /// [`ItemProducer`] and [`SceneBridge`] resources.
    pub fn from_store(mut store: ComponentStore) -> Self {
        if !store.world().contains_resource::<WorldTime>() {
            store.insert_resource(WorldTime::default());
        }
        let mut update = Schedule::default();
        update.add_systems((item_producer_system, motion_system).chain());
        Self {
            store,
            update,
            elapsed: 0.0,
        }
    }

    /// Run one frame at `current_time`, `delta_time` after the previous one.
    pub fn update(&mut self, current_time: f32, delta_time: f32) {
        self.elapsed = f64::from(current_time);
        self.run(current_time, delta_time);
    }

    /// Advance the accumulated clock by `delta_time` and run one frame.
    pub fn tick(&mut self, delta_time: f32) {
        self.elapsed += f64::from(delta_time.max(0.0));
        self.run(self.elapsed as f32, delta_time);
    }

    fn run(&mut self, current_time: f32, delta_time: f32) {
        update_world_time(self.store.world_mut(), current_time, delta_time);
        self.update.run(self.store.world_mut());
    }

    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub fn store(&self) -> &ComponentStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut ComponentStore {
        &mut self.store
    }

    pub fn producer(&self) -> &ItemProducer {
        self.store.resource::<ItemProducer>()
    }

    pub fn producer_mut(&mut self) -> Mut<'_, ItemProducer> {
        self.store.resource_mut::<ItemProducer>()
    }
}
