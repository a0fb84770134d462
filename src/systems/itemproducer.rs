//! Fetch-and-spawn system and the fetch worker it starts.
//!
//! - [`item_producer_system`] runs on the frame thread, advances the
//!   [`ItemProducer`] state machine and materializes spawn requests as
//!   entities with a [`Velocity`] and a [`VisualHandle`].
//! - [`fetch_cycle`] runs on a worker thread: it requests one batch from the
//!   [`ItemSource`], resolves every referenced image through the
//!   [`AssetCache`] concurrently and reports a single [`FeedMessage`].
//!
//! Asset failures are isolated per item: an item whose image cannot be cached
//! before the cycle deadline is dropped, the rest of the batch survives.

use std::time::{Duration, Instant};

use bevy_ecs::prelude::*;
use crossbeam_channel::Sender;
use log::{debug, warn};

use crate::components::velocity::Velocity;
use crate::components::visualhandle::VisualHandle;
use crate::events::feed::{FeedMessage, ReadyItem};
use crate::feed::source::ItemSource;
use crate::resources::assetcache::AssetCache;
use crate::resources::itemproducer::{ItemProducer, ProducerStep};
use crate::resources::scene::SceneBridge;
use crate::resources::worldtime::WorldTime;

/// Advance the producer and spawn at most one entity.
pub fn item_producer_system(
    time: Res<WorldTime>,
    mut producer: ResMut<ItemProducer>,
    mut scene: ResMut<SceneBridge>,
    mut commands: Commands,
) {
    let ProducerStep::Spawn(request) = producer.update(time.elapsed) else {
        return;
    };
    let node = scene.create_visual_handle(&request.item.display_text(), &request.image_path);
    let entity = commands
        .spawn((Velocity::new(request.speed), VisualHandle::new(node)))
        .id();
    debug!(
        "spawned {:?} for @{} at t={}",
        entity, request.item.author.screen_name, time.elapsed
    );
}

/// Body of the fetch worker thread. Sends exactly one message on `tx`.
pub fn fetch_cycle(
    source: &dyn ItemSource,
    cache: &AssetCache,
    asset_timeout: Duration,
    tx: Sender<FeedMessage>,
) {
    let items = match source.fetch_batch() {
        Ok(items) => items,
        Err(error) => {
            let _ = tx.send(FeedMessage::CycleFailed { error });
            return;
        }
    };

    // issue every download before waiting on any of them
    let pending: Vec<_> = items
        .into_iter()
        .map(|item| {
            let asset = cache.ensure_local(&item.image_url);
            (item, asset)
        })
        .collect();

    let deadline = Instant::now() + asset_timeout;
    let mut ready = Vec::with_capacity(pending.len());
    let mut dropped = 0;
    for (item, asset) in pending {
        match asset.wait_until(deadline) {
            Ok(image_path) => ready.push(ReadyItem { item, image_path }),
            Err(e) => {
                warn!("dropping item from @{}: {}", item.author.screen_name, e);
                dropped += 1;
            }
        }
    }

    let _ = tx.send(FeedMessage::CycleFinished {
        items: ready,
        dropped,
    });
}
