//! floatfeed main entry point.
//!
//! Headless frame driver for the floatfeed engine:
//! - **bevy_ecs** holds the floating entities and runs the per-frame systems
//! - **reqwest** talks to the search feed and downloads profile images
//! - a [`HeadlessScene`] stands in for the host renderer
//!
//! # Main Loop
//!
//! 1. Merge configuration: defaults, `floatfeed.ini`, environment
//! 2. Build the feed source, asset cache and item producer, prefetch a batch
//! 3. Tick the scheduler at the target frame rate with a cumulative clock
//!
//! # Running
//!
//! ```sh
//! BEARER_TOKEN=... cargo run --release -- --term rustlang
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use fastrand::Rng;

use floatfeed::components::velocity::Velocity;
use floatfeed::components::visualhandle::VisualHandle;
use floatfeed::feed::download::HttpAssetFetcher;
use floatfeed::feed::source::SearchFeed;
use floatfeed::resources::assetcache::AssetCache;
use floatfeed::resources::feedconfig::FeedConfig;
use floatfeed::resources::itemproducer::ItemProducer;
use floatfeed::resources::scene::{HeadlessScene, SceneBridge};
use floatfeed::scheduler::Scheduler;

/// Float search results upwards, one every few seconds.
#[derive(Parser)]
#[command(version, about = "Fetches a search feed and floats its items through a scene.")]
struct Cli {
    /// Configuration file (default: ./floatfeed.ini).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Search term, overriding the configuration.
    #[arg(long, value_name = "TERM")]
    term: Option<String>,

    /// Stop after this many frames instead of running forever.
    #[arg(long, value_name = "N")]
    frames: Option<u64>,

    /// Target frames per second.
    #[arg(long, default_value_t = 60)]
    fps: u32,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => FeedConfig::with_path(path),
        None => FeedConfig::new(),
    };
    if let Err(e) = config.load_from_file() {
        // a missing default file is normal; an explicit one is not
        if cli.config.is_some() {
            log::error!("{}", e);
            std::process::exit(1);
        }
        log::info!("No config file at {:?}, using defaults", config.config_path);
    }
    config.apply_env_overrides();
    if let Some(term) = cli.term {
        config.search_term = term;
    }
    if let Err(e) = config.validate() {
        log::error!("{}", e);
        std::process::exit(1);
    }
    if config.bearer_token.is_none() {
        log::warn!("No bearer token configured; every fetch cycle will fail until one is set");
    }

    let source = match SearchFeed::from_config(&config) {
        Ok(source) => source,
        Err(e) => {
            log::error!("Failed to build feed client: {}", e);
            std::process::exit(1);
        }
    };
    let fetcher = match HttpAssetFetcher::new(config.request_timeout) {
        Ok(fetcher) => fetcher,
        Err(e) => {
            log::error!("Failed to build asset client: {}", e);
            std::process::exit(1);
        }
    };
    let cache = AssetCache::with_transform(
        config.cache_dir.clone(),
        Arc::new(fetcher),
        config.url_transform.clone(),
    );
    let mut producer = ItemProducer::new(&config, Arc::new(source), cache.clone());
    producer.start_fetch(0.0);

    let scene_rng = config.seed.map(Rng::with_seed).unwrap_or_default();
    let scene = SceneBridge::new(HeadlessScene::new(scene_rng));

    log::info!(
        "floatfeed: term='{}', spawn every {} s, cache at {:?}",
        config.search_term,
        config.spawn_interval,
        config.cache_dir
    );
    let mut scheduler = Scheduler::new(config, producer, cache, scene);

    // --------------- Main loop ---------------
    let frame = Duration::from_secs_f64(1.0 / f64::from(cli.fps.max(1)));
    let mut last = Instant::now();
    let mut frames: u64 = 0;
    loop {
        let now = Instant::now();
        let dt = now.duration_since(last).as_secs_f32();
        last = now;

        scheduler.tick(dt);
        frames += 1;

        if frames % (u64::from(cli.fps.max(1)) * 5) == 0 {
            report(&mut scheduler);
        }
        if cli.frames.is_some_and(|limit| frames >= limit) {
            break;
        }

        let spent = now.elapsed();
        if spent < frame {
            std::thread::sleep(frame - spent);
        }
    }
    report(&mut scheduler);
}

fn report(scheduler: &mut Scheduler) {
    let elapsed = scheduler.elapsed();
    let buffered = scheduler.producer().buffered();
    let store = scheduler.store_mut();
    let mut query = store.query::<(&Velocity, &VisualHandle)>();
    let mut count = 0;
    let mut highest = f32::MIN;
    for (_, handle) in query.iter(store.world()) {
        count += 1;
        highest = highest.max(handle.position().y);
    }
    if count == 0 {
        log::info!("t={:.1}: no entities yet, {} buffered", elapsed, buffered);
    } else {
        log::info!(
            "t={:.1}: {} entities floating, highest at y={:.3}, {} buffered",
            elapsed,
            count,
            highest,
            buffered
        );
    }
}
