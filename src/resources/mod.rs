//! ECS resources made available to systems.
//!
//! Overview
//! - `assetcache` – download-once cache of remote images
//! - `feedconfig` – merged configuration (defaults, INI file, environment)
//! - `itemproducer` – fetch-and-spawn state machine and its item buffer
//! - `scene` – bridge to the host scene that renders entities
//! - `worldtime` – frame-driver time and delta
pub mod assetcache;
pub mod feedconfig;
pub mod itemproducer;
pub mod scene;
pub mod worldtime;
