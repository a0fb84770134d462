//! floatfeed library.
//!
//! Periodically fetches items from a search feed, caches their images
//! locally and floats one visual per item upwards through a host scene.
//!
//! This module exposes the ECS components, resources, systems and events for
//! use in integration tests and by the `floatfeed` binary.

pub mod components;
pub mod error;
pub mod events;
pub mod feed;
pub mod resources;
pub mod scheduler;
pub mod store;
pub mod systems;
