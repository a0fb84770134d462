//! ECS components for floating entities.
//!
//! Submodules overview:
//! - [`velocity`] – vertical speed assigned at spawn time
//! - [`visualhandle`] – handle to the scene node rendering the entity

pub mod velocity;
pub mod visualhandle;
