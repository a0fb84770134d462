//! Records and messages exchanged across the fetch worker boundary.
//!
//! Submodules:
//! - [`feed`] – remote items, cached items and fetch cycle outcomes
pub mod feed;
