//! Engine systems.
//!
//! Submodules overview
//! - [`itemproducer`] – advance the producer, spawn entities, run fetch cycles
//! - [`motion`] – move visual handles by their velocity
//! - [`time`] – write the frame driver's clock into `WorldTime`

pub mod itemproducer;
pub mod motion;
pub mod time;
