//! HTTP collaborators for the fetch worker.
//!
//! - [`source`] – item source trait and the search-endpoint implementation
//! - [`download`] – asset fetcher backed by plain HTTP GET requests
//!
//! Both are blocking; they only ever run on fetch worker and download threads,
//! never on the frame thread.

pub mod download;
pub mod source;
