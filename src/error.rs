//! Error types shared by the feed, asset cache, component store and config.
//!
//! Errors that cross the fetch worker boundary carry plain strings so they
//! can be cloned to every caller waiting on the same download.

use bevy_ecs::prelude::Entity;
use thiserror::Error;

/// Failure of one fetch cycle's feed request.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FeedError {
    /// No bearer token was configured for the feed request.
    #[error("no bearer token configured (set BEARER_TOKEN or [feed] bearer_token)")]
    MissingCredential,
    /// Transport-level failure talking to the feed endpoint.
    #[error("feed request failed: {0}")]
    Http(String),
    /// The endpoint answered with a non-success status.
    #[error("feed endpoint returned HTTP {0}")]
    Status(u16),
    /// The response body was not the expected JSON document.
    #[error("feed response could not be decoded: {0}")]
    Decode(String),
    /// The request did not complete within the configured timeout.
    #[error("feed request timed out")]
    Timeout,
    /// The worker running the cycle went away without reporting.
    #[error("fetch worker exited without a result")]
    WorkerLost,
}

/// Failure to make one remote asset available locally.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum AssetError {
    /// The URL has no usable final path segment to name the local file.
    #[error("cannot derive a file name from '{0}'")]
    InvalidUrl(String),
    /// Transport-level failure fetching the asset.
    #[error("asset request for '{url}' failed: {reason}")]
    Http { url: String, reason: String },
    /// The asset host answered with a non-success status.
    #[error("asset request for '{url}' returned HTTP {status}")]
    Status { url: String, status: u16 },
    /// Writing the body into the cache directory failed.
    #[error("could not write '{path}': {reason}")]
    Write { path: String, reason: String },
    /// The download did not settle before the cycle deadline.
    #[error("asset '{0}' timed out")]
    Timeout(String),
    /// The download thread stopped without reporting a result.
    #[error("download of '{0}' was abandoned")]
    Cancelled(String),
}

/// Failure of a [`ComponentStore`](crate::store::ComponentStore) operation.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StoreError {
    #[error("entity {0:?} does not exist")]
    NoSuchEntity(Entity),
}

/// Failure loading or validating [`FeedConfig`](crate::resources::feedconfig::FeedConfig).
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("failed to load config file: {0}")]
    Load(String),
    #[error("invalid value for '{key}': {reason}")]
    Invalid { key: &'static str, reason: String },
}
