//! Local cache of remote assets.
//!
//! [`AssetCache::ensure_local`] makes sure every remote URL is downloaded at
//! most once. The first caller for a URL starts a download on its own thread;
//! callers arriving while it is in flight join the same download; callers
//! arriving after it finished get the cached path without touching the
//! network.
//!
//! Each caller receives a [`PendingAsset`], a one-shot receiver that yields
//! the local path (or the download error) once the download settles.
//!
//! Files are named after the final path segment of the (transformed) URL and
//! written under the cache directory. The body is first written to a `.part`
//! sibling and renamed on success so a half-written file never resolves.
//!
//! Every local file belongs to exactly one URL. When a second URL ends in a
//! file name already taken by another URL, it is stored as
//! `<stem>-<url hash>.<ext>` instead.

use std::fs::{self, File};
use std::hash::{Hash, Hasher};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use bevy_ecs::prelude::Resource;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded};
use log::{debug, warn};
use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHasher};

use crate::error::AssetError;

/// Substring rewrite applied to asset URLs before they are cached.
///
/// The profile image host serves several sizes of the same picture that only
/// differ by a suffix in the file name; the default transform asks for the
/// larger variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTransform {
    pub from: String,
    pub to: String,
}

impl UrlTransform {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }

    /// `normal` -> `bigger`, the profile image host's size convention.
    pub fn profile_image_bigger() -> Self {
        Self::new("normal", "bigger")
    }

    pub fn apply(&self, url: &str) -> String {
        if self.from.is_empty() {
            return url.to_string();
        }
        url.replace(&self.from, &self.to)
    }
}

/// Opens a readable body for a remote URL.
///
/// Implemented over HTTP by [`HttpAssetFetcher`](crate::feed::download::HttpAssetFetcher);
/// tests substitute in-memory fetchers.
pub trait AssetFetcher: Send + Sync {
    fn open(&self, url: &str) -> Result<Box<dyn Read + Send>, AssetError>;
}

type AssetResult = Result<PathBuf, AssetError>;

enum CacheEntry {
    /// Download in flight; every waiter gets the result.
    Pending(Vec<Sender<AssetResult>>),
    Resolved(PathBuf),
}

/// Result of [`AssetCache::ensure_local`] that may not have settled yet.
#[derive(Debug)]
pub struct PendingAsset {
    url: String,
    rx: Receiver<AssetResult>,
}

impl PendingAsset {
    fn ready(url: String, result: AssetResult) -> Self {
        let (tx, rx) = bounded(1);
        let _ = tx.send(result);
        Self { url, rx }
    }

    /// The (transformed) URL this result belongs to.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Block until the download settles.
    pub fn wait(self) -> AssetResult {
        self.rx
            .recv()
            .unwrap_or_else(|_| Err(AssetError::Cancelled(self.url)))
    }

    /// Block until the download settles or `deadline` passes.
    pub fn wait_until(self, deadline: Instant) -> AssetResult {
        match self.rx.recv_deadline(deadline) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Err(AssetError::Timeout(self.url)),
            Err(RecvTimeoutError::Disconnected) => Err(AssetError::Cancelled(self.url)),
        }
    }

    /// Non-blocking check. `None` while the download is still running.
    pub fn try_get(&self) -> Option<AssetResult> {
        self.rx.try_recv().ok()
    }
}

#[derive(Default)]
struct CacheState {
    entries: FxHashMap<String, CacheEntry>,
    /// Local file -> the URL it was claimed for.
    owners: FxHashMap<PathBuf, String>,
}

impl CacheState {
    /// Local file for `url`, never shared with another URL.
    fn claim(&mut self, base: PathBuf, url: &str) -> PathBuf {
        let dest = match self.owners.get(&base) {
            Some(owner) if owner != url => disambiguated(&base, url),
            _ => base,
        };
        self.owners.insert(dest.clone(), url.to_string());
        dest
    }
}

struct CacheInner {
    cache_dir: PathBuf,
    transform: Option<UrlTransform>,
    fetcher: Arc<dyn AssetFetcher>,
    state: Mutex<CacheState>,
}

/// Shared, thread-safe asset cache. Cloning shares the same entries.
#[derive(Resource, Clone)]
pub struct AssetCache {
    inner: Arc<CacheInner>,
}

impl AssetCache {
    pub fn new(cache_dir: impl Into<PathBuf>, fetcher: Arc<dyn AssetFetcher>) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                cache_dir: cache_dir.into(),
                transform: None,
                fetcher,
                state: Mutex::new(CacheState::default()),
            }),
        }
    }

    pub fn with_transform(
        cache_dir: impl Into<PathBuf>,
        fetcher: Arc<dyn AssetFetcher>,
        transform: Option<UrlTransform>,
    ) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                cache_dir: cache_dir.into(),
                transform,
                fetcher,
                state: Mutex::new(CacheState::default()),
            }),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.inner.cache_dir
    }

    /// The URL the cache keys `remote_url` under.
    pub fn cache_key(&self, remote_url: &str) -> String {
        match &self.inner.transform {
            Some(transform) => transform.apply(remote_url),
            None => remote_url.to_string(),
        }
    }

    /// Make `remote_url` available locally, downloading it at most once.
    pub fn ensure_local(&self, remote_url: &str) -> PendingAsset {
        let url = self.cache_key(remote_url);
        let (tx, rx) = bounded(1);

        let dest = {
            let mut state = self.inner.state.lock();
            match state.entries.get_mut(&url) {
                Some(CacheEntry::Resolved(path)) => {
                    debug!("asset cache hit '{}'", url);
                    return PendingAsset::ready(url, Ok(path.clone()));
                }
                Some(CacheEntry::Pending(waiters)) => {
                    debug!("joining in-flight download of '{}'", url);
                    waiters.push(tx);
                    return PendingAsset { url, rx };
                }
                None => {}
            }
            let base = match local_path_for(&self.inner.cache_dir, &url) {
                Ok(base) => base,
                Err(e) => {
                    warn!("asset download failed: {}", e);
                    return PendingAsset::ready(url, Err(e));
                }
            };
            let dest = state.claim(base, &url);
            state.entries.insert(url.clone(), CacheEntry::Pending(vec![tx]));
            dest
        };

        let cache = self.clone();
        let download_url = url.clone();
        let spawned = std::thread::Builder::new()
            .name("asset-download".to_string())
            .spawn(move || {
                let result = cache.download(&download_url, &dest);
                cache.settle(&download_url, result);
            });
        if let Err(e) = spawned {
            self.settle(
                &url,
                Err(AssetError::Http {
                    url: url.clone(),
                    reason: format!("could not spawn download thread: {}", e),
                }),
            );
        }

        PendingAsset { url, rx }
    }

    /// Path of an already downloaded asset, if any.
    pub fn local_path(&self, remote_url: &str) -> Option<PathBuf> {
        let url = self.cache_key(remote_url);
        match self.inner.state.lock().entries.get(&url) {
            Some(CacheEntry::Resolved(path)) => Some(path.clone()),
            _ => None,
        }
    }

    /// Whether a download for `remote_url` is currently running.
    pub fn is_pending(&self, remote_url: &str) -> bool {
        let url = self.cache_key(remote_url);
        matches!(
            self.inner.state.lock().entries.get(&url),
            Some(CacheEntry::Pending(_))
        )
    }

    fn download(&self, url: &str, dest: &Path) -> AssetResult {
        let mut body = self.inner.fetcher.open(url)?;
        let write_err = |e: io::Error| AssetError::Write {
            path: dest.display().to_string(),
            reason: e.to_string(),
        };
        fs::create_dir_all(&self.inner.cache_dir).map_err(write_err)?;
        let partial = dest.with_extension(partial_extension(dest));
        let mut file = File::create(&partial).map_err(write_err)?;
        let mut buf = [0u8; 8192];
        loop {
            let n = match body.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    let _ = fs::remove_file(&partial);
                    return Err(read_error(url, e));
                }
            };
            if let Err(e) = file.write_all(&buf[..n]) {
                let _ = fs::remove_file(&partial);
                return Err(write_err(e));
            }
        }
        drop(file);
        fs::rename(&partial, dest).map_err(write_err)?;
        Ok(dest.to_path_buf())
    }

    fn settle(&self, url: &str, result: AssetResult) {
        let waiters = {
            let mut state = self.inner.state.lock();
            let previous = match &result {
                Ok(path) => state
                    .entries
                    .insert(url.to_string(), CacheEntry::Resolved(path.clone())),
                // failed downloads are forgotten so a later cycle can retry
                Err(_) => state.entries.remove(url),
            };
            match previous {
                Some(CacheEntry::Pending(waiters)) => waiters,
                _ => Vec::new(),
            }
        };
        if let Err(e) = &result {
            warn!("asset download failed: {}", e);
        }
        for waiter in waiters {
            let _ = waiter.send(result.clone());
        }
    }
}

/// `<cache_dir>/<final path segment of url>`, ignoring query and fragment.
pub fn local_path_for(cache_dir: &Path, url: &str) -> Result<PathBuf, AssetError> {
    let without_suffix = url.split(['?', '#']).next().unwrap_or(url);
    let name = without_suffix.rsplit('/').next().unwrap_or("");
    if name.is_empty() || name == "." || name == ".." || !without_suffix.contains('/') {
        return Err(AssetError::InvalidUrl(url.to_string()));
    }
    Ok(cache_dir.join(name))
}

/// A body that stops mid-stream is a transport failure, not a disk one.
fn read_error(url: &str, e: io::Error) -> AssetError {
    if e.kind() == io::ErrorKind::TimedOut {
        AssetError::Timeout(url.to_string())
    } else {
        AssetError::Http {
            url: url.to_string(),
            reason: e.to_string(),
        }
    }
}

/// `<stem>-<hash of url>.<ext>` next to `base`.
fn disambiguated(base: &Path, url: &str) -> PathBuf {
    let mut hasher = FxHasher::default();
    url.hash(&mut hasher);
    let tag = format!("{:016x}", hasher.finish());
    let stem = base
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match base.extension() {
        Some(ext) => format!("{}-{}.{}", stem, tag, ext.to_string_lossy()),
        None => format!("{}-{}", stem, tag),
    };
    base.with_file_name(name)
}

fn partial_extension(dest: &Path) -> String {
    match dest.extension() {
        Some(ext) => format!("{}.part", ext.to_string_lossy()),
        None => "part".to_string(),
    }
}
