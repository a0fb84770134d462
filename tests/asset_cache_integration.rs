//! AssetCache integration tests: download deduplication and URL transforms.

use std::io::{Cursor, Read};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, unbounded};
use parking_lot::Mutex;

use floatfeed::error::AssetError;
use floatfeed::resources::assetcache::{AssetCache, AssetFetcher, UrlTransform};

/// Fetcher that records requested URLs and holds each download until released.
struct GatedFetcher {
    calls: AtomicUsize,
    urls: Mutex<Vec<String>>,
    gate: Receiver<()>,
}

impl GatedFetcher {
    fn new() -> (Arc<Self>, Sender<()>) {
        let (tx, rx) = unbounded();
        let fetcher = Arc::new(Self {
            calls: AtomicUsize::new(0),
            urls: Mutex::new(Vec::new()),
            gate: rx,
        });
        (fetcher, tx)
    }
}

impl AssetFetcher for GatedFetcher {
    fn open(&self, url: &str) -> Result<Box<dyn Read + Send>, AssetError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.urls.lock().push(url.to_string());
        self.gate
            .recv()
            .map_err(|_| AssetError::Cancelled(url.to_string()))?;
        Ok(Box::new(Cursor::new(b"png".to_vec())))
    }
}

fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "floatfeed-assets-{}-{}",
        name,
        std::process::id()
    ));
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

#[test]
fn concurrent_requests_share_one_download() {
    let (fetcher, release) = GatedFetcher::new();
    let cache = AssetCache::new(temp_dir("dedupe"), fetcher.clone());

    let first = cache.ensure_local("http://x/a.png");
    let second = cache.ensure_local("http://x/a.png");
    assert!(cache.is_pending("http://x/a.png"));
    assert!(first.try_get().is_none());
    assert!(cache.local_path("http://x/a.png").is_none());

    release.send(()).unwrap();
    let a = first.wait().unwrap();
    let b = second.wait().unwrap();

    assert_eq!(a, b);
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    assert_eq!(std::fs::read(&a).unwrap(), b"png");
    assert_eq!(cache.local_path("http://x/a.png"), Some(a));
}

#[test]
fn requests_from_many_threads_share_one_download() {
    let (fetcher, release) = GatedFetcher::new();
    let cache = AssetCache::new(temp_dir("threads"), fetcher.clone());

    let pending: Vec<_> = (0..8)
        .map(|_| {
            let cache = cache.clone();
            std::thread::spawn(move || cache.ensure_local("http://x/shared.png"))
        })
        .map(|handle| handle.join().unwrap())
        .collect();

    release.send(()).unwrap();
    let deadline = Instant::now() + Duration::from_secs(5);
    for asset in pending {
        assert!(asset.wait_until(deadline).unwrap().ends_with("shared.png"));
    }
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
}

#[test]
fn distinct_urls_download_independently() {
    let (fetcher, release) = GatedFetcher::new();
    let cache = AssetCache::new(temp_dir("distinct"), fetcher.clone());

    let a = cache.ensure_local("http://x/a.png");
    let b = cache.ensure_local("http://x/b.png");
    release.send(()).unwrap();
    release.send(()).unwrap();

    assert!(a.wait().unwrap().ends_with("a.png"));
    assert!(b.wait().unwrap().ends_with("b.png"));
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
}

#[test]
fn transform_rewrites_url_and_file_name() {
    let (fetcher, release) = GatedFetcher::new();
    let cache = AssetCache::with_transform(
        temp_dir("transform"),
        fetcher.clone(),
        Some(UrlTransform::profile_image_bigger()),
    );

    let pending = cache.ensure_local("http://x/img_normal.png");
    assert_eq!(pending.url(), "http://x/img_bigger.png");
    release.send(()).unwrap();
    let path = pending.wait().unwrap();

    assert!(path.ends_with("img_bigger.png"));
    assert_eq!(fetcher.urls.lock().as_slice(), ["http://x/img_bigger.png"]);
    assert_eq!(cache.local_path("http://x/img_normal.png"), Some(path.clone()));
    assert_eq!(cache.local_path("http://x/img_bigger.png"), Some(path));
}

#[test]
fn waiting_past_the_deadline_times_out_without_cancelling() {
    let (fetcher, release) = GatedFetcher::new();
    let cache = AssetCache::new(temp_dir("deadline"), fetcher.clone());

    let slow = cache.ensure_local("http://x/slow.png");
    let err = slow
        .wait_until(Instant::now() + Duration::from_millis(20))
        .unwrap_err();
    assert_eq!(err, AssetError::Timeout("http://x/slow.png".to_string()));

    // the download itself keeps going and later callers still join it
    let again = cache.ensure_local("http://x/slow.png");
    release.send(()).unwrap();
    assert!(again.wait().unwrap().ends_with("slow.png"));
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
}

/// Body of `len` copies of one byte, handed out in small, slow chunks.
struct TrickleBody {
    byte: u8,
    remaining: usize,
}

impl Read for TrickleBody {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if self.remaining == 0 {
            return Ok(0);
        }
        std::thread::sleep(Duration::from_millis(1));
        let n = buf.len().min(self.remaining).min(64);
        buf[..n].fill(self.byte);
        self.remaining -= n;
        Ok(n)
    }
}

/// Serves `A`s for alice's URLs and `B`s for everything else.
struct TrickleFetcher;

impl AssetFetcher for TrickleFetcher {
    fn open(&self, url: &str) -> Result<Box<dyn Read + Send>, AssetError> {
        let byte = if url.contains("/alice/") { b'A' } else { b'B' };
        Ok(Box::new(TrickleBody {
            byte,
            remaining: 3200,
        }))
    }
}

#[test]
fn same_file_name_from_different_urls_never_mixes() {
    let dir = temp_dir("same-name");
    let cache = AssetCache::new(&dir, Arc::new(TrickleFetcher));

    let alice = cache.ensure_local("http://img/alice/photo_bigger.png");
    let bob = cache.ensure_local("http://img/bob/photo_bigger.png");
    let alice = alice.wait().unwrap();
    let bob = bob.wait().unwrap();

    assert_ne!(alice, bob);
    assert_eq!(alice, dir.join("photo_bigger.png"));
    let a = std::fs::read(&alice).unwrap();
    let b = std::fs::read(&bob).unwrap();
    assert_eq!(a.len(), 3200);
    assert_eq!(b.len(), 3200);
    assert!(a.iter().all(|&c| c == b'A'));
    assert!(b.iter().all(|&c| c == b'B'));

    // both stay cached under their own files
    assert_eq!(cache.local_path("http://img/alice/photo_bigger.png"), Some(alice));
    assert_eq!(cache.local_path("http://img/bob/photo_bigger.png"), Some(bob));
}
