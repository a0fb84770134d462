//! HTTP asset fetcher.

use std::io::{self, Read};
use std::time::Duration;

use reqwest::blocking::{Client, Response};

use crate::error::AssetError;
use crate::resources::assetcache::AssetFetcher;

/// [`AssetFetcher`] issuing a plain GET per asset.
///
/// The response body is returned unread; the cache streams it to disk.
pub struct HttpAssetFetcher {
    client: Client,
}

impl HttpAssetFetcher {
    pub fn new(timeout: Duration) -> Result<Self, AssetError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AssetError::Http {
                url: String::new(),
                reason: e.to_string(),
            })?;
        Ok(Self { client })
    }
}

impl AssetFetcher for HttpAssetFetcher {
    fn open(&self, url: &str) -> Result<Box<dyn Read + Send>, AssetError> {
        let response = self.client.get(url).send().map_err(|e| {
            if e.is_timeout() {
                AssetError::Timeout(url.to_string())
            } else {
                AssetError::Http {
                    url: url.to_string(),
                    reason: e.to_string(),
                }
            }
        })?;
        let status = response.status();
        if !status.is_success() {
            return Err(AssetError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(Box::new(TimedBody(response)))
    }
}

/// Response body whose client timeouts read as [`io::ErrorKind::TimedOut`].
struct TimedBody(Response);

impl Read for TimedBody {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf).map_err(|e| {
            let timed_out = e
                .get_ref()
                .and_then(|inner| inner.downcast_ref::<reqwest::Error>())
                .is_some_and(reqwest::Error::is_timeout);
            if timed_out {
                io::Error::new(io::ErrorKind::TimedOut, e)
            } else {
                e
            }
        })
    }
}
