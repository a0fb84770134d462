//! Feed configuration resource.
//!
//! Settings are merged once at startup from three layers: built-in defaults,
//! an INI configuration file, and environment variables. The merged value is
//! passed explicitly to the [`ItemProducer`] and [`AssetCache`] constructors.
//!
//! # Configuration File Format
//!
//! ```ini
//! [feed]
//! bearer_token = AAAA...
//! search_term = magicleap
//! endpoint = https://api.twitter.com/1.1/search/tweets.json
//! spawn_interval = 5.0
//! min_speed = 0.01
//! max_speed = 0.06
//! request_timeout_secs = 10
//! cache_dir = ./cache
//! seed = 42
//!
//! [assets]
//! url_transform = true
//! url_transform_from = normal
//! url_transform_to = bigger
//! ```
//!
//! # Environment
//!
//! - `BEARER_TOKEN` overrides `[feed] bearer_token`
//! - `FLOATFEED_SEARCH_TERM` overrides `[feed] search_term`
//!
//! [`ItemProducer`]: crate::resources::itemproducer::ItemProducer
//! [`AssetCache`]: crate::resources::assetcache::AssetCache

use bevy_ecs::prelude::*;
use configparser::ini::Ini;
use log::info;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;
use crate::resources::assetcache::UrlTransform;

const DEFAULT_ENDPOINT: &str = "https://api.twitter.com/1.1/search/tweets.json";
const DEFAULT_SEARCH_TERM: &str = "magicleap";
const DEFAULT_SPAWN_INTERVAL: f32 = 5.0;
const DEFAULT_MIN_SPEED: f32 = 0.01;
const DEFAULT_MAX_SPEED: f32 = 0.06;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
const DEFAULT_CACHE_DIR: &str = "./cache";
const DEFAULT_CONFIG_PATH: &str = "./floatfeed.ini";

pub const ENV_BEARER_TOKEN: &str = "BEARER_TOKEN";
pub const ENV_SEARCH_TERM: &str = "FLOATFEED_SEARCH_TERM";

/// Merged feed configuration.
#[derive(Resource, Debug, Clone, PartialEq)]
pub struct FeedConfig {
    /// Credential sent as `authorization: bearer <token>`.
    pub bearer_token: Option<String>,
    /// Search term passed as the `q` parameter.
    pub search_term: String,
    /// Search endpoint URL.
    pub endpoint: String,
    /// Minimum time between spawn attempts, in frame-driver time units.
    pub spawn_interval: f32,
    /// Lower bound (inclusive) of spawned entity speed.
    pub min_speed: f32,
    /// Upper bound (exclusive) of spawned entity speed.
    pub max_speed: f32,
    /// Timeout applied to every feed request and asset download.
    pub request_timeout: Duration,
    /// Directory that receives cached assets.
    pub cache_dir: PathBuf,
    /// Rewrite applied to asset URLs before caching.
    pub url_transform: Option<UrlTransform>,
    /// Seed for the speed generator. `None` seeds from entropy.
    pub seed: Option<u64>,
    /// Path to the configuration file.
    pub config_path: PathBuf,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl FeedConfig {
    /// Create a configuration holding the built-in defaults.
    pub fn new() -> Self {
        Self {
            bearer_token: None,
            search_term: DEFAULT_SEARCH_TERM.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            spawn_interval: DEFAULT_SPAWN_INTERVAL,
            min_speed: DEFAULT_MIN_SPEED,
            max_speed: DEFAULT_MAX_SPEED,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            url_transform: Some(UrlTransform::profile_image_bigger()),
            seed: None,
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
        }
    }

    /// Create a configuration with a custom config file path.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: path.into(),
            ..Self::new()
        }
    }

    /// Overlay values from the INI file onto the current ones.
    ///
    /// Missing keys keep their current values.
    pub fn load_from_file(&mut self) -> Result<(), ConfigError> {
        let mut config = Ini::new();
        config.load(&self.config_path).map_err(ConfigError::Load)?;
        self.apply_ini(&config)?;
        info!(
            "Loaded config from {:?}: term='{}', interval={}, speed={}..{}",
            self.config_path, self.search_term, self.spawn_interval, self.min_speed, self.max_speed
        );
        Ok(())
    }

    /// Overlay values from INI text. Used by tests and embedded defaults.
    pub fn load_from_str(&mut self, text: &str) -> Result<(), ConfigError> {
        let mut config = Ini::new();
        config.read(text.to_string()).map_err(ConfigError::Load)?;
        self.apply_ini(&config)
    }

    fn apply_ini(&mut self, config: &Ini) -> Result<(), ConfigError> {
        // [feed] section
        if let Some(token) = config.get("feed", "bearer_token") {
            if !token.trim().is_empty() {
                self.bearer_token = Some(token.trim().to_string());
            }
        }
        if let Some(term) = config.get("feed", "search_term") {
            self.search_term = term;
        }
        if let Some(endpoint) = config.get("feed", "endpoint") {
            self.endpoint = endpoint;
        }
        if let Some(interval) = read_float(config, "feed", "spawn_interval")? {
            self.spawn_interval = interval;
        }
        if let Some(speed) = read_float(config, "feed", "min_speed")? {
            self.min_speed = speed;
        }
        if let Some(speed) = read_float(config, "feed", "max_speed")? {
            self.max_speed = speed;
        }
        if let Some(secs) = config
            .getuint("feed", "request_timeout_secs")
            .map_err(|reason| ConfigError::Invalid {
                key: "request_timeout_secs",
                reason,
            })?
        {
            self.request_timeout = Duration::from_secs(secs);
        }
        if let Some(dir) = config.get("feed", "cache_dir") {
            self.cache_dir = PathBuf::from(dir);
        }
        if let Some(seed) = config
            .getuint("feed", "seed")
            .map_err(|reason| ConfigError::Invalid { key: "seed", reason })?
        {
            self.seed = Some(seed);
        }

        // [assets] section
        let enabled = config
            .getbool("assets", "url_transform")
            .map_err(|reason| ConfigError::Invalid {
                key: "url_transform",
                reason,
            })?
            .unwrap_or(self.url_transform.is_some());
        if enabled {
            let mut transform = self
                .url_transform
                .clone()
                .unwrap_or_else(UrlTransform::profile_image_bigger);
            if let Some(from) = config.get("assets", "url_transform_from") {
                transform.from = from;
            }
            if let Some(to) = config.get("assets", "url_transform_to") {
                transform.to = to;
            }
            self.url_transform = Some(transform);
        } else {
            self.url_transform = None;
        }

        Ok(())
    }

    /// Overlay process environment variables.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Overlay values from an arbitrary key lookup, keyed like the environment.
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(token) = lookup(ENV_BEARER_TOKEN) {
            if !token.trim().is_empty() {
                self.bearer_token = Some(token.trim().to_string());
            }
        }
        if let Some(term) = lookup(ENV_SEARCH_TERM) {
            if !term.is_empty() {
                self.search_term = term;
            }
        }
    }

    /// Reject combinations the producer cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.spawn_interval > 0.0) {
            return Err(ConfigError::Invalid {
                key: "spawn_interval",
                reason: format!("must be positive, got {}", self.spawn_interval),
            });
        }
        if !(self.min_speed >= 0.0) {
            return Err(ConfigError::Invalid {
                key: "min_speed",
                reason: format!("must not be negative, got {}", self.min_speed),
            });
        }
        if !(self.min_speed < self.max_speed) {
            return Err(ConfigError::Invalid {
                key: "min_speed",
                reason: format!(
                    "must be below max_speed ({} >= {})",
                    self.min_speed, self.max_speed
                ),
            });
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::Invalid {
                key: "request_timeout_secs",
                reason: "must be positive".to_string(),
            });
        }
        if self.search_term.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "search_term",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

fn read_float(config: &Ini, section: &str, key: &'static str) -> Result<Option<f32>, ConfigError> {
    config
        .getfloat(section, key)
        .map(|v| v.map(|v| v as f32))
        .map_err(|reason| ConfigError::Invalid { key, reason })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_behavior() {
        let config = FeedConfig::new();
        assert_eq!(config.spawn_interval, 5.0);
        assert_eq!(config.min_speed, 0.01);
        assert_eq!(config.max_speed, 0.06);
        assert_eq!(config.search_term, "magicleap");
        assert!(config.bearer_token.is_none());
        assert_eq!(config.url_transform, Some(UrlTransform::profile_image_bigger()));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn ini_overrides_only_present_keys() {
        let mut config = FeedConfig::new();
        config
            .load_from_str("[feed]\nsearch_term = rustlang\nspawn_interval = 2.5\n")
            .unwrap();
        assert_eq!(config.search_term, "rustlang");
        assert_eq!(config.spawn_interval, 2.5);
        assert_eq!(config.max_speed, 0.06);
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
    }

    #[test]
    fn ini_can_disable_url_transform() {
        let mut config = FeedConfig::new();
        config.load_from_str("[assets]\nurl_transform = false\n").unwrap();
        assert!(config.url_transform.is_none());
    }

    #[test]
    fn ini_can_replace_url_transform_pattern() {
        let mut config = FeedConfig::new();
        config
            .load_from_str("[assets]\nurl_transform_from = _small\nurl_transform_to = _large\n")
            .unwrap();
        let transform = config.url_transform.unwrap();
        assert_eq!(transform.from, "_small");
        assert_eq!(transform.to, "_large");
    }

    #[test]
    fn ini_rejects_non_numeric_interval() {
        let mut config = FeedConfig::new();
        let err = config
            .load_from_str("[feed]\nspawn_interval = soon\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "spawn_interval", .. }));
    }

    #[test]
    fn env_overrides_win_over_file() {
        let mut config = FeedConfig::new();
        config.load_from_str("[feed]\nbearer_token = from-file\n").unwrap();
        config.apply_overrides_from(|key| match key {
            ENV_BEARER_TOKEN => Some("from-env".to_string()),
            _ => None,
        });
        assert_eq!(config.bearer_token.as_deref(), Some("from-env"));
        assert_eq!(config.search_term, "magicleap");
    }

    #[test]
    fn blank_env_token_is_ignored() {
        let mut config = FeedConfig::new();
        config.apply_overrides_from(|_| Some("   ".to_string()));
        assert!(config.bearer_token.is_none());
    }

    #[test]
    fn validate_rejects_inverted_speed_range() {
        let mut config = FeedConfig::new();
        config.min_speed = 0.1;
        config.max_speed = 0.05;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { key: "min_speed", .. })
        ));
    }

    #[test]
    fn validate_rejects_zero_interval() {
        let mut config = FeedConfig::new();
        config.spawn_interval = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_negative_min_speed() {
        let mut config = FeedConfig::new();
        config.min_speed = -0.02;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { key: "min_speed", .. })
        ));
    }

    #[test]
    fn validate_rejects_zero_request_timeout() {
        let mut config = FeedConfig::new();
        config
            .load_from_str("[feed]\nrequest_timeout_secs = 0\n")
            .unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { key: "request_timeout_secs", .. })
        ));
    }

    #[test]
    fn missing_file_is_a_load_error() {
        let mut config = FeedConfig::with_path("/definitely/not/here/floatfeed.ini");
        assert!(matches!(config.load_from_file(), Err(ConfigError::Load(_))));
        assert_eq!(config, FeedConfig::with_path("/definitely/not/here/floatfeed.ini"));
    }
}
