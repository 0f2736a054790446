//! Configuration loading for the background execution core.
//!
//! Loads `anheyu.toml` (if present) and layers default values over it so the
//! system behaves per specification with zero configuration. Every numeric
//! knob here has a hard-coded default matching the documented constants
//! (queue capacities, worker counts, TTLs); the file and environment only
//! ever override, never introduce new defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const CONFIG_FILE: &str = "anheyu.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

pub fn config_path(dir: &Path) -> PathBuf {
    dir.join(CONFIG_FILE)
}

/// Complete process configuration for the background core.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub broker: BrokerConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub stats: StatsConfig,
    #[serde(default)]
    pub id_codec: IdCodecConfig,
    #[serde(default)]
    pub log: LogConfig,
}

impl AppConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from `path` if it exists, else return defaults; then apply the
    /// small set of environment-variable overrides used for secrets and
    /// deployment knobs (Redis URL, log level).
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
            toml::from_str(&text).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?
        } else {
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("ANHEYU_REDIS_URL") {
            self.cache.redis_url = Some(url);
        }
        if let Ok(level) = std::env::var("ANHEYU_LOG_LEVEL") {
            self.log.level = level;
        }
        if let Ok(seed) = std::env::var("ANHEYU_ID_SEED") {
            self.id_codec.seed = seed;
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheConfig {
    /// `None` means "use the in-memory fallback".
    #[serde(default)]
    pub redis_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    #[serde(default = "default_worker_pool_size")]
    pub worker_pool_size: Option<usize>,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_worker_pool_size() -> Option<usize> {
    None
}

fn default_queue_capacity() -> usize {
    1000
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            worker_pool_size: default_worker_pool_size(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
    #[serde(default = "default_max_posts")]
    pub max_posts_num: usize,
    #[serde(default = "default_fetch_timeout", with = "humantime_serde")]
    pub fetch_timeout: Duration,
    #[serde(default = "default_health_check_deadline", with = "humantime_serde")]
    pub health_check_deadline: Duration,
}

fn default_max_concurrent() -> usize {
    3
}

fn default_max_posts() -> usize {
    5
}

fn default_fetch_timeout() -> Duration {
    Duration::from_secs(15)
}

fn default_health_check_deadline() -> Duration {
    Duration::from_secs(600)
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            max_posts_num: default_max_posts(),
            fetch_timeout: default_fetch_timeout(),
            health_check_deadline: default_health_check_deadline(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsConfig {
    #[serde(default = "default_worker_concurrency")]
    pub worker_concurrency: usize,
    #[serde(default = "default_ingest_queue_capacity")]
    pub ingest_queue_capacity: usize,
    #[serde(default = "default_dedup_window", with = "humantime_serde")]
    pub dedup_window: Duration,
    #[serde(default = "default_ua_cache_ttl", with = "humantime_serde")]
    pub ua_cache_ttl: Duration,
}

fn default_worker_concurrency() -> usize {
    50
}

fn default_ingest_queue_capacity() -> usize {
    1000
}

fn default_dedup_window() -> Duration {
    Duration::from_secs(3)
}

fn default_ua_cache_ttl() -> Duration {
    Duration::from_secs(12 * 3600)
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            worker_concurrency: default_worker_concurrency(),
            ingest_queue_capacity: default_ingest_queue_capacity(),
            dedup_window: default_dedup_window(),
            ua_cache_ttl: default_ua_cache_ttl(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdCodecConfig {
    #[serde(default = "default_seed")]
    pub seed: String,
}

fn default_seed() -> String {
    "a1b2c3d4e5f60718293a4b5c6d7e8f90".to_string()
}

impl Default for IdCodecConfig {
    fn default() -> Self {
        Self { seed: default_seed() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { level: default_log_level() }
    }
}
