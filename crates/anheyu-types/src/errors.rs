//! Per-subsystem typed error enums (see module docs in each subsystem crate
//! for where these are produced and how orchestration code wraps them).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("seed must be a 32-character hex string, got {0} characters")]
    InvalidSeedLength(usize),
    #[error("seed contains a non-hex character")]
    InvalidSeedDigit,
    #[error("opaque id could not be decoded")]
    Malformed,
    #[error("opaque id decoded to an unknown entity type: {0}")]
    UnknownEntityType(u8),
    #[error("opaque id decoded to entity type {found}, expected {expected}")]
    EntityTypeMismatch { expected: u8, found: u8 },
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(String),
    #[error("value at key {0} was not valid UTF-8 / JSON")]
    Decode(String),
}

#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("http request to {url} failed: {message}")]
    Http { url: String, message: String },
    #[error("no extraction strategy produced any posts")]
    NoStrategyMatched,
    #[error("feed could not be parsed: {0}")]
    FeedParse(String),
}

#[derive(Debug, Error)]
pub enum StatsError {
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),
    #[error("repository error: {0}")]
    Repository(String),
}

#[derive(Debug, Error)]
pub enum WritebackError {
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),
    #[error("article repository batch increment failed: {0}")]
    BatchIncrement(String),
}

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),
    #[error("article repository publish failed for {public_id}: {message}")]
    Publish {
        public_id: String,
        message: String,
    },
}

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("failed to register cron entry {name}: {message}")]
    Registration {
        name: String,
        message: String,
    },
    #[error("dispatch queue is closed")]
    QueueClosed,
}
