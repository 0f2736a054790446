//! Semantic cache adapter: a narrow key-value interface covering everything
//! the background core needs (counters with TTL, sets, lists, atomic batch
//! drain, pattern scan), backed by either Redis or an in-memory fallback.
//!
//! Mirrors the shape of a `StateStore`/`DataStore<T>` trait pair behind one
//! concrete, swappable backend: callers depend only on [`CacheAdapter`].

mod memory;
mod redis_backend;

pub use memory::InMemoryCache;
pub use redis_backend::RedisCache;

use anheyu_types::errors::CacheError;
use async_trait::async_trait;
use std::time::Duration;

/// Semantic key-value operations used throughout the visitor-statistics,
/// view-count, and scheduled-publisher components.
#[async_trait]
pub trait CacheAdapter: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError>;
    /// Increment an integer counter by `delta`, creating it at `delta` if absent.
    /// If `ttl` is given and the key did not previously exist, the TTL is set.
    async fn incr(&self, key: &str, delta: i64, ttl: Option<Duration>) -> Result<i64, CacheError>;
    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), CacheError>;
    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Add `member` to the set at `key`. Returns `true` if the member was new.
    async fn set_add(&self, key: &str, member: &str) -> Result<bool, CacheError>;
    async fn set_card(&self, key: &str) -> Result<u64, CacheError>;

    async fn list_push(&self, key: &str, value: &str) -> Result<(), CacheError>;
    async fn list_range(&self, key: &str, start: isize, stop: isize) -> Result<Vec<String>, CacheError>;
    async fn list_len(&self, key: &str) -> Result<u64, CacheError>;

    /// Atomically read and remove every key matching `pattern`, returning
    /// `(key, value)` pairs for keys that existed. Used by the view-count
    /// writeback job to drain `anheyu:article:view_count:*`.
    async fn get_and_delete_many(&self, pattern: &str) -> Result<Vec<(String, String)>, CacheError>;

    /// List every key matching `pattern` without removing them.
    async fn scan(&self, pattern: &str) -> Result<Vec<String>, CacheError>;
}
