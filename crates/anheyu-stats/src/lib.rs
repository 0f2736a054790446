//! Visitor-statistics pipeline (§4.3): a low-latency ingest path backed by an
//! in-memory dedup map and bounded queue, a worker pool that maintains
//! real-time cache counters and durable repositories, cached read paths, and
//! a daily aggregation job with startup backfill.

pub mod aggregate;
pub mod dedup;
pub mod ip;
pub mod keys;
pub mod pipeline;
pub mod read;
pub mod ua;

pub use aggregate::Aggregator;
pub use pipeline::{Ingest, IngestConfig, WorkerDeps};
pub use read::Reader;
pub use ua::UaCache;

use anheyu_cache::CacheAdapter;
use anheyu_clock::Clock;
use anheyu_types::collaborators::{DailyStatRepository, UrlStatRepository, VisitorLogRepository};
use std::sync::Arc;

/// Everything the visitor-statistics subsystem needs from its host: a cache,
/// a clock, and the three repositories it writes through.
pub struct StatsDeps {
    pub cache: Arc<dyn CacheAdapter>,
    pub clock: Clock,
    pub visitor_log_repo: Arc<dyn VisitorLogRepository>,
    pub url_stat_repo: Arc<dyn UrlStatRepository>,
    pub daily_stat_repo: Arc<dyn DailyStatRepository>,
}

/// Wires the ingest path, worker pool, aggregator, and reader from a single
/// set of collaborators. Returned alongside the dispatcher's `JoinHandle` and
/// the UA cache handle, so the host can register a periodic `sweep()` call;
/// the caller can shut the handle down or just let it run for the process
/// lifetime.
pub fn start(
    config: IngestConfig,
    deps: StatsDeps,
) -> (Ingest, Aggregator, Reader, Arc<UaCache>, tokio::task::JoinHandle<()>) {
    let ua_cache = Arc::new(ua::UaCache::new(config.ua_cache_ttl));
    let worker_deps = Arc::new(WorkerDeps {
        cache: deps.cache.clone(),
        clock: deps.clock,
        visitor_log_repo: deps.visitor_log_repo.clone(),
        url_stat_repo: deps.url_stat_repo.clone(),
        ua_cache: ua_cache.clone(),
    });
    let (ingest, handle) = pipeline::spawn(config, worker_deps);

    let aggregator = Aggregator {
        cache: deps.cache.clone(),
        clock: deps.clock,
        visitor_log_repo: deps.visitor_log_repo.clone(),
        daily_stat_repo: deps.daily_stat_repo.clone(),
    };
    let reader = Reader {
        cache: deps.cache,
        clock: deps.clock,
        daily_stat_repo: deps.daily_stat_repo,
        visitor_log_repo: deps.visitor_log_repo,
        url_stat_repo: deps.url_stat_repo,
    };

    (ingest, aggregator, reader, ua_cache, handle)
}
