//! Background execution core for the personal-site backend.
//!
//! This is the facade crate: it owns no business logic of its own and instead
//! wires the `anheyu-broker` Task Broker to the job bodies implemented by
//! `anheyu-crawler`, `anheyu-stats`, and `anheyu-viewcount`, using the cache,
//! clock, id codec, and collaborator repositories each subsystem depends on.
//!
//! # Pipeline
//!
//! ```text
//! anheyu-config  ──> Core::build ──> Broker (cron + dispatch queue + worker pool)
//!                        │                 │
//!                        │                 ├─ view-count writeback     (daily 02:00)
//!                        │                 ├─ daily stats aggregation  (daily 01:00)
//!                        │                 ├─ link health check        (daily 03:00)
//!                        │                 ├─ scheduled publisher      (every minute)
//!                        │                 └─ friend-circle crawl      (every 6h)
//!                        │
//!                        └─> stats ingest pipeline (always-on, not cron-driven)
//! ```
//!
//! # Example
//!
//! ```no_run
//! # async fn run(collaborators: anheyu_core::Collaborators) -> anyhow::Result<()> {
//! let config = anheyu_config::AppConfig::new();
//! let mut core = anheyu_core::Core::build(&config, collaborators)?;
//! core.start().await?;
//! // ... serve requests, call core.ingest().record_visit(...) per request ...
//! core.stop().await;
//! # Ok(())
//! # }
//! ```
//!
//! # Key types
//!
//! - [`Collaborators`] — every repository and cache handle the core needs from
//!   its host, bundled into one struct so `Core::build` takes a single argument.
//! - [`Core`] — owns the Broker and the always-on stats ingest pipeline;
//!   `start`/`stop` mirror the Broker's own lifecycle.
//!
//! # Modules
//!
//! - [`schedule`] — builds the §6.1 cron table as `PeriodicEntry` values, and
//!   the §4.1.3 startup-pass jobs.
//!
//! # Stability
//!
//! Pre-1.0; the collaborator trait shapes in `anheyu-types` are the contract
//! surface most likely to move as the surrounding HTTP layer is built out.

pub mod schedule;


use anheyu_broker::Broker;
use anheyu_cache::CacheAdapter;
use anheyu_clock::Clock;
use anheyu_config::AppConfig;
use anheyu_id::Codec;
use anheyu_stats::{Aggregator, Ingest, IngestConfig, Reader, StatsDeps};
use anheyu_types::collaborators::{
    ArticleRepository, DailyStatRepository, FriendPostRepository, LinkRepository, UrlStatRepository,
    VisitorLogRepository,
};
use anheyu_viewcount::{Publisher, Writeback};
use std::sync::Arc;
use tracing::warn;

/// Every collaborator the core needs from its host application. Nothing in
/// this crate implements these traits; the surrounding ORM/HTTP layer does.
pub struct Collaborators {
    pub cache: Arc<dyn CacheAdapter>,
    pub link_repo: Arc<dyn LinkRepository>,
    pub post_repo: Arc<dyn FriendPostRepository>,
    pub article_repo: Arc<dyn ArticleRepository>,
    pub visitor_log_repo: Arc<dyn VisitorLogRepository>,
    pub url_stat_repo: Arc<dyn UrlStatRepository>,
    pub daily_stat_repo: Arc<dyn DailyStatRepository>,
}

/// Friend-circle posts older than this, from friends still in the active set,
/// are retired by the nightly crawl's cleanup step. §4.2.4 names a
/// "configured age" without pinning a value; `DESIGN.md` records why 30 days
/// was chosen here.
pub const FRIEND_POST_MAX_AGE_DAYS: i64 = 30;

/// The running background core: the Task Broker plus the always-on stats
/// ingest pipeline (driven by per-request calls, not by cron).
pub struct Core {
    broker: Broker,
    ingest: Ingest,
    reader: Reader,
    stats_worker: tokio::task::JoinHandle<()>,
    aggregator: Arc<Aggregator>,
    writeback: Arc<Writeback>,
    publisher: Arc<Publisher>,
    link_repo: Arc<dyn LinkRepository>,
    post_repo: Arc<dyn FriendPostRepository>,
    site_client: Arc<anheyu_crawler::SiteClient>,
    crawler_config: anheyu_crawler::CrawlerConfig,
    health_check_deadline: std::time::Duration,
    ua_cache: Arc<anheyu_stats::UaCache>,
    clock: Clock,
}

impl Core {
    /// Wire every subsystem together from config and collaborators. Does not
    /// start the Broker; call [`Core::start`] for that.
    pub fn build(config: &AppConfig, collaborators: Collaborators) -> anyhow::Result<Self> {
        let clock = Clock::new(anheyu_clock::DEFAULT_OFFSET_HOURS);
        let codec = Arc::new(Codec::new(&config.id_codec.seed)?);

        let stats_config = IngestConfig {
            queue_capacity: config.stats.ingest_queue_capacity,
            dedup_window: config.stats.dedup_window,
            worker_concurrency: config.stats.worker_concurrency,
            ua_cache_ttl: config.stats.ua_cache_ttl,
        };
        let (ingest, aggregator, reader, ua_cache, stats_worker) = anheyu_stats::start(
            stats_config,
            StatsDeps {
                cache: collaborators.cache.clone(),
                clock,
                visitor_log_repo: collaborators.visitor_log_repo.clone(),
                url_stat_repo: collaborators.url_stat_repo.clone(),
                daily_stat_repo: collaborators.daily_stat_repo.clone(),
            },
        );

        let writeback = Arc::new(Writeback {
            cache: collaborators.cache.clone(),
            codec,
            article_repo: collaborators.article_repo.clone(),
        });
        let publisher = Arc::new(Publisher {
            cache: collaborators.cache,
            article_repo: collaborators.article_repo,
        });

        let crawler_config = anheyu_crawler::CrawlerConfig {
            max_concurrent: config.crawler.max_concurrent,
            max_posts_num: config.crawler.max_posts_num,
        };
        let site_client = Arc::new(anheyu_crawler::SiteClient::with_timeout(config.crawler.fetch_timeout));
        let broker = Broker::new(config.broker.queue_capacity, config.broker.worker_pool_size);

        Ok(Self {
            broker,
            ingest,
            reader,
            stats_worker,
            aggregator: Arc::new(aggregator),
            writeback,
            publisher,
            link_repo: collaborators.link_repo,
            post_repo: collaborators.post_repo,
            site_client,
            crawler_config,
            health_check_deadline: config.crawler.health_check_deadline,
            ua_cache,
            clock,
        })
    }

    /// The ingest handle; call `.record_visit(...)` from the request path.
    pub fn ingest(&self) -> &Ingest {
        &self.ingest
    }

    /// The cached read path for visitor statistics.
    pub fn reader(&self) -> &Reader {
        &self.reader
    }

    /// Register the §6.1 cron schedule and run the §4.1.3 startup pass, then
    /// start the Broker's worker pool and cron ticking. Cron-registration
    /// failure is fatal, per §7.
    pub async fn start(&mut self) -> anyhow::Result<()> {
        let entries = schedule::periodic_entries(
            self.writeback.clone(),
            self.aggregator.clone(),
            self.link_repo.clone(),
            self.publisher.clone(),
            self.site_client.clone(),
            self.post_repo.clone(),
            self.crawler_config,
            self.health_check_deadline,
            self.ua_cache.clone(),
            self.clock,
        );
        self.broker.register_cron_jobs(entries).await?;

        let startup_jobs = schedule::startup_jobs(
            self.aggregator.clone(),
            self.link_repo.clone(),
            self.post_repo.clone(),
            self.site_client.clone(),
            self.crawler_config,
            self.clock,
        );
        self.broker.start(startup_jobs).await?;
        Ok(())
    }

    /// Stop cron ticking (waiting out in-flight entries), drain the worker
    /// pool, and stop the stats ingest pipeline.
    pub async fn stop(self) {
        self.broker.stop().await;
        drop(self.ingest);
        if let Err(e) = self.stats_worker.await {
            warn!(error = %e, "stats worker task did not shut down cleanly");
        }
    }
}
