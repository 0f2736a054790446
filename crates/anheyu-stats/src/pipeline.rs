//! Ingest path and worker pool (§4.3.1, §4.3.2).
//!
//! `record_visit` never touches the cache, a repository, or the network; it
//! only resolves the caller's identity, dedups, and enqueues. The heavy work
//! happens in workers fanned out from [`spawn_workers`].

use crate::{ip, keys, ua::UaCache};
use anheyu_cache::CacheAdapter;
use anheyu_clock::Clock;
use anheyu_types::collaborators::{UrlStatRepository, VisitorLogRepository};
use anheyu_types::VisitTask;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Semaphore};
use tracing::{error, warn};

use crate::dedup::DedupMap;

#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub queue_capacity: usize,
    pub dedup_window: Duration,
    pub worker_concurrency: usize,
    pub ua_cache_ttl: Duration,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1000,
            dedup_window: Duration::from_secs(3),
            worker_concurrency: 50,
            ua_cache_ttl: Duration::from_secs(12 * 3600),
        }
    }
}

/// The synchronous half: resolves identity, dedups, enqueues.
pub struct Ingest {
    tx: mpsc::Sender<VisitTask>,
    dedup: Arc<DedupMap>,
    epoch: Instant,
    dropped: Arc<AtomicU64>,
}

impl Ingest {
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Runs steps 1-4 of §4.3.1. `get_header` is a case-insensitive header
    /// lookup; `socket_peer` is the fallback when no header yields an IP.
    #[allow(clippy::too_many_arguments)]
    pub fn record_visit(
        &self,
        get_header: impl Fn(&str) -> Option<String>,
        socket_peer: &str,
        user_agent: &str,
        url_path: &str,
        referer: &str,
        duration_secs: f64,
        now: DateTime<Utc>,
    ) {
        let ip = ip::resolve_client_ip(get_header, socket_peer);
        let visitor_id = format!("{:x}", md5::compute(format!("{ip}{user_agent}").as_bytes()));

        let bucket_key = self.dedup.bucket_key(&visitor_id, url_path, Instant::now(), self.epoch);
        if !self.dedup.insert_if_absent(bucket_key, Instant::now()) {
            return;
        }

        let task = VisitTask {
            arrived_at: now,
            ip,
            user_agent: user_agent.to_string(),
            visitor_id,
            url_path: url_path.to_string(),
            referer: referer.to_string(),
            duration_secs,
        };
        if self.tx.try_send(task).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            warn!("ingest queue full, dropping visit task");
        }
    }
}

/// Shared collaborator handles the worker pool drains tasks against.
pub struct WorkerDeps {
    pub cache: Arc<dyn CacheAdapter>,
    pub clock: Clock,
    pub visitor_log_repo: Arc<dyn VisitorLogRepository>,
    pub url_stat_repo: Arc<dyn UrlStatRepository>,
    pub ua_cache: Arc<UaCache>,
}

/// Builds the channel, returns the synchronous `Ingest` handle, and spawns
/// the dispatcher that fans incoming tasks out to up to `config.worker_concurrency`
/// concurrently-running workers.
pub fn spawn(config: IngestConfig, deps: Arc<WorkerDeps>) -> (Ingest, tokio::task::JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(config.queue_capacity);
    let dedup = Arc::new(DedupMap::new(config.dedup_window));
    let ingest = Ingest {
        tx,
        dedup,
        epoch: Instant::now(),
        dropped: Arc::new(AtomicU64::new(0)),
    };
    let handle = tokio::spawn(dispatch(rx, deps, config.worker_concurrency));
    (ingest, handle)
}

async fn dispatch(mut rx: mpsc::Receiver<VisitTask>, deps: Arc<WorkerDeps>, concurrency: usize) {
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    while let Some(task) = rx.recv().await {
        let permit = match semaphore.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => break,
        };
        let deps = deps.clone();
        tokio::spawn(async move {
            let _permit = permit;
            if let Err(panic) = tokio::spawn(process_one(deps, task)).await {
                error!(panic = %panic, "stats worker panicked");
            }
        });
    }
}

/// Process exactly one visit (§4.3.2 steps 1-4). Errors from the
/// VisitorLog write are swallowed per spec; every other failure is logged
/// and the worker moves on.
async fn process_one(deps: Arc<WorkerDeps>, task: VisitTask) {
    let date = deps.clock.today();

    let newly_unique = match deps.cache.set_add(&keys::visitors_set(date), &task.visitor_id).await {
        Ok(added) => added,
        Err(e) => {
            error!(error = %e, "visitor set_add failed");
            false
        }
    };
    if newly_unique {
        if let Err(e) = deps.cache.expire(&keys::visitors_set(date), Duration::from_secs(48 * 3600)).await {
            error!(error = %e, "visitor set expire failed");
        }
        if let Err(e) = deps
            .cache
            .incr(&keys::today_visitors(date), 1, Some(Duration::from_secs(24 * 3600)))
            .await
        {
            error!(error = %e, "today_visitors incr failed");
        }
    }
    if let Err(e) = deps
        .cache
        .incr(&keys::today_views(date), 1, Some(Duration::from_secs(24 * 3600)))
        .await
    {
        error!(error = %e, "today_views incr failed");
    }
    if let Err(e) = deps.cache.delete(&keys::basic_snapshot()).await {
        error!(error = %e, "basic_snapshot invalidation failed");
    }

    let (browser, os, device) = deps.ua_cache.resolve(&task.user_agent);
    let is_bounce = task.duration_secs < 10.0;

    let log = anheyu_types::VisitorLog {
        visitor_id: task.visitor_id,
        ip: task.ip,
        url_path: task.url_path.clone(),
        referer: task.referer,
        browser,
        os,
        device,
        is_bounce,
        created_at: task.arrived_at,
    };
    if let Err(e) = deps.visitor_log_repo.create(log).await {
        warn!(error = %e, "visitor log insert failed, swallowed");
    }

    if let Err(e) = deps
        .url_stat_repo
        .increment(&task.url_path, newly_unique, is_bounce, task.duration_secs)
        .await
    {
        error!(error = %e, "url stat increment failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anheyu_cache::InMemoryCache;
    use anheyu_types::{Post, UrlStat};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tokio::time::{sleep, Duration as TokioDuration};

    struct FakeVisitorLogRepo {
        logs: Mutex<Vec<anheyu_types::VisitorLog>>,
    }

    #[async_trait]
    impl VisitorLogRepository for FakeVisitorLogRepo {
        async fn create(&self, log: anheyu_types::VisitorLog) -> anyhow::Result<()> {
            self.logs.lock().unwrap().push(log);
            Ok(())
        }
        async fn count_uniques_on(&self, _date: chrono::NaiveDate) -> anyhow::Result<u64> {
            Ok(self.logs.lock().unwrap().len() as u64)
        }
        async fn count_views_on(&self, _date: chrono::NaiveDate) -> anyhow::Result<u64> {
            Ok(self.logs.lock().unwrap().len() as u64)
        }
        async fn count_bounces_on(&self, _date: chrono::NaiveDate) -> anyhow::Result<u64> {
            Ok(0)
        }
        async fn first_log_date(&self) -> anyhow::Result<Option<chrono::NaiveDate>> {
            Ok(None)
        }
        async fn range(
            &self,
            _from: DateTime<Utc>,
            _to: DateTime<Utc>,
            _page: u32,
            _page_size: u32,
        ) -> anyhow::Result<Vec<anheyu_types::VisitorLog>> {
            Ok(self.logs.lock().unwrap().clone())
        }
    }

    struct FakeUrlStatRepo {
        increments: Mutex<Vec<(String, bool, bool, f64)>>,
    }

    #[async_trait]
    impl UrlStatRepository for FakeUrlStatRepo {
        async fn increment(&self, path: &str, unique: bool, is_bounce: bool, duration_secs: f64) -> anyhow::Result<()> {
            self.increments.lock().unwrap().push((path.to_string(), unique, is_bounce, duration_secs));
            Ok(())
        }
        async fn top_pages(&self, _limit: usize) -> anyhow::Result<Vec<(String, UrlStat)>> {
            Ok(vec![])
        }
    }

    fn no_headers(_name: &str) -> Option<String> {
        None
    }

    #[tokio::test]
    async fn burst_of_identical_visits_yields_one_log_and_unique_counter() {
        let cache: Arc<dyn CacheAdapter> = Arc::new(InMemoryCache::new());
        let visitor_log_repo = Arc::new(FakeVisitorLogRepo { logs: Mutex::new(vec![]) });
        let url_stat_repo = Arc::new(FakeUrlStatRepo { increments: Mutex::new(vec![]) });
        let deps = Arc::new(WorkerDeps {
            cache: cache.clone(),
            clock: Clock::default(),
            visitor_log_repo: visitor_log_repo.clone(),
            url_stat_repo: url_stat_repo.clone(),
            ua_cache: Arc::new(UaCache::new(Duration::from_secs(12 * 3600))),
        });
        let (ingest, _handle) = spawn(IngestConfig::default(), deps.clone());

        for _ in 0..1000 {
            ingest.record_visit(no_headers, "10.0.0.1", "curl/8.0", "/home", "", 1.0, Utc::now());
        }

        // give the pool time to drain a single enqueued task
        sleep(TokioDuration::from_millis(200)).await;

        assert_eq!(visitor_log_repo.logs.lock().unwrap().len(), 1);
        let date = deps.clock.today();
        assert_eq!(cache.get(&keys::today_views(date)).await.unwrap(), Some("1".to_string()));
        assert_eq!(cache.set_card(&keys::visitors_set(date)).await.unwrap(), 1);
        assert_eq!(ingest.dropped_count(), 0);
    }

    #[tokio::test]
    async fn bounce_flag_matches_ten_second_threshold() {
        let cache: Arc<dyn CacheAdapter> = Arc::new(InMemoryCache::new());
        let visitor_log_repo = Arc::new(FakeVisitorLogRepo { logs: Mutex::new(vec![]) });
        let url_stat_repo = Arc::new(FakeUrlStatRepo { increments: Mutex::new(vec![]) });
        let deps = Arc::new(WorkerDeps {
            cache,
            clock: Clock::default(),
            visitor_log_repo: visitor_log_repo.clone(),
            url_stat_repo: url_stat_repo.clone(),
            ua_cache: Arc::new(UaCache::new(Duration::from_secs(12 * 3600))),
        });
        let (ingest, _handle) = spawn(IngestConfig::default(), deps);

        ingest.record_visit(no_headers, "10.0.0.1", "ua-a", "/a", "", 9.9, Utc::now());
        ingest.record_visit(no_headers, "10.0.0.2", "ua-b", "/b", "", 10.0, Utc::now());
        sleep(TokioDuration::from_millis(100)).await;

        let logs = visitor_log_repo.logs.lock().unwrap();
        assert!(logs.iter().any(|l| l.url_path == "/a" && l.is_bounce));
        assert!(logs.iter().any(|l| l.url_path == "/b" && !l.is_bounce));
    }

    #[allow(dead_code)]
    fn suppress_unused(_: HashMap<u64, i64>, _: Post) {}
}
