//! The §6.1 periodic schedule and §4.1.3 startup pass, wired to the job
//! bodies each subsystem crate exposes.
//!
//! Two of the seven entries in §6.1's table — "Cleanup abandoned uploads" and
//! "Article history cleanup" — are intentionally absent here: they belong to
//! file-format CRUD and article-version CRUD respectively, both named
//! Non-goals. The remaining five are registered below, plus a UA cache sweep
//! that isn't part of §6.1 but needs somewhere to tick.

use crate::FRIEND_POST_MAX_AGE_DAYS;
use anheyu_broker::{Job, PeriodicEntry};
use anheyu_clock::Clock;
use anheyu_crawler::{themes, CrawlerConfig, SiteClient};
use anheyu_stats::{Aggregator, UaCache};
use anheyu_types::collaborators::{FriendPostRepository, LinkRepository};
use anheyu_viewcount::{Publisher, Writeback};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[allow(clippy::too_many_arguments)]
pub fn periodic_entries(
    writeback: Arc<Writeback>,
    aggregator: Arc<Aggregator>,
    link_repo: Arc<dyn LinkRepository>,
    publisher: Arc<Publisher>,
    site_client: Arc<SiteClient>,
    post_repo: Arc<dyn FriendPostRepository>,
    crawler_config: CrawlerConfig,
    health_check_deadline: Duration,
    ua_cache: Arc<UaCache>,
    clock: Clock,
) -> Vec<PeriodicEntry> {
    vec![
        PeriodicEntry::new(
            "0 0 2 * * *",
            Job::new("view_count_writeback", move || {
                let writeback = writeback.clone();
                async move { writeback.run().await }
            }),
        ),
        PeriodicEntry::new(
            "0 0 1 * * *",
            Job::new("daily_stats_aggregation", move || {
                let aggregator = aggregator.clone();
                async move { aggregator.run_daily_job().await }
            }),
        ),
        PeriodicEntry::new(
            "0 0 3 * * *",
            Job::new("link_health_check", {
                let link_repo = link_repo.clone();
                move || {
                    let link_repo = link_repo.clone();
                    async move { anheyu_crawler::health::run(link_repo.as_ref(), health_check_deadline).await }
                }
            }),
        ),
        PeriodicEntry::new(
            "0 * * * * *",
            Job::new("scheduled_publisher", move || {
                let publisher = publisher.clone();
                async move { publisher.run(chrono::Utc::now()).await }
            }),
        ),
        PeriodicEntry::new(
            "0 0 */6 * * *",
            Job::new("friend_circle_crawl", move || {
                let site_client = site_client.clone();
                let link_repo = link_repo.clone();
                let post_repo = post_repo.clone();
                let crawler_config = crawler_config;
                async move {
                    let themes = themes::default_theme_rules();
                    let max_age = chrono::Duration::days(FRIEND_POST_MAX_AGE_DAYS);
                    anheyu_crawler::run_crawl_job(
                        &site_client,
                        link_repo.as_ref(),
                        post_repo.as_ref(),
                        &crawler_config,
                        &themes,
                        max_age,
                        &clock,
                    )
                    .await
                    .map(|_| ())
                }
            }),
        ),
        PeriodicEntry::new(
            "0 */30 * * * *",
            Job::new("ua_cache_sweep", move || {
                let ua_cache = ua_cache.clone();
                async move {
                    ua_cache.sweep();
                    Ok(())
                }
            }),
        ),
    ]
}

/// Build the startup-pass jobs (§4.1.3): crawl-if-empty and the stats
/// backfill. Both are fired once by the Broker at `start()`; neither retries
/// on failure.
#[allow(clippy::too_many_arguments)]
pub fn startup_jobs(
    aggregator: Arc<Aggregator>,
    link_repo: Arc<dyn LinkRepository>,
    post_repo: Arc<dyn FriendPostRepository>,
    site_client: Arc<SiteClient>,
    crawler_config: CrawlerConfig,
    clock: Clock,
) -> Vec<Job> {
    let backfill = Job::new("stats_startup_backfill", move || {
        let aggregator = aggregator.clone();
        async move { aggregator.run_startup_backfill().await }
    });

    let crawl_if_empty = Job::new("crawl_if_friend_posts_empty", move || {
        let link_repo = link_repo.clone();
        let post_repo = post_repo.clone();
        let site_client = site_client.clone();
        let crawler_config = crawler_config;
        async move {
            if !post_repo.is_empty().await? {
                info!("friend-circle post store already populated, skipping startup crawl");
                return Ok(());
            }
            let themes = themes::default_theme_rules();
            let max_age = chrono::Duration::days(FRIEND_POST_MAX_AGE_DAYS);
            anheyu_crawler::run_crawl_job(
                &site_client,
                link_repo.as_ref(),
                post_repo.as_ref(),
                &crawler_config,
                &themes,
                max_age,
                &clock,
            )
            .await
            .map(|_| ())
        }
    });

    vec![backfill, crawl_if_empty]
}
