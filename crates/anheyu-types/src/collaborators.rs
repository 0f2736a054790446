//! Collaborator interfaces consumed by the core (§6.4).
//!
//! These are the narrow repository traits the background subsystems call
//! through; the surrounding application (ORM glue, HTTP handlers) supplies the
//! concrete implementations. Nothing in this crate implements them other than
//! test doubles.

use crate::{DailyStat, Friend, Post, VisitorLog};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;

/// Result of probing one friend link's reachability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkHealth {
    pub site_url: String,
    pub reachable: bool,
    pub status_code: u16,
    pub redirect_count: usize,
}

/// The `(friends_num, active_num, error_num, article_num, last_updated_time)`
/// aggregate recomputed after every crawl pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FriendCircleStatistics {
    pub friends_num: u64,
    pub active_num: u64,
    pub error_num: u64,
    pub article_num: u64,
    /// "YYYY-MM-DD HH:MM:SS", already normalized to the logical zone.
    pub last_updated_time: String,
}

/// An article past its scheduled publish time, pending promotion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledArticle {
    pub db_id: u64,
    pub public_id: String,
    pub abbrlink: Option<String>,
    pub publish_at: DateTime<Utc>,
}

/// Approved friend links plus the full (approved + pending) link set used for
/// the crawl and the health check respectively.
#[async_trait]
pub trait LinkRepository: Send + Sync {
    async fn list_approved_friends(&self) -> anyhow::Result<Vec<Friend>>;
    async fn list_all_links(&self) -> anyhow::Result<Vec<Friend>>;
    async fn batch_update_status(&self, results: Vec<LinkHealth>) -> anyhow::Result<()>;
}

#[async_trait]
pub trait FriendPostRepository: Send + Sync {
    /// Upsert by `(friend_link, link)`: an already-seen post gets its
    /// `updated`/`rule` refreshed but keeps its original `crawled_at`.
    async fn upsert_posts(&self, posts: Vec<Post>) -> anyhow::Result<()>;
    /// Remove posts whose friend link is no longer in `active_links`, or that
    /// are older than `max_age`. Returns the number removed.
    async fn cleanup_expired(
        &self,
        active_links: &[String],
        max_age: chrono::Duration,
        now: DateTime<Utc>,
    ) -> anyhow::Result<u64>;
    async fn random_sample(&self, n: usize) -> anyhow::Result<Vec<Post>>;
    async fn filter_by_friend_link(&self, friend_link: &str) -> anyhow::Result<Vec<Post>>;
    async fn is_empty(&self) -> anyhow::Result<bool>;
    /// Recompute and persist the aggregate row from this pass's counts.
    async fn recompute_statistics(
        &self,
        friends_num: u64,
        active_num: u64,
        error_num: u64,
        now: DateTime<Utc>,
    ) -> anyhow::Result<FriendCircleStatistics>;
}

#[async_trait]
pub trait ArticleRepository: Send + Sync {
    async fn find_scheduled_due(&self, now: DateTime<Utc>) -> anyhow::Result<Vec<ScheduledArticle>>;
    /// Atomically transition one article from scheduled to published. Returns
    /// `false` if it was already published by a concurrent run (§8 property 12).
    async fn publish_scheduled(&self, db_id: u64) -> anyhow::Result<bool>;
    async fn batch_increment_views(&self, deltas: &HashMap<u64, i64>) -> anyhow::Result<()>;
}

#[async_trait]
pub trait VisitorLogRepository: Send + Sync {
    /// Best-effort insert; duplicate-key failures are swallowed by the caller.
    async fn create(&self, log: VisitorLog) -> anyhow::Result<()>;
    async fn count_uniques_on(&self, date: NaiveDate) -> anyhow::Result<u64>;
    async fn count_views_on(&self, date: NaiveDate) -> anyhow::Result<u64>;
    async fn count_bounces_on(&self, date: NaiveDate) -> anyhow::Result<u64>;
    async fn first_log_date(&self) -> anyhow::Result<Option<NaiveDate>>;
    async fn range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        page: u32,
        page_size: u32,
    ) -> anyhow::Result<Vec<VisitorLog>>;
}

#[async_trait]
pub trait DailyStatRepository: Send + Sync {
    async fn upsert(&self, stat: DailyStat) -> anyhow::Result<()>;
    async fn latest_date(&self) -> anyhow::Result<Option<NaiveDate>>;
    async fn range(&self, from: NaiveDate, to: NaiveDate) -> anyhow::Result<Vec<DailyStat>>;
    async fn views_on(&self, date: NaiveDate) -> anyhow::Result<u64>;
    async fn total_views_between(&self, from: NaiveDate, to: NaiveDate) -> anyhow::Result<u64>;
}

#[async_trait]
pub trait UrlStatRepository: Send + Sync {
    async fn increment(
        &self,
        path: &str,
        unique: bool,
        is_bounce: bool,
        duration_secs: f64,
    ) -> anyhow::Result<()>;
    /// The `limit` highest-traffic paths, most-visited first.
    async fn top_pages(&self, limit: usize) -> anyhow::Result<Vec<(String, crate::UrlStat)>>;
}
