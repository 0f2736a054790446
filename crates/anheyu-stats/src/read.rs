//! Read paths (§4.3.4).

use crate::keys;
use anheyu_cache::CacheAdapter;
use anheyu_clock::Clock;
use anheyu_types::collaborators::{DailyStatRepository, UrlStatRepository, VisitorLogRepository};
use anheyu_types::{BasicStatistics, DailyStat, UrlStat, VisitorLog};
use chrono::{DateTime, Datelike, Duration as ChronoDuration, NaiveDate, Utc};
use std::sync::Arc;
use std::time::Duration;

const BASIC_STATS_TTL: Duration = Duration::from_secs(5 * 60);
const TOP_PAGES_TTL: Duration = Duration::from_secs(15 * 60);
const MAX_TOP_PAGES: usize = 100;
const MAX_TREND_DAYS: i64 = 365;
const MAX_PAGE_SIZE: u32 = 200;
const DEFAULT_RANGE_DAYS: i64 = 7;

pub struct Reader {
    pub cache: Arc<dyn CacheAdapter>,
    pub clock: Clock,
    pub daily_stat_repo: Arc<dyn DailyStatRepository>,
    pub visitor_log_repo: Arc<dyn VisitorLogRepository>,
    pub url_stat_repo: Arc<dyn UrlStatRepository>,
}

impl Reader {
    pub async fn get_basic_statistics(&self) -> anyhow::Result<BasicStatistics> {
        if let Some(json) = self.cache.get(&keys::basic_snapshot()).await?
            && let Ok(stats) = serde_json::from_str::<BasicStatistics>(&json) {
                return Ok(stats);
            }

        let date = self.clock.today();
        let yesterday = date - ChronoDuration::days(1);
        let month_start = NaiveDate::from_ymd_opt(date.year(), date.month(), 1).unwrap_or(date);
        let year_start = NaiveDate::from_ymd_opt(date.year(), 1, 1).unwrap_or(date);

        let cached_today_views = self
            .cache
            .get(&keys::today_views(date))
            .await?
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|&v| v > 0);

        let stats = if let Some(today_views) = cached_today_views {
            let today_unique_visitors = self
                .cache
                .get(&keys::today_visitors(date))
                .await?
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(0);
            BasicStatistics {
                today_views,
                yesterday_views: self.daily_stat_repo.views_on(yesterday).await?,
                month_views: self.daily_stat_repo.total_views_between(month_start, date).await?,
                year_views: self.daily_stat_repo.total_views_between(year_start, date).await?,
                today_unique_visitors,
            }
        } else {
            BasicStatistics {
                today_views: self.visitor_log_repo.count_views_on(date).await?,
                yesterday_views: self.daily_stat_repo.views_on(yesterday).await?,
                month_views: self.daily_stat_repo.total_views_between(month_start, date).await?,
                year_views: self.daily_stat_repo.total_views_between(year_start, date).await?,
                today_unique_visitors: self.visitor_log_repo.count_uniques_on(date).await?,
            }
        };

        let json = serde_json::to_string(&stats)?;
        self.cache.set(&keys::basic_snapshot(), &json, Some(BASIC_STATS_TTL)).await?;
        Ok(stats)
    }

    pub async fn get_top_pages(&self, limit: usize) -> anyhow::Result<Vec<(String, UrlStat)>> {
        let limit = limit.clamp(1, MAX_TOP_PAGES);
        let cache_key = keys::top_pages(limit);
        if let Some(json) = self.cache.get(&cache_key).await?
            && let Ok(pages) = serde_json::from_str::<Vec<(String, UrlStat)>>(&json) {
                return Ok(pages);
            }
        let pages = self.url_stat_repo.top_pages(limit).await?;
        let json = serde_json::to_string(&pages)?;
        self.cache.set(&cache_key, &json, Some(TOP_PAGES_TTL)).await?;
        Ok(pages)
    }

    /// `period` is currently always daily granularity; accepted for API
    /// symmetry with future groupings.
    pub async fn get_visitor_trend(&self, _period: &str, days: i64) -> anyhow::Result<Vec<DailyStat>> {
        let days = days.clamp(1, MAX_TREND_DAYS);
        let to = self.clock.today();
        let from = to - ChronoDuration::days(days - 1);
        self.daily_stat_repo.range(from, to).await
    }

    pub async fn get_visitor_analytics(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        page: u32,
        page_size: u32,
    ) -> anyhow::Result<Vec<VisitorLog>> {
        let (from, to) = self.resolve_range(from, to);
        let page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        self.visitor_log_repo.range(from, to, page, page_size).await
    }

    pub async fn get_visitor_logs(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        page: u32,
        page_size: u32,
    ) -> anyhow::Result<Vec<VisitorLog>> {
        self.get_visitor_analytics(from, to, page, page_size).await
    }

    fn resolve_range(&self, from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> (DateTime<Utc>, DateTime<Utc>) {
        let to = to.unwrap_or_else(Utc::now);
        let from = from.unwrap_or_else(|| to - ChronoDuration::days(DEFAULT_RANGE_DAYS));
        (from, to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anheyu_cache::InMemoryCache;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct FakeDailyStatRepo {
        views: Mutex<HashMap<NaiveDate, u64>>,
    }

    #[async_trait]
    impl DailyStatRepository for FakeDailyStatRepo {
        async fn upsert(&self, _stat: DailyStat) -> anyhow::Result<()> {
            Ok(())
        }
        async fn latest_date(&self) -> anyhow::Result<Option<NaiveDate>> {
            Ok(None)
        }
        async fn range(&self, _from: NaiveDate, _to: NaiveDate) -> anyhow::Result<Vec<DailyStat>> {
            Ok(vec![])
        }
        async fn views_on(&self, date: NaiveDate) -> anyhow::Result<u64> {
            Ok(*self.views.lock().unwrap().get(&date).unwrap_or(&0))
        }
        async fn total_views_between(&self, _from: NaiveDate, _to: NaiveDate) -> anyhow::Result<u64> {
            Ok(42)
        }
    }

    struct FakeVisitorLogRepo;

    #[async_trait]
    impl VisitorLogRepository for FakeVisitorLogRepo {
        async fn create(&self, _log: VisitorLog) -> anyhow::Result<()> {
            Ok(())
        }
        async fn count_uniques_on(&self, _date: NaiveDate) -> anyhow::Result<u64> {
            Ok(7)
        }
        async fn count_views_on(&self, _date: NaiveDate) -> anyhow::Result<u64> {
            Ok(11)
        }
        async fn count_bounces_on(&self, _date: NaiveDate) -> anyhow::Result<u64> {
            Ok(2)
        }
        async fn first_log_date(&self) -> anyhow::Result<Option<NaiveDate>> {
            Ok(None)
        }
        async fn range(
            &self,
            _from: DateTime<Utc>,
            _to: DateTime<Utc>,
            _page: u32,
            _page_size: u32,
        ) -> anyhow::Result<Vec<VisitorLog>> {
            Ok(vec![])
        }
    }

    struct FakeUrlStatRepo;

    #[async_trait]
    impl UrlStatRepository for FakeUrlStatRepo {
        async fn increment(&self, _path: &str, _unique: bool, _is_bounce: bool, _duration_secs: f64) -> anyhow::Result<()> {
            Ok(())
        }
        async fn top_pages(&self, limit: usize) -> anyhow::Result<Vec<(String, UrlStat)>> {
            Ok((0..limit)
                .map(|i| (format!("/page{i}"), UrlStat::default()))
                .collect())
        }
    }

    fn reader(cache: Arc<dyn CacheAdapter>) -> Reader {
        Reader {
            cache,
            clock: Clock::default(),
            daily_stat_repo: Arc::new(FakeDailyStatRepo { views: Mutex::new(HashMap::new()) }),
            visitor_log_repo: Arc::new(FakeVisitorLogRepo),
            url_stat_repo: Arc::new(FakeUrlStatRepo),
        }
    }

    #[tokio::test]
    async fn basic_statistics_falls_back_to_repository_when_cache_empty() {
        let r = reader(Arc::new(InMemoryCache::new()));
        let stats = r.get_basic_statistics().await.unwrap();
        assert_eq!(stats.today_views, 11);
        assert_eq!(stats.today_unique_visitors, 7);
        assert_eq!(stats.month_views, 42);
    }

    #[tokio::test]
    async fn basic_statistics_second_call_is_served_from_snapshot_cache() {
        let cache = Arc::new(InMemoryCache::new());
        let r = reader(cache.clone());
        let first = r.get_basic_statistics().await.unwrap();
        let snapshot = cache.get(&keys::basic_snapshot()).await.unwrap();
        assert!(snapshot.is_some());
        let second = r.get_basic_statistics().await.unwrap();
        assert_eq!(first.today_views, second.today_views);
    }

    #[tokio::test]
    async fn top_pages_clamps_limit_and_caches() {
        let r = reader(Arc::new(InMemoryCache::new()));
        let pages = r.get_top_pages(500).await.unwrap();
        assert_eq!(pages.len(), MAX_TOP_PAGES);
        let pages = r.get_top_pages(0).await.unwrap();
        assert_eq!(pages.len(), 1);
    }

    #[tokio::test]
    async fn visitor_trend_clamps_days() {
        let r = reader(Arc::new(InMemoryCache::new()));
        let trend = r.get_visitor_trend("day", 10_000).await.unwrap();
        assert!(trend.is_empty());
    }

    #[tokio::test]
    async fn visitor_analytics_defaults_to_last_week_and_clamps_page_size() {
        let r = reader(Arc::new(InMemoryCache::new()));
        let logs = r.get_visitor_analytics(None, None, 1, 10_000).await.unwrap();
        assert!(logs.is_empty());
    }
}
