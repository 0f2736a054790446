//! Daily aggregation and startup backfill (§4.3.5).

use crate::keys;
use anheyu_cache::CacheAdapter;
use anheyu_clock::Clock;
use anheyu_types::collaborators::{DailyStatRepository, VisitorLogRepository};
use anheyu_types::DailyStat;
use chrono::Duration as ChronoDuration;
use std::sync::Arc;
use tokio::time::{timeout, Duration};
use tracing::{info, warn};

pub struct Aggregator {
    pub cache: Arc<dyn CacheAdapter>,
    pub clock: Clock,
    pub visitor_log_repo: Arc<dyn VisitorLogRepository>,
    pub daily_stat_repo: Arc<dyn DailyStatRepository>,
}

const BACKFILL_DEADLINE: Duration = Duration::from_secs(30 * 60);

impl Aggregator {
    /// Aggregate one UTC+8 calendar day and invalidate the cached snapshot.
    pub async fn aggregate_day(&self, date: chrono::NaiveDate) -> anyhow::Result<()> {
        let unique_visitors = self.visitor_log_repo.count_uniques_on(date).await?;
        let total_views = self.visitor_log_repo.count_views_on(date).await?;
        let bounce_count = self.visitor_log_repo.count_bounces_on(date).await?;
        self.daily_stat_repo
            .upsert(DailyStat {
                date,
                unique_visitors,
                total_views,
                page_views: total_views,
                bounce_count,
            })
            .await?;
        self.cache.delete(&keys::basic_snapshot()).await?;
        info!(%date, unique_visitors, total_views, "aggregated daily stats");
        Ok(())
    }

    /// The 01:00 UTC+8 cron job: aggregates yesterday.
    pub async fn run_daily_job(&self) -> anyhow::Result<()> {
        let yesterday = self.clock.today() - ChronoDuration::days(1);
        self.aggregate_day(yesterday).await
    }

    /// Startup backfill (§4.3.5): catch up any days missed since the last
    /// successful aggregation, bounded by a 30-minute overall deadline.
    pub async fn run_startup_backfill(&self) -> anyhow::Result<()> {
        match timeout(BACKFILL_DEADLINE, self.backfill_inner()).await {
            Ok(result) => result,
            Err(_) => {
                warn!("startup backfill hit its 30-minute deadline");
                Ok(())
            }
        }
    }

    async fn backfill_inner(&self) -> anyhow::Result<()> {
        let start_date = match self.daily_stat_repo.latest_date().await? {
            Some(d) => d + ChronoDuration::days(1),
            None => match self.visitor_log_repo.first_log_date().await? {
                Some(d) => d,
                None => return Ok(()),
            },
        };
        let end_date = self.clock.today() - ChronoDuration::days(1);

        let mut date = start_date;
        while date <= end_date {
            if let Err(e) = self.aggregate_day(date).await {
                warn!(%date, error = %e, "backfill stopped on failure, will retry next startup");
                return Ok(());
            }
            date += ChronoDuration::days(1);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anheyu_cache::InMemoryCache;
    use async_trait::async_trait;
    use chrono::{DateTime, NaiveDate, Utc};
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct FakeVisitorLogRepo {
        first_date: Option<NaiveDate>,
    }

    #[async_trait]
    impl VisitorLogRepository for FakeVisitorLogRepo {
        async fn create(&self, _log: anheyu_types::VisitorLog) -> anyhow::Result<()> {
            Ok(())
        }
        async fn count_uniques_on(&self, _date: NaiveDate) -> anyhow::Result<u64> {
            Ok(5)
        }
        async fn count_views_on(&self, _date: NaiveDate) -> anyhow::Result<u64> {
            Ok(9)
        }
        async fn count_bounces_on(&self, _date: NaiveDate) -> anyhow::Result<u64> {
            Ok(1)
        }
        async fn first_log_date(&self) -> anyhow::Result<Option<NaiveDate>> {
            Ok(self.first_date)
        }
        async fn range(
            &self,
            _from: DateTime<Utc>,
            _to: DateTime<Utc>,
            _page: u32,
            _page_size: u32,
        ) -> anyhow::Result<Vec<anheyu_types::VisitorLog>> {
            Ok(vec![])
        }
    }

    struct FakeDailyStatRepo {
        rows: Mutex<HashMap<NaiveDate, DailyStat>>,
        latest: Mutex<Option<NaiveDate>>,
    }

    #[async_trait]
    impl DailyStatRepository for FakeDailyStatRepo {
        async fn upsert(&self, stat: DailyStat) -> anyhow::Result<()> {
            let mut latest = self.latest.lock().unwrap();
            if latest.map(|d| stat.date > d).unwrap_or(true) {
                *latest = Some(stat.date);
            }
            self.rows.lock().unwrap().insert(stat.date, stat);
            Ok(())
        }
        async fn latest_date(&self) -> anyhow::Result<Option<NaiveDate>> {
            Ok(*self.latest.lock().unwrap())
        }
        async fn range(&self, from: NaiveDate, to: NaiveDate) -> anyhow::Result<Vec<DailyStat>> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .values()
                .filter(|r| r.date >= from && r.date <= to)
                .copied()
                .collect())
        }
        async fn views_on(&self, date: NaiveDate) -> anyhow::Result<u64> {
            Ok(self.rows.lock().unwrap().get(&date).map(|r| r.total_views).unwrap_or(0))
        }
        async fn total_views_between(&self, from: NaiveDate, to: NaiveDate) -> anyhow::Result<u64> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .values()
                .filter(|r| r.date >= from && r.date <= to)
                .map(|r| r.total_views)
                .sum())
        }
    }

    #[tokio::test]
    async fn backfill_with_no_prior_stats_and_no_logs_does_nothing() {
        let aggregator = Aggregator {
            cache: Arc::new(InMemoryCache::new()),
            clock: Clock::default(),
            visitor_log_repo: Arc::new(FakeVisitorLogRepo { first_date: None }),
            daily_stat_repo: Arc::new(FakeDailyStatRepo {
                rows: Mutex::new(HashMap::new()),
                latest: Mutex::new(None),
            }),
        };
        aggregator.run_startup_backfill().await.unwrap();
        assert_eq!(aggregator.daily_stat_repo.latest_date().await.unwrap(), None);
    }

    #[tokio::test]
    async fn backfill_aggregates_each_missing_day_up_to_yesterday() {
        let clock = Clock::default();
        let today = clock.today();
        let first_date = today - ChronoDuration::days(4);
        let daily_stat_repo = Arc::new(FakeDailyStatRepo {
            rows: Mutex::new(HashMap::new()),
            latest: Mutex::new(None),
        });
        let aggregator = Aggregator {
            cache: Arc::new(InMemoryCache::new()),
            clock,
            visitor_log_repo: Arc::new(FakeVisitorLogRepo {
                first_date: Some(first_date),
            }),
            daily_stat_repo: daily_stat_repo.clone(),
        };
        aggregator.run_startup_backfill().await.unwrap();
        let latest = daily_stat_repo.latest_date().await.unwrap().unwrap();
        assert_eq!(latest, today - ChronoDuration::days(1));
        let range = daily_stat_repo.range(first_date, latest).await.unwrap();
        assert_eq!(range.len(), 4);
    }

    #[tokio::test]
    async fn aggregate_day_invalidates_basic_snapshot() {
        let cache = Arc::new(InMemoryCache::new());
        cache.set(&keys::basic_snapshot(), "stale", None).await.unwrap();
        let aggregator = Aggregator {
            cache: cache.clone(),
            clock: Clock::default(),
            visitor_log_repo: Arc::new(FakeVisitorLogRepo { first_date: None }),
            daily_stat_repo: Arc::new(FakeDailyStatRepo {
                rows: Mutex::new(HashMap::new()),
                latest: Mutex::new(None),
            }),
        };
        aggregator.aggregate_day(Clock::default().today()).await.unwrap();
        assert_eq!(cache.get(&keys::basic_snapshot()).await.unwrap(), None);
    }
}
