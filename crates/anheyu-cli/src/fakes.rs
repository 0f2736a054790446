//! In-memory collaborator fakes, standing in for the ORM/HTTP layer that
//! would supply real repositories in production. Exists only so this binary
//! can drive the whole background core for manual smoke-testing.

use anheyu_types::collaborators::{
    ArticleRepository, DailyStatRepository, FriendCircleStatistics, FriendPostRepository, LinkHealth,
    LinkRepository, ScheduledArticle, UrlStatRepository, VisitorLogRepository,
};
use anheyu_types::{DailyStat, Friend, Post, UrlStat, VisitorLog};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
pub struct InMemoryLinkRepo {
    friends: Mutex<Vec<Friend>>,
}

impl InMemoryLinkRepo {
    pub fn seeded(friends: Vec<Friend>) -> Self {
        Self {
            friends: Mutex::new(friends),
        }
    }
}

#[async_trait]
impl LinkRepository for InMemoryLinkRepo {
    async fn list_approved_friends(&self) -> anyhow::Result<Vec<Friend>> {
        Ok(self.friends.lock().unwrap().clone())
    }
    async fn list_all_links(&self) -> anyhow::Result<Vec<Friend>> {
        Ok(self.friends.lock().unwrap().clone())
    }
    async fn batch_update_status(&self, results: Vec<LinkHealth>) -> anyhow::Result<()> {
        for r in results {
            tracing::info!(site_url = %r.site_url, reachable = r.reachable, "link health result");
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryPostRepo {
    posts: Mutex<Vec<Post>>,
    statistics: Mutex<Option<FriendCircleStatistics>>,
}

#[async_trait]
impl FriendPostRepository for InMemoryPostRepo {
    async fn upsert_posts(&self, posts: Vec<Post>) -> anyhow::Result<()> {
        let mut stored = self.posts.lock().unwrap();
        for incoming in posts {
            if let Some(existing) = stored
                .iter_mut()
                .find(|p| p.friend_link == incoming.friend_link && p.link == incoming.link)
            {
                existing.updated = incoming.updated;
                existing.rule = incoming.rule;
            } else {
                stored.push(incoming);
            }
        }
        Ok(())
    }

    async fn cleanup_expired(
        &self,
        active_links: &[String],
        max_age: chrono::Duration,
        now: DateTime<Utc>,
    ) -> anyhow::Result<u64> {
        let mut stored = self.posts.lock().unwrap();
        let before = stored.len();
        stored.retain(|p| active_links.contains(&p.friend_link) && now - p.crawled_at <= max_age);
        Ok((before - stored.len()) as u64)
    }

    async fn random_sample(&self, n: usize) -> anyhow::Result<Vec<Post>> {
        let stored = self.posts.lock().unwrap();
        Ok(stored.iter().take(n).cloned().collect())
    }

    async fn filter_by_friend_link(&self, friend_link: &str) -> anyhow::Result<Vec<Post>> {
        let stored = self.posts.lock().unwrap();
        Ok(stored.iter().filter(|p| p.friend_link == friend_link).cloned().collect())
    }

    async fn is_empty(&self) -> anyhow::Result<bool> {
        Ok(self.posts.lock().unwrap().is_empty())
    }

    async fn recompute_statistics(
        &self,
        friends_num: u64,
        active_num: u64,
        error_num: u64,
        now: DateTime<Utc>,
    ) -> anyhow::Result<FriendCircleStatistics> {
        let article_num = self.posts.lock().unwrap().len() as u64;
        let stats = FriendCircleStatistics {
            friends_num,
            active_num,
            error_num,
            article_num,
            last_updated_time: now.format("%Y-%m-%d %H:%M:%S").to_string(),
        };
        *self.statistics.lock().unwrap() = Some(stats.clone());
        Ok(stats)
    }
}

#[derive(Default)]
pub struct InMemoryArticleRepo {
    scheduled: Mutex<Vec<ScheduledArticle>>,
    published: Mutex<Vec<u64>>,
    view_counts: Mutex<HashMap<u64, i64>>,
}

#[async_trait]
impl ArticleRepository for InMemoryArticleRepo {
    async fn find_scheduled_due(&self, now: DateTime<Utc>) -> anyhow::Result<Vec<ScheduledArticle>> {
        let published = self.published.lock().unwrap();
        Ok(self
            .scheduled
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.publish_at <= now && !published.contains(&a.db_id))
            .cloned()
            .collect())
    }

    async fn publish_scheduled(&self, db_id: u64) -> anyhow::Result<bool> {
        let mut published = self.published.lock().unwrap();
        if published.contains(&db_id) {
            return Ok(false);
        }
        published.push(db_id);
        Ok(true)
    }

    async fn batch_increment_views(&self, deltas: &HashMap<u64, i64>) -> anyhow::Result<()> {
        let mut counts = self.view_counts.lock().unwrap();
        for (db_id, delta) in deltas {
            *counts.entry(*db_id).or_insert(0) += delta;
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryVisitorLogRepo {
    logs: Mutex<Vec<VisitorLog>>,
}

#[async_trait]
impl VisitorLogRepository for InMemoryVisitorLogRepo {
    async fn create(&self, log: VisitorLog) -> anyhow::Result<()> {
        self.logs.lock().unwrap().push(log);
        Ok(())
    }

    async fn count_uniques_on(&self, date: NaiveDate) -> anyhow::Result<u64> {
        let logs = self.logs.lock().unwrap();
        let unique: std::collections::HashSet<_> = logs
            .iter()
            .filter(|l| l.created_at.date_naive() == date)
            .map(|l| l.visitor_id.clone())
            .collect();
        Ok(unique.len() as u64)
    }

    async fn count_views_on(&self, date: NaiveDate) -> anyhow::Result<u64> {
        let logs = self.logs.lock().unwrap();
        Ok(logs.iter().filter(|l| l.created_at.date_naive() == date).count() as u64)
    }

    async fn count_bounces_on(&self, date: NaiveDate) -> anyhow::Result<u64> {
        let logs = self.logs.lock().unwrap();
        Ok(logs
            .iter()
            .filter(|l| l.created_at.date_naive() == date && l.is_bounce)
            .count() as u64)
    }

    async fn first_log_date(&self) -> anyhow::Result<Option<NaiveDate>> {
        let logs = self.logs.lock().unwrap();
        Ok(logs.iter().map(|l| l.created_at.date_naive()).min())
    }

    async fn range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        page: u32,
        page_size: u32,
    ) -> anyhow::Result<Vec<VisitorLog>> {
        let logs = self.logs.lock().unwrap();
        let filtered: Vec<_> = logs.iter().filter(|l| l.created_at >= from && l.created_at <= to).cloned().collect();
        let start = (page.saturating_sub(1) as usize) * page_size as usize;
        Ok(filtered.into_iter().skip(start).take(page_size as usize).collect())
    }
}

#[derive(Default)]
pub struct InMemoryDailyStatRepo {
    rows: Mutex<HashMap<NaiveDate, DailyStat>>,
}

#[async_trait]
impl DailyStatRepository for InMemoryDailyStatRepo {
    async fn upsert(&self, stat: DailyStat) -> anyhow::Result<()> {
        self.rows.lock().unwrap().insert(stat.date, stat);
        Ok(())
    }

    async fn latest_date(&self) -> anyhow::Result<Option<NaiveDate>> {
        Ok(self.rows.lock().unwrap().keys().max().copied())
    }

    async fn range(&self, from: NaiveDate, to: NaiveDate) -> anyhow::Result<Vec<DailyStat>> {
        let rows = self.rows.lock().unwrap();
        let mut out: Vec<_> = rows.values().filter(|s| s.date >= from && s.date <= to).copied().collect();
        out.sort_by_key(|s| s.date);
        Ok(out)
    }

    async fn views_on(&self, date: NaiveDate) -> anyhow::Result<u64> {
        Ok(self.rows.lock().unwrap().get(&date).map(|s| s.total_views).unwrap_or(0))
    }

    async fn total_views_between(&self, from: NaiveDate, to: NaiveDate) -> anyhow::Result<u64> {
        let rows = self.rows.lock().unwrap();
        Ok(rows.values().filter(|s| s.date >= from && s.date <= to).map(|s| s.total_views).sum())
    }
}

#[derive(Default)]
pub struct InMemoryUrlStatRepo {
    rows: Mutex<HashMap<String, UrlStat>>,
}

#[async_trait]
impl UrlStatRepository for InMemoryUrlStatRepo {
    async fn increment(&self, path: &str, unique: bool, is_bounce: bool, duration_secs: f64) -> anyhow::Result<()> {
        let mut rows = self.rows.lock().unwrap();
        let entry = rows.entry(path.to_string()).or_default();
        entry.views += 1;
        if unique {
            entry.unique_visitors += 1;
        }
        if is_bounce {
            entry.bounce_count += 1;
        }
        entry.total_duration_secs += duration_secs;
        Ok(())
    }

    async fn top_pages(&self, limit: usize) -> anyhow::Result<Vec<(String, UrlStat)>> {
        let rows = self.rows.lock().unwrap();
        let mut all: Vec<_> = rows.iter().map(|(k, v)| (k.clone(), *v)).collect();
        all.sort_by_key(|b| std::cmp::Reverse(b.1.views));
        all.truncate(limit);
        Ok(all)
    }
}
