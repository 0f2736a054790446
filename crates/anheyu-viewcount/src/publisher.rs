//! Scheduled publisher job (§4.4.2, every minute at second 0).

use crate::keys;
use anheyu_cache::CacheAdapter;
use anheyu_types::collaborators::ArticleRepository;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{error, info};

pub struct Publisher {
    pub cache: Arc<dyn CacheAdapter>,
    pub article_repo: Arc<dyn ArticleRepository>,
}

impl Publisher {
    pub async fn run(&self, now: DateTime<Utc>) -> anyhow::Result<()> {
        let due = self.article_repo.find_scheduled_due(now).await?;
        let mut any_published = false;

        for article in due {
            let published = match self.article_repo.publish_scheduled(article.db_id).await {
                Ok(published) => published,
                Err(e) => {
                    error!(db_id = article.db_id, error = %e, "failed to publish scheduled article");
                    continue;
                }
            };
            if !published {
                info!(db_id = article.db_id, "article already published by a concurrent run");
                continue;
            }
            any_published = true;

            if let Err(e) = self.cache.delete(&keys::article_html(&article.public_id)).await {
                error!(public_id = %article.public_id, error = %e, "failed to invalidate article html cache");
            }
            if let Some(abbrlink) = &article.abbrlink
                && let Err(e) = self.cache.delete(&keys::article_html(abbrlink)).await {
                    error!(%abbrlink, error = %e, "failed to invalidate article html cache by abbrlink");
                }
        }

        if any_published {
            for key in [
                keys::rss_feed_latest(),
                keys::home_articles_cache(),
                keys::home_featured_cache(),
                keys::sidebar_recent_cache(),
            ] {
                if let Err(e) = self.cache.delete(&key).await {
                    error!(%key, error = %e, "failed to invalidate global cache");
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anheyu_cache::InMemoryCache;
    use anheyu_types::collaborators::ScheduledArticle;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct FakeArticleRepo {
        due: Vec<ScheduledArticle>,
        published: Mutex<Vec<u64>>,
        already_published: Vec<u64>,
    }

    #[async_trait]
    impl ArticleRepository for FakeArticleRepo {
        async fn find_scheduled_due(&self, _now: DateTime<Utc>) -> anyhow::Result<Vec<ScheduledArticle>> {
            Ok(self.due.clone())
        }
        async fn publish_scheduled(&self, db_id: u64) -> anyhow::Result<bool> {
            if self.already_published.contains(&db_id) {
                return Ok(false);
            }
            self.published.lock().unwrap().push(db_id);
            Ok(true)
        }
        async fn batch_increment_views(&self, _deltas: &HashMap<u64, i64>) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn article(db_id: u64, public_id: &str, abbrlink: Option<&str>) -> ScheduledArticle {
        ScheduledArticle {
            db_id,
            public_id: public_id.to_string(),
            abbrlink: abbrlink.map(|s| s.to_string()),
            publish_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn empty_due_set_does_zero_writes_and_leaves_global_caches_untouched() {
        let cache = Arc::new(InMemoryCache::new());
        cache.set(&keys::rss_feed_latest(), "stale", None).await.unwrap();
        let article_repo = Arc::new(FakeArticleRepo {
            due: vec![],
            published: Mutex::new(vec![]),
            already_published: vec![],
        });
        let job = Publisher { cache: cache.clone(), article_repo: article_repo.clone() };
        job.run(Utc::now()).await.unwrap();

        assert!(article_repo.published.lock().unwrap().is_empty());
        assert_eq!(cache.get(&keys::rss_feed_latest()).await.unwrap(), Some("stale".to_string()));
    }

    #[tokio::test]
    async fn publishing_invalidates_per_article_and_global_caches() {
        let cache = Arc::new(InMemoryCache::new());
        cache.set(&keys::article_html("pid-1"), "html", None).await.unwrap();
        cache.set(&keys::article_html("abbr-1"), "html", None).await.unwrap();
        cache.set(&keys::home_articles_cache(), "stale", None).await.unwrap();

        let article_repo = Arc::new(FakeArticleRepo {
            due: vec![article(1, "pid-1", Some("abbr-1"))],
            published: Mutex::new(vec![]),
            already_published: vec![],
        });
        let job = Publisher { cache: cache.clone(), article_repo };
        job.run(Utc::now()).await.unwrap();

        assert_eq!(cache.get(&keys::article_html("pid-1")).await.unwrap(), None);
        assert_eq!(cache.get(&keys::article_html("abbr-1")).await.unwrap(), None);
        assert_eq!(cache.get(&keys::home_articles_cache()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn concurrent_publish_race_is_published_exactly_once() {
        let cache = Arc::new(InMemoryCache::new());
        let article_repo = Arc::new(FakeArticleRepo {
            due: vec![article(1, "pid-1", None)],
            published: Mutex::new(vec![]),
            already_published: vec![1],
        });
        let job = Publisher { cache, article_repo: article_repo.clone() };
        job.run(Utc::now()).await.unwrap();
        assert!(article_repo.published.lock().unwrap().is_empty());
    }
}
