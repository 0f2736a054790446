//! Friend-Circle Crawler: given the current set of approved friend sites,
//! produces a bounded list of recent posts per site via ordered extraction
//! strategies (feed discovery, then themed CSS rules), with per-site failure
//! isolation.

pub mod client;
pub mod feed;
pub mod health;
pub mod theme;
pub mod themes;
pub mod timestamp;

pub use client::SiteClient;

use anheyu_clock::Clock;
use anheyu_types::collaborators::{FriendPostRepository, LinkRepository};
use anheyu_types::{Friend, Post, ThemeRules};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::warn;

#[derive(Debug, Clone, Copy)]
pub struct CrawlerConfig {
    pub max_concurrent: usize,
    pub max_posts_num: usize,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 3,
            max_posts_num: 5,
        }
    }
}

/// Outcome of one `crawl_all_friends` pass.
pub struct CrawlSummary {
    pub posts: Vec<Post>,
    pub error_count: usize,
    pub combined_error: Option<anyhow::Error>,
}

/// Crawl every friend's site, bounded to `config.max_concurrent` in-flight
/// HTTP fetches. Per-site failures never abort the pass: a failing site
/// contributes nothing to `posts` and is counted in `error_count`.
pub async fn crawl_all_friends(
    client: &SiteClient,
    friends: &[Friend],
    config: &CrawlerConfig,
    themes: &ThemeRules,
    clock: &Clock,
) -> CrawlSummary {
    let semaphore = Arc::new(Semaphore::new(config.max_concurrent.max(1)));
    let tasks = friends.iter().map(|friend| {
        let semaphore = semaphore.clone();
        let friend = friend.clone();
        async move {
            let _permit = semaphore.acquire_owned().await.expect("semaphore never closed");
            crawl_posts(client, &friend, config, themes, clock).await
        }
    });

    let results = futures::future::join_all(tasks).await;

    let mut posts = Vec::new();
    let mut error_count = 0usize;
    let mut messages = Vec::new();
    for result in results {
        match result {
            Ok(site_posts) => posts.extend(site_posts),
            Err(e) => {
                error_count += 1;
                messages.push(e.to_string());
            }
        }
    }

    let combined_error = (!messages.is_empty())
        .then(|| anyhow::anyhow!("{} site(s) failed to crawl: {}", messages.len(), messages.join("; ")));

    CrawlSummary {
        posts,
        error_count,
        combined_error,
    }
}

/// Crawl a single friend's site: feed discovery first, themed CSS extraction
/// second. Neither strategy producing posts is not an error — it yields an
/// empty list.
pub async fn crawl_posts(
    client: &SiteClient,
    friend: &Friend,
    config: &CrawlerConfig,
    themes: &ThemeRules,
    clock: &Clock,
) -> anyhow::Result<Vec<Post>> {
    let friend_link = friend.link();
    let now = Utc::now();

    if let Some(raw_posts) = feed::discover(client, &friend.site_url).await {
        let tuples = raw_posts.into_iter().map(|p| (p.title, p.link, p.created, p.updated));
        return Ok(enrich(tuples, "feed", friend, &friend_link, now, config.max_posts_num, clock));
    }

    let root_html = client.get_text(&friend.site_url).await?;
    if let Some((theme_name, raw_posts)) = theme::extract(&root_html, &friend.site_url, themes) {
        return Ok(enrich(
            raw_posts.into_iter(),
            &theme_name,
            friend,
            &friend_link,
            now,
            config.max_posts_num,
            clock,
        ));
    }

    Ok(Vec::new())
}

#[allow(clippy::too_many_arguments)]
fn enrich(
    raw_posts: impl Iterator<Item = (String, String, String, String)>,
    rule: &str,
    friend: &Friend,
    friend_link: &str,
    now: chrono::DateTime<Utc>,
    max_posts_num: usize,
    clock: &Clock,
) -> Vec<Post> {
    raw_posts
        .filter(|(_, link, _, _)| !link.is_empty())
        .take(max_posts_num)
        .map(|(title, link, created, updated)| Post {
            title,
            link,
            created: timestamp::normalize(&created, clock),
            updated: timestamp::normalize(&updated, clock),
            rule: rule.to_string(),
            author: friend.name.clone(),
            avatar: friend.avatar.clone(),
            friend_link: friend_link.to_string(),
            crawled_at: now,
        })
        .collect()
}

/// The broker-dispatched crawl job: crawl every approved friend, upsert the
/// resulting posts, clean up retired friends' posts, and recompute the
/// aggregate statistics row (§4.2.4).
#[allow(clippy::too_many_arguments)]
pub async fn run_crawl_job(
    client: &SiteClient,
    link_repo: &dyn LinkRepository,
    post_repo: &dyn FriendPostRepository,
    config: &CrawlerConfig,
    themes: &ThemeRules,
    max_post_age: chrono::Duration,
    clock: &Clock,
) -> anyhow::Result<CrawlSummary> {
    let friends = link_repo.list_approved_friends().await?;
    let summary = crawl_all_friends(client, &friends, config, themes, clock).await;

    if let Err(e) = post_repo.upsert_posts(summary.posts.clone()).await {
        warn!(error = %e, "failed to upsert crawled posts");
    }

    let active_links: Vec<String> = friends.iter().map(|f| f.link()).collect();
    let now = Utc::now();
    if let Err(e) = post_repo.cleanup_expired(&active_links, max_post_age, now).await {
        warn!(error = %e, "failed to clean up expired friend-circle posts");
    }

    let friends_num = friends.len() as u64;
    let error_num = summary.error_count as u64;
    let active_num = friends_num.saturating_sub(error_num);
    if let Err(e) = post_repo
        .recompute_statistics(friends_num, active_num, error_num, now)
        .await
    {
        warn!(error = %e, "failed to recompute friend-circle statistics");
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anheyu_types::collaborators::{FriendCircleStatistics, LinkHealth};
    use std::sync::Mutex;

    fn friend(name: &str, url: &str) -> Friend {
        Friend {
            name: name.to_string(),
            site_url: url.to_string(),
            avatar: String::new(),
            description: String::new(),
        }
    }

    #[tokio::test]
    async fn crawl_posts_with_unreachable_site_yields_error_not_panic() {
        let client = SiteClient::with_timeout(std::time::Duration::from_millis(200));
        let config = CrawlerConfig::default();
        let themes = themes::default_theme_rules();
        let f = friend("ghost", "http://127.0.0.1:1");
        let clock = Clock::default();
        let result = crawl_posts(&client, &f, &config, &themes, &clock).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn crawl_all_friends_isolates_per_site_failures() {
        let client = SiteClient::with_timeout(std::time::Duration::from_millis(200));
        let config = CrawlerConfig::default();
        let themes = themes::default_theme_rules();
        let friends = vec![
            friend("a", "http://127.0.0.1:1"),
            friend("b", "http://127.0.0.1:2"),
        ];
        let clock = Clock::default();
        let summary = crawl_all_friends(&client, &friends, &config, &themes, &clock).await;
        assert_eq!(summary.error_count, 2);
        assert!(summary.posts.is_empty());
        assert!(summary.combined_error.is_some());
    }

    struct FakeLinkRepo {
        friends: Vec<Friend>,
    }

    #[async_trait::async_trait]
    impl LinkRepository for FakeLinkRepo {
        async fn list_approved_friends(&self) -> anyhow::Result<Vec<Friend>> {
            Ok(self.friends.clone())
        }
        async fn list_all_links(&self) -> anyhow::Result<Vec<Friend>> {
            Ok(self.friends.clone())
        }
        async fn batch_update_status(&self, _results: Vec<LinkHealth>) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakePostRepo {
        upserted: Mutex<Vec<Post>>,
    }

    #[async_trait::async_trait]
    impl FriendPostRepository for FakePostRepo {
        async fn upsert_posts(&self, posts: Vec<Post>) -> anyhow::Result<()> {
            self.upserted.lock().unwrap().extend(posts);
            Ok(())
        }
        async fn cleanup_expired(
            &self,
            _active_links: &[String],
            _max_age: chrono::Duration,
            _now: chrono::DateTime<Utc>,
        ) -> anyhow::Result<u64> {
            Ok(0)
        }
        async fn random_sample(&self, _n: usize) -> anyhow::Result<Vec<Post>> {
            Ok(Vec::new())
        }
        async fn filter_by_friend_link(&self, _friend_link: &str) -> anyhow::Result<Vec<Post>> {
            Ok(Vec::new())
        }
        async fn is_empty(&self) -> anyhow::Result<bool> {
            Ok(self.upserted.lock().unwrap().is_empty())
        }
        async fn recompute_statistics(
            &self,
            friends_num: u64,
            active_num: u64,
            error_num: u64,
            now: chrono::DateTime<Utc>,
        ) -> anyhow::Result<FriendCircleStatistics> {
            Ok(FriendCircleStatistics {
                friends_num,
                active_num,
                error_num,
                article_num: self.upserted.lock().unwrap().len() as u64,
                last_updated_time: now.format("%Y-%m-%d %H:%M:%S").to_string(),
            })
        }
    }

    #[tokio::test]
    async fn run_crawl_job_tolerates_unreachable_friends() {
        let client = SiteClient::with_timeout(std::time::Duration::from_millis(200));
        let config = CrawlerConfig::default();
        let themes = themes::default_theme_rules();
        let link_repo = FakeLinkRepo {
            friends: vec![friend("dead", "http://127.0.0.1:1")],
        };
        let post_repo = FakePostRepo::default();
        let clock = Clock::default();

        let summary = run_crawl_job(
            &client,
            &link_repo,
            &post_repo,
            &config,
            &themes,
            chrono::Duration::days(30),
            &clock,
        )
        .await
        .unwrap();

        assert_eq!(summary.error_count, 1);
        assert!(post_repo.is_empty().await.unwrap());
    }
}
