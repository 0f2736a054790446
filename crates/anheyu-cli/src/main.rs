//! Demo binary: wires in-memory collaborator fakes to the background
//! execution core and runs it for a fixed duration, printing the visitor
//! statistics snapshot at the end. Not an HTTP server — the core never
//! speaks to clients directly (§1 Non-goals); this binary exists for manual
//! smoke-testing of the Broker, cron schedule, and stats ingest pipeline.

mod fakes;

use anheyu_cache::{CacheAdapter, InMemoryCache, RedisCache};
use anheyu_config::AppConfig;
use anheyu_core::{Collaborators, Core};
use anheyu_types::Friend;
use clap::Parser;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "anheyu-cli", version)]
#[command(about = "Run the background execution core against in-memory fakes")]
struct Cli {
    /// Path to anheyu.toml. Falls back to defaults if missing.
    #[arg(long, default_value = "anheyu.toml")]
    config: std::path::PathBuf,

    /// How long to run before stopping and printing the stats snapshot.
    #[arg(long, default_value = "10s")]
    duration: String,

    /// Seed friend sites to register with the in-memory link repository
    /// (repeatable). With none given, the friend-circle crawl has nothing to
    /// do but still runs on schedule.
    #[arg(long = "friend-site")]
    friend_sites: Vec<String>,

    /// Number of synthetic page visits to record against `/demo` before
    /// stopping, to exercise the stats ingest pipeline.
    #[arg(long, default_value_t = 3)]
    synthetic_visits: u32,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let run_for = humantime::parse_duration(&cli.duration)?;

    let config = AppConfig::load(&cli.config).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        AppConfig::new()
    });

    let friends: Vec<Friend> = cli
        .friend_sites
        .iter()
        .enumerate()
        .map(|(i, url)| Friend {
            name: format!("friend-{i}"),
            site_url: url.clone(),
            avatar: String::new(),
            description: String::new(),
        })
        .collect();

    let cache: Arc<dyn CacheAdapter> = match &config.cache.redis_url {
        Some(url) => {
            tracing::info!("connecting to redis cache backend");
            Arc::new(RedisCache::connect(url).await?)
        }
        None => {
            tracing::info!("no redis_url configured, using in-memory cache backend");
            Arc::new(InMemoryCache::new())
        }
    };

    let collaborators = Collaborators {
        cache,
        link_repo: Arc::new(fakes::InMemoryLinkRepo::seeded(friends)),
        post_repo: Arc::new(fakes::InMemoryPostRepo::default()),
        article_repo: Arc::new(fakes::InMemoryArticleRepo::default()),
        visitor_log_repo: Arc::new(fakes::InMemoryVisitorLogRepo::default()),
        url_stat_repo: Arc::new(fakes::InMemoryUrlStatRepo::default()),
        daily_stat_repo: Arc::new(fakes::InMemoryDailyStatRepo::default()),
    };

    let mut core = Core::build(&config, collaborators)?;
    core.start().await?;
    tracing::info!("core started, broker cron schedule registered");

    for i in 0..cli.synthetic_visits {
        core.ingest().record_visit(
            |_| None,
            "127.0.0.1",
            "anheyu-cli-demo/1.0",
            "/demo",
            "",
            1.0 + i as f64,
            chrono::Utc::now(),
        );
    }

    tokio::select! {
        _ = tokio::time::sleep(run_for) => {
            tracing::info!(?run_for, "duration elapsed, shutting down");
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("ctrl-c received, shutting down");
        }
    }

    let stats = core.reader().get_basic_statistics().await?;
    println!("today_views: {}", stats.today_views);
    println!("today_unique_visitors: {}", stats.today_unique_visitors);
    println!("yesterday_views: {}", stats.yesterday_views);

    core.stop().await;
    Ok(())
}
