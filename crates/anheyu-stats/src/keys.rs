//! Cache key families (§6.2), all under the `anheyu:` prefix.

use chrono::NaiveDate;

const PREFIX: &str = "anheyu:";

pub fn today_views(date: NaiveDate) -> String {
    format!("{PREFIX}stats:today:views:{date}")
}

pub fn today_visitors(date: NaiveDate) -> String {
    format!("{PREFIX}stats:today:visitors:{date}")
}

pub fn visitors_set(date: NaiveDate) -> String {
    format!("{PREFIX}stats:visitors:set:{date}")
}

pub fn basic_snapshot() -> String {
    format!("{PREFIX}stats:basic")
}

pub fn top_pages(limit: usize) -> String {
    format!("{PREFIX}stats:top_pages:{limit}")
}

pub fn article_view_count(public_id: &str) -> String {
    format!("{PREFIX}article:view_count:{public_id}")
}

pub fn article_view_count_scan_pattern() -> String {
    format!("{PREFIX}article:view_count:*")
}

pub fn article_html(id_or_abbrlink: &str) -> String {
    format!("{PREFIX}article:html:{id_or_abbrlink}")
}

pub fn rss_feed_latest() -> String {
    format!("{PREFIX}rss:feed:latest")
}

pub fn home_articles_cache() -> String {
    format!("{PREFIX}home:articles:cache")
}

pub fn home_featured_cache() -> String {
    format!("{PREFIX}home:featured:cache")
}

pub fn sidebar_recent_cache() -> String {
    format!("{PREFIX}sidebar:recent:cache")
}
