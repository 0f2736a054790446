//! Cache key families this subsystem reads or invalidates (§6.2).

const PREFIX: &str = "anheyu:";

pub fn article_view_count_scan_pattern() -> String {
    format!("{PREFIX}article:view_count:*")
}

pub fn view_count_key_prefix() -> String {
    format!("{PREFIX}article:view_count:")
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
