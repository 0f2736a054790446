//! Feed discovery: the first extraction strategy tried for every site.
//!
//! Probes a fixed, ordered list of common feed suffixes; the first one that
//! responds 2xx and parses into at least one accepted entry wins.

use crate::client::SiteClient;

/// Suffixes probed in order, relative to the site root.
const FEED_SUFFIXES: &[&str] = &["atom.xml", "feed/atom", "rss.xml", "rss2.xml", "feed", "index.xml"];

/// One feed entry before timestamp normalization.
pub struct RawPost {
    pub title: String,
    pub link: String,
    pub created: String,
    pub updated: String,
}

/// Try each feed suffix in order; return the first one that parses with at
/// least one accepted entry, or `None` if every suffix fails or is empty.
pub async fn discover(client: &SiteClient, base_url: &str) -> Option<Vec<RawPost>> {
    let base = base_url.trim_end_matches('/');
    for suffix in FEED_SUFFIXES {
        let url = format!("{base}/{suffix}");
        let Ok(body) = client.get_text(&url).await else {
            continue;
        };
        let posts = parse_feed(&body);
        if !posts.is_empty() {
            return Some(posts);
        }
    }
    None
}

fn parse_feed(body: &str) -> Vec<RawPost> {
    let Ok(feed) = feed_rs::parser::parse(body.as_bytes()) else {
        return Vec::new();
    };

    feed.entries
        .into_iter()
        .filter_map(|entry| {
            let title = entry.title.map(|t| t.content.trim().to_string()).unwrap_or_default();
            if title.is_empty() {
                return None;
            }
            let link = entry
                .links
                .first()
                .map(|l| l.href.clone())
                .filter(|s| !s.is_empty())
                .or_else(|| Some(entry.id.clone()).filter(|s| !s.is_empty()))?;

            let created = entry
                .published
                .or(entry.updated)
                .map(|d| d.to_rfc3339())
                .unwrap_or_default();
            let updated = entry
                .updated
                .or(entry.published)
                .map(|d| d.to_rfc3339())
                .unwrap_or_else(|| created.clone());

            Some(RawPost {
                title,
                link,
                created,
                updated,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ATOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Example Feed</title>
  <entry>
    <title>Entry One</title>
    <link href="https://example.com/1"/>
    <id>https://example.com/1</id>
    <published>2024-01-01T00:00:00Z</published>
  </entry>
  <entry>
    <title></title>
    <link href="https://example.com/blank"/>
    <id>https://example.com/blank</id>
  </entry>
</feed>"#;

    #[test]
    fn parses_entries_and_skips_blank_titles() {
        let posts = parse_feed(ATOM);
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].title, "Entry One");
        assert_eq!(posts[0].link, "https://example.com/1");
        assert_eq!(posts[0].created, "2024-01-01T00:00:00+00:00");
    }

    #[test]
    fn malformed_body_yields_no_posts() {
        assert!(parse_feed("not xml at all").is_empty());
    }
}
