//! End-to-end crawl scenarios against mock HTTP servers (§8 seed scenarios).

use anheyu_clock::Clock;
use anheyu_crawler::{crawl_all_friends, crawl_posts, themes, CrawlerConfig, SiteClient};
use anheyu_types::Friend;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn friend(name: &str, url: &str) -> Friend {
    Friend {
        name: name.to_string(),
        site_url: url.to_string(),
        avatar: format!("{url}/avatar.png"),
        description: String::new(),
    }
}

fn atom_feed(n: usize) -> String {
    let entries: String = (1..=n)
        .map(|i| {
            format!(
                r#"<entry>
                    <title>Post {i}</title>
                    <link href="https://a.example/posts/{i}"/>
                    <id>https://a.example/posts/{i}</id>
                    <published>2024-01-{i:02}T00:00:00Z</published>
                </entry>"#
            )
        })
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
        <feed xmlns="http://www.w3.org/2005/Atom"><title>A</title>{entries}</feed>"#
    )
}

const BUTTERFLY_HTML: &str = r#"
    <html><body>
    <div id="recent-posts">
      <div class="recent-post-info">
        <a class="article-title" href="/posts/one">First post</a>
        <div class="post-meta"><time class="post-meta-date-created" datetime="2024-02-01T00:00:00Z"></time></div>
      </div>
      <div class="recent-post-info">
        <a class="article-title" href="/posts/two">Second post</a>
        <div class="post-meta"><time class="post-meta-date-created" datetime="2024-02-02T00:00:00Z"></time></div>
      </div>
      <div class="recent-post-info">
        <a class="article-title" href="/posts/three">Third post</a>
        <div class="post-meta"><time class="post-meta-date-created" datetime="2024-02-03T00:00:00Z"></time></div>
      </div>
    </div>
    </body></html>
"#;

#[tokio::test]
async fn scenario_1_feed_wins_and_is_capped() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/atom.xml"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/feed/atom"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rss.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(atom_feed(8)))
        .mount(&server)
        .await;

    let client = SiteClient::new();
    let config = CrawlerConfig {
        max_concurrent: 3,
        max_posts_num: 5,
    };
    let themes = themes::default_theme_rules();
    let f = friend("friend-a", &server.uri());
    let clock = Clock::default();

    let posts = crawl_posts(&client, &f, &config, &themes, &clock).await.unwrap();

    assert_eq!(posts.len(), 5);
    for p in &posts {
        assert_eq!(p.rule, "feed");
        assert_eq!(p.author, "friend-a");
        assert!(!p.friend_link.ends_with('/'));
        assert!(p.created.len() == "YYYY-MM-DD HH:MM:SS".len());
    }
}

#[tokio::test]
async fn scenario_2_css_fallback_when_feed_absent() {
    let server = MockServer::start().await;
    for suffix in ["atom.xml", "feed/atom", "rss.xml", "rss2.xml", "feed", "index.xml"] {
        Mock::given(method("GET"))
            .and(path(format!("/{suffix}")))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(BUTTERFLY_HTML))
        .mount(&server)
        .await;

    let client = SiteClient::new();
    let config = CrawlerConfig::default();
    let themes = themes::default_theme_rules();
    let f = friend("friend-b", &server.uri());
    let clock = Clock::default();

    let posts = crawl_posts(&client, &f, &config, &themes, &clock).await.unwrap();

    assert_eq!(posts.len(), 3);
    for p in &posts {
        assert_eq!(p.rule, "butterfly");
        assert_eq!(p.created, p.updated);
    }
}

#[tokio::test]
async fn scenario_3_partial_failure_is_isolated() {
    let good_a = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/atom.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(atom_feed(2)))
        .mount(&good_a)
        .await;

    let good_b = MockServer::start().await;
    for suffix in ["atom.xml", "feed/atom", "rss.xml", "rss2.xml", "feed", "index.xml"] {
        Mock::given(method("GET"))
            .and(path(format!("/{suffix}")))
            .respond_with(ResponseTemplate::new(404))
            .mount(&good_b)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(BUTTERFLY_HTML))
        .mount(&good_b)
        .await;

    let failing = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&failing)
        .await;

    let good_d = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/atom.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(atom_feed(1)))
        .mount(&good_d)
        .await;

    let client = SiteClient::new();
    let config = CrawlerConfig::default();
    let themes = themes::default_theme_rules();
    let friends = vec![
        friend("a", &good_a.uri()),
        friend("b", &good_b.uri()),
        friend("c", &failing.uri()),
        friend("d", &good_d.uri()),
    ];

    let clock = Clock::default();
    let summary = crawl_all_friends(&client, &friends, &config, &themes, &clock).await;

    assert!(summary.error_count >= 1);
    assert!(summary.combined_error.is_some());
    let authors: Vec<&str> = summary.posts.iter().map(|p| p.author.as_str()).collect();
    assert!(authors.contains(&"a"));
    assert!(authors.contains(&"b"));
    assert!(authors.contains(&"d"));
    assert!(!authors.contains(&"c"));
}
