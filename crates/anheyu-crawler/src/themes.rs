//! Built-in theme rule set (§9 "theme rules encoded as data, not code").
//!
//! Adding support for another blog theme means appending an entry here, never
//! touching [`crate::theme::extract`]. Order matters: themes are tried
//! front-to-back and the first match wins.

use anheyu_types::{FieldRule, RuleAttr, ThemeFieldRules, ThemeRules};

fn text(selector: &str) -> FieldRule {
    FieldRule {
        selector: selector.to_string(),
        attr: RuleAttr::Text,
    }
}

fn href(selector: &str) -> FieldRule {
    FieldRule {
        selector: selector.to_string(),
        attr: RuleAttr::Named("href".to_string()),
    }
}

fn time(selector: &str) -> FieldRule {
    FieldRule {
        selector: selector.to_string(),
        attr: RuleAttr::Time,
    }
}

/// The default, fixed-order theme table.
pub fn default_theme_rules() -> ThemeRules {
    ThemeRules(vec![
        (
            "butterfly".to_string(),
            ThemeFieldRules {
                title: vec![text("#recent-posts .recent-post-info .article-title")],
                link: vec![href("#recent-posts .recent-post-info a.article-title")],
                created: vec![time("#recent-posts .post-meta time.post-meta-date-created")],
                updated: vec![time("#recent-posts .post-meta time.post-meta-date-updated")],
            },
        ),
        (
            "next".to_string(),
            ThemeFieldRules {
                title: vec![text(".post-block .post-title-link")],
                link: vec![href(".post-block a.post-title-link")],
                created: vec![time(".post-block .post-time .post-meta-item-text time")],
                updated: vec![time(".post-block .post-updated .post-meta-item-text time")],
            },
        ),
        (
            "fluid".to_string(),
            ThemeFieldRules {
                title: vec![text("article.post-item .post-title")],
                link: vec![href("article.post-item a.post-title")],
                created: vec![time("article.post-item time.post-meta-date")],
                updated: vec![time("article.post-item time.post-meta-date-update")],
            },
        ),
    ])
}
