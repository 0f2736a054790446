//! Shared domain types for the background execution core.
//!
//! This crate holds the plain data carried between subsystems (`Job`, `Friend`,
//! `Post`, visitor records, ...), the collaborator traits each subsystem depends
//! on, and the per-subsystem `thiserror` error enums. Nothing in here does I/O.

pub mod collaborators;
pub mod errors;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque-id entity kinds, as enumerated by the public-id codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum EntityType {
    User = 1,
    File = 2,
    Album = 3,
    UserGroup = 4,
    StoragePolicy = 5,
    StorageEntity = 6,
    DirectLink = 7,
    Article = 8,
    PostTag = 9,
    PostCategory = 10,
    Comment = 11,
    DocSeries = 12,
}

impl EntityType {
    pub fn from_u8(v: u8) -> Option<Self> {
        Some(match v {
            1 => Self::User,
            2 => Self::File,
            3 => Self::Album,
            4 => Self::UserGroup,
            5 => Self::StoragePolicy,
            6 => Self::StorageEntity,
            7 => Self::DirectLink,
            8 => Self::Article,
            9 => Self::PostTag,
            10 => Self::PostCategory,
            11 => Self::Comment,
            12 => Self::DocSeries,
            _ => return None,
        })
    }
}

/// A friend-circle site entry, sourced from the link repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Friend {
    pub name: String,
    pub site_url: String,
    pub avatar: String,
    pub description: String,
}

impl Friend {
    /// The site URL with any trailing slash stripped, as used on every crawled post.
    pub fn link(&self) -> String {
        self.site_url.trim_end_matches('/').to_string()
    }
}

/// One crawled article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub title: String,
    pub link: String,
    /// "YYYY-MM-DD HH:MM:SS", normalized to the logical zone.
    pub created: String,
    pub updated: String,
    /// Which extraction strategy produced this post ("feed" or a theme name).
    pub rule: String,
    pub author: String,
    pub avatar: String,
    pub friend_link: String,
    pub crawled_at: DateTime<Utc>,
}

/// Which HTML attribute a CSS selector rule extracts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleAttr {
    Text,
    Time,
    Named(String),
}

/// One ordered (selector, attribute) rule for a single field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRule {
    pub selector: String,
    pub attr: RuleAttr,
}

/// A theme's rules for the four required fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeFieldRules {
    pub title: Vec<FieldRule>,
    pub link: Vec<FieldRule>,
    pub created: Vec<FieldRule>,
    pub updated: Vec<FieldRule>,
}

/// Ordered theme name -> rules. Order matters: themes are tried in sequence.
#[derive(Debug, Clone, Default)]
pub struct ThemeRules(pub Vec<(String, ThemeFieldRules)>);

impl ThemeRules {
    pub fn iter(&self) -> impl Iterator<Item = &(String, ThemeFieldRules)> {
        self.0.iter()
    }
}

/// One ingest-path visit, queued for asynchronous processing.
#[derive(Debug, Clone)]
pub struct VisitTask {
    pub arrived_at: DateTime<Utc>,
    pub ip: String,
    pub user_agent: String,
    pub visitor_id: String,
    pub url_path: String,
    pub referer: String,
    pub duration_secs: f64,
}

/// Browser/OS/device classification produced by the UA parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Browser {
    Chrome,
    Firefox,
    Safari,
    Edge,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Os {
    Windows,
    MacOs,
    Linux,
    Android,
    Ios,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Device {
    Mobile,
    Tablet,
    Desktop,
}

/// A persisted visit record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisitorLog {
    pub visitor_id: String,
    pub ip: String,
    pub url_path: String,
    pub referer: String,
    pub browser: Browser,
    pub os: Os,
    pub device: Device,
    pub is_bounce: bool,
    pub created_at: DateTime<Utc>,
}

/// Rolling per-path counters.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct UrlStat {
    pub views: u64,
    pub unique_visitors: u64,
    pub total_duration_secs: f64,
    pub bounce_count: u64,
}

/// One aggregated day.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DailyStat {
    pub date: chrono::NaiveDate,
    pub unique_visitors: u64,
    pub total_views: u64,
    pub page_views: u64,
    pub bounce_count: u64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct BasicStatistics {
    pub today_views: u64,
    pub yesterday_views: u64,
    pub month_views: u64,
    pub year_views: u64,
    pub today_unique_visitors: u64,
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}
