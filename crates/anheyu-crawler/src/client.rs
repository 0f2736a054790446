//! A thin wrapper around `reqwest::Client` with the crawler's fixed timeout
//! and user agent, mirroring a registry-client-wraps-`reqwest` shape.

use anheyu_types::errors::CrawlError;
use reqwest::redirect::Policy;
use std::time::Duration;

pub const USER_AGENT: &str = concat!("anheyu-crawler/", env!("CARGO_PKG_VERSION"));
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_MAX_REDIRECTS: usize = 10;

#[derive(Clone)]
pub struct SiteClient {
    client: reqwest::Client,
}

impl SiteClient {
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_timeout_and_redirect_limit(timeout, DEFAULT_MAX_REDIRECTS)
    }

    /// Used by the link health check, which needs a tighter timeout and
    /// redirect cap than feed/page fetching.
    pub fn with_timeout_and_redirect_limit(timeout: Duration, max_redirects: usize) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .redirect(Policy::limited(max_redirects))
            .build()
            .expect("reqwest client builder never fails with these options");
        Self { client }
    }

    /// GET `url`; returns the body text only for a 2xx response.
    pub async fn get_text(&self, url: &str) -> Result<String, CrawlError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| CrawlError::Http {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        if !response.status().is_success() {
            return Err(CrawlError::Http {
                url: url.to_string(),
                message: format!("status {}", response.status()),
            });
        }
        response.text().await.map_err(|e| CrawlError::Http {
            url: url.to_string(),
            message: e.to_string(),
        })
    }

    /// HEAD `url`, falling back to GET if the server rejects HEAD. Used by
    /// the link health check, which only needs status and redirect info.
    pub async fn check_reachable(&self, url: &str) -> Result<(bool, u16, usize), CrawlError> {
        let resp = self.client.head(url).send().await;
        let resp = match resp {
            Ok(r) if r.status() != reqwest::StatusCode::METHOD_NOT_ALLOWED => r,
            _ => self
                .client
                .get(url)
                .send()
                .await
                .map_err(|e| CrawlError::Http {
                    url: url.to_string(),
                    message: e.to_string(),
                })?,
        };
        let redirect_count = if resp.url().as_str().ne(url) { 1usize } else { 0 };
        Ok((resp.status().is_success(), resp.status().as_u16(), redirect_count))
    }
}

impl Default for SiteClient {
    fn default() -> Self {
        Self::new()
    }
}
