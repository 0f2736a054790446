//! Link health check (§4.2.5, supplemental): walks every known friend link —
//! approved or not — and records reachability. Shares the crawler's HTTP
//! client shape (`SiteClient`) but uses its own timeout/redirect policy and
//! never touches post storage.

use crate::client::SiteClient;
use anheyu_types::collaborators::{LinkHealth, LinkRepository};
use std::time::Duration;
use tracing::warn;

pub const PER_REQUEST_TIMEOUT_SECS: u64 = 10;
pub const MAX_REDIRECTS: usize = 5;

/// Build the `SiteClient` this module probes with: a tighter timeout and
/// redirect cap than feed/page fetching needs.
pub fn client() -> SiteClient {
    SiteClient::with_timeout_and_redirect_limit(Duration::from_secs(PER_REQUEST_TIMEOUT_SECS), MAX_REDIRECTS)
}

/// Probe `url` through `client`, which is expected to enforce the redirect
/// cap and per-request timeout this check needs.
pub async fn check_one(client: &SiteClient, url: &str) -> LinkHealth {
    match client.check_reachable(url).await {
        Ok((reachable, status_code, redirect_count)) => LinkHealth {
            site_url: url.to_string(),
            reachable,
            status_code,
            redirect_count,
        },
        Err(_) => LinkHealth {
            site_url: url.to_string(),
            reachable: false,
            status_code: 0,
            redirect_count: 0,
        },
    }
}

/// Probe every known link and report results back to the link repository.
/// Bounded by an overall `deadline`; individual probes that are still in
/// flight when the deadline elapses are dropped, not retried.
pub async fn run(link_repo: &dyn LinkRepository, deadline: Duration) -> anyhow::Result<()> {
    let links = link_repo.list_all_links().await?;
    let client = client();
    let sleep = tokio::time::sleep(deadline);
    tokio::pin!(sleep);

    let probes = futures::future::join_all(links.iter().map(|f| check_one(&client, &f.site_url)));

    let results = tokio::select! {
        results = probes => results,
        _ = &mut sleep => {
            warn!("link health check hit its deadline before all probes finished");
            Vec::new()
        }
    };

    if !results.is_empty() {
        link_repo.batch_update_status(results).await?;
    }
    Ok(())
}
