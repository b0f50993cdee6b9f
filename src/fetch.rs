// fetch.rs - Raw document collaborator: pulls a domain's landing page HTML
//
// Fetch failures are reported to the caller as errors; the pipeline maps
// them to a fetch_failed observation rather than aborting a batch.

use std::time::Duration;

use anyhow::{anyhow, Result};
use tracing::debug;

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (compatible; leifinder/0.1; +https://github.com/grcengineering/leifinder)";

pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Build the shared HTTP client used for page fetches.
pub fn build_client(user_agent: &str, timeout_secs: u64) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(user_agent)
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()
        .map_err(|e| anyhow!("Failed to build HTTP client: {}", e))
}

/// Fetch a domain's landing page, trying HTTPS first and falling back to HTTP.
pub async fn fetch_page_content(client: &reqwest::Client, domain: &str) -> Result<String> {
    let url = format!("https://{}", domain);

    debug!("Fetching page content: {}", url);

    let response = match client.get(&url).send().await {
        Ok(resp) => resp,
        Err(e) => {
            debug!("HTTPS fetch failed for {}: {}", domain, e);
            let http_url = format!("http://{}", domain);
            client.get(&http_url).send().await.map_err(|e2| {
                anyhow!("Failed to fetch {}: HTTPS: {}, HTTP: {}", domain, e, e2)
            })?
        }
    };

    if !response.status().is_success() {
        return Err(anyhow!(
            "Non-success status {} for {}",
            response.status(),
            url
        ));
    }

    response
        .text()
        .await
        .map_err(|e| anyhow!("Failed to read response body: {}", e))
}

/// Fetch from an explicit base URL instead of deriving one from the domain.
/// Used by tests and by deployments that front pages through a proxy.
pub async fn fetch_from_url(client: &reqwest::Client, url: &str) -> Result<String> {
    debug!("Fetching page content: {}", url);

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| anyhow!("Failed to fetch {}: {}", url, e))?;

    if !response.status().is_success() {
        return Err(anyhow!(
            "Non-success status {} for {}",
            response.status(),
            url
        ));
    }

    response
        .text()
        .await
        .map_err(|e| anyhow!("Failed to read response body: {}", e))
}
