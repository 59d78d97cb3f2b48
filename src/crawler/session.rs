//! HTTP session factory and page fetching
//!
//! Each worker gets its own `reqwest::Client`, which means its own cookie
//! jar, connection pool, and default headers. Fetch failures are classified
//! into the crate error type here so callers only ever see `HarvestError`.

use crate::config::HttpConfig;
use crate::HarvestError;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::Client;
use std::time::Duration;

/// Builds an isolated HTTP session
///
/// # Arguments
///
/// * `config` - The HTTP configuration
///
/// # Returns
///
/// * `Ok(Client)` - Session with its own cookie store and headers
/// * `Err(reqwest::Error)` - Failed to build the client
///
/// # Example
///
/// ```no_run
/// use job_harvest::config::HttpConfig;
/// use job_harvest::crawler::build_session;
///
/// let session = build_session(&HttpConfig::default()).unwrap();
/// ```
pub fn build_session(config: &HttpConfig) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml;q=0.9,*/*;q=0.8"),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

    Client::builder()
        .user_agent(config.user_agent.as_str())
        .default_headers(headers)
        .cookie_store(true)
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a page and returns its body
///
/// Non-success status codes are errors; there is no retry; a failed fetch is
/// recorded once and the caller moves on.
///
/// # Arguments
///
/// * `client` - The session to use
/// * `url` - The URL to fetch
///
/// # Returns
///
/// * `Ok(String)` - The response body
/// * `Err(HarvestError)` - `Timeout`, `Http`, or `HttpStatus`
pub async fn fetch_html(client: &Client, url: &str) -> Result<String, HarvestError> {
    tracing::debug!("Fetching {}", url);

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| HarvestError::from_request(url, e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(HarvestError::HttpStatus {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    response
        .text()
        .await
        .map_err(|e| HarvestError::from_request(url, e))
}
