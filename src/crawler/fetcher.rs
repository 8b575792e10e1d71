//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with proper user agent strings and timeouts
//! - GET requests for friends pages (text) and Web API calls (JSON)
//! - Pacing and retry of transient failures
//! - Error classification

use crate::config::{Config, UserAgentConfig};
use crate::crawler::pacer::Pacer;
use crate::crawler::retry::RetryPolicy;
use reqwest::{redirect::Policy, Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Errors from a single upstream request
///
/// URLs are stored without their query string so API keys never reach the logs.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Transport error for {url}: {message}")]
    Transport {
        url: String,
        message: String,
        transient: bool,
    },

    #[error("HTTP {status_code} for {url}")]
    Status { url: String, status_code: u16 },

    #[error("Failed to parse response from {url}: {message}")]
    ParseFailure { url: String, message: String },
}

impl FetchError {
    /// Returns true if repeating the request may succeed
    ///
    /// | Condition | Transient |
    /// |-----------|-----------|
    /// | Timeout / connection failure | yes |
    /// | HTTP 429 | yes |
    /// | HTTP 5xx | yes |
    /// | Other HTTP status | no |
    /// | Parse failure | no |
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport { transient, .. } => *transient,
            Self::Status { status_code, .. } => {
                *status_code == StatusCode::TOO_MANY_REQUESTS.as_u16() || *status_code >= 500
            }
            Self::ParseFailure { .. } => false,
        }
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use steam_ripple::config::UserAgentConfig;
/// use steam_ripple::crawler::build_http_client;
/// use std::time::Duration;
///
/// let config = UserAgentConfig {
///     crawler_name: "SteamRipple".to_string(),
///     crawler_version: "0.1".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config, Duration::from_secs(30)).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    request_timeout: Duration,
) -> Result<Client, reqwest::Error> {
    // Format: CrawlerName/Version (+ContactURL; ContactEmail)
    let user_agent = format!(
        "{}/{} (+{}; {})",
        config.crawler_name, config.crawler_version, config.contact_url, config.contact_email
    );

    Client::builder()
        .user_agent(user_agent)
        .timeout(request_timeout)
        .connect_timeout(request_timeout.min(Duration::from_secs(10)))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Joins `path` onto `base`, treating `base` as a directory
///
/// `Url::join` replaces the last path segment unless it ends with a slash, so a
/// base such as `http://host/prefix` would otherwise lose `prefix`.
pub fn endpoint(base: &Url, path: &str) -> Url {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let with_slash = format!("{}/", base.path());
        base.set_path(&with_slash);
    }
    base.join(path.trim_start_matches('/'))
        .unwrap_or(base)
}

/// Renders a URL for logs and errors, without its query string
pub fn redact_url(url: &Url) -> String {
    let mut redacted = url.clone();
    redacted.set_query(None);
    redacted.to_string()
}

/// Paced, retrying HTTP GET shared by every upstream adapter
pub struct HttpFetcher {
    client: Client,
    retry: RetryPolicy,
    pacer: Pacer,
}

impl HttpFetcher {
    pub fn new(client: Client, retry: RetryPolicy, pacer: Pacer) -> Self {
        Self {
            client,
            retry,
            pacer,
        }
    }

    /// Builds a fetcher from the `[crawler]` and `[user-agent]` sections
    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        let client = build_http_client(&config.user_agent, config.crawler.request_timeout())?;
        Ok(Self::new(
            client,
            RetryPolicy::from_config(&config.crawler),
            Pacer::new(config.crawler.request_delay()),
        ))
    }

    /// Fetches `url` and returns the response body as text
    pub async fn get_text(&self, url: &Url) -> Result<String, FetchError> {
        let label = &redact_url(url);
        self.retry
            .run(label, move || async move {
                let response = self.send(url).await?;
                response.text().await.map_err(|e| classify_error(label, e))
            })
            .await
    }

    /// Fetches `url` and decodes the JSON response body
    pub async fn get_json<T: DeserializeOwned>(&self, url: &Url) -> Result<T, FetchError> {
        let label = &redact_url(url);
        self.retry
            .run(label, move || async move {
                let response = self.send(url).await?;
                response
                    .json::<T>()
                    .await
                    .map_err(|e| classify_error(label, e))
            })
            .await
    }

    /// Sends a single GET, honouring the pacing interval
    async fn send(&self, url: &Url) -> Result<Response, FetchError> {
        self.pacer.wait().await;

        let label = redact_url(url);
        tracing::trace!(url = %label, "GET");

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| classify_error(&label, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: label,
                status_code: status.as_u16(),
            });
        }

        Ok(response)
    }
}

/// Classifies a reqwest error into a fetch error
fn classify_error(url: &str, error: reqwest::Error) -> FetchError {
    // reqwest errors embed the full URL; strip it so the key stays out of messages
    let error = error.without_url();
    if error.is_timeout() {
        FetchError::Transport {
            url: url.to_string(),
            message: "Request timeout".to_string(),
            transient: true,
        }
    } else if error.is_connect() {
        FetchError::Transport {
            url: url.to_string(),
            message: "Connection refused".to_string(),
            transient: true,
        }
    } else if error.is_decode() {
        FetchError::ParseFailure {
            url: url.to_string(),
            message: error.to_string(),
        }
    } else {
        FetchError::Transport {
            url: url.to_string(),
            message: error.to_string(),
            transient: error.is_request() || error.is_body(),
        }
    }
}
