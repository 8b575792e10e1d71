use crate::ConfigError;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

/// Main configuration structure for Steam-Ripple
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub steam: SteamConfig,
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Identifier recorded as the origin of every node this worker discovers
    #[serde(rename = "worker-id")]
    pub worker_id: String,

    /// Optional starting profile reference
    #[serde(default)]
    pub seed: Option<String>,

    /// Overall timeout for a single HTTP request (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Retries after the first attempt for transient failures
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    /// Base backoff between retries (milliseconds), doubled on each retry
    #[serde(rename = "retry-base-delay-ms", default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    /// Minimum time between two upstream requests (milliseconds)
    #[serde(rename = "request-delay-ms", default = "default_request_delay_ms")]
    pub request_delay_ms: u64,

    /// Age after which an in-progress claim is considered abandoned (seconds, 0 disables)
    #[serde(rename = "stale-after-secs", default = "default_stale_after_secs")]
    pub stale_after_secs: u64,
}

impl CrawlerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    /// Staleness threshold for the reconciliation sweep, if enabled
    pub fn stale_after(&self) -> Option<Duration> {
        (self.stale_after_secs > 0).then(|| Duration::from_secs(self.stale_after_secs))
    }
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    500
}

fn default_request_delay_ms() -> u64 {
    1000
}

fn default_stale_after_secs() -> u64 {
    3600
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

/// Steam endpoints and credentials
#[derive(Debug, Clone, Deserialize)]
pub struct SteamConfig {
    /// Web API key; falls back to the `STEAM_API_KEY` environment variable
    #[serde(rename = "api-key", default)]
    pub api_key: Option<String>,

    /// Base URL of the community site hosting profile pages
    #[serde(rename = "community-url", default = "default_community_url")]
    pub community_url: String,

    /// Base URL of the Steam Web API
    #[serde(rename = "api-url", default = "default_api_url")]
    pub api_url: String,
}

impl SteamConfig {
    /// Returns the API key, or a validation error if none was configured
    pub fn api_key(&self) -> Result<&str, ConfigError> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                ConfigError::Validation(
                    "steam api-key is required (or set STEAM_API_KEY)".to_string(),
                )
            })
    }

    pub fn community_url(&self) -> Result<Url, ConfigError> {
        parse_base_url("community-url", &self.community_url)
    }

    pub fn api_url(&self) -> Result<Url, ConfigError> {
        parse_base_url("api-url", &self.api_url)
    }
}

fn parse_base_url(field: &str, value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", field, value, e)))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} must use http or https, got '{}'",
            field, value
        )));
    }
    Ok(url)
}

impl Default for SteamConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            community_url: default_community_url(),
            api_url: default_api_url(),
        }
    }
}

fn default_community_url() -> String {
    "https://steamcommunity.com".to_string()
}

fn default_api_url() -> String {
    "https://api.steampowered.com".to_string()
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}
