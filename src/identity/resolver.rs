//! Vanity name resolution against the Steam Web API

use crate::crawler::{endpoint, HttpFetcher};
use crate::identity::{parse_profile_ref, IdentityResolver, NodeId, ProfileRef, ResolveError};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use url::Url;

/// Resolver backed by `ISteamUser/ResolveVanityURL`
pub struct SteamIdentityResolver {
    fetcher: Arc<HttpFetcher>,
    api_url: Url,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct ResolveVanityEnvelope {
    response: ResolveVanityResponse,
}

#[derive(Debug, Deserialize)]
struct ResolveVanityResponse {
    success: i64,
    #[serde(default)]
    steamid: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl SteamIdentityResolver {
    pub fn new(fetcher: Arc<HttpFetcher>, api_url: Url, api_key: impl Into<String>) -> Self {
        Self {
            fetcher,
            api_url,
            api_key: api_key.into(),
        }
    }

    async fn resolve_vanity(&self, vanity: &str) -> Result<NodeId, ResolveError> {
        let mut url = endpoint(&self.api_url, "ISteamUser/ResolveVanityURL/v1/");
        url.query_pairs_mut()
            .append_pair("key", &self.api_key)
            .append_pair("vanityurl", vanity);

        let envelope: ResolveVanityEnvelope =
            self.fetcher
                .get_json(&url)
                .await
                .map_err(|e| ResolveError::Unavailable {
                    reference: vanity.to_string(),
                    message: e.to_string(),
                })?;

        let response = envelope.response;
        match (response.success, response.steamid) {
            (1, Some(steamid)) if !steamid.is_empty() => {
                tracing::debug!(vanity, steamid = %steamid, "Resolved vanity name");
                Ok(NodeId::new(steamid))
            }
            _ => Err(ResolveError::NotFound {
                reference: vanity.to_string(),
                message: response
                    .message
                    .unwrap_or_else(|| "no match".to_string()),
            }),
        }
    }
}

#[async_trait]
impl IdentityResolver for SteamIdentityResolver {
    async fn resolve(&self, reference: &str) -> Result<NodeId, ResolveError> {
        match parse_profile_ref(reference)? {
            ProfileRef::Canonical(id) => Ok(id),
            ProfileRef::Vanity(vanity) => self.resolve_vanity(&vanity).await,
        }
    }
}
