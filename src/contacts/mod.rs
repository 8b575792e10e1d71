//! Contact extraction: turning a profile into the raw references of its friends

mod parser;

pub use parser::{parse_friends_page, FRIEND_SELECTOR};

use crate::crawler::{endpoint, FetchError, HttpFetcher};
use crate::identity::NodeId;
use async_trait::async_trait;
use std::sync::Arc;
use url::Url;

/// An unresolved profile reference as it appears on a friends page
pub type RawRef = String;

/// Discovers the outbound edges of a node
#[async_trait]
pub trait ContactExtractor: Send + Sync {
    /// Returns the raw references linked from `id`'s contact list
    async fn extract_contacts(&self, id: &NodeId) -> Result<Vec<RawRef>, FetchError>;
}

/// Extractor that scrapes `<community>/profiles/<id>/friends/`
pub struct FriendsPageExtractor {
    fetcher: Arc<HttpFetcher>,
    community_url: Url,
}

impl FriendsPageExtractor {
    pub fn new(fetcher: Arc<HttpFetcher>, community_url: Url) -> Self {
        Self {
            fetcher,
            community_url,
        }
    }

    /// URL of the friends page for `id`
    pub fn friends_url(&self, id: &NodeId) -> Url {
        endpoint(&id.profile_url(&self.community_url), "friends/")
    }
}

#[async_trait]
impl ContactExtractor for FriendsPageExtractor {
    async fn extract_contacts(&self, id: &NodeId) -> Result<Vec<RawRef>, FetchError> {
        let url = self.friends_url(id);
        let body = self.fetcher.get_text(&url).await?;

        let refs = parse_friends_page(&body, &url).map_err(|message| {
            FetchError::ParseFailure {
                url: url.to_string(),
                message,
            }
        })?;

        tracing::debug!(node = %id, contacts = refs.len(), "Parsed friends page");
        Ok(refs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::{Pacer, RetryPolicy};
    use std::time::Duration;

    #[test]
    fn test_friends_url() {
        let fetcher = HttpFetcher::new(
            reqwest::Client::new(),
            RetryPolicy::new(0, Duration::ZERO),
            Pacer::new(Duration::ZERO),
        );
        let extractor = FriendsPageExtractor::new(
            Arc::new(fetcher),
            Url::parse("https://steamcommunity.com").unwrap(),
        );
        assert_eq!(
            extractor
                .friends_url(&NodeId::new("76561197960287930"))
                .as_str(),
            "https://steamcommunity.com/profiles/76561197960287930/friends/"
        );
    }
}
