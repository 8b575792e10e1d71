//! Canonical identity handling for Steam profiles
//!
//! Every profile is keyed by its SteamID64. Friends pages link to profiles
//! either by that id (`/profiles/<id>/`) or by a vanity name (`/id/<name>/`);
//! the resolver turns both into a [`NodeId`].

mod profile_ref;
mod resolver;

pub use profile_ref::{parse_profile_ref, ProfileRef};
pub use resolver::SteamIdentityResolver;

use async_trait::async_trait;
use std::fmt;
use thiserror::Error;
use url::Url;

/// Canonical identifier of a node in the crawl graph
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(String);

impl NodeId {
    /// Wraps an already-canonical identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Builds the community profile URL for this node, with a trailing slash
    pub fn profile_url(&self, community_url: &Url) -> Url {
        crate::crawler::endpoint(community_url, &format!("profiles/{}/", self.0))
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Errors raised while turning a profile reference into a canonical id
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("No profile matches '{reference}': {message}")]
    NotFound { reference: String, message: String },

    #[error("Resolver unavailable for '{reference}': {message}")]
    Unavailable { reference: String, message: String },

    #[error("Not a profile reference: '{0}'")]
    Malformed(String),
}

/// Normalizes profile references into canonical node ids
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// Resolves `reference` into a canonical id
    ///
    /// Canonical references are passed through without any external call.
    async fn resolve(&self, reference: &str) -> Result<NodeId, ResolveError>;
}
