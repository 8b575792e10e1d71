//! Enrichment: one-time attribute lookups for newly discovered profiles
//!
//! Attributes are fetched only when a profile is inserted. A failed lookup is
//! recorded as unknown rather than blocking the insert.

mod steam_api;

pub use steam_api::{PlayerBans, SteamWebApiEnricher};

use crate::identity::NodeId;
use crate::state::FlagStatus;
use async_trait::async_trait;
use thiserror::Error;

/// Errors from an enrichment lookup
#[derive(Debug, Error)]
pub enum EnrichmentError {
    #[error("Enrichment service unavailable for {id}: {message}")]
    Unavailable { id: String, message: String },

    #[error("No record for {0}")]
    NotFound(String),
}

/// Attribute lookups performed once per new node
#[async_trait]
pub trait Enricher: Send + Sync {
    /// Looks up the profile's current display name
    async fn fetch_display_name(&self, id: &NodeId) -> Result<String, EnrichmentError>;

    /// Looks up the profile's ban summary
    async fn fetch_flag_status(&self, id: &NodeId) -> Result<FlagStatus, EnrichmentError>;
}
