//! Enrichment through the Steam Web API
//!
//! - display name: `ISteamUser/GetPlayerSummaries/v2` (`personaname`)
//! - flag status: `ISteamUser/GetPlayerBans/v1`

use crate::crawler::{endpoint, HttpFetcher};
use crate::enrichment::{Enricher, EnrichmentError};
use crate::identity::NodeId;
use crate::state::FlagStatus;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use url::Url;

#[derive(Debug, Deserialize)]
struct SummariesEnvelope {
    response: SummariesResponse,
}

#[derive(Debug, Deserialize)]
struct SummariesResponse {
    #[serde(default)]
    players: Vec<PlayerSummary>,
}

#[derive(Debug, Deserialize)]
struct PlayerSummary {
    steamid: String,
    personaname: String,
}

#[derive(Debug, Deserialize)]
struct BansEnvelope {
    #[serde(default)]
    players: Vec<PlayerBans>,
}

/// One entry of a `GetPlayerBans` response
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PlayerBans {
    pub steam_id: String,
    #[serde(default)]
    pub community_banned: bool,
    #[serde(rename = "VACBanned", default)]
    pub vac_banned: bool,
    #[serde(default)]
    pub number_of_game_bans: u32,
    #[serde(default = "no_economy_ban")]
    pub economy_ban: String,
}

fn no_economy_ban() -> String {
    "none".to_string()
}

impl PlayerBans {
    /// Collapses the ban record into a single flag, most severe first
    pub fn flag_status(&self) -> FlagStatus {
        if self.vac_banned {
            FlagStatus::VacBanned
        } else if self.number_of_game_bans > 0 {
            FlagStatus::GameBanned
        } else if self.community_banned {
            FlagStatus::CommunityBanned
        } else if !self.economy_ban.eq_ignore_ascii_case("none") {
            FlagStatus::EconomyBanned
        } else {
            FlagStatus::Clean
        }
    }
}

/// Enricher backed by the Steam Web API
pub struct SteamWebApiEnricher {
    fetcher: Arc<HttpFetcher>,
    api_url: Url,
    api_key: String,
}

impl SteamWebApiEnricher {
    pub fn new(fetcher: Arc<HttpFetcher>, api_url: Url, api_key: impl Into<String>) -> Self {
        Self {
            fetcher,
            api_url,
            api_key: api_key.into(),
        }
    }

    fn player_url(&self, path: &str, id: &NodeId) -> Url {
        let mut url = endpoint(&self.api_url, path);
        url.query_pairs_mut()
            .append_pair("key", &self.api_key)
            .append_pair("steamids", id.as_str());
        url
    }
}

#[async_trait]
impl Enricher for SteamWebApiEnricher {
    async fn fetch_display_name(&self, id: &NodeId) -> Result<String, EnrichmentError> {
        let url = self.player_url("ISteamUser/GetPlayerSummaries/v2/", id);
        let envelope: SummariesEnvelope =
            self.fetcher
                .get_json(&url)
                .await
                .map_err(|e| EnrichmentError::Unavailable {
                    id: id.to_string(),
                    message: e.to_string(),
                })?;

        envelope
            .response
            .players
            .into_iter()
            .find(|player| player.steamid == id.as_str())
            .map(|player| player.personaname)
            .ok_or_else(|| EnrichmentError::NotFound(id.to_string()))
    }

    async fn fetch_flag_status(&self, id: &NodeId) -> Result<FlagStatus, EnrichmentError> {
        let url = self.player_url("ISteamUser/GetPlayerBans/v1/", id);
        let envelope: BansEnvelope =
            self.fetcher
                .get_json(&url)
                .await
                .map_err(|e| EnrichmentError::Unavailable {
                    id: id.to_string(),
                    message: e.to_string(),
                })?;

        envelope
            .players
            .iter()
            .find(|bans| bans.steam_id == id.as_str())
            .map(PlayerBans::flag_status)
            .ok_or_else(|| EnrichmentError::NotFound(id.to_string()))
    }
}
