use std::fmt;

/// Ban summary for a profile, captured once at discovery time
///
/// `Unknown` is written when the ban lookup failed; it is never
/// refreshed afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlagStatus {
    Clean,
    VacBanned,
    GameBanned,
    CommunityBanned,
    EconomyBanned,
    Unknown,
}

impl FlagStatus {
    /// Returns true if any kind of ban was recorded
    pub fn is_flagged(&self) -> bool {
        !matches!(self, Self::Clean | Self::Unknown)
    }

    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Clean => "clean",
            Self::VacBanned => "vac_banned",
            Self::GameBanned => "game_banned",
            Self::CommunityBanned => "community_banned",
            Self::EconomyBanned => "economy_banned",
            Self::Unknown => "unknown",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "clean" => Some(Self::Clean),
            "vac_banned" => Some(Self::VacBanned),
            "game_banned" => Some(Self::GameBanned),
            "community_banned" => Some(Self::CommunityBanned),
            "economy_banned" => Some(Self::EconomyBanned),
            "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }

    pub fn all_statuses() -> [Self; 6] {
        [
            Self::Clean,
            Self::VacBanned,
            Self::GameBanned,
            Self::CommunityBanned,
            Self::EconomyBanned,
            Self::Unknown,
        ]
    }
}

impl fmt::Display for FlagStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
