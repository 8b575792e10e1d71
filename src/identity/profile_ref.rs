use crate::identity::{NodeId, ResolveError};
use url::Url;

/// A profile reference as found in a friends list or supplied as a seed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileRef {
    /// Already keyed by SteamID64; needs no lookup
    Canonical(NodeId),
    /// A custom vanity name that must be resolved through the Web API
    Vanity(String),
}

/// Parses a raw profile reference
///
/// # Accepted forms
///
/// - a bare SteamID64: `76561197960287930`
/// - `https://steamcommunity.com/profiles/76561197960287930/` (any host, http or https,
///   trailing segments such as `/friends/` are ignored)
/// - `https://steamcommunity.com/id/gabelogannewell/`
///
/// # Examples
///
/// ```
/// use steam_ripple::identity::{parse_profile_ref, ProfileRef};
///
/// let parsed = parse_profile_ref("https://steamcommunity.com/id/gaben/").unwrap();
/// assert_eq!(parsed, ProfileRef::Vanity("gaben".to_string()));
/// ```
pub fn parse_profile_ref(raw: &str) -> Result<ProfileRef, ResolveError> {
    let raw = raw.trim();

    if is_steam_id(raw) {
        return Ok(ProfileRef::Canonical(NodeId::new(raw)));
    }

    let url = Url::parse(raw).map_err(|_| ResolveError::Malformed(raw.to_string()))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ResolveError::Malformed(raw.to_string()));
    }

    let mut segments = url
        .path_segments()
        .ok_or_else(|| ResolveError::Malformed(raw.to_string()))?
        .filter(|s| !s.is_empty());

    match (segments.next(), segments.next()) {
        (Some("profiles"), Some(id)) if is_steam_id(id) => {
            Ok(ProfileRef::Canonical(NodeId::new(id)))
        }
        (Some("id"), Some(vanity)) => Ok(ProfileRef::Vanity(vanity.to_string())),
        _ => Err(ResolveError::Malformed(raw.to_string())),
    }
}

/// SteamID64 values are plain decimal numbers
fn is_steam_id(s: &str) -> bool {
    !s.is_empty() && s.len() <= 20 && s.bytes().all(|b| b.is_ascii_digit())
}
