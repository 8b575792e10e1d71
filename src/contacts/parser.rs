//! HTML parser for Steam friends pages
//!
//! Each friend block on `/profiles/<id>/friends/` carries an overlay anchor
//! (`<a class="selectable_overlay" href="...">`) that links to the friend's
//! profile. Those hrefs are the only thing the crawler needs from the page.

use scraper::{Html, Selector};
use url::Url;

/// CSS selector matching one element per friend
pub const FRIEND_SELECTOR: &str = ".selectable_overlay";

/// Extracts friend profile references from a friends page
///
/// # Extraction Rules
///
/// - Only elements matching [`FRIEND_SELECTOR`] with an `href` are considered
/// - Relative hrefs are resolved against `page_url`
/// - `javascript:`, `mailto:`, fragment-only and non-HTTP(S) hrefs are dropped
/// - Document order is preserved; duplicates are kept
///
/// # Example
///
/// ```
/// use steam_ripple::contacts::parse_friends_page;
/// use url::Url;
///
/// let html = r#"<div class="friend_block_v2">
///     <a class="selectable_overlay" href="https://steamcommunity.com/id/robin/"></a>
/// </div>"#;
/// let page = Url::parse("https://steamcommunity.com/profiles/76561197960287930/friends/").unwrap();
/// let refs = parse_friends_page(html, &page).unwrap();
/// assert_eq!(refs, vec!["https://steamcommunity.com/id/robin/".to_string()]);
/// ```
pub fn parse_friends_page(html: &str, page_url: &Url) -> Result<Vec<String>, String> {
    let selector = Selector::parse(FRIEND_SELECTOR)
        .map_err(|e| format!("Invalid friend selector '{}': {}", FRIEND_SELECTOR, e))?;

    let document = Html::parse_document(html);

    let refs = document
        .select(&selector)
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| resolve_link(href, page_url))
        .collect();

    Ok(refs)
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto: schemes
/// - Fragment-only links
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
fn resolve_link(href: &str, page_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:") || href.starts_with("mailto:") {
        return None;
    }

    match page_url.join(href) {
        Ok(absolute_url) => {
            if absolute_url.scheme() == "http" || absolute_url.scheme() == "https" {
                Some(absolute_url.to_string())
            } else {
                None
            }
        }
        Err(_) => None,
    }
}
