//! URL shapes for the fixed remote site
//!
//! The aggregation site exposes one listing layout:
//! `https://<host>/<platform>/user/<target>?o=<offset>` where the offset is
//! the index of the first post on the page, in multiples of the page size.

use crate::config::SiteConfig;
use crate::SiphonError;

/// Builds the root listing URL for a target (first page, no offset query)
pub fn root_listing_url(site: &SiteConfig, target: &str) -> String {
    format!("https://{}/{}/user/{}", site.host, site.platform, target)
}

/// Builds a listing URL at the given offset
pub fn listing_url(site: &SiteConfig, target: &str, offset: u64) -> String {
    format!(
        "https://{}/{}/user/{}?o={}",
        site.host, site.platform, target, offset
    )
}

/// Extracts the `o` offset query parameter from a listing href
///
/// Returns None when the href has no parseable offset.
pub fn parse_offset(href: &str) -> Option<u64> {
    let url = url::Url::parse(href).ok()?;
    url.query_pairs()
        .find(|(key, _)| key == "o")
        .and_then(|(_, value)| value.parse::<u64>().ok())
}

/// Validates a target (creator username) before a job is accepted
///
/// Target names are path segments on the remote site, so only a
/// conservative character set is accepted.
pub fn validate_target(target: &str) -> Result<(), SiphonError> {
    if target.is_empty() {
        return Err(SiphonError::InvalidTarget(
            "target name cannot be empty".to_string(),
        ));
    }

    if !target
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-')
    {
        return Err(SiphonError::InvalidTarget(format!(
            "target name '{}' contains invalid characters",
            target
        )));
    }

    Ok(())
}
