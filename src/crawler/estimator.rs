//! Total-work estimation from pagination controls
//!
//! The estimate is a deliberate over-approximation: the highest numeric
//! pagination offset plus one full page, assuming the last visible page is
//! full. It is computed once per job and never corrected mid-run; the
//! orchestrator's exhaustion check absorbs the divergence.

use url::Url;

use crate::browser::{BrowserError, PageHandle};
use crate::config::{CrawlConfig, SiteConfig};
use crate::crawler::extract::{extract_max_offset, listing_item_count, LISTING_CONTAINER};
use crate::site;

/// Estimates the total number of posts for a target
///
/// * Numeric pagination with highest offset `M` ⇒ `M + page_size`.
/// * No numeric pagination but at least one listed post ⇒ `page_size`.
/// * An empty listing ⇒ `0`.
///
/// Navigation failures propagate; the caller decides what a blind guess
/// is worth (and makes it visible to clients).
pub async fn estimate_total(
    page: &dyn PageHandle,
    site_config: &SiteConfig,
    crawl_config: &CrawlConfig,
    target: &str,
) -> Result<u64, BrowserError> {
    let url = site::root_listing_url(site_config, target);
    let html = page.fetch_rendered(&url, Some(LISTING_CONTAINER)).await?;

    let base = Url::parse(&url).map_err(|e| BrowserError::Navigation {
        url: url.clone(),
        message: e.to_string(),
    })?;

    match extract_max_offset(&html, &base, &site_config.platform) {
        Some(max_offset) => Ok(max_offset + crawl_config.page_size),
        None => {
            if listing_item_count(&html) > 0 {
                Ok(crawl_config.page_size)
            } else {
                Ok(0)
            }
        }
    }
}
