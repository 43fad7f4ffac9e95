//! Link extraction from rendered listing and post pages
//!
//! Parsing is pure (rendered HTML in, URLs out) so it can be tested without
//! a browser. The `list_*` wrappers add navigation and fold every
//! navigation-level failure into an empty result: the caller cannot
//! distinguish "no more posts" from "page failed to render", and the
//! orchestrator's stall counter is the only compensation. Only
//! session-fatal browser errors escape.

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::browser::{BrowserError, PageHandle};

/// Container that must be present before a listing page is queried
pub const LISTING_CONTAINER: &str = ".card-list__items";

/// Extracts post-card links from a rendered listing page, in DOM order
pub fn extract_post_links(html: &str, base: &Url) -> Vec<String> {
    let document = Html::parse_document(html);

    let selector = match Selector::parse(r#".card-list__items article.post-card a[href*="/post/"]"#)
    {
        Ok(s) => s,
        Err(_) => return Vec::new(),
    };

    document
        .select(&selector)
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| resolve(href, base))
        .collect()
}

/// Extracts media URLs from a rendered post page, in DOM order
///
/// Vector-graphic sources and anything under the post header (avatar and
/// byline thumbnails, not content) are excluded.
pub fn extract_media_urls(html: &str, base: &Url) -> Vec<String> {
    let document = Html::parse_document(html);

    let selector = match Selector::parse("img") {
        Ok(s) => s,
        Err(_) => return Vec::new(),
    };

    document
        .select(&selector)
        .filter(|element| !under_post_header(element))
        .filter_map(|element| element.value().attr("src"))
        .filter(|src| !src.is_empty() && !src.ends_with(".svg"))
        .filter_map(|src| resolve(src, base))
        .collect()
}

/// Finds the highest numeric pagination offset on a listing page
///
/// Only pagination links whose visible text is a number count; arrow
/// links (`<`, `>`) carry offsets too and must be ignored. Returns None
/// when no numeric pagination exists.
pub fn extract_max_offset(html: &str, base: &Url, platform: &str) -> Option<u64> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("menu a[href]").ok()?;
    let user_path = format!("/{}/user/", platform);

    let mut max_offset: Option<u64> = None;

    for element in document.select(&selector) {
        let href = match element.value().attr("href") {
            Some(h) if h.contains(&user_path) => h,
            _ => continue,
        };

        let text = element.text().collect::<String>();
        if text.trim().parse::<u64>().is_err() {
            continue;
        }

        let absolute = match resolve(href, base) {
            Some(url) => url,
            None => continue,
        };

        if let Some(offset) = crate::site::parse_offset(&absolute) {
            max_offset = Some(max_offset.map_or(offset, |current| current.max(offset)));
        }
    }

    max_offset
}

/// Counts post cards on a rendered listing page
pub fn listing_item_count(html: &str) -> usize {
    let document = Html::parse_document(html);

    match Selector::parse(".card-list__items article.post-card") {
        Ok(selector) => document.select(&selector).count(),
        Err(_) => 0,
    }
}

/// Returns the post links on a listing page, empty on any extraction failure
pub async fn list_posts(
    page: &dyn PageHandle,
    listing_url: &str,
) -> Result<Vec<String>, BrowserError> {
    match page.fetch_rendered(listing_url, Some(LISTING_CONTAINER)).await {
        Ok(html) => {
            let base = match Url::parse(listing_url) {
                Ok(base) => base,
                Err(_) => return Ok(Vec::new()),
            };
            Ok(extract_post_links(&html, &base))
        }
        Err(e) if e.is_session_fatal() => Err(e),
        Err(e) => {
            tracing::warn!("Listing extraction failed for {}: {}", listing_url, e);
            Ok(Vec::new())
        }
    }
}

/// Returns the media URLs in a post, empty on any extraction failure
pub async fn list_media(page: &dyn PageHandle, post_url: &str) -> Result<Vec<String>, BrowserError> {
    match page.fetch_rendered(post_url, None).await {
        Ok(html) => {
            let base = match Url::parse(post_url) {
                Ok(base) => base,
                Err(_) => return Ok(Vec::new()),
            };
            Ok(extract_media_urls(&html, &base))
        }
        Err(e) if e.is_session_fatal() => Err(e),
        Err(e) => {
            tracing::warn!("Media extraction failed for {}: {}", post_url, e);
            Ok(Vec::new())
        }
    }
}

/// Resolves an href against the page URL, keeping only HTTP(S) results
fn resolve(href: &str, base: &Url) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }

    match base.join(href) {
        Ok(absolute) => {
            if absolute.scheme() == "http" || absolute.scheme() == "https" {
                Some(absolute.to_string())
            } else {
                None
            }
        }
        Err(_) => None,
    }
}

fn under_post_header(element: &ElementRef) -> bool {
    element.ancestors().any(|node| {
        ElementRef::wrap(node)
            .map(|el| {
                el.value().name() == "header" && el.value().classes().any(|c| c == "post__header")
            })
            .unwrap_or(false)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_url() -> Url {
        Url::parse("https://coomer.su/onlyfans/user/creator").unwrap()
    }

    #[test]
    fn test_extract_post_links_in_dom_order() {
        let html = r#"
            <div class="card-list__items">
                <article class="post-card post-card--preview">
                    <a href="/onlyfans/user/creator/post/111">one</a>
                </article>
                <article class="post-card post-card--preview">
                    <a href="/onlyfans/user/creator/post/222">two</a>
                </article>
            </div>
        "#;
        let links = extract_post_links(html, &base_url());
        assert_eq!(
            links,
            vec![
                "https://coomer.su/onlyfans/user/creator/post/111",
                "https://coomer.su/onlyfans/user/creator/post/222",
            ]
        );
    }

    #[test]
    fn test_extract_post_links_ignores_non_post_anchors() {
        let html = r#"
            <div class="card-list__items">
                <article class="post-card">
                    <a href="/onlyfans/user/creator">profile</a>
                    <a href="/onlyfans/user/creator/post/333">post</a>
                </article>
            </div>
            <a href="/onlyfans/user/creator/post/999">outside container</a>
        "#;
        let links = extract_post_links(html, &base_url());
        assert_eq!(links, vec!["https://coomer.su/onlyfans/user/creator/post/333"]);
    }

    #[test]
    fn test_extract_post_links_empty_page() {
        assert!(extract_post_links("<html><body></body></html>", &base_url()).is_empty());
    }

    #[test]
    fn test_extract_media_urls() {
        let html = r#"
            <div class="post__body">
                <img src="/data/aa/bb/photo1.jpg">
                <img src="https://cdn.coomer.su/data/cc/photo2.png">
            </div>
        "#;
        let urls = extract_media_urls(html, &base_url());
        assert_eq!(
            urls,
            vec![
                "https://coomer.su/data/aa/bb/photo1.jpg",
                "https://cdn.coomer.su/data/cc/photo2.png",
            ]
        );
    }

    #[test]
    fn test_extract_media_skips_svg() {
        let html = r#"
            <img src="/static/icon.svg">
            <img src="/data/photo.jpg">
        "#;
        let urls = extract_media_urls(html, &base_url());
        assert_eq!(urls, vec!["https://coomer.su/data/photo.jpg"]);
    }

    #[test]
    fn test_extract_media_skips_header_avatar() {
        let html = r#"
            <header class="post__header">
                <img src="/icons/avatar.png">
            </header>
            <div class="post__body">
                <img src="/data/content.jpg">
            </div>
        "#;
        let urls = extract_media_urls(html, &base_url());
        assert_eq!(urls, vec!["https://coomer.su/data/content.jpg"]);
    }

    #[test]
    fn test_extract_media_skips_deeply_nested_header_image() {
        let html = r#"
            <header class="post__header">
                <div class="post__user"><span><img src="/icons/deep-avatar.png"></span></div>
            </header>
        "#;
        assert!(extract_media_urls(html, &base_url()).is_empty());
    }

    #[test]
    fn test_extract_media_skips_empty_src() {
        let html = r#"<img src=""><img src="/data/real.jpg">"#;
        let urls = extract_media_urls(html, &base_url());
        assert_eq!(urls, vec!["https://coomer.su/data/real.jpg"]);
    }

    #[test]
    fn test_extract_max_offset() {
        let html = r#"
            <menu>
                <a href="/onlyfans/user/creator?o=0">1</a>
                <a href="/onlyfans/user/creator?o=50">2</a>
                <a href="/onlyfans/user/creator?o=100">3</a>
            </menu>
        "#;
        assert_eq!(
            extract_max_offset(html, &base_url(), "onlyfans"),
            Some(100)
        );
    }

    #[test]
    fn test_extract_max_offset_ignores_arrow_links() {
        // The ">" arrow points at the last page; its text is not numeric
        // so it must not contribute an offset.
        let html = r#"
            <menu>
                <a href="/onlyfans/user/creator?o=50">2</a>
                <a href="/onlyfans/user/creator?o=950">&gt;</a>
            </menu>
        "#;
        assert_eq!(extract_max_offset(html, &base_url(), "onlyfans"), Some(50));
    }

    #[test]
    fn test_extract_max_offset_ignores_other_platforms() {
        let html = r#"
            <menu>
                <a href="/fansly/user/creator?o=500">11</a>
            </menu>
        "#;
        assert_eq!(extract_max_offset(html, &base_url(), "onlyfans"), None);
    }

    #[test]
    fn test_extract_max_offset_no_pagination() {
        let html = r#"<div class="card-list__items"></div>"#;
        assert_eq!(extract_max_offset(html, &base_url(), "onlyfans"), None);
    }

    #[test]
    fn test_listing_item_count() {
        let html = r#"
            <div class="card-list__items">
                <article class="post-card"></article>
                <article class="post-card"></article>
            </div>
        "#;
        assert_eq!(listing_item_count(html), 2);
        assert_eq!(listing_item_count("<div></div>"), 0);
    }
}
