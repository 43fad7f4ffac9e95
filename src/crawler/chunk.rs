//! Bounded chunk runner
//!
//! One chunk opens a fresh tab, walks listing pages from its start offset,
//! and processes up to a hard cap of posts before returning the count. The
//! cap bounds worst-case memory and time per invocation; larger chunks were
//! the historical out-of-memory failure mode of this pipeline.

use std::time::Duration;

use crate::browser::{PageHandle, Session};
use crate::config::{CrawlConfig, SiteConfig};
use crate::crawler::{extract, CancelToken};
use crate::events::{EventSink, JobEvent};
use crate::site;
use crate::transfer::{MediaItem, TransferUnit};

/// Runs bounded batches of crawl work against a session owned by the caller
pub struct ChunkRunner<'a> {
    session: &'a dyn Session,
    transfer: &'a dyn TransferUnit,
    sink: &'a dyn EventSink,
    cancel: &'a CancelToken,
    site: &'a SiteConfig,
    crawl: &'a CrawlConfig,
}

impl<'a> ChunkRunner<'a> {
    pub fn new(
        session: &'a dyn Session,
        transfer: &'a dyn TransferUnit,
        sink: &'a dyn EventSink,
        cancel: &'a CancelToken,
        site: &'a SiteConfig,
        crawl: &'a CrawlConfig,
    ) -> Self {
        Self {
            session,
            transfer,
            sink,
            cancel,
            site,
            crawl,
        }
    }

    /// Processes one chunk starting at `start_offset`
    ///
    /// Returns the number of posts whose link extraction was attempted.
    /// The tab opened for this chunk is closed on every exit path before
    /// any error reaches the caller.
    pub async fn run(&self, target: &str, start_offset: u64) -> crate::Result<u64> {
        let page = self.session.open_page().await?;
        let result = self.crawl_listing_pages(&*page, target, start_offset).await;
        page.close().await;
        result
    }

    async fn crawl_listing_pages(
        &self,
        page: &dyn PageHandle,
        target: &str,
        start_offset: u64,
    ) -> crate::Result<u64> {
        let cap = self.crawl.posts_per_chunk;
        // Upper bound on listing pages per chunk; guards against endless
        // pagination if the cap is ever configured below one page.
        let max_pages = (cap.div_ceil(self.crawl.page_size)).max(1);

        let mut processed: u64 = 0;
        let mut offset = start_offset;

        for page_index in 0..max_pages {
            if processed >= cap {
                break;
            }

            if page_index > 0 {
                self.sink.emit(JobEvent::progress(format!(
                    "Waiting {}ms before the next listing page",
                    self.crawl.listing_delay_ms
                )));
                tokio::time::sleep(Duration::from_millis(self.crawl.listing_delay_ms)).await;
            }

            let listing = site::listing_url(self.site, target, offset);
            self.sink.emit(JobEvent::progress(format!(
                "Collecting post links from {}",
                listing
            )));

            let posts = extract::list_posts(page, &listing).await?;
            if posts.is_empty() {
                self.sink.emit(JobEvent::progress(format!(
                    "No post links found at offset {}",
                    offset
                )));
                break;
            }

            self.sink.emit(JobEvent::progress(format!(
                "Found {} post links at offset {}",
                posts.len(),
                offset
            )));

            for post_url in posts {
                if processed >= cap {
                    self.sink.emit(JobEvent::progress(format!(
                        "Reached chunk cap of {} posts",
                        cap
                    )));
                    break;
                }

                // Best-effort mid-chunk cancellation; the post in flight
                // finishes before we honor it.
                if self.cancel.is_cancelled() {
                    self.sink
                        .emit(JobEvent::warning("Cancellation requested; ending chunk early"));
                    return Ok(processed);
                }

                self.sink
                    .emit(JobEvent::progress(format!("Entering post {}", post_url)));

                let media = extract::list_media(page, &post_url).await?;

                // A post counts as processed whether or not its media could
                // be extracted; the cursor must always advance.
                processed += 1;

                self.sink.emit(JobEvent::progress(format!(
                    "Found {} media items in post",
                    media.len()
                )));

                self.mirror_media(target, &post_url, &media).await;
            }

            offset += self.crawl.page_size;
        }

        Ok(processed)
    }

    /// Transfers each media item in order; a failed item is logged and
    /// skipped, never retried, and never aborts the batch
    async fn mirror_media(&self, target: &str, post_url: &str, media: &[String]) {
        for (index, media_url) in media.iter().enumerate() {
            if index > 0 {
                tokio::time::sleep(Duration::from_millis(self.crawl.media_delay_ms)).await;
            }

            let item = MediaItem {
                source_url: media_url.clone(),
                owner_post_url: post_url.to_string(),
            };

            match self.transfer.transfer(&item, target).await {
                Ok(stored) => {
                    self.sink.emit(JobEvent::MediaTransferred {
                        permanent_url: stored.permanent_url,
                        target_id: target.to_string(),
                        source_url: media_url.clone(),
                    });
                }
                Err(e) => {
                    tracing::warn!("Transfer failed for {}: {}", media_url, e);
                    self.sink.emit(JobEvent::warning(format!(
                        "Failed to mirror {}: {}",
                        media_url, e
                    )));
                }
            }
        }
    }
}
