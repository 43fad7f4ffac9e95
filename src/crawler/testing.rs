//! Shared stubs for crawler tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::browser::{BrowserError, PageHandle, Session};
use crate::config::{BrowserConfig, Config, CrawlConfig, ServerConfig, SiteConfig, StorageConfig};
use crate::events::{EventSink, JobEvent};
use crate::storage::{StoreError, StoredMedia};
use crate::transfer::{MediaItem, TransferError, TransferUnit};

/// Builds a full config with zeroed delays for fast tests
pub(crate) fn test_config() -> Config {
    Config {
        crawl: CrawlConfig {
            inter_chunk_delay_ms: 0,
            listing_delay_ms: 0,
            media_delay_ms: 0,
            settle_delay_ms: 0,
            ..CrawlConfig::default()
        },
        site: SiteConfig {
            host: "coomer.su".to_string(),
            platform: "onlyfans".to_string(),
        },
        browser: BrowserConfig::default(),
        storage: StorageConfig {
            upload_url: "https://media.test/upload".to_string(),
            namespace_prefix: "mirrors".to_string(),
            api_key: None,
        },
        server: ServerConfig::default(),
    }
}

/// Renders a listing page with `count` post cards starting at `start_index`
pub(crate) fn listing_page(target: &str, start_index: u64, count: u64) -> String {
    let mut cards = String::new();
    for i in 0..count {
        cards.push_str(&format!(
            r#"<article class="post-card post-card--preview"><a href="/onlyfans/user/{}/post/{}">post</a></article>"#,
            target,
            start_index + i
        ));
    }
    format!(
        r#"<html><body><div class="card-list__items">{}</div></body></html>"#,
        cards
    )
}

/// Renders a listing page that also carries numeric pagination up to `max_offset`
pub(crate) fn listing_page_with_pagination(
    target: &str,
    count: u64,
    max_offset: u64,
) -> String {
    let body = listing_page(target, 0, count);
    let menu = format!(
        r#"<menu><a href="/onlyfans/user/{target}?o=0">1</a><a href="/onlyfans/user/{target}?o={max_offset}">{page}</a></menu>"#,
        target = target,
        max_offset = max_offset,
        page = max_offset / 50 + 1
    );
    body.replace("</body>", &format!("{}</body>", menu))
}

/// Renders a post page with the given media sources (plus a header avatar
/// that extraction must skip)
pub(crate) fn post_page(media: &[&str]) -> String {
    let mut imgs = String::new();
    for src in media {
        imgs.push_str(&format!(r#"<img src="{}">"#, src));
    }
    format!(
        r#"<html><body><header class="post__header"><img src="/icons/avatar.png"></header><div class="post__body">{}</div></body></html>"#,
        imgs
    )
}

/// Stub browser session serving canned HTML by URL
///
/// URLs without a canned page yield a navigation timeout, which the
/// extraction layer folds into an empty result.
pub(crate) struct StubSession {
    pages: Arc<Mutex<HashMap<String, String>>>,
    pub crash_on_fetch: bool,
    pub fail_open: bool,
    opened: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
    shutdowns: Arc<AtomicUsize>,
}

impl StubSession {
    pub fn new() -> Self {
        Self {
            pages: Arc::new(Mutex::new(HashMap::new())),
            crash_on_fetch: false,
            fail_open: false,
            opened: Arc::new(AtomicUsize::new(0)),
            closed: Arc::new(AtomicUsize::new(0)),
            shutdowns: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn add_page(&mut self, url: impl Into<String>, html: String) {
        self.pages.lock().unwrap().insert(url.into(), html);
    }

    pub fn opened_pages(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed_pages(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn shutdown_count(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Session for StubSession {
    async fn open_page(&self) -> Result<Box<dyn PageHandle>, BrowserError> {
        if self.fail_open {
            return Err(BrowserError::Launch("scripted launch failure".to_string()));
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(StubPage {
            pages: self.pages.clone(),
            crash: self.crash_on_fetch,
            closed: self.closed.clone(),
        }))
    }

    async fn shutdown(&self) {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
    }
}

struct StubPage {
    pages: Arc<Mutex<HashMap<String, String>>>,
    crash: bool,
    closed: Arc<AtomicUsize>,
}

#[async_trait]
impl PageHandle for StubPage {
    async fn fetch_rendered(
        &self,
        url: &str,
        _wait_selector: Option<&str>,
    ) -> Result<String, BrowserError> {
        if self.crash {
            return Err(BrowserError::Session("scripted session crash".to_string()));
        }
        self.pages
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| BrowserError::Timeout {
                url: url.to_string(),
            })
    }

    async fn close(self: Box<Self>) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Transfer stub that can fail deterministically every Nth call
pub(crate) struct ScriptedStore {
    fail_every: Option<u64>,
    pub calls: Arc<AtomicU64>,
}

impl ScriptedStore {
    pub fn new(fail_every: Option<u64>) -> Self {
        Self {
            fail_every,
            calls: Arc::new(AtomicU64::new(0)),
        }
    }
}

#[async_trait]
impl TransferUnit for ScriptedStore {
    async fn transfer(
        &self,
        item: &MediaItem,
        target: &str,
    ) -> Result<StoredMedia, TransferError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(k) = self.fail_every {
            if n % k == 0 {
                return Err(TransferError::Store {
                    url: item.source_url.clone(),
                    source: StoreError::Upload {
                        status: 500,
                        body: "scripted failure".to_string(),
                    },
                });
            }
        }
        Ok(StoredMedia {
            permanent_url: format!("https://media.test/{}/{}", target, n),
        })
    }
}

/// Sink that records every event for later assertions
#[derive(Default)]
pub(crate) struct CollectSink {
    events: Mutex<Vec<JobEvent>>,
}

impl CollectSink {
    pub fn snapshot(&self) -> Vec<JobEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl EventSink for CollectSink {
    fn emit(&self, event: JobEvent) {
        self.events.lock().unwrap().push(event);
    }
}
