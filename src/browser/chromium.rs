//! Headless Chromium adapter over CDP

use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig as CdpConfig};
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::browser::{BrowserError, PageHandle, Session};
use crate::config::{BrowserConfig, CrawlConfig};

/// How long to keep retrying a selector lookup before giving up
const SELECTOR_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// A Chromium process owned by one job
///
/// By default the browser lives for the whole job and each chunk gets a
/// fresh tab. With `fresh-session-per-chunk` the browser is relaunched on
/// every `open_page`, trading startup cost for resilience to session
/// corruption.
pub struct ChromiumSession {
    browser: Mutex<Option<Browser>>,
    browser_config: BrowserConfig,
    navigation_timeout: Duration,
    settle_delay: Duration,
}

impl ChromiumSession {
    /// Launches a browser and wraps it in a session
    pub async fn launch(
        browser_config: &BrowserConfig,
        crawl_config: &CrawlConfig,
    ) -> Result<Self, BrowserError> {
        let session = Self {
            browser: Mutex::new(None),
            browser_config: browser_config.clone(),
            navigation_timeout: Duration::from_secs(crawl_config.navigation_timeout_secs),
            settle_delay: Duration::from_millis(crawl_config.settle_delay_ms),
        };
        let browser = session.launch_browser().await?;
        *session.browser.lock().await = Some(browser);
        Ok(session)
    }

    async fn launch_browser(&self) -> Result<Browser, BrowserError> {
        info!("Launching browser (headless={})", self.browser_config.headless);

        let mut builder = CdpConfig::builder();

        if let Some(ref executable) = self.browser_config.executable {
            builder = builder.chrome_executable(executable);
        }

        // with_head() means NOT headless
        if !self.browser_config.headless {
            builder = builder.with_head();
        }

        builder = builder
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-dev-shm-usage")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--no-sandbox")
            .arg("--disable-gpu");

        for arg in &self.browser_config.chrome_args {
            builder = builder.arg(arg);
        }

        let config = builder
            .build()
            .map_err(|e| BrowserError::Launch(format!("invalid browser config: {}", e)))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        // Drive the CDP message loop until the browser goes away
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        Ok(browser)
    }

    async fn close_browser(browser: &mut Browser) {
        if let Err(e) = browser.close().await {
            warn!("Browser close error: {}", e);
        }
        let _ = browser.wait().await;
    }
}

#[async_trait]
impl Session for ChromiumSession {
    async fn open_page(&self) -> Result<Box<dyn PageHandle>, BrowserError> {
        let mut guard = self.browser.lock().await;

        if self.browser_config.fresh_session_per_chunk {
            if let Some(mut old) = guard.take() {
                debug!("Recycling browser session");
                Self::close_browser(&mut old).await;
            }
        }

        if guard.is_none() {
            *guard = Some(self.launch_browser().await?);
        }

        let browser = guard.as_ref().unwrap();
        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::Session(format!("failed to open tab: {}", e)))?;

        Ok(Box::new(ChromiumPage {
            page,
            navigation_timeout: self.navigation_timeout,
            settle_delay: self.settle_delay,
        }))
    }

    async fn shutdown(&self) {
        if let Some(mut browser) = self.browser.lock().await.take() {
            Self::close_browser(&mut browser).await;
        }
    }
}

/// One tab in a Chromium session
pub struct ChromiumPage {
    page: Page,
    navigation_timeout: Duration,
    settle_delay: Duration,
}

#[async_trait]
impl PageHandle for ChromiumPage {
    async fn fetch_rendered(
        &self,
        url: &str,
        wait_selector: Option<&str>,
    ) -> Result<String, BrowserError> {
        debug!("Navigating to {}", url);

        tokio::time::timeout(self.navigation_timeout, self.page.goto(url))
            .await
            .map_err(|_| BrowserError::Timeout {
                url: url.to_string(),
            })?
            .map_err(|e| BrowserError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        // Best-effort wait for the load event; client-rendered pages keep
        // mutating the DOM afterwards, hence the settle delay below.
        let _ = tokio::time::timeout(
            Duration::from_secs(10),
            self.page.wait_for_navigation(),
        )
        .await;

        tokio::time::sleep(self.settle_delay).await;

        if let Some(selector) = wait_selector {
            self.wait_for_selector(url, selector).await?;
        }

        let html = tokio::time::timeout(self.navigation_timeout, self.page.content())
            .await
            .map_err(|_| BrowserError::Timeout {
                url: url.to_string(),
            })?
            .map_err(|e| BrowserError::Session(format!("failed to read page content: {}", e)))?;

        Ok(html)
    }

    async fn close(self: Box<Self>) {
        if let Err(e) = self.page.close().await {
            debug!("Page close error (tab leak): {}", e);
        }
    }
}

impl ChromiumPage {
    /// Polls for a selector until the navigation timeout elapses
    async fn wait_for_selector(&self, url: &str, selector: &str) -> Result<(), BrowserError> {
        let deadline = tokio::time::Instant::now() + self.navigation_timeout;

        loop {
            if self.page.find_element(selector).await.is_ok() {
                return Ok(());
            }

            if tokio::time::Instant::now() >= deadline {
                debug!("Selector '{}' never appeared on {}", selector, url);
                return Err(BrowserError::Timeout {
                    url: url.to_string(),
                });
            }

            tokio::time::sleep(SELECTOR_POLL_INTERVAL).await;
        }
    }
}
