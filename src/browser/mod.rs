//! Browser session abstraction
//!
//! The crawl core only needs two operations from page automation: open a
//! tab, and fetch the rendered HTML of a URL. Both live behind traits so
//! the orchestration logic can be exercised against stub sessions; the
//! real implementation drives headless Chromium over CDP.

mod chromium;

pub use chromium::ChromiumSession;

use async_trait::async_trait;
use thiserror::Error;

/// Errors from page automation
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("Failed to launch browser: {0}")]
    Launch(String),

    /// The browser session itself is gone (CDP connection lost, tab
    /// unusable). Unlike navigation failures, these escape the extraction
    /// layer and abort the current chunk.
    #[error("Browser session failure: {0}")]
    Session(String),

    #[error("Navigation failed for {url}: {message}")]
    Navigation { url: String, message: String },

    #[error("Navigation timeout for {url}")]
    Timeout { url: String },
}

impl BrowserError {
    /// Returns true for failures that invalidate the whole session
    ///
    /// Navigation-level failures are folded into "no content found" by the
    /// extraction layer; session-level failures must propagate.
    pub fn is_session_fatal(&self) -> bool {
        matches!(self, Self::Session(_) | Self::Launch(_))
    }
}

/// One open tab, able to render pages
#[async_trait]
pub trait PageHandle: Send + Sync {
    /// Navigates to `url`, waits out the configured settle delay (and the
    /// given selector, when present), and returns the rendered HTML.
    async fn fetch_rendered(
        &self,
        url: &str,
        wait_selector: Option<&str>,
    ) -> Result<String, BrowserError>;

    /// Closes the tab. Failures are logged, not propagated: close runs on
    /// every chunk exit path and must never mask the original error.
    async fn close(self: Box<Self>);
}

/// A browser session owned by exactly one job
#[async_trait]
pub trait Session: Send + Sync {
    /// Opens a fresh tab for one chunk of work
    async fn open_page(&self) -> Result<Box<dyn PageHandle>, BrowserError>;

    /// Releases the session's resources
    async fn shutdown(&self);
}
