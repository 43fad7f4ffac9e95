//! Siphon: a creator-gallery mirroring crawler
//!
//! This crate crawls the public gallery of a named creator on a fixed
//! content-aggregation site, downloads every media item it discovers, and
//! re-uploads each one to a cloud media host while streaming progress events
//! to a connected client.

pub mod browser;
pub mod config;
pub mod crawler;
pub mod events;
pub mod job;
pub mod server;
pub mod site;
pub mod storage;
pub mod transfer;

use thiserror::Error;

/// Main error type for siphon operations
#[derive(Debug, Error)]
pub enum SiphonError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Browser error: {0}")]
    Browser(#[from] browser::BrowserError),

    #[error("Transfer error: {0}")]
    Transfer(#[from] transfer::TransferError),

    #[error("Storage error: {0}")]
    Store(#[from] storage::StoreError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Invalid target name: {0}")]
    InvalidTarget(String),

    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition { from: job::JobState, to: job::JobState },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for siphon operations
pub type Result<T> = std::result::Result<T, SiphonError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use events::{EventSink, JobEvent};
pub use job::{CrawlJob, JobState};
