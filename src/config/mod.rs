//! Configuration module for siphon
//!
//! Handles loading, parsing, and validating the TOML configuration file,
//! including a content hash used to detect config drift between runs.

mod parser;
mod types;
mod validation;

pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use types::{BrowserConfig, Config, CrawlConfig, ServerConfig, SiteConfig, StorageConfig};
pub use validation::validate;
