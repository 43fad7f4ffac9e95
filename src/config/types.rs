use serde::Deserialize;

/// Main configuration structure for siphon
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawl: CrawlConfig,
    pub site: SiteConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Crawl behavior configuration
///
/// Every tunable the orchestration loop depends on lives here, with
/// defaults matching the values the production system settled on.
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlConfig {
    /// Number of posts per remote listing page (fixed by the site)
    #[serde(rename = "page-size", default = "default_page_size")]
    pub page_size: u64,

    /// Hard cap on posts processed by a single chunk
    #[serde(rename = "posts-per-chunk", default = "default_posts_per_chunk")]
    pub posts_per_chunk: u64,

    /// Consecutive empty chunks before the job is considered exhausted
    #[serde(rename = "stall-threshold", default = "default_stall_threshold")]
    pub stall_threshold: u32,

    /// Delay between chunks (milliseconds)
    #[serde(rename = "inter-chunk-delay-ms", default = "default_inter_chunk_delay")]
    pub inter_chunk_delay_ms: u64,

    /// Delay between listing pages within a chunk (milliseconds)
    #[serde(rename = "listing-delay-ms", default = "default_listing_delay")]
    pub listing_delay_ms: u64,

    /// Delay between media transfers within a post (milliseconds)
    #[serde(rename = "media-delay-ms", default = "default_media_delay")]
    pub media_delay_ms: u64,

    /// Settle delay after navigation before querying the DOM (milliseconds)
    #[serde(rename = "settle-delay-ms", default = "default_settle_delay")]
    pub settle_delay_ms: u64,

    /// Upper bound for a single page navigation (seconds)
    #[serde(rename = "navigation-timeout-secs", default = "default_navigation_timeout")]
    pub navigation_timeout_secs: u64,

    /// Upper bound for a single media fetch (seconds)
    #[serde(rename = "fetch-timeout-secs", default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,

    /// Estimate used when pagination inspection fails outright.
    /// Non-zero so the job still attempts at least one chunk.
    #[serde(rename = "fallback-estimate", default = "default_fallback_estimate")]
    pub fallback_estimate: u64,
}

fn default_page_size() -> u64 {
    50
}

fn default_posts_per_chunk() -> u64 {
    10
}

fn default_stall_threshold() -> u32 {
    3
}

fn default_inter_chunk_delay() -> u64 {
    10_000
}

fn default_listing_delay() -> u64 {
    3_000
}

fn default_media_delay() -> u64 {
    500
}

fn default_settle_delay() -> u64 {
    1_500
}

fn default_navigation_timeout() -> u64 {
    60
}

fn default_fetch_timeout() -> u64 {
    60
}

fn default_fallback_estimate() -> u64 {
    50
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            posts_per_chunk: default_posts_per_chunk(),
            stall_threshold: default_stall_threshold(),
            inter_chunk_delay_ms: default_inter_chunk_delay(),
            listing_delay_ms: default_listing_delay(),
            media_delay_ms: default_media_delay(),
            settle_delay_ms: default_settle_delay(),
            navigation_timeout_secs: default_navigation_timeout(),
            fetch_timeout_secs: default_fetch_timeout(),
            fallback_estimate: default_fallback_estimate(),
        }
    }
}

/// Remote site identification
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Hostname of the aggregation site (e.g. "coomer.su")
    pub host: String,

    /// Platform segment in listing URLs (e.g. "onlyfans")
    pub platform: String,
}

/// Headless browser configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BrowserConfig {
    /// Run the browser headless (disable for debugging)
    #[serde(default = "default_headless")]
    pub headless: bool,

    /// Explicit Chrome/Chromium executable path; auto-detected when unset
    #[serde(default)]
    pub executable: Option<String>,

    /// Additional Chrome arguments
    #[serde(rename = "chrome-args", default)]
    pub chrome_args: Vec<String>,

    /// Relaunch the browser for every chunk instead of reusing one
    /// session per job. Slower, but recovers from session corruption.
    #[serde(rename = "fresh-session-per-chunk", default)]
    pub fresh_session_per_chunk: bool,
}

fn default_headless() -> bool {
    true
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            executable: None,
            chrome_args: Vec::new(),
            fresh_session_per_chunk: false,
        }
    }
}

/// Media host (upload backend) configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Upload endpoint of the media host
    #[serde(rename = "upload-url")]
    pub upload_url: String,

    /// Folder prefix under which per-target namespaces are created
    #[serde(rename = "namespace-prefix", default = "default_namespace_prefix")]
    pub namespace_prefix: String,

    /// Bearer token for the media host, if it requires one
    #[serde(rename = "api-key", default)]
    pub api_key: Option<String>,
}

fn default_namespace_prefix() -> String {
    "gallery_mirrors".to_string()
}

/// HTTP front-end configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address to bind the HTTP server to
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Origins allowed to connect (CORS); empty list allows none
    #[serde(rename = "allowed-origins", default)]
    pub allowed_origins: Vec<String>,
}

fn default_bind() -> String {
    "127.0.0.1:3000".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            allowed_origins: Vec::new(),
        }
    }
}
