use crate::config::types::{Config, CrawlConfig, ServerConfig, SiteConfig, StorageConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawl_config(&config.crawl)?;
    validate_site_config(&config.site)?;
    validate_storage_config(&config.storage)?;
    validate_server_config(&config.server)?;
    Ok(())
}

/// Validates crawl tunables
fn validate_crawl_config(config: &CrawlConfig) -> Result<(), ConfigError> {
    if config.page_size < 1 {
        return Err(ConfigError::Validation(
            "page_size must be >= 1".to_string(),
        ));
    }

    if config.posts_per_chunk < 1 {
        return Err(ConfigError::Validation(format!(
            "posts_per_chunk must be >= 1, got {}",
            config.posts_per_chunk
        )));
    }

    if config.stall_threshold < 1 {
        return Err(ConfigError::Validation(format!(
            "stall_threshold must be >= 1, got {}",
            config.stall_threshold
        )));
    }

    if config.navigation_timeout_secs < 1 || config.navigation_timeout_secs > 300 {
        return Err(ConfigError::Validation(format!(
            "navigation_timeout_secs must be between 1 and 300, got {}",
            config.navigation_timeout_secs
        )));
    }

    if config.fetch_timeout_secs < 1 || config.fetch_timeout_secs > 300 {
        return Err(ConfigError::Validation(format!(
            "fetch_timeout_secs must be between 1 and 300, got {}",
            config.fetch_timeout_secs
        )));
    }

    if config.fallback_estimate < 1 {
        return Err(ConfigError::Validation(
            "fallback_estimate must be >= 1 so a job attempts at least one chunk".to_string(),
        ));
    }

    Ok(())
}

/// Validates site identification
fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    validate_host(&config.host)?;

    if config.platform.is_empty() {
        return Err(ConfigError::Validation(
            "site platform cannot be empty".to_string(),
        ));
    }

    if !config
        .platform
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ConfigError::Validation(format!(
            "site platform '{}' contains invalid characters",
            config.platform
        )));
    }

    Ok(())
}

/// Validates storage backend settings
fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.upload_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid upload_url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "upload_url must use HTTP or HTTPS, got '{}'",
            url.scheme()
        )));
    }

    if config.namespace_prefix.is_empty() {
        return Err(ConfigError::Validation(
            "namespace_prefix cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates server settings
fn validate_server_config(config: &ServerConfig) -> Result<(), ConfigError> {
    config
        .bind
        .parse::<std::net::SocketAddr>()
        .map_err(|e| ConfigError::Validation(format!("Invalid bind address '{}': {}", config.bind, e)))?;

    for origin in &config.allowed_origins {
        Url::parse(origin)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid allowed origin '{}': {}", origin, e)))?;
    }

    Ok(())
}

/// Validates a hostname
fn validate_host(host: &str) -> Result<(), ConfigError> {
    if host.is_empty() {
        return Err(ConfigError::Validation("site host cannot be empty".to_string()));
    }

    if !host
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "site host '{}' contains invalid characters",
            host
        )));
    }

    if host.starts_with('.') || host.ends_with('.') || host.starts_with('-') || host.ends_with('-') {
        return Err(ConfigError::Validation(format!(
            "site host '{}' cannot start or end with '.' or '-'",
            host
        )));
    }

    if host.contains("..") {
        return Err(ConfigError::Validation(format!(
            "site host '{}' cannot contain consecutive dots",
            host
        )));
    }

    if !host.contains('.') {
        return Err(ConfigError::Validation(format!(
            "site host '{}' must contain at least one dot (e.g. 'example.com')",
            host
        )));
    }

    Ok(())
}
