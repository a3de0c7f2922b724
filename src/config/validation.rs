use crate::config::types::{Config, CrawlerConfig, FetcherConfig, MirrorConfig, OutputConfig};
use crate::ConfigError;
use url::Url;

/// Upper bound accepted for mirror concurrency
pub const MAX_MIRROR_CONCURRENCY: usize = 1000;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_fetcher_config(&config.fetcher)?;
    validate_crawler_config(&config.crawler)?;
    validate_mirror_config(&config.mirror)?;
    validate_output_config(&config.output)?;

    if config.credentials.cookies_path.is_empty() {
        return Err(ConfigError::Validation(
            "cookies_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates fetcher configuration
fn validate_fetcher_config(config: &FetcherConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url must use http or https, got '{}'",
            config.base_url
        )));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url has no host: '{}'",
            config.base_url
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "timeout_secs must be >= 1, got {}",
            config.timeout_secs
        )));
    }

    if config.connect_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "connect_timeout_secs must be >= 1, got {}",
            config.connect_timeout_secs
        )));
    }

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.comment_page_size < 1 {
        return Err(ConfigError::Validation(format!(
            "comment_page_size must be >= 1, got {}",
            config.comment_page_size
        )));
    }

    Ok(())
}

/// Validates mirror configuration
fn validate_mirror_config(config: &MirrorConfig) -> Result<(), ConfigError> {
    validate_concurrency(config.concurrency)?;

    if config.combined_dir.is_empty() {
        return Err(ConfigError::Validation(
            "combined_dir cannot be empty".to_string(),
        ));
    }

    if config.root.is_empty() {
        return Err(ConfigError::Validation("root cannot be empty".to_string()));
    }

    Ok(())
}

/// Validates an image download concurrency value
pub fn validate_concurrency(concurrency: usize) -> Result<(), ConfigError> {
    if concurrency < 1 || concurrency > MAX_MIRROR_CONCURRENCY {
        return Err(ConfigError::Validation(format!(
            "concurrency must be between 1 and {}, got {}",
            MAX_MIRROR_CONCURRENCY, concurrency
        )));
    }
    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.json_dir.is_empty() {
        return Err(ConfigError::Validation(
            "json_dir cannot be empty".to_string(),
        ));
    }

    Ok(())
}
