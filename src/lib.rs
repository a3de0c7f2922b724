//! Tieba-Mirror: a concurrent thread archiver
//!
//! This crate crawls a paginated discussion thread, reassembles its pages and
//! nested comment pages into one ordered document, and mirrors every referenced
//! image into content-addressed local storage.

pub mod config;
pub mod crawler;
pub mod extract;
pub mod fetch;
pub mod mirror;
pub mod model;
pub mod output;

use thiserror::Error;

/// Main error type for Tieba-Mirror operations
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Crawl failed: {0}")]
    Crawl(#[from] crawler::CrawlError),

    #[error("Image mirror failed: {0}")]
    Mirror(#[from] mirror::MirrorError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

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

    #[error("Failed to parse cookies: {0}")]
    Cookies(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL: {0}")]
    MissingHost(String),
}

/// Result type alias for Tieba-Mirror operations
pub type Result<T> = std::result::Result<T, ArchiveError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::{Config, Credentials};
pub use crawler::{CrawlCoordinator, CrawlError, PageRange, ScopeFilter};
pub use mirror::{ImageMirror, ImageRef, MirrorMode};
pub use model::{Comment, Document, Post, PostBatch};
