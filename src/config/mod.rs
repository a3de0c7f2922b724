//! Configuration module for Tieba-Mirror
//!
//! This module handles loading, parsing, and validating TOML configuration
//! files, and loading the session credentials that every fetch receives.
//!
//! # Example
//!
//! ```no_run
//! use tieba_mirror::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("tieba-mirror.toml")).unwrap();
//! println!("Comment page size: {}", config.crawler.comment_page_size);
//! ```

mod credentials;
mod parser;
mod types;
mod validation;

// Re-export types
pub use credentials::Credentials;
pub use types::{
    Config, CrawlerConfig, CredentialsConfig, FetcherConfig, Layout, MirrorConfig, OutputConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::{validate, validate_concurrency, MAX_MIRROR_CONCURRENCY};
