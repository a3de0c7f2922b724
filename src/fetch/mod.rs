//! Fetch collaborator
//!
//! Everything that touches the network goes through the [`Fetcher`] trait:
//! - `Fetcher` / `FetchError`: the interface and its tagged failure kinds
//! - `HttpFetcher`: the reqwest-backed implementation
//! - `Endpoints`: URL builders for thread pages, comment payloads and forum listings

mod endpoints;
mod http;

pub use endpoints::{Endpoints, FORUM_PAGE_SIZE};
pub use http::{build_http_client, is_security_challenge, HttpFetcher, SECURITY_CHALLENGE_TITLE};

use crate::config::Credentials;
use async_trait::async_trait;
use thiserror::Error;
use url::Url;

/// Failure kinds a fetch can end in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchErrorKind {
    /// The source served its anti-bot interstitial instead of content
    SecurityChallenge,
    /// Transport failure or unexpected status
    Network,
    /// The resource does not exist
    NotFound,
}

/// Errors returned by a [`Fetcher`]
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("security challenge served for {url}")]
    SecurityChallenge { url: String },

    #[error("network error for {url}: {message}")]
    Network { url: String, message: String },

    #[error("not found: {url}")]
    NotFound { url: String },
}

impl FetchError {
    /// Returns the tag of this error
    pub fn kind(&self) -> FetchErrorKind {
        match self {
            Self::SecurityChallenge { .. } => FetchErrorKind::SecurityChallenge,
            Self::Network { .. } => FetchErrorKind::Network,
            Self::NotFound { .. } => FetchErrorKind::NotFound,
        }
    }

    /// The URL whose fetch failed
    pub fn url(&self) -> &str {
        match self {
            Self::SecurityChallenge { url } | Self::Network { url, .. } | Self::NotFound { url } => {
                url
            }
        }
    }

    pub fn network(url: &Url, message: impl Into<String>) -> Self {
        Self::Network {
            url: url.to_string(),
            message: message.into(),
        }
    }
}

/// Retrieves raw bytes for a URL
///
/// Implementations own their timeout and transport policy; callers never
/// retry. Credentials are passed per call so no fetch depends on ambient
/// session state.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(
        &self,
        url: &Url,
        credentials: Option<&Credentials>,
    ) -> Result<Vec<u8>, FetchError>;
}
