//! HTTP fetcher implementation
//!
//! This module handles every HTTP request the archiver makes:
//! - Building the HTTP client with the configured user agent and timeouts
//! - Attaching session cookies when credentials are supplied
//! - Classifying failures into [`FetchError`] kinds
//! - Recognizing the source's security-challenge interstitial

use crate::config::{Credentials, FetcherConfig};
use crate::fetch::{FetchError, Fetcher};
use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, COOKIE};
use reqwest::{Client, StatusCode};
use scraper::{Html, Selector};
use std::time::Duration;
use url::Url;

/// `<title>` of the page served instead of content when the source
/// suspects automated access
pub const SECURITY_CHALLENGE_TITLE: &str = "百度安全验证";

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The fetcher configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use tieba_mirror::config::FetcherConfig;
/// use tieba_mirror::fetch::build_http_client;
///
/// let client = build_http_client(&FetcherConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &FetcherConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .gzip(true)
        .brotli(true)
        .build()
}

/// [`Fetcher`] backed by a shared reqwest client
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &FetcherConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config)?,
        })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    /// Fetches a URL and classifies the outcome
    ///
    /// | Condition | Result |
    /// |-----------|--------|
    /// | HTTP 404 | `NotFound` |
    /// | Other non-2xx | `Network` |
    /// | Timeout / connect / body error | `Network` |
    /// | HTML titled [`SECURITY_CHALLENGE_TITLE`] | `SecurityChallenge` |
    async fn fetch(
        &self,
        url: &Url,
        credentials: Option<&Credentials>,
    ) -> Result<Vec<u8>, FetchError> {
        tracing::debug!("GET {}", url);

        let mut request = self.client.get(url.clone());
        if let Some(cookie) = credentials.and_then(Credentials::cookie_header) {
            request = request.header(COOKIE, cookie);
        }

        let response = request
            .send()
            .await
            .map_err(|e| FetchError::network(url, describe_reqwest_error(&e)))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound {
                url: url.to_string(),
            });
        }
        if !status.is_success() {
            return Err(FetchError::network(url, format!("HTTP {}", status.as_u16())));
        }

        let is_html = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.contains("text/html"))
            .unwrap_or(false);

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::network(url, describe_reqwest_error(&e)))?;

        if is_html && is_security_challenge(&body) {
            tracing::warn!("Security challenge served for {}", url);
            return Err(FetchError::SecurityChallenge {
                url: url.to_string(),
            });
        }

        Ok(body.to_vec())
    }
}

/// Returns true when an HTML body is the security-challenge interstitial
pub fn is_security_challenge(body: &[u8]) -> bool {
    let text = String::from_utf8_lossy(body);

    // Cheap substring test first; most pages never need a parse
    if !text.contains(SECURITY_CHALLENGE_TITLE) {
        return false;
    }

    extract_title(&text).as_deref() == Some(SECURITY_CHALLENGE_TITLE)
}

/// Extracts the page title from an HTML document
fn extract_title(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn describe_reqwest_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "request timeout".to_string()
    } else if e.is_connect() {
        "connection refused".to_string()
    } else {
        e.to_string()
    }
}
