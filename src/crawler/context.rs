use crate::config::{Config, Credentials};
use crate::extract::{PageExtractor, TiebaExtractor};
use crate::fetch::{Endpoints, FetchError, Fetcher, HttpFetcher};
use crate::ArchiveError;
use std::sync::Arc;
use url::Url;

/// Read-only state shared by every fetch task of a crawl
///
/// Cloning is cheap; each spawned task receives its own handle.
#[derive(Clone)]
pub struct CrawlContext {
    pub fetcher: Arc<dyn Fetcher>,
    pub extractor: Arc<dyn PageExtractor>,
    pub endpoints: Arc<Endpoints>,
    pub credentials: Arc<Credentials>,

    /// Comments the source serves per comment sub-page
    pub comment_page_size: usize,
}

impl CrawlContext {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        extractor: Arc<dyn PageExtractor>,
        endpoints: Endpoints,
        credentials: Credentials,
        comment_page_size: usize,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            endpoints: Arc::new(endpoints),
            credentials: Arc::new(credentials),
            comment_page_size: comment_page_size.max(1),
        }
    }

    /// Builds the production context: reqwest fetcher, Tieba extractor
    pub fn from_config(config: &Config, credentials: Credentials) -> Result<Self, ArchiveError> {
        let fetcher = HttpFetcher::new(&config.fetcher)?;
        let endpoints = Endpoints::new(&config.fetcher.base_url)?;

        Ok(Self::new(
            Arc::new(fetcher),
            Arc::new(TiebaExtractor),
            endpoints,
            credentials,
            config.crawler.comment_page_size,
        ))
    }

    /// Fetches a thread resource with the session credentials attached
    pub async fn fetch(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        self.fetcher.fetch(url, Some(&self.credentials)).await
    }
}
