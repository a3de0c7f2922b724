//! Crawl engine
//!
//! Turns a thread id into an ordered [`Document`](crate::model::Document):
//! - `coordinator`: page-level fan-out and slot assembly
//! - `page`: one thread page plus the comments of each post on it
//! - `comments`: concurrent comment sub-page resolution
//! - `context`: the collaborators shared by every task
//! - `forum`: forum listing, used to pick a thread to archive

mod comments;
mod context;
mod coordinator;
mod forum;
mod page;

pub use comments::{extra_comment_pages, CommentAssembler};
pub use context::CrawlContext;
pub use coordinator::CrawlCoordinator;
pub use forum::{format_listing, list_forum, select_thread};
pub use page::{FetchedPage, PageAssembler};

use crate::config::{Config, Credentials};
use crate::extract::{ExtractError, ExtractedPost};
use crate::fetch::{FetchError, FetchErrorKind};
use crate::model::Document;
use crate::ArchiveError;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Why a single page (or comment sub-page) could not be produced
#[derive(Debug, Error)]
pub enum PageError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("extraction failed: {0}")]
    Extract(#[from] ExtractError),
}

/// Errors that abort a crawl
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("page {page}: {source}")]
    Page {
        page: u32,
        #[source]
        source: PageError,
    },

    #[error("forum '{forum}' page {page}: {source}")]
    Forum {
        forum: String,
        page: u32,
        #[source]
        source: PageError,
    },

    #[error("page range {range} selects nothing from a {total_pages}-page thread")]
    EmptyRange { range: PageRange, total_pages: u32 },

    #[error("page {0} produced no batch")]
    MissingPage(u32),

    #[error("crawl task failed: {0}")]
    Join(String),
}

impl CrawlError {
    /// The fetch failure behind this error, if any
    pub fn fetch_error(&self) -> Option<&FetchError> {
        match self {
            Self::Page {
                source: PageError::Fetch(e),
                ..
            }
            | Self::Forum {
                source: PageError::Fetch(e),
                ..
            } => Some(e),
            _ => None,
        }
    }

    /// Whether the crawl was stopped by the source's anti-bot interstitial
    pub fn is_security_challenge(&self) -> bool {
        self.fetch_error()
            .is_some_and(|e| e.kind() == FetchErrorKind::SecurityChallenge)
    }
}

/// Which posts of a thread are kept
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScopeFilter {
    #[default]
    All,

    /// Only posts written by the thread's author
    ThreadAuthorOnly,
}

impl ScopeFilter {
    /// Whether the source should be asked for author-only pages
    pub fn author_only(self) -> bool {
        matches!(self, Self::ThreadAuthorOnly)
    }

    /// Whether a post passes the filter
    pub fn admits(self, post: &ExtractedPost) -> bool {
        match self {
            Self::All => true,
            Self::ThreadAuthorOnly => post.author.is_thread_author,
        }
    }
}

/// An inclusive, 1-based page interval
///
/// Either bound may be open. Parses from `"3"`, `"2-5"`, `"4-"` or `"-3"`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageRange {
    pub start: Option<u32>,
    pub end: Option<u32>,
}

impl PageRange {
    pub fn new(start: Option<u32>, end: Option<u32>) -> Self {
        Self { start, end }
    }

    /// Every page
    pub fn all() -> Self {
        Self::default()
    }

    /// Clamps the range to `1..=total_pages`
    ///
    /// Returns the inclusive `(start, end)` to fetch, or `None` when nothing
    /// remains after clamping.
    pub fn resolve(self, total_pages: u32) -> Option<(u32, u32)> {
        let start = self.start.unwrap_or(1).max(1);
        let end = self.end.unwrap_or(total_pages).min(total_pages);
        (start <= end).then_some((start, end))
    }
}

impl fmt::Display for PageRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bound = |b: Option<u32>| b.map(|n| n.to_string()).unwrap_or_default();
        write!(f, "{}-{}", bound(self.start), bound(self.end))
    }
}

impl FromStr for PageRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse_bound = |text: &str| -> Result<Option<u32>, String> {
            let text = text.trim();
            if text.is_empty() {
                return Ok(None);
            }
            text.parse::<u32>()
                .map(Some)
                .map_err(|_| format!("invalid page number '{}'", text))
        };

        match s.split_once('-') {
            Some((start, end)) => Ok(Self::new(parse_bound(start)?, parse_bound(end)?)),
            None => {
                let page = parse_bound(s)?.ok_or_else(|| "empty page range".to_string())?;
                Ok(Self::new(Some(page), Some(page)))
            }
        }
    }
}

/// Crawls a thread using the HTTP fetcher configured by `config`
///
/// # Example
///
/// ```no_run
/// use tieba_mirror::config::{Config, Credentials};
/// use tieba_mirror::crawler::{crawl, ScopeFilter};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Config::default();
/// let document = crawl(&config, Credentials::anonymous(), 7_000_000_000, None, ScopeFilter::All).await?;
/// println!("{} posts", document.post_count());
/// # Ok(())
/// # }
/// ```
pub async fn crawl(
    config: &Config,
    credentials: Credentials,
    thread_id: u64,
    range: Option<PageRange>,
    scope: ScopeFilter,
) -> Result<Document, ArchiveError> {
    let coordinator = CrawlCoordinator::from_config(config, credentials)?;
    Ok(coordinator.crawl(thread_id, range, scope).await?)
}
