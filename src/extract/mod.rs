//! Page-content extraction
//!
//! The crawl engine never reads markup itself. It hands raw bytes to a
//! [`PageExtractor`] and receives typed posts and comments back:
//! - `page`: thread pages (title, page count, posts)
//! - `comments`: the per-page comment index payload and comment sub-pages
//! - `forum`: forum listing pages
//! - `markup`: small HTML helpers shared by both

mod comments;
mod forum;
mod markup;
mod page;

pub use comments::{extract_comment_index, extract_comment_page, PORTRAIT_BASE_URL};
pub use forum::extract_forum_page;
pub use page::extract_thread_page;

use crate::model::{Author, Comment, CommentPage};
use std::collections::HashMap;
use thiserror::Error;

/// Errors raised while turning raw bytes into typed content
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("missing {0}")]
    Missing(&'static str),

    #[error("invalid {field}: '{value}'")]
    Invalid { field: &'static str, value: String },

    #[error("invalid comment payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid selector '{0}'")]
    Selector(String),
}

/// A post as located on a thread page, before its comments are resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedPost {
    pub pid: String,
    pub floor: Option<u32>,
    pub author: Author,
    pub body: String,
    pub timestamp: String,
    pub ip_location: Option<String>,
}

/// Typed content of one thread page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedPage {
    /// Thread title, when the page shows one
    pub title: Option<String>,

    /// Thread page count, when the page shows one
    pub total_pages: Option<u32>,

    /// Posts in source order
    pub posts: Vec<ExtractedPost>,

    /// Post containers dropped for missing required structure
    pub skipped: usize,
}

/// The comment state of one post as reported by the comment index
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommentThread {
    /// Total comments the post has
    pub total: usize,

    /// Comments delivered inline with the index (sub-page 0)
    pub first_page: CommentPage,
}

/// Comment index for one thread page, keyed by post id
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommentIndex {
    pub threads: HashMap<String, CommentThread>,
}

impl CommentIndex {
    /// Removes and returns the entry for a post
    ///
    /// Posts without comments are absent from the index and yield an empty
    /// thread.
    pub fn take(&mut self, post_id: &str) -> CommentThread {
        self.threads.remove(post_id).unwrap_or_default()
    }
}

/// A thread as listed on a forum page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForumThread {
    pub thread_id: u64,
    pub title: String,
    /// Listing abstract, one line per non-blank source line
    pub summary: String,
}

/// Turns raw fetched bytes into typed page content
pub trait PageExtractor: Send + Sync {
    /// Extracts title, page count and posts from a thread page
    fn extract_page(&self, raw: &[u8]) -> Result<ExtractedPage, ExtractError>;

    /// Extracts the comment index delivered alongside a thread page
    fn extract_comment_index(&self, raw: &[u8]) -> Result<CommentIndex, ExtractError>;

    /// Extracts the comments of one comment sub-page
    fn extract_comment_page(&self, raw: &[u8]) -> Result<Vec<Comment>, ExtractError>;

    /// Extracts the non-pinned threads of a forum listing page
    fn extract_forum_page(&self, raw: &[u8]) -> Result<Vec<ForumThread>, ExtractError>;
}

/// Extractor for Baidu Tieba markup and payloads
#[derive(Debug, Clone, Copy, Default)]
pub struct TiebaExtractor;

impl PageExtractor for TiebaExtractor {
    fn extract_page(&self, raw: &[u8]) -> Result<ExtractedPage, ExtractError> {
        extract_thread_page(&String::from_utf8_lossy(raw))
    }

    fn extract_comment_index(&self, raw: &[u8]) -> Result<CommentIndex, ExtractError> {
        extract_comment_index(raw)
    }

    fn extract_comment_page(&self, raw: &[u8]) -> Result<Vec<Comment>, ExtractError> {
        extract_comment_page(&String::from_utf8_lossy(raw))
    }

    fn extract_forum_page(&self, raw: &[u8]) -> Result<Vec<ForumThread>, ExtractError> {
        extract_forum_page(&String::from_utf8_lossy(raw))
    }
}
