use crate::model::{Comment, Post};
use serde::{Deserialize, Serialize};

/// The assembled posts of one thread page
///
/// Serializes as a bare array of posts; the page index and skip count are
/// bookkeeping for the crawl and are not persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostBatch {
    #[serde(skip)]
    pub page_index: u32,

    pub posts: Vec<Post>,

    /// Posts dropped because they lacked required structure
    #[serde(skip)]
    pub skipped: usize,
}

impl PostBatch {
    pub fn new(page_index: u32, posts: Vec<Post>, skipped: usize) -> Self {
        Self {
            page_index,
            posts,
            skipped,
        }
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }
}

/// One sub-page of a post's comment list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommentPage {
    /// 0 for the inline page delivered with the thread page
    pub index: usize,

    pub comments: Vec<Comment>,
}

impl CommentPage {
    pub fn new(index: usize, comments: Vec<Comment>) -> Self {
        Self { index, comments }
    }
}

/// The merged, ordered record of a whole thread
///
/// Persisted as `{"title": ..., "result": [[post, ...], ...]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub title: String,

    #[serde(rename = "result")]
    pub pages: Vec<PostBatch>,
}

impl Document {
    pub fn new(title: impl Into<String>, pages: Vec<PostBatch>) -> Self {
        Self {
            title: title.into(),
            pages,
        }
    }

    /// Number of page batches in the document
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Total number of posts across all pages
    pub fn post_count(&self) -> usize {
        self.pages.iter().map(PostBatch::len).sum()
    }

    /// Total number of comments across all posts
    pub fn comment_count(&self) -> usize {
        self.posts().map(|post| post.comments.len()).sum()
    }

    /// Iterates over every post in document order
    pub fn posts(&self) -> impl Iterator<Item = &Post> {
        self.pages.iter().flat_map(|batch| batch.posts.iter())
    }
}
