//! Document model
//!
//! The types a crawl produces: threads, posts with their comments, per-page
//! post batches, and the final merged document handed to renderers.

mod document;
mod post;

pub use document::{CommentPage, Document, PostBatch};
pub use post::{Author, Comment, Post, Thread};
