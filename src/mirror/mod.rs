//! Content-addressed image mirror
//!
//! Every image reference is normalized and hashed before any I/O; the hash
//! names the local file, so an image referenced many times is downloaded
//! once and reused across invocations sharing a directory.
//! - `normalize`: reference to absolute HTTPS URL
//! - `image_ref`: `ImageRef` and the content hash
//! - `collect`: image references found in a document
//! - `pool`: `ImageMirror`, the bounded download worker pool

mod collect;
mod image_ref;
mod normalize;
mod pool;

pub use collect::collect_image_urls;
pub use image_ref::{content_hash, ImageRef};
pub use normalize::normalize_image_url;
pub use pool::ImageMirror;

use std::path::PathBuf;
use thiserror::Error;

/// Where mirrored images are stored
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MirrorMode {
    /// Nothing is downloaded; references are only normalized
    #[default]
    None,

    /// One directory shared by every thread and every run
    Combined,

    /// One directory per thread
    PerThread { thread_id: u64 },
}

/// Errors that stop a mirror run before any download starts
///
/// Individual download failures are not errors; the image keeps its remote
/// URL instead.
#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("concurrency must be at least 1 and at most 1000, got {0}")]
    InvalidConcurrency(usize),

    #[error("failed to create image directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
