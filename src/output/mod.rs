//! Output module for persisted records and rendered pages
//!
//! This module handles:
//! - Saving and loading the JSON record of a crawled thread
//! - Resolving where the rendered page is written
//! - Rendering a document to HTML with mirrored image sources

mod html;
mod json;
mod path;

pub use html::{format_html, generate_html};
pub use json::{json_path, load_document, save_document};
pub use path::{determine_output_path, sanitize_file_name};

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid thread record: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;
