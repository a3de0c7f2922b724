//! JSON thread records
//!
//! A crawled thread is saved as `{dir}/{tid}.json` so it can be rendered
//! again later without re-crawling.

use crate::model::Document;
use crate::output::{OutputError, OutputResult};
use std::fs;
use std::path::{Path, PathBuf};

/// Path of the record for `thread_id` under `dir`
pub fn json_path(dir: &Path, thread_id: u64) -> PathBuf {
    dir.join(format!("{}.json", thread_id))
}

/// Writes a document as pretty-printed JSON
///
/// # Arguments
///
/// * `document` - The crawled thread
/// * `dir` - Directory the record is written to (created if missing)
/// * `thread_id` - Names the file
///
/// # Returns
///
/// * `Ok(PathBuf)` - Where the record was written
/// * `Err(OutputError)` - Failed to serialize or write
pub fn save_document(document: &Document, dir: &Path, thread_id: u64) -> OutputResult<PathBuf> {
    let path = json_path(dir, thread_id);
    let json = serde_json::to_string_pretty(document)?;

    fs::create_dir_all(dir).map_err(|source| OutputError::Write {
        path: dir.to_path_buf(),
        source,
    })?;
    fs::write(&path, json).map_err(|source| OutputError::Write {
        path: path.clone(),
        source,
    })?;

    tracing::info!("Saved thread record to {}", path.display());
    Ok(path)
}

/// Reads a document saved by [`save_document`]
///
/// Batch page indexes are not persisted; they are restored from the posts
/// (or from the batch position for an empty page).
pub fn load_document(path: &Path) -> OutputResult<Document> {
    let content = fs::read_to_string(path).map_err(|source| OutputError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut document: Document = serde_json::from_str(&content)?;

    for (position, batch) in document.pages.iter_mut().enumerate() {
        batch.page_index = batch
            .posts
            .first()
            .map_or(position as u32 + 1, |post| post.page_index);
    }

    Ok(document)
}
