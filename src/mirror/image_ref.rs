use crate::mirror::normalize_image_url;
use crate::UrlError;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use url::Url;

/// Extensions carried over into a mirrored file name
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "bmp"];

/// An image reference with its dedup key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    /// The reference exactly as it appeared in the document
    pub source_url: String,

    /// Absolute HTTPS URL the image is fetched from
    pub url: Url,

    /// SHA-256 hex digest of `url`
    pub content_hash: String,
}

impl ImageRef {
    /// Normalizes and hashes a reference; no I/O happens here
    pub fn new(source_url: &str, base: &Url) -> Result<Self, UrlError> {
        let url = normalize_image_url(source_url, base)?;
        Ok(Self {
            source_url: source_url.to_string(),
            content_hash: content_hash(&url),
            url,
        })
    }

    /// File name inside a mirror directory: the hash plus the source extension
    pub fn file_name(&self) -> String {
        match extension(&self.url) {
            Some(ext) => format!("{}.{}", self.content_hash, ext),
            None => self.content_hash.clone(),
        }
    }

    pub fn local_path(&self, dir: &Path) -> PathBuf {
        dir.join(self.file_name())
    }
}

/// Dedup key of a normalized URL
pub fn content_hash(url: &Url) -> String {
    hex::encode(Sha256::digest(url.as_str().as_bytes()))
}

fn extension(url: &Url) -> Option<String> {
    let last = url.path_segments()?.next_back()?;
    let (stem, ext) = last.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    (!stem.is_empty() && IMAGE_EXTENSIONS.contains(&ext.as_str())).then_some(ext)
}
