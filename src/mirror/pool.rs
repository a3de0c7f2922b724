//! Bounded download pool
//!
//! Distinct images go into one pending queue. At most `concurrency` workers
//! drain it, each claiming the next image by popping under the queue lock as
//! soon as its previous download ends. Workers keep their outcomes locally and
//! hand them back when they exit, so the queue is the only shared state.

use crate::config::{Config, MAX_MIRROR_CONCURRENCY};
use crate::fetch::{Fetcher, HttpFetcher};
use crate::mirror::{ImageRef, MirrorError, MirrorMode};
use crate::ArchiveError;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use url::Url;

/// One distinct image waiting to be mirrored
#[derive(Debug, Clone)]
struct DownloadTask {
    url: Url,
    content_hash: String,
    path: PathBuf,
}

#[derive(Debug)]
enum Outcome {
    Downloaded,
    Reused,
    Failed,
}

/// Downloads images into content-addressed local storage
pub struct ImageMirror {
    fetcher: Arc<dyn Fetcher>,
    base: Url,
    root: PathBuf,
    combined_dir: String,
}

impl ImageMirror {
    /// Creates a mirror
    ///
    /// # Arguments
    ///
    /// * `fetcher` - Fetches image bytes (images are fetched without credentials)
    /// * `base` - Site root that relative image references resolve against
    /// * `root` - Directory that mirror directories are created under
    /// * `combined_dir` - Directory name used by [`MirrorMode::Combined`]
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        base: Url,
        root: impl Into<PathBuf>,
        combined_dir: impl Into<String>,
    ) -> Self {
        Self {
            fetcher,
            base,
            root: root.into(),
            combined_dir: combined_dir.into(),
        }
    }

    /// Creates a mirror backed by the HTTP fetcher
    pub fn from_config(config: &Config) -> Result<Self, ArchiveError> {
        let fetcher = HttpFetcher::new(&config.fetcher)?;
        let base = Url::parse(&config.fetcher.base_url)
            .map_err(|e| crate::UrlError::Parse(e.to_string()))?;

        Ok(Self::new(
            Arc::new(fetcher),
            base,
            &config.mirror.root,
            config.mirror.combined_dir.clone(),
        ))
    }

    /// Directory images land in for `mode`, or `None` when nothing is stored
    pub fn directory(&self, mode: MirrorMode) -> Option<PathBuf> {
        let name = match mode {
            MirrorMode::None => return None,
            MirrorMode::Combined => self.combined_dir.clone(),
            MirrorMode::PerThread { thread_id } => thread_id.to_string(),
        };

        if self.root.as_os_str().is_empty() || self.root == Path::new(".") {
            Some(PathBuf::from(name))
        } else {
            Some(self.root.join(name))
        }
    }

    /// Mirrors a set of image references
    ///
    /// Returns a mapping from every reference in `refs` to what the rendered
    /// document should point at: the local file for a mirrored image, or the
    /// normalized remote URL when the image could not be stored (or `mode`
    /// is [`MirrorMode::None`]). References that cannot be normalized map to
    /// themselves.
    ///
    /// # Arguments
    ///
    /// * `refs` - Image references as they appear in the document
    /// * `mode` - Where images are stored
    /// * `concurrency` - Maximum simultaneous downloads
    ///
    /// # Returns
    ///
    /// * `Ok(HashMap)` - One entry per distinct reference
    /// * `Err(MirrorError)` - Bad concurrency or the directory could not be created
    pub async fn mirror(
        &self,
        refs: &[String],
        mode: MirrorMode,
        concurrency: usize,
    ) -> Result<HashMap<String, String>, MirrorError> {
        if concurrency == 0 || concurrency > MAX_MIRROR_CONCURRENCY {
            return Err(MirrorError::InvalidConcurrency(concurrency));
        }

        let mut mapping = HashMap::with_capacity(refs.len());
        let mut images = Vec::with_capacity(refs.len());
        for source in refs {
            match ImageRef::new(source, &self.base) {
                Ok(image) => images.push(image),
                Err(e) => {
                    tracing::warn!("Keeping unmirrorable image reference '{}': {}", source, e);
                    mapping.insert(source.clone(), source.clone());
                }
            }
        }

        let Some(dir) = self.directory(mode) else {
            for image in images {
                mapping.insert(image.source_url, image.url.to_string());
            }
            return Ok(mapping);
        };

        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| MirrorError::CreateDir {
                path: dir.clone(),
                source,
            })?;

        // Dedup by content hash before any download
        let mut pending = VecDeque::new();
        let mut queued = HashSet::new();
        for image in &images {
            if queued.insert(image.content_hash.as_str()) {
                pending.push_back(DownloadTask {
                    url: image.url.clone(),
                    content_hash: image.content_hash.clone(),
                    path: image.local_path(&dir),
                });
            }
        }

        let distinct = pending.len();
        let outcomes = self.run_workers(pending, concurrency).await;

        let mut downloaded = 0;
        let mut reused = 0;
        let mut failed = 0;
        for outcome in outcomes.values() {
            match outcome {
                Outcome::Downloaded => downloaded += 1,
                Outcome::Reused => reused += 1,
                Outcome::Failed => failed += 1,
            }
        }
        // Tasks lost to a worker that did not finish count as failures
        failed += distinct - outcomes.len();

        for image in images {
            let target = match outcomes.get(&image.content_hash) {
                Some(Outcome::Downloaded | Outcome::Reused) => {
                    image.local_path(&dir).to_string_lossy().into_owned()
                }
                _ => image.url.to_string(),
            };
            mapping.insert(image.source_url, target);
        }

        tracing::info!(
            "Mirrored {} images into {}: {} downloaded, {} reused, {} kept remote",
            distinct,
            dir.display(),
            downloaded,
            reused,
            failed
        );

        Ok(mapping)
    }

    async fn run_workers(
        &self,
        pending: VecDeque<DownloadTask>,
        concurrency: usize,
    ) -> HashMap<String, Outcome> {
        let workers = concurrency.min(pending.len());
        let queue = Arc::new(Mutex::new(pending));

        let mut tasks = JoinSet::new();
        for worker in 0..workers {
            let queue = Arc::clone(&queue);
            let fetcher = Arc::clone(&self.fetcher);
            tasks.spawn(async move { drain_queue(worker, queue, fetcher).await });
        }

        let mut outcomes = HashMap::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(finished) => outcomes.extend(finished),
                Err(e) => tracing::warn!("Image worker did not finish: {}", e),
            }
        }
        outcomes
    }
}

/// Worker loop: claim, mirror, repeat until the queue is empty
async fn drain_queue(
    worker: usize,
    queue: Arc<Mutex<VecDeque<DownloadTask>>>,
    fetcher: Arc<dyn Fetcher>,
) -> Vec<(String, Outcome)> {
    let mut finished = Vec::new();

    loop {
        let next = queue.lock().await.pop_front();
        let Some(task) = next else {
            break;
        };
        let outcome = mirror_one(worker, &task, fetcher.as_ref()).await;
        finished.push((task.content_hash, outcome));
    }

    finished
}

async fn mirror_one(worker: usize, task: &DownloadTask, fetcher: &dyn Fetcher) -> Outcome {
    // Empty files are leftovers of an interrupted run
    if matches!(tokio::fs::metadata(&task.path).await, Ok(meta) if meta.len() > 0) {
        tracing::debug!("Reusing {} for {}", task.path.display(), task.url);
        return Outcome::Reused;
    }

    tracing::debug!("Worker {} downloading image {}", worker, task.url);
    let bytes = match fetcher.fetch(&task.url, None).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!("Image download failed, keeping remote URL: {}", e);
            return Outcome::Failed;
        }
    };

    match store(&task.path, &bytes).await {
        Ok(()) => Outcome::Downloaded,
        Err(e) => {
            tracing::warn!(
                "Could not write {}, keeping remote URL {}: {}",
                task.path.display(),
                task.url,
                e
            );
            Outcome::Failed
        }
    }
}

/// Writes `bytes` next to `path` and renames the file into place
///
/// The content-addressed path only ever holds a complete image.
async fn store(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let partial = partial_path(path);
    let written = match tokio::fs::write(&partial, bytes).await {
        Ok(()) => tokio::fs::rename(&partial, path).await,
        Err(e) => Err(e),
    };

    if written.is_err() {
        let _ = tokio::fs::remove_file(&partial).await;
    }
    written
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}
