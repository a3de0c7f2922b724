//! Crawl coordinator - thread-level orchestration
//!
//! Page 1 is fetched first because it fixes the title and page count. Every
//! other requested page is then fetched concurrently, one task per page.
//! Each task reports back tagged with its page index and the coordinator
//! writes the batch into that page's slot, so document order never depends
//! on completion order.

use crate::config::{Config, Credentials};
use crate::crawler::page::PageAssembler;
use crate::crawler::{CrawlContext, CrawlError, PageError, PageRange, ScopeFilter};
use crate::extract::ExtractError;
use crate::model::{Document, PostBatch, Thread};
use crate::ArchiveError;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;

/// Crawls one thread into a [`Document`]
pub struct CrawlCoordinator {
    pages: Arc<PageAssembler>,
}

impl CrawlCoordinator {
    pub fn new(context: CrawlContext) -> Self {
        Self {
            pages: Arc::new(PageAssembler::new(context)),
        }
    }

    /// Creates a coordinator backed by the HTTP fetcher
    pub fn from_config(config: &Config, credentials: Credentials) -> Result<Self, ArchiveError> {
        Ok(Self::new(CrawlContext::from_config(config, credentials)?))
    }

    /// Crawls a thread
    ///
    /// # Arguments
    ///
    /// * `thread_id` - Source thread id
    /// * `range` - Pages to include; `None` means every page
    /// * `scope` - Which posts to keep
    ///
    /// # Returns
    ///
    /// * `Ok(Document)` - One batch per requested page, in page order
    /// * `Err(CrawlError)` - A page failed; no partial document is returned
    pub async fn crawl(
        &self,
        thread_id: u64,
        range: Option<PageRange>,
        scope: ScopeFilter,
    ) -> Result<Document, CrawlError> {
        let start_time = Instant::now();
        tracing::info!("Crawling thread {}", thread_id);

        tracing::info!("Page 1 started");
        let first = self
            .pages
            .fetch_page(thread_id, 1, scope)
            .await
            .map_err(|source| CrawlError::Page { page: 1, source })?;

        let thread = Thread {
            id: thread_id,
            title: first.title.ok_or_else(|| missing_metadata("thread title"))?,
            total_pages: first
                .total_pages
                .ok_or_else(|| missing_metadata("page count"))?
                .max(1),
        };

        tracing::info!(
            "Thread '{}' has {} pages",
            thread.title,
            thread.total_pages
        );

        let (start, end) = range
            .unwrap_or_default()
            .resolve(thread.total_pages)
            .ok_or(CrawlError::EmptyRange {
                range: range.unwrap_or_default(),
                total_pages: thread.total_pages,
            })?;

        let mut slots: Vec<Option<PostBatch>> = vec![None; (end - start + 1) as usize];
        if start == 1 {
            tracing::info!("Page 1 finished: {} posts", first.batch.len());
            slots[0] = Some(first.batch);
        }

        let mut tasks = JoinSet::new();
        for page in start.max(2)..=end {
            let pages = Arc::clone(&self.pages);
            tasks.spawn(async move {
                tracing::info!("Page {} started", page);
                let result = pages.fetch_page(thread_id, page, scope).await;
                (page, result)
            });
        }

        // Every task is joined before returning, success or not
        let mut fatal: Option<CrawlError> = None;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((page, Ok(fetched))) => {
                    tracing::info!("Page {} finished: {} posts", page, fetched.batch.len());
                    slots[(page - start) as usize] = Some(fetched.batch);
                }
                Ok((page, Err(source))) => {
                    tracing::error!("Page {} failed: {}", page, source);
                    if fatal.is_none() {
                        fatal = Some(CrawlError::Page { page, source });
                    }
                }
                Err(e) => {
                    tracing::error!("Page task did not finish: {}", e);
                    if fatal.is_none() {
                        fatal = Some(CrawlError::Join(e.to_string()));
                    }
                }
            }
        }

        if let Some(e) = fatal {
            return Err(e);
        }

        let pages = slots
            .into_iter()
            .zip(start..=end)
            .map(|(slot, page)| slot.ok_or(CrawlError::MissingPage(page)))
            .collect::<Result<Vec<_>, _>>()?;

        let document = Document::new(thread.title, pages);
        tracing::info!(
            "Crawl completed: {} pages, {} posts, {} comments in {:?}",
            document.page_count(),
            document.post_count(),
            document.comment_count(),
            start_time.elapsed()
        );

        Ok(document)
    }
}

fn missing_metadata(field: &'static str) -> CrawlError {
    CrawlError::Page {
        page: 1,
        source: PageError::Extract(ExtractError::Missing(field)),
    }
}
