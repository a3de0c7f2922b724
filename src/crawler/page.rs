use crate::crawler::comments::CommentAssembler;
use crate::crawler::{CrawlContext, PageError, ScopeFilter};
use crate::extract::CommentIndex;
use crate::fetch::{FetchError, FetchErrorKind};
use crate::model::{Post, PostBatch};

/// One fetched thread page plus the metadata it carried
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub batch: PostBatch,
    pub title: Option<String>,
    pub total_pages: Option<u32>,
}

/// Fetches one thread page and resolves the comments of each of its posts
pub struct PageAssembler {
    context: CrawlContext,
    comments: CommentAssembler,
}

impl PageAssembler {
    pub fn new(context: CrawlContext) -> Self {
        let comments = CommentAssembler::new(context.clone());
        Self { context, comments }
    }

    /// Produces the post batch of page `page_index`
    ///
    /// The thread page and its comment index are fetched together; either
    /// failing fails the page, and a security challenge from either one is
    /// the error reported. An unreadable comment index only costs the page
    /// its inline comments.
    ///
    /// # Arguments
    ///
    /// * `thread_id` - Source thread id
    /// * `page_index` - 1-based page number
    /// * `scope` - Which posts to keep
    ///
    /// # Returns
    ///
    /// * `Ok(FetchedPage)` - Posts in source order with comments attached
    /// * `Err(PageError)` - The page could not be fetched or read
    pub async fn fetch_page(
        &self,
        thread_id: u64,
        page_index: u32,
        scope: ScopeFilter,
    ) -> Result<FetchedPage, PageError> {
        let endpoints = &self.context.endpoints;
        let page_url = endpoints.thread_page(thread_id, page_index, scope.author_only());
        let index_url = endpoints.comment_index(thread_id, page_index, scope.author_only());

        let (raw_page, raw_index) = settle(tokio::join!(
            self.context.fetch(&page_url),
            self.context.fetch(&index_url)
        ))?;

        let extracted = self.context.extractor.extract_page(&raw_page)?;
        let mut index = match self.context.extractor.extract_comment_index(&raw_index) {
            Ok(index) => index,
            Err(e) => {
                tracing::warn!(
                    "Comment index for page {} unreadable, posts keep no inline comments: {}",
                    page_index,
                    e
                );
                CommentIndex::default()
            }
        };

        let pending: Vec<_> = extracted
            .posts
            .into_iter()
            .filter(|post| scope.admits(post))
            .enumerate()
            .map(|(order_index, post)| {
                let thread = index.take(&post.pid);
                (order_index, post, thread)
            })
            .collect();

        let posts = futures::future::join_all(pending.into_iter().map(
            |(order_index, post, thread)| async move {
                let comments = self.comments.resolve(thread_id, &post.pid, thread).await;
                Post {
                    page_index,
                    order_index,
                    pid: post.pid,
                    floor: post.floor,
                    author: post.author,
                    body: post.body,
                    timestamp: post.timestamp,
                    ip_location: post.ip_location,
                    comments,
                }
            },
        ))
        .await;

        if extracted.skipped > 0 {
            tracing::warn!(
                "Page {}: skipped {} malformed posts",
                page_index,
                extracted.skipped
            );
        }

        Ok(FetchedPage {
            batch: PostBatch::new(page_index, posts, extracted.skipped),
            title: extracted.title,
            total_pages: extracted.total_pages,
        })
    }
}

/// Combines the page and comment index fetches
///
/// Both have finished by now. A security challenge outranks any other failure
/// so the diagnostic names it regardless of which fetch failed first.
fn settle(
    results: (Result<Vec<u8>, FetchError>, Result<Vec<u8>, FetchError>),
) -> Result<(Vec<u8>, Vec<u8>), FetchError> {
    match results {
        (Ok(page), Ok(index)) => Ok((page, index)),
        (Err(page), Err(index)) => {
            let challenged = |e: &FetchError| e.kind() == FetchErrorKind::SecurityChallenge;
            if challenged(&index) && !challenged(&page) {
                Err(index)
            } else {
                Err(page)
            }
        }
        (Err(e), Ok(_)) | (Ok(_), Err(e)) => Err(e),
    }
}
