//! Comment pagination
//!
//! A post's first comment page arrives inline with the thread page. When the
//! post has more comments than that, the remaining sub-pages are fetched
//! concurrently, each into its own slot, and merged in sub-page order.

use crate::crawler::{CrawlContext, PageError};
use crate::extract::CommentThread;
use crate::model::{Comment, CommentPage};
use tokio::task::JoinSet;

/// Number of comment sub-pages to fetch beyond the inline one
///
/// `ceil(total / page_size) - 1`, or zero when the inline page already holds
/// every comment.
///
/// # Examples
///
/// ```
/// use tieba_mirror::crawler::extra_comment_pages;
///
/// assert_eq!(extra_comment_pages(65, 30, 30), 2);
/// assert_eq!(extra_comment_pages(60, 30, 30), 1);
/// assert_eq!(extra_comment_pages(8, 8, 10), 0);
/// ```
pub fn extra_comment_pages(total: usize, inline: usize, page_size: usize) -> usize {
    if total <= inline || page_size == 0 {
        return 0;
    }
    total.div_ceil(page_size).saturating_sub(1)
}

/// Resolves the full comment list of one post
#[derive(Clone)]
pub struct CommentAssembler {
    context: CrawlContext,
}

impl CommentAssembler {
    pub fn new(context: CrawlContext) -> Self {
        Self { context }
    }

    /// Returns every comment of a post in (sub-page, position) order
    ///
    /// A sub-page that fails to fetch or extract leaves its slot empty; the
    /// rest of the list is still returned.
    pub async fn resolve(&self, thread_id: u64, post_id: &str, thread: CommentThread) -> Vec<Comment> {
        let CommentThread { total, first_page } = thread;
        let extra = extra_comment_pages(
            total,
            first_page.comments.len(),
            self.context.comment_page_size,
        );

        if extra == 0 {
            return first_page.comments;
        }

        tracing::debug!(
            "Post {} has {} comments, fetching {} more sub-pages",
            post_id,
            total,
            extra
        );

        let mut slots: Vec<Vec<Comment>> = vec![Vec::new(); extra + 1];
        slots[0] = first_page.comments;

        let mut tasks = JoinSet::new();
        for sub_page in 1..=extra {
            let context = self.context.clone();
            let post_id = post_id.to_string();
            tasks.spawn(async move {
                let result = fetch_comment_page(&context, thread_id, &post_id, sub_page).await;
                (sub_page, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((sub_page, Ok(page))) => slots[sub_page] = page.comments,
                Ok((sub_page, Err(e))) => {
                    tracing::warn!(
                        "Comment sub-page {} of post {} unavailable, leaving it empty: {}",
                        sub_page,
                        post_id,
                        e
                    );
                }
                Err(e) => {
                    tracing::warn!("Comment task for post {} did not finish: {}", post_id, e);
                }
            }
        }

        slots.into_iter().flatten().collect()
    }
}

/// Fetches and extracts one comment sub-page
async fn fetch_comment_page(
    context: &CrawlContext,
    thread_id: u64,
    post_id: &str,
    sub_page: usize,
) -> Result<CommentPage, PageError> {
    let url = context.endpoints.comment_page(thread_id, post_id, sub_page);
    let raw = context.fetch(&url).await?;
    let comments = context.extractor.extract_comment_page(&raw)?;
    Ok(CommentPage::new(sub_page, comments))
}
