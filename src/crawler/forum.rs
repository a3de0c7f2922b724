//! Forum browsing
//!
//! Lists the threads of one forum page so a caller can pick one to archive.

use crate::crawler::{CrawlContext, CrawlError, PageError};
use crate::extract::ForumThread;

/// Fetches one forum listing page and returns its non-pinned threads
///
/// # Arguments
///
/// * `context` - Shared fetcher, extractor and endpoints
/// * `forum` - Forum name as typed by the user
/// * `page` - 0-based listing page
///
/// # Returns
///
/// * `Ok(Vec<ForumThread>)` - Threads in listing order
/// * `Err(CrawlError)` - The listing could not be fetched or read
pub async fn list_forum(
    context: &CrawlContext,
    forum: &str,
    page: u32,
) -> Result<Vec<ForumThread>, CrawlError> {
    let url = context.endpoints.forum_page(forum, page);
    tracing::info!("Listing forum '{}' page {}", forum, page);

    let listed = async {
        let raw = context.fetch(&url).await?;
        Ok::<_, PageError>(context.extractor.extract_forum_page(&raw)?)
    }
    .await
    .map_err(|source| CrawlError::Forum {
        forum: forum.to_string(),
        page,
        source,
    })?;

    tracing::debug!("Forum '{}' page {} lists {} threads", forum, page, listed.len());
    Ok(listed)
}

/// Numbered listing, one entry per thread with its summary below the title
pub fn format_listing(threads: &[ForumThread]) -> String {
    let mut listing = String::new();
    for (i, thread) in threads.iter().enumerate() {
        listing.push_str(&format!("{}: {}\n", i, thread.title));
        if !thread.summary.is_empty() {
            listing.push_str(&thread.summary);
            listing.push('\n');
        }
    }
    listing
}

/// Thread id picked by a typed answer, or `None` when it names no entry
pub fn select_thread(threads: &[ForumThread], answer: &str) -> Option<u64> {
    let index: usize = answer.trim().parse().ok()?;
    threads.get(index).map(|thread| thread.thread_id)
}
