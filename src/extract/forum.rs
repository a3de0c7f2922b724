//! Forum listing extraction
//!
//! A forum page lists threads as `li.j_thread_list` entries under
//! `ul#thread_list`. Pinned threads carry an `i.icon-top` marker and are left
//! out, as are entries without a numeric `data-tid`.

use crate::extract::markup::{first_text, selector};
use crate::extract::{ExtractError, ForumThread};
use scraper::{ElementRef, Html, Selector};

struct ForumSelectors {
    entry: Selector,
    pinned: Selector,
    title: Selector,
    lead: Selector,
    detail: Selector,
}

impl ForumSelectors {
    fn new() -> Result<Self, ExtractError> {
        Ok(Self {
            entry: selector("ul#thread_list > li.j_thread_list")?,
            pinned: selector("i.icon-top")?,
            title: selector("a.j_th_tit")?,
            lead: selector("div.threadlist_lz")?,
            detail: selector("div.threadlist_detail")?,
        })
    }
}

/// Extracts the non-pinned threads of a forum listing page, in listing order
pub fn extract_forum_page(html: &str) -> Result<Vec<ForumThread>, ExtractError> {
    let selectors = ForumSelectors::new()?;
    let document = Html::parse_document(html);

    let threads = document
        .root_element()
        .select(&selectors.entry)
        .filter(|entry| entry.select(&selectors.pinned).next().is_none())
        .filter_map(|entry| extract_entry(entry, &selectors))
        .collect();

    Ok(threads)
}

fn extract_entry(entry: ElementRef<'_>, selectors: &ForumSelectors) -> Option<ForumThread> {
    let thread_id = entry.value().attr("data-tid")?.trim().parse::<u64>().ok()?;

    let title = first_text(entry, &selectors.title)
        .or_else(|| block_text(entry, &selectors.lead))
        .unwrap_or_default();
    let summary = block_text(entry, &selectors.detail).unwrap_or_default();

    Some(ForumThread {
        thread_id,
        title,
        summary,
    })
}

/// Text of a listing block with blank lines and indentation collapsed
fn block_text(scope: ElementRef<'_>, selector: &Selector) -> Option<String> {
    let block = scope.select(selector).next()?;
    let text: String = block.text().collect();
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    (!lines.is_empty()).then(|| lines.join("\n"))
}
