//! Thread page extraction
//!
//! Locates the thread title, the page count and every post container on a
//! thread page. A post container is kept only when it carries a post id, a
//! body and a tail block with a timestamp; anything else is counted as
//! skipped so the page itself still succeeds.

use crate::extract::markup::{first_number, first_text, joined_inner_html, selector, trimmed_text};
use crate::extract::{ExtractError, ExtractedPage, ExtractedPost};
use crate::model::Author;
use scraper::{ElementRef, Html, Selector};

const IP_PREFIX: &str = "IP属地:";

/// Compiled selectors used while walking one page
struct PageSelectors {
    title: Selector,
    reply_num: Selector,
    span: Selector,
    post: Selector,
    icon: Selector,
    name: Selector,
    badge_title: Selector,
    badge_level: Selector,
    content: Selector,
    tail: Selector,
    tail_info: Selector,
    thread_author: Selector,
}

impl PageSelectors {
    fn new() -> Result<Self, ExtractError> {
        Ok(Self {
            title: selector(".core_title_txt")?,
            reply_num: selector("li.l_reply_num")?,
            span: selector("span")?,
            post: selector("div.l_post.l_post_bright.j_l_post")?,
            icon: selector("li.icon img")?,
            name: selector("li.d_name a")?,
            badge_title: selector("div.d_badge_title")?,
            badge_level: selector("div.d_badge_lv")?,
            content: selector("div.d_post_content.j_d_post_content")?,
            tail: selector("div.post-tail-wrap")?,
            tail_info: selector("span.tail-info")?,
            thread_author: selector(".louzhubiaoshi")?,
        })
    }
}

/// Extracts the typed content of a thread page
///
/// # Arguments
///
/// * `html` - The thread page markup
///
/// # Returns
///
/// * `Ok(ExtractedPage)` - Title and page count when present, posts in
///   source order, and the number of skipped containers
/// * `Err(ExtractError)` - A selector failed to compile
pub fn extract_thread_page(html: &str) -> Result<ExtractedPage, ExtractError> {
    let selectors = PageSelectors::new()?;
    let document = Html::parse_document(html);
    let root = document.root_element();

    let title = first_text(root, &selectors.title);

    // The reply counter reads "<span>N</span>回复贴，共<span>P</span>页"
    let total_pages = root
        .select(&selectors.reply_num)
        .next()
        .and_then(|li| li.select(&selectors.span).nth(1))
        .and_then(|span| trimmed_text(span).parse::<u32>().ok());

    let mut posts = Vec::new();
    let mut skipped = 0;

    for container in root.select(&selectors.post) {
        match extract_post(container, &selectors) {
            Some(post) => posts.push(post),
            None => {
                skipped += 1;
                tracing::debug!(
                    "Skipping post container without required fields (pid: {:?})",
                    container.value().attr("data-pid")
                );
            }
        }
    }

    Ok(ExtractedPage {
        title,
        total_pages,
        posts,
        skipped,
    })
}

/// Extracts one post, or `None` when a required field is missing
fn extract_post(container: ElementRef<'_>, selectors: &PageSelectors) -> Option<ExtractedPost> {
    let pid = container.value().attr("data-pid")?.to_string();

    let tail = container.select(&selectors.tail).next()?;
    let tail_info: Vec<String> = tail.select(&selectors.tail_info).map(trimmed_text).collect();
    let timestamp = tail_info.last().filter(|t| !t.is_empty())?.clone();

    let body = container
        .select(&selectors.content)
        .next()
        .map(joined_inner_html)?;

    let floor = tail_info
        .iter()
        .find(|info| info.ends_with('楼'))
        .and_then(|info| first_number(info));

    let ip_location = tail
        .select(&selectors.span)
        .next()
        .map(trimmed_text)
        .and_then(|text| {
            text.strip_prefix(IP_PREFIX)
                .map(|ip| ip.trim().to_string())
        })
        .filter(|ip| !ip.is_empty());

    let author = Author {
        name: container
            .select(&selectors.name)
            .next()
            .map(joined_inner_html)
            .unwrap_or_default(),
        icon: container
            .select(&selectors.icon)
            .next()
            .and_then(avatar_source),
        badge: first_text(container, &selectors.badge_title),
        level: first_text(container, &selectors.badge_level).and_then(|lv| lv.parse().ok()),
        is_thread_author: container.select(&selectors.thread_author).next().is_some(),
    };

    Some(ExtractedPost {
        pid,
        floor,
        author,
        body,
        timestamp,
        ip_location,
    })
}

/// Picks the real avatar URL from an `<img>` element
///
/// Lazily-loaded avatars carry a protocol-relative placeholder in `src` and
/// the real image in `data-tb-lazyload`.
fn avatar_source(img: ElementRef<'_>) -> Option<String> {
    let src = img.value().attr("src")?;
    if src.starts_with("//") {
        if let Some(lazy) = img.value().attr("data-tb-lazyload") {
            return Some(lazy.to_string());
        }
    }
    Some(src.to_string())
}
