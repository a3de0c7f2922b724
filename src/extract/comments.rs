//! Comment payload extraction
//!
//! Two shapes carry comments:
//! - the per-page comment index, a JSON payload listing every post's comment
//!   count and its first (inline) comment page
//! - comment sub-pages, HTML fragments of `li.lzl_single_post` entries

use crate::extract::markup::{first_text, joined_inner_html, selector};
use crate::extract::{CommentIndex, CommentThread, ExtractError};
use crate::model::{Comment, CommentPage};
use chrono::{FixedOffset, TimeZone};
use scraper::Html;
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::HashMap;

/// Prefix that user portrait ids are appended to
pub const PORTRAIT_BASE_URL: &str =
    "https://gss0.bdstatic.com/6LZ1dD3d1sgCo2Kml5_Y_D3/sys/portrait/item/";

/// Offset the source reports comment times in (UTC+8)
const SOURCE_UTC_OFFSET_SECS: i32 = 8 * 3600;

#[derive(Debug, Deserialize)]
struct CommentIndexPayload {
    data: CommentIndexData,
}

#[derive(Debug, Deserialize)]
struct CommentIndexData {
    #[serde(default, deserialize_with = "object_or_empty")]
    comment_list: HashMap<String, RawCommentThread>,

    #[serde(default, deserialize_with = "object_or_empty")]
    user_list: HashMap<String, RawUser>,
}

#[derive(Debug, Deserialize)]
struct RawCommentThread {
    #[serde(default)]
    comment_num: usize,

    #[serde(default)]
    comment_info: Vec<RawComment>,
}

#[derive(Debug, Deserialize)]
struct RawComment {
    #[serde(default)]
    show_nickname: String,

    #[serde(default)]
    user_id: Value,

    #[serde(default)]
    content: String,

    #[serde(default)]
    now_time: i64,
}

#[derive(Debug, Deserialize)]
struct RawUser {
    #[serde(default)]
    portrait: String,
}

/// The source serializes an empty map as `[]`
fn object_or_empty<'de, D, T>(deserializer: D) -> Result<HashMap<String, T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    match Value::deserialize(deserializer)? {
        Value::Object(map) => map
            .into_iter()
            .map(|(key, value)| {
                serde_json::from_value(value)
                    .map(|item| (key, item))
                    .map_err(D::Error::custom)
            })
            .collect(),
        Value::Array(_) | Value::Null => Ok(HashMap::new()),
        other => Err(D::Error::custom(format!(
            "expected object or empty array, got {}",
            other
        ))),
    }
}

/// Extracts the comment index delivered alongside a thread page
///
/// Inline comments get their avatar from the payload's user list and their
/// timestamp formatted as `%Y-%m-%d %H:%M` in the source's UTC+8 zone.
pub fn extract_comment_index(raw: &[u8]) -> Result<CommentIndex, ExtractError> {
    let payload: CommentIndexPayload = serde_json::from_slice(raw)?;
    let CommentIndexData {
        comment_list,
        user_list,
    } = payload.data;

    let threads = comment_list
        .into_iter()
        .map(|(pid, raw_thread)| {
            let comments: Vec<Comment> = raw_thread
                .comment_info
                .into_iter()
                .map(|raw| Comment {
                    avatar: user_key(&raw.user_id)
                        .and_then(|uid| user_list.get(&uid))
                        .filter(|user| !user.portrait.is_empty())
                        .map(|user| format!("{}{}", PORTRAIT_BASE_URL, user.portrait)),
                    author: raw.show_nickname,
                    body: raw.content,
                    timestamp: format_source_time(raw.now_time),
                })
                .collect();

            let total = raw_thread.comment_num.max(comments.len());
            let thread = CommentThread {
                total,
                first_page: CommentPage::new(0, comments),
            };
            (pid, thread)
        })
        .collect();

    Ok(CommentIndex { threads })
}

/// Extracts the comments of one comment sub-page, in source order
///
/// Entries without a body or a timestamp are dropped.
pub fn extract_comment_page(html: &str) -> Result<Vec<Comment>, ExtractError> {
    let entry_selector = selector("li.lzl_single_post")?;
    let author_selector = selector("div a")?;
    let avatar_selector = selector("img")?;
    let content_selector = selector("span.lzl_content_main")?;
    let time_selector = selector("span.lzl_time")?;

    let fragment = Html::parse_fragment(html);

    let comments = fragment
        .select(&entry_selector)
        .filter_map(|li| {
            let body = li
                .select(&content_selector)
                .next()
                .map(joined_inner_html)?;
            let timestamp = first_text(li, &time_selector)?;

            Some(Comment {
                author: first_text(li, &author_selector).unwrap_or_default(),
                avatar: li
                    .select(&avatar_selector)
                    .next()
                    .and_then(|img| img.value().attr("src"))
                    .map(str::to_string),
                body,
                timestamp,
            })
        })
        .collect();

    Ok(comments)
}

fn user_key(user_id: &Value) -> Option<String> {
    match user_id {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

fn format_source_time(unix_secs: i64) -> String {
    FixedOffset::east_opt(SOURCE_UTC_OFFSET_SECS)
        .and_then(|offset| offset.timestamp_opt(unix_secs, 0).single())
        .map(|time| time.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default()
}
