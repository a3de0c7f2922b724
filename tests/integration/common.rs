//! Shared fixtures: a scripted fetcher and source-shaped page builders

use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tieba_mirror::config::Credentials;
use tieba_mirror::crawler::{CrawlContext, CrawlCoordinator};
use tieba_mirror::extract::TiebaExtractor;
use tieba_mirror::fetch::{Endpoints, FetchError, FetchErrorKind, Fetcher};
use url::Url;

pub const BASE_URL: &str = "https://tieba.test";
pub const TID: u64 = 7_000_000_001;

/// A canned fetch outcome
#[derive(Debug, Clone)]
pub struct Scripted {
    body: Result<Vec<u8>, FetchErrorKind>,
    delay: Duration,
}

impl Scripted {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            body: Ok(body.into()),
            delay: Duration::ZERO,
        }
    }

    pub fn fail(kind: FetchErrorKind) -> Self {
        Self {
            body: Err(kind),
            delay: Duration::ZERO,
        }
    }

    pub fn after_ms(mut self, millis: u64) -> Self {
        self.delay = Duration::from_millis(millis);
        self
    }
}

/// A recorded fetch: the URL and whether credentials came with it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub url: String,
    pub with_credentials: bool,
}

/// In-memory [`Fetcher`] answering from a URL script
///
/// Unscripted URLs get the fallback response, or `NotFound` without one.
#[derive(Default)]
pub struct ScriptedFetcher {
    responses: Mutex<HashMap<String, Scripted>>,
    fallback: Option<Scripted>,
    calls: Mutex<Vec<Call>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fallback(fallback: Scripted) -> Self {
        Self {
            fallback: Some(fallback),
            ..Self::default()
        }
    }

    pub fn script(&self, url: &Url, response: Scripted) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), response);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, url: &Url) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.url == url.as_str())
            .count()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(
        &self,
        url: &Url,
        credentials: Option<&Credentials>,
    ) -> Result<Vec<u8>, FetchError> {
        self.calls.lock().unwrap().push(Call {
            url: url.to_string(),
            with_credentials: credentials.is_some(),
        });

        let scripted = self
            .responses
            .lock()
            .unwrap()
            .get(url.as_str())
            .cloned()
            .or_else(|| self.fallback.clone());
        let Some(scripted) = scripted else {
            return Err(FetchError::NotFound {
                url: url.to_string(),
            });
        };

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if scripted.delay.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(scripted.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        scripted.body.map_err(|kind| match kind {
            FetchErrorKind::SecurityChallenge => FetchError::SecurityChallenge {
                url: url.to_string(),
            },
            FetchErrorKind::NotFound => FetchError::NotFound {
                url: url.to_string(),
            },
            FetchErrorKind::Network => FetchError::network(url, "connection reset"),
        })
    }
}

/// A post as it should appear on a fixture thread page
#[derive(Debug, Clone)]
pub struct PostFixture {
    pub pid: String,
    pub body: String,
    pub is_thread_author: bool,
    pub has_tail: bool,
}

pub fn post(pid: &str, body: &str) -> PostFixture {
    PostFixture {
        pid: pid.to_string(),
        body: body.to_string(),
        is_thread_author: false,
        has_tail: true,
    }
}

pub fn op_post(pid: &str, body: &str) -> PostFixture {
    PostFixture {
        is_thread_author: true,
        ..post(pid, body)
    }
}

pub fn malformed_post(pid: &str) -> PostFixture {
    PostFixture {
        has_tail: false,
        ..post(pid, "no tail")
    }
}

/// Thread page markup in the source's layout
pub fn thread_page(title: Option<&str>, total_pages: u32, posts: &[PostFixture]) -> String {
    let title = title
        .map(|t| format!(r#"<h3 class="core_title_txt">{}</h3>"#, t))
        .unwrap_or_default();

    let posts: String = posts
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let badge = if p.is_thread_author {
                r#"<li><span class="louzhubiaoshi"></span></li>"#
            } else {
                ""
            };
            let tail = if p.has_tail {
                format!(
                    r#"<div class="post-tail-wrap"><span>IP属地:北京</span><span class="tail-info">{}楼</span><span class="tail-info">2024-05-01 12:{:02}</span></div>"#,
                    i + 1,
                    i % 60
                )
            } else {
                String::new()
            };
            format!(
                r#"<div class="l_post l_post_bright j_l_post clearfix" data-pid="{pid}">
                    <ul class="p_author">
                        <li class="icon"><img src="https://portrait.test/{pid}.jpg"></li>
                        <li class="d_name"><a>user-{pid}</a></li>
                        {badge}
                    </ul>
                    <div class="d_post_content j_d_post_content">{body}</div>
                    {tail}
                </div>"#,
                pid = p.pid,
                body = p.body,
            )
        })
        .collect();

    format!(
        r#"<html><head><title>thread</title></head><body>
        {title}
        <ul><li class="l_reply_num"><span class="red">99</span>回复贴，共<span class="red">{total_pages}</span>页</li></ul>
        {posts}
        </body></html>"#
    )
}

/// Forum listing markup: `(tid, title, pinned)` per entry
pub fn forum_page(entries: &[(u64, &str, bool)]) -> String {
    let items: String = entries
        .iter()
        .map(|(tid, title, pinned)| {
            let marker = if *pinned {
                r#"<i class="icon-top"></i>"#
            } else {
                ""
            };
            format!(
                r#"<li class="j_thread_list clearfix" data-tid="{tid}">
                    <div class="threadlist_lz clearfix">{marker}<a class="j_th_tit">{title}</a></div>
                    <div class="threadlist_detail clearfix">summary of {title}</div>
                </li>"#
            )
        })
        .collect();

    format!(
        r#"<html><head><title>forum</title></head><body><ul id="thread_list">{items}</ul></body></html>"#
    )
}

/// Comment index payload: `(pid, total comments, inline comment bodies)`
pub fn comment_index(entries: &[(&str, usize, Vec<String>)]) -> String {
    let mut comment_list = serde_json::Map::new();
    for (pid, total, inline) in entries {
        let info: Vec<_> = inline
            .iter()
            .map(|body| {
                json!({
                    "show_nickname": "replier",
                    "user_id": 1,
                    "content": body,
                    "now_time": 1_714_536_000,
                })
            })
            .collect();
        comment_list.insert(
            pid.to_string(),
            json!({ "comment_num": total, "comment_info": info }),
        );
    }

    json!({
        "errno": 0,
        "data": {
            "comment_list": comment_list,
            "user_list": { "1": { "portrait": "tb.1.replier" } },
        }
    })
    .to_string()
}

pub fn empty_comment_index() -> String {
    r#"{"errno": 0, "data": {"comment_list": [], "user_list": []}}"#.to_string()
}

/// Comment sub-page markup with one entry per body
pub fn comment_page(bodies: &[String]) -> String {
    bodies
        .iter()
        .map(|body| {
            format!(
                r#"<li class="lzl_single_post"><div class="lzl_cnt"><a>replier</a><span class="lzl_content_main">{body}</span><div class="lzl_content_reply"><span class="lzl_time">2024-05-01 13:00</span></div></div></li>"#
            )
        })
        .collect()
}

pub fn bodies(prefix: &str, range: std::ops::Range<usize>) -> Vec<String> {
    range.map(|i| format!("{}{}", prefix, i)).collect()
}

/// A scripted source for one thread
pub struct Harness {
    pub fetcher: Arc<ScriptedFetcher>,
    pub endpoints: Endpoints,
    pub author_only: bool,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            fetcher: Arc::new(ScriptedFetcher::new()),
            endpoints: Endpoints::new(BASE_URL).unwrap(),
            author_only: false,
        }
    }

    pub fn author_only() -> Self {
        Self {
            author_only: true,
            ..Self::new()
        }
    }

    pub fn context(&self, comment_page_size: usize) -> CrawlContext {
        CrawlContext::new(
            self.fetcher.clone(),
            Arc::new(TiebaExtractor),
            self.endpoints.clone(),
            Credentials::from_pairs([("BDUSS", "session")]),
            comment_page_size,
        )
    }

    pub fn coordinator(&self, comment_page_size: usize) -> CrawlCoordinator {
        CrawlCoordinator::new(self.context(comment_page_size))
    }

    pub fn page_url(&self, page: u32) -> Url {
        self.endpoints.thread_page(TID, page, self.author_only)
    }

    pub fn comment_page_url(&self, pid: &str, sub_page: usize) -> Url {
        self.endpoints.comment_page(TID, pid, sub_page)
    }

    /// Scripts a thread page with no comments
    pub fn page(&self, page: u32, html: String, delay_ms: u64) {
        self.page_with_comments(page, html, empty_comment_index(), delay_ms);
    }

    /// Scripts a thread page and its comment index
    pub fn page_with_comments(&self, page: u32, html: String, index: String, delay_ms: u64) {
        self.fetcher
            .script(&self.page_url(page), Scripted::ok(html).after_ms(delay_ms));
        self.fetcher.script(
            &self.endpoints.comment_index(TID, page, self.author_only),
            Scripted::ok(index).after_ms(delay_ms),
        );
    }

    pub fn fail_page(&self, page: u32, kind: FetchErrorKind) {
        self.fetcher.script(&self.page_url(page), Scripted::fail(kind));
        self.fetcher.script(
            &self.endpoints.comment_index(TID, page, self.author_only),
            Scripted::ok(empty_comment_index()),
        );
    }

    pub fn comment_sub_page(&self, pid: &str, sub_page: usize, response: Scripted) {
        self.fetcher
            .script(&self.comment_page_url(pid, sub_page), response);
    }
}
