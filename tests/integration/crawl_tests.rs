use crate::common::*;
use tieba_mirror::crawler::{
    list_forum, select_thread, CrawlError, PageError, PageRange, ScopeFilter,
};
use std::io::Write;
use std::sync::{Arc, Mutex};
use tieba_mirror::fetch::FetchErrorKind;

fn pids(batch: &tieba_mirror::PostBatch) -> Vec<&str> {
    batch.posts.iter().map(|p| p.pid.as_str()).collect()
}

/// Scripts a `total`-page thread whose later pages answer sooner
fn reversed_latency_thread(harness: &Harness, total: u32) {
    for page in 1..=total {
        let html = thread_page(
            Some("Ordering"),
            total,
            &[
                post(&format!("{}-a", page), "first"),
                post(&format!("{}-b", page), "second"),
            ],
        );
        let delay = if page == 1 { 0 } else { u64::from(total - page + 1) * 40 };
        harness.page(page, html, delay);
    }
}

#[tokio::test]
async fn test_document_order_ignores_completion_order() {
    let harness = Harness::new();
    reversed_latency_thread(&harness, 5);

    let document = harness
        .coordinator(10)
        .crawl(TID, None, ScopeFilter::All)
        .await
        .unwrap();

    assert_eq!(document.title, "Ordering");
    assert_eq!(document.page_count(), 5);
    for (i, batch) in document.pages.iter().enumerate() {
        let page = i as u32 + 1;
        assert_eq!(batch.page_index, page);
        assert_eq!(pids(batch), vec![format!("{}-a", page), format!("{}-b", page)]);
        for (order, post) in batch.posts.iter().enumerate() {
            assert_eq!(post.order_key(), (page, order));
        }
    }
}

#[tokio::test]
async fn test_every_page_gets_a_slot_even_when_empty() {
    let harness = Harness::new();
    harness.page(1, thread_page(Some("Gaps"), 3, &[op_post("1-a", "hello")]), 0);
    harness.page(2, thread_page(Some("Gaps"), 3, &[]), 0);
    harness.page(3, thread_page(Some("Gaps"), 3, &[post("3-a", "bye")]), 0);

    let document = harness
        .coordinator(10)
        .crawl(TID, None, ScopeFilter::All)
        .await
        .unwrap();

    assert_eq!(document.page_count(), 3);
    assert!(document.pages[1].is_empty());
    assert_eq!(document.pages[1].page_index, 2);
    assert_eq!(document.post_count(), 2);
}

#[tokio::test]
async fn test_security_challenge_on_page_three_is_fatal() {
    let harness = Harness::new();
    for page in [1, 2, 4, 5] {
        harness.page(page, thread_page(Some("Fatal"), 5, &[post(&page.to_string(), "x")]), 20);
    }
    harness.fail_page(3, FetchErrorKind::SecurityChallenge);

    let err = harness
        .coordinator(10)
        .crawl(TID, None, ScopeFilter::All)
        .await
        .unwrap_err();

    assert!(err.is_security_challenge());
    match err {
        CrawlError::Page { page, source } => {
            assert_eq!(page, 3);
            assert!(matches!(source, PageError::Fetch(_)));
        }
        other => panic!("unexpected error: {other}"),
    }

    // Pages after the failure were still requested
    assert_eq!(harness.fetcher.call_count(&harness.page_url(5)), 1);
}

#[tokio::test]
async fn test_challenge_named_when_comment_index_fails_first() {
    let harness = Harness::new();
    harness.fetcher.script(
        &harness.page_url(1),
        Scripted::fail(FetchErrorKind::SecurityChallenge).after_ms(50),
    );
    harness.fetcher.script(
        &harness.endpoints.comment_index(TID, 1, false),
        Scripted::fail(FetchErrorKind::Network),
    );

    let err = harness
        .coordinator(10)
        .crawl(TID, None, ScopeFilter::All)
        .await
        .unwrap_err();

    assert!(err.is_security_challenge(), "unexpected error: {err}");
    assert!(matches!(err, CrawlError::Page { page: 1, .. }));
}

#[tokio::test]
async fn test_network_failure_on_first_page_is_fatal() {
    let harness = Harness::new();
    harness.fail_page(1, FetchErrorKind::Network);

    let err = harness
        .coordinator(10)
        .crawl(TID, None, ScopeFilter::All)
        .await
        .unwrap_err();

    assert!(matches!(err, CrawlError::Page { page: 1, .. }));
    assert!(!err.is_security_challenge());
}

#[tokio::test]
async fn test_missing_title_is_fatal() {
    let harness = Harness::new();
    harness.page(1, thread_page(None, 1, &[post("1", "x")]), 0);

    let err = harness
        .coordinator(10)
        .crawl(TID, None, ScopeFilter::All)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CrawlError::Page {
            page: 1,
            source: PageError::Extract(_)
        }
    ));
}

#[tokio::test]
async fn test_comment_pages_fetched_and_merged_in_order() {
    let harness = Harness::new();
    harness.page_with_comments(
        1,
        thread_page(Some("Comments"), 1, &[op_post("100", "busy post"), post("200", "quiet post")]),
        comment_index(&[("100", 65, bodies("c", 0..30)), ("200", 2, bodies("q", 0..2))]),
        0,
    );
    // Sub-page 1 answers last
    harness.comment_sub_page(
        "100",
        1,
        Scripted::ok(comment_page(&bodies("c", 30..60))).after_ms(80),
    );
    harness.comment_sub_page("100", 2, Scripted::ok(comment_page(&bodies("c", 60..65))));

    let document = harness
        .coordinator(30)
        .crawl(TID, None, ScopeFilter::All)
        .await
        .unwrap();

    let busy = &document.pages[0].posts[0];
    let comment_bodies: Vec<_> = busy.comments.iter().map(|c| c.body.clone()).collect();
    assert_eq!(comment_bodies, bodies("c", 0..65));

    // Inline comments carry portrait avatars
    assert_eq!(
        busy.comments[0].avatar.as_deref(),
        Some("https://gss0.bdstatic.com/6LZ1dD3d1sgCo2Kml5_Y_D3/sys/portrait/item/tb.1.replier")
    );

    let quiet = &document.pages[0].posts[1];
    assert_eq!(quiet.comments.len(), 2);

    let sub_page_calls = harness
        .fetcher
        .calls()
        .into_iter()
        .filter(|call| call.url.contains("/p/comment?"))
        .count();
    assert_eq!(sub_page_calls, 2);
    assert_eq!(harness.fetcher.call_count(&harness.comment_page_url("100", 1)), 1);
    assert_eq!(harness.fetcher.call_count(&harness.comment_page_url("100", 2)), 1);
}

#[tokio::test]
async fn test_failed_comment_sub_page_degrades_to_empty() {
    let harness = Harness::new();
    harness.page_with_comments(
        1,
        thread_page(Some("Degrade"), 1, &[post("100", "post")]),
        comment_index(&[("100", 25, bodies("c", 0..10))]),
        0,
    );
    harness.comment_sub_page("100", 1, Scripted::fail(FetchErrorKind::Network));
    harness.comment_sub_page("100", 2, Scripted::ok(comment_page(&bodies("c", 20..25))));

    let document = harness
        .coordinator(10)
        .crawl(TID, None, ScopeFilter::All)
        .await
        .unwrap();

    let comment_bodies: Vec<_> = document.pages[0].posts[0]
        .comments
        .iter()
        .map(|c| c.body.clone())
        .collect();
    let mut expected = bodies("c", 0..10);
    expected.extend(bodies("c", 20..25));
    assert_eq!(comment_bodies, expected);
}

#[tokio::test]
async fn test_unreadable_comment_index_keeps_posts() {
    let harness = Harness::new();
    harness.page_with_comments(
        1,
        thread_page(Some("Index"), 1, &[post("1", "a"), post("2", "b")]),
        "<html>rate limited</html>".to_string(),
        0,
    );

    let document = harness
        .coordinator(10)
        .crawl(TID, None, ScopeFilter::All)
        .await
        .unwrap();

    assert_eq!(document.post_count(), 2);
    assert_eq!(document.comment_count(), 0);
}

#[tokio::test]
async fn test_page_range_limits_batches() {
    let harness = Harness::new();
    for page in 1..=4 {
        harness.page(page, thread_page(Some("Range"), 4, &[post(&page.to_string(), "x")]), 0);
    }

    let range: PageRange = "2-3".parse().unwrap();
    let document = harness
        .coordinator(10)
        .crawl(TID, Some(range), ScopeFilter::All)
        .await
        .unwrap();

    let pages: Vec<_> = document.pages.iter().map(|b| b.page_index).collect();
    assert_eq!(pages, vec![2, 3]);
    assert_eq!(harness.fetcher.call_count(&harness.page_url(1)), 1);
    assert_eq!(harness.fetcher.call_count(&harness.page_url(4)), 0);
}

#[tokio::test]
async fn test_range_past_last_page_is_empty() {
    let harness = Harness::new();
    harness.page(1, thread_page(Some("Short"), 2, &[post("1", "x")]), 0);

    let err = harness
        .coordinator(10)
        .crawl(TID, Some(PageRange::new(Some(5), None)), ScopeFilter::All)
        .await
        .unwrap_err();

    assert!(matches!(err, CrawlError::EmptyRange { total_pages: 2, .. }));
}

#[tokio::test]
async fn test_author_only_scope() {
    let harness = Harness::author_only();
    harness.page(
        1,
        thread_page(
            Some("Scope"),
            1,
            &[op_post("1", "op"), post("2", "other"), op_post("3", "op again")],
        ),
        0,
    );

    let document = harness
        .coordinator(10)
        .crawl(TID, None, ScopeFilter::ThreadAuthorOnly)
        .await
        .unwrap();

    assert_eq!(pids(&document.pages[0]), vec!["1", "3"]);
    assert_eq!(document.pages[0].posts[1].order_index, 1);
    let calls = harness.fetcher.calls();
    assert!(!calls.is_empty());
    assert!(calls
        .iter()
        .filter(|call| !call.url.contains("/p/comment?"))
        .all(|call| call.url.contains("see_lz=1")));
}

#[tokio::test]
async fn test_malformed_posts_skipped_and_counted() {
    let harness = Harness::new();
    harness.page(
        1,
        thread_page(Some("Skip"), 1, &[post("1", "ok"), malformed_post("2"), post("3", "ok")]),
        0,
    );

    let document = harness
        .coordinator(10)
        .crawl(TID, None, ScopeFilter::All)
        .await
        .unwrap();

    assert_eq!(pids(&document.pages[0]), vec!["1", "3"]);
    assert_eq!(document.pages[0].skipped, 1);
}

#[tokio::test]
async fn test_credentials_sent_with_every_thread_fetch() {
    let harness = Harness::new();
    harness.page_with_comments(
        1,
        thread_page(Some("Creds"), 1, &[post("100", "x")]),
        comment_index(&[("100", 15, bodies("c", 0..10))]),
        0,
    );
    harness.comment_sub_page("100", 1, Scripted::ok(comment_page(&bodies("c", 10..15))));

    harness
        .coordinator(10)
        .crawl(TID, None, ScopeFilter::All)
        .await
        .unwrap();

    let calls = harness.fetcher.calls();
    assert_eq!(calls.len(), 3);
    assert!(calls.iter().all(|call| call.with_credentials));
}

#[tokio::test]
async fn test_forum_listing_picks_non_pinned_thread() {
    let harness = Harness::new();
    let url = harness.endpoints.forum_page("rust", 1);
    harness.fetcher.script(
        &url,
        Scripted::ok(forum_page(&[
            (1, "Forum rules", true),
            (TID, "Archive me", false),
            (3, "Other", false),
        ])),
    );

    let threads = list_forum(&harness.context(10), "rust", 1).await.unwrap();

    assert_eq!(threads.len(), 2);
    assert_eq!(threads[0].title, "Archive me");
    assert_eq!(threads[0].summary, "summary of Archive me");
    assert_eq!(select_thread(&threads, "0"), Some(TID));
    let calls = harness.fetcher.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].url.contains("/f?kw=rust&pn=50"));
    assert!(calls[0].with_credentials);
}

#[tokio::test]
async fn test_forum_listing_challenge_is_reported() {
    let harness = Harness::new();
    harness.fetcher.script(
        &harness.endpoints.forum_page("rust", 0),
        Scripted::fail(FetchErrorKind::SecurityChallenge),
    );

    let err = list_forum(&harness.context(10), "rust", 0).await.unwrap_err();

    assert!(err.is_security_challenge());
    assert!(matches!(err, CrawlError::Forum { page: 0, .. }));
}

/// Log sink shared between the subscriber and the test
#[derive(Clone, Default)]
struct CapturedLog(Arc<Mutex<Vec<u8>>>);

impl CapturedLog {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for CapturedLog {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn test_progress_logged_for_every_page() {
    let log = CapturedLog::default();
    let writer = log.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let harness = Harness::new();
    for page in 1..=2 {
        harness.page(page, thread_page(Some("Progress"), 2, &[post(&page.to_string(), "x")]), 0);
    }

    harness
        .coordinator(10)
        .crawl(TID, None, ScopeFilter::All)
        .await
        .unwrap();

    let text = log.text();
    for page in 1..=2 {
        assert!(text.contains(&format!("Page {} started", page)), "{text}");
        assert!(text.contains(&format!("Page {} finished", page)), "{text}");
    }
}
