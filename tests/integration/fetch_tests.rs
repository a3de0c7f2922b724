use tieba_mirror::config::{Config, Credentials, FetcherConfig};
use tieba_mirror::crawler::{CrawlCoordinator, ScopeFilter};
use tieba_mirror::fetch::{FetchErrorKind, Fetcher, HttpFetcher};
use url::Url;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const HTML: &str = "text/html; charset=utf-8";

fn fetcher() -> HttpFetcher {
    HttpFetcher::new(&FetcherConfig::default()).expect("Failed to build fetcher")
}

fn url(server: &MockServer, path: &str) -> Url {
    Url::parse(&format!("{}{}", server.uri(), path)).expect("Failed to parse URL")
}

#[tokio::test]
async fn test_fetch_returns_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/p/1"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<html>ok</html>", HTML))
        .mount(&server)
        .await;

    let body = fetcher().fetch(&url(&server, "/p/1"), None).await.unwrap();
    assert_eq!(body, b"<html>ok</html>");
}

#[tokio::test]
async fn test_fetch_sends_cookie_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/p/1"))
        .and(header("cookie", "BDUSS=abc; STOKEN=def"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("secret", "text/plain"))
        .mount(&server)
        .await;

    let credentials = Credentials::from_pairs([("STOKEN", "def"), ("BDUSS", "abc")]);
    let body = fetcher()
        .fetch(&url(&server, "/p/1"), Some(&credentials))
        .await
        .unwrap();
    assert_eq!(body, b"secret");

    // Without the cookie the mock does not match and the server answers 404
    let err = fetcher().fetch(&url(&server, "/p/1"), None).await.unwrap_err();
    assert_eq!(err.kind(), FetchErrorKind::NotFound);
}

#[tokio::test]
async fn test_fetch_classifies_statuses() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let missing = fetcher().fetch(&url(&server, "/missing"), None).await.unwrap_err();
    assert_eq!(missing.kind(), FetchErrorKind::NotFound);

    let broken = fetcher().fetch(&url(&server, "/broken"), None).await.unwrap_err();
    assert_eq!(broken.kind(), FetchErrorKind::Network);
    assert!(broken.to_string().contains("HTTP 500"));
}

#[tokio::test]
async fn test_fetch_detects_security_challenge() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/p/1"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            "<html><head><title>百度安全验证</title></head><body>verify</body></html>",
            HTML,
        ))
        .mount(&server)
        .await;

    let err = fetcher().fetch(&url(&server, "/p/1"), None).await.unwrap_err();
    assert_eq!(err.kind(), FetchErrorKind::SecurityChallenge);
}

#[tokio::test]
async fn test_connection_refused_is_network_error() {
    let server = MockServer::start().await;
    let dead = url(&server, "/p/1");
    drop(server);

    let err = fetcher().fetch(&dead, None).await.unwrap_err();
    assert_eq!(err.kind(), FetchErrorKind::Network);
}

#[tokio::test]
async fn test_crawl_over_http() {
    let server = MockServer::start().await;

    let page = r#"<html><head><title>t</title></head><body>
        <h3 class="core_title_txt">Over HTTP</h3>
        <ul><li class="l_reply_num"><span>1</span>回复贴，共<span>1</span>页</li></ul>
        <div class="l_post l_post_bright j_l_post" data-pid="55">
            <ul class="p_author"><li class="d_name"><a>poster</a></li></ul>
            <div class="d_post_content j_d_post_content">body text</div>
            <div class="post-tail-wrap"><span class="tail-info">1楼</span><span class="tail-info">2024-06-01 08:00</span></div>
        </div>
    </body></html>"#;
    let index = r#"{"errno":0,"data":{"comment_list":{"55":{"comment_num":1,"comment_info":[
        {"show_nickname":"friend","user_id":9,"content":"welcome","now_time":1717200000}
    ]}},"user_list":{}}}"#;

    Mock::given(method("GET"))
        .and(path("/p/123"))
        .and(query_param("pn", "1"))
        .and(query_param("see_lz", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(page, HTML))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/p/totalComment"))
        .and(query_param("tid", "123"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(index, "application/json"))
        .mount(&server)
        .await;

    let mut config = Config::default();
    config.fetcher.base_url = server.uri();

    let document = CrawlCoordinator::from_config(&config, Credentials::anonymous())
        .unwrap()
        .crawl(123, None, ScopeFilter::All)
        .await
        .unwrap();

    assert_eq!(document.title, "Over HTTP");
    assert_eq!(document.post_count(), 1);

    let post = &document.pages[0].posts[0];
    assert_eq!(post.pid, "55");
    assert_eq!(post.floor, Some(1));
    assert_eq!(post.body, "body text");
    assert_eq!(post.comments.len(), 1);
    assert_eq!(post.comments[0].body, "welcome");
    assert_eq!(post.comments[0].avatar, None);
}
