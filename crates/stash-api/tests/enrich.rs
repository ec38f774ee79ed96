mod common;

use std::time::Duration;

use httpmock::Method::GET;
use httpmock::MockServer;
use regex::Regex;
use url::Url;

use stash_api::enrich::{
    Enricher, EnricherConfig, FALLBACK_SUMMARY, RATE_LIMITED_SUMMARY, REJECTED_URL_SUMMARY,
    TIMED_OUT_SUMMARY,
};

use common::TestApp;

const ARTICLE: &str = r#"<!doctype html>
<html>
  <head>
    <meta property="og:title" content="Ignored OG title">
    <title>Ownership in Practice</title>
    <link rel="icon" href="/assets/icon.png">
  </head>
  <body><p>Borrowing rules.</p></body>
</html>"#;

fn enricher_for(summarizer: &MockServer, summary_timeout: Duration) -> Enricher {
    Enricher::new(EnricherConfig {
        summarizer_url: format!("{}/", summarizer.base_url()),
        page_timeout: Duration::from_secs(5),
        summary_timeout,
    })
    .unwrap()
}

#[tokio::test]
async fn scrape_and_summary_fill_the_link() {
    let site = MockServer::start_async().await;
    let summarizer = MockServer::start_async().await;

    let page_mock = site
        .mock_async(|when, then| {
            when.method(GET).path("/article");
            then.status(200)
                .header("content-type", "text/html; charset=utf-8")
                .body(ARTICLE);
        })
        .await;
    let summary_mock = summarizer
        .mock_async(|when, then| {
            when.method(GET);
            then.status(200).body("A short tour of ownership.\n");
        })
        .await;

    let app = TestApp::new(enricher_for(&summarizer, Duration::from_secs(5)));
    let token = app.login_new_user("a@example.com").await;
    let url = site.url("/article");
    let link = app.create_link(&token, &url, &["rust"]).await;

    assert_eq!(link["title"], "Ownership in Practice");
    assert_eq!(link["favicon"], format!("{}/assets/icon.png", site.base_url()));
    assert_eq!(link["summary"], "A short tour of ownership.");
    assert_eq!(link["url"], url);

    page_mock.assert_async().await;
    summary_mock.assert_async().await;
}

#[tokio::test]
async fn failed_page_fetch_keeps_summary() {
    let site = MockServer::start_async().await;
    let summarizer = MockServer::start_async().await;
    site.mock_async(|when, then| {
        when.method(GET);
        then.status(500).body("<title>Error page</title>");
    })
    .await;
    summarizer
        .mock_async(|when, then| {
            when.method(GET);
            then.status(200).body("still summarized");
        })
        .await;

    let enricher = enricher_for(&summarizer, Duration::from_secs(5));
    let url = Url::parse(&site.url("/missing")).unwrap();
    let enrichment = enricher.enrich(url.as_str(), &url).await;

    assert_eq!(Some(enrichment.title.as_str()), url.host_str());
    assert_eq!(enrichment.favicon, format!("{}/favicon.ico", site.base_url()));
    assert_eq!(enrichment.summary, "still summarized");
}

#[tokio::test]
async fn long_summaries_are_truncated() {
    let summarizer = MockServer::start_async().await;
    summarizer
        .mock_async(|when, then| {
            when.method(GET);
            then.status(200).body("x".repeat(800));
        })
        .await;

    let enricher = enricher_for(&summarizer, Duration::from_secs(5));
    let summary = enricher
        .summarize("https://example.com/long")
        .await;
    assert_eq!(summary.len(), 503);
    assert!(summary.ends_with("x..."));
}

#[tokio::test]
async fn summarizer_status_codes_pick_fallback_text() {
    let cases = [
        (429, RATE_LIMITED_SUMMARY.to_string()),
        (400, REJECTED_URL_SUMMARY.to_string()),
        (503, "Summary API error: 503 - Service Unavailable".to_string()),
    ];

    for (code, expected) in cases {
        let summarizer = MockServer::start_async().await;
        summarizer
            .mock_async(|when, then| {
                when.method(GET);
                then.status(code).body("nope");
            })
            .await;

        let enricher = enricher_for(&summarizer, Duration::from_secs(5));
        let summary = enricher
            .summarize("https://example.com")
            .await;
        assert_eq!(summary, expected, "status {code}");
    }
}

#[tokio::test]
async fn slow_summarizer_times_out() {
    let summarizer = MockServer::start_async().await;
    summarizer
        .mock_async(|when, then| {
            when.method(GET);
            then.status(200)
                .body("too late")
                .delay(Duration::from_secs(3));
        })
        .await;

    let enricher = enricher_for(&summarizer, Duration::from_millis(200));
    let summary = enricher
        .summarize("https://example.com")
        .await;
    assert_eq!(summary, TIMED_OUT_SUMMARY);
}

#[tokio::test]
async fn unreachable_summarizer_uses_generic_fallback() {
    let enricher = common::offline_enricher();
    let summary = enricher
        .summarize("http://example.com")
        .await;
    assert_eq!(summary, FALLBACK_SUMMARY);
}

#[tokio::test]
async fn summarizer_receives_the_url_as_submitted() {
    let summarizer = MockServer::start_async().await;
    let exact = summarizer
        .mock_async(|when, then| {
            when.method(GET).path("/http://example.com");
            then.status(200).body("as typed");
        })
        .await;

    let enricher = enricher_for(&summarizer, Duration::from_secs(5));
    assert_eq!(enricher.summarize("http://example.com").await, "as typed");
    exact.assert_async().await;
}

#[tokio::test]
async fn created_link_is_summarized_without_a_trailing_slash() {
    let site = MockServer::start_async().await;
    let summarizer = MockServer::start_async().await;
    site.mock_async(|when, then| {
        when.method(GET);
        then.status(200).body(ARTICLE);
    })
    .await;
    let summary_mock = summarizer
        .mock_async(|when, then| {
            when.method(GET)
                .path_matches(Regex::new(r"^/http://127\.0\.0\.1(%3A|:)[0-9]+$").unwrap());
            then.status(200).body("root page");
        })
        .await;

    let app = TestApp::new(enricher_for(&summarizer, Duration::from_secs(5)));
    let token = app.login_new_user("a@example.com").await;
    let url = site.base_url();
    assert!(!url.ends_with('/'));
    let link = app.create_link(&token, &url, &[]).await;

    summary_mock.assert_async().await;
    assert_eq!(link["summary"], "root page");
    assert_eq!(link["url"], url);
}
