//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end.

use depthcrawl::config::Config;
use depthcrawl::storage::{decode_links, SqliteStorage, Storage};
use depthcrawl::{run_crawl, CrawlError};
use std::path::Path;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration crawling `seed` into `db_path`
fn create_test_config(seed: &str, max_depth: u32, db_path: &Path) -> Config {
    let mut config = Config::default();
    config.crawler.seed_url = seed.to_string();
    config.crawler.max_depth = max_depth;
    config.crawler.workers = 4;
    config.crawler.queue_capacity = 4;
    config.render.user_agent = "TestBot/1.0".to_string();
    config.render.timeout_secs = 5;
    config.output.database_path = db_path.to_string_lossy().into_owned();
    config
}

fn html_page(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.as_bytes().to_vec(), "text/html")
}

async fn mount_page(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(html_page(body))
        .mount(server)
        .await;
}

/// Home links to page1 and page2; page1 links back home and on to page3
async fn mount_small_site(server: &MockServer) {
    mount_page(
        server,
        "/",
        r##"<html><head><title>Home</title></head><body>
            <a href="/page1">Page 1</a>
            <a href="/page2">Page 2</a>
            <a href="mailto:admin@example.com">Mail</a>
            <a href="#top">Top</a>
        </body></html>"##,
    )
    .await;
    mount_page(
        server,
        "/page1",
        r#"<html><head><title>Page 1</title></head><body>
            <a href="/">Home</a>
            <a href="page3">Page 3</a>
        </body></html>"#,
    )
    .await;
    mount_page(
        server,
        "/page2",
        "<html><head><title>Page 2</title></head><body></body></html>",
    )
    .await;
    mount_page(
        server,
        "/page3",
        "<html><head><title>Page 3</title></head><body></body></html>",
    )
    .await;
}

#[tokio::test]
async fn test_full_crawl_single_domain() {
    let server = MockServer::start().await;
    mount_small_site(&server).await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("crawl.db");
    let seed = format!("{}/", server.uri());

    let summary = run_crawl(create_test_config(&seed, 2, &db_path))
        .await
        .unwrap();

    assert!(!summary.resumed);
    assert_eq!(summary.pages_fetched, 4);
    assert_eq!(summary.fetch_failures, 0);
    assert_eq!(summary.records_written, 4);

    let storage = SqliteStorage::new(&db_path).unwrap();
    assert_eq!(storage.count_pages().unwrap(), 4);

    let home = storage.get_page_by_url(&seed).unwrap().unwrap();
    assert_eq!(home.depth, 0);
    assert_eq!(home.title, "Home");
    // mailto and fragment-only links are never recorded
    assert_eq!(
        decode_links(&home.links),
        vec![
            format!("{}/page1", server.uri()),
            format!("{}/page2", server.uri()),
        ]
    );

    let page3 = storage
        .get_page_by_url(&format!("{}/page3", server.uri()))
        .unwrap()
        .unwrap();
    assert_eq!(page3.depth, 2);
    assert_eq!(page3.title, "Page 3");
}

#[tokio::test]
async fn test_crawl_with_depth_limit() {
    let server = MockServer::start().await;
    mount_small_site(&server).await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("crawl.db");
    let seed = format!("{}/", server.uri());

    run_crawl(create_test_config(&seed, 1, &db_path))
        .await
        .unwrap();

    let storage = SqliteStorage::new(&db_path).unwrap();
    assert_eq!(storage.count_pages().unwrap(), 3);
    assert!(storage
        .get_page_by_url(&format!("{}/page3", server.uri()))
        .unwrap()
        .is_none());

    // Only one request per page, even with the back-link to home
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 3);
}

#[tokio::test]
async fn test_depth_zero_fetches_seed_only() {
    let server = MockServer::start().await;
    mount_small_site(&server).await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("crawl.db");
    let seed = format!("{}/", server.uri());

    run_crawl(create_test_config(&seed, 0, &db_path))
        .await
        .unwrap();

    let storage = SqliteStorage::new(&db_path).unwrap();
    assert_eq!(storage.count_pages().unwrap(), 1);
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_resume_performs_no_fetches() {
    let server = MockServer::start().await;
    mount_small_site(&server).await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("crawl.db");
    let seed = format!("{}/", server.uri());
    let config = create_test_config(&seed, 2, &db_path);

    run_crawl(config.clone()).await.unwrap();
    let first_run_requests = server.received_requests().await.unwrap().len();

    let summary = run_crawl(config).await.unwrap();

    assert!(summary.resumed);
    assert_eq!(summary.rehydrated, 4);
    assert_eq!(summary.pages_fetched, 0);
    assert_eq!(
        server.received_requests().await.unwrap().len(),
        first_run_requests
    );
}

#[tokio::test]
async fn test_failed_pages_are_skipped() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        r#"<a href="/missing">Missing</a><a href="/broken">Broken</a><a href="/ok">Ok</a>"#,
    )
    .await;
    mount_page(&server, "/ok", "<title>Ok</title>").await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("crawl.db");
    let seed = format!("{}/", server.uri());

    let summary = run_crawl(create_test_config(&seed, 1, &db_path))
        .await
        .unwrap();

    assert_eq!(summary.pages_fetched, 2);
    assert_eq!(summary.fetch_failures, 2);

    let storage = SqliteStorage::new(&db_path).unwrap();
    assert_eq!(storage.count_pages().unwrap(), 2);
}

#[tokio::test]
async fn test_seed_timeout_stores_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page("<title>Slow</title>").set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("crawl.db");
    let seed = format!("{}/", server.uri());

    let mut config = create_test_config(&seed, 2, &db_path);
    config.render.timeout_secs = 1;

    let summary = run_crawl(config).await.unwrap();

    assert_eq!(summary.fetch_failures, 1);
    assert_eq!(summary.pages_fetched, 0);

    let storage = SqliteStorage::new(&db_path).unwrap();
    assert_eq!(storage.count_pages().unwrap(), 0);
}

#[tokio::test]
async fn test_content_type_handling() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        r#"<a href="/report.pdf">Report</a><a href="/about">About</a>"#,
    )
    .await;
    mount_page(&server, "/about", "<title>About</title>").await;
    Mock::given(method("GET"))
        .and(path("/report.pdf"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(b"%PDF-1.4".to_vec(), "application/pdf"),
        )
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("crawl.db");
    let seed = format!("{}/", server.uri());

    run_crawl(create_test_config(&seed, 1, &db_path))
        .await
        .unwrap();

    let storage = SqliteStorage::new(&db_path).unwrap();
    assert_eq!(storage.count_pages().unwrap(), 2);
    assert!(storage
        .get_page_by_url(&format!("{}/report.pdf", server.uri()))
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_links_resolved_against_redirect_target() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(301).insert_header("location", "/docs/index.html"),
        )
        .mount(&server)
        .await;
    mount_page(&server, "/docs/index.html", r#"<a href="guide.html">Guide</a>"#).await;
    mount_page(&server, "/docs/guide.html", "<title>Guide</title>").await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("crawl.db");
    let seed = format!("{}/", server.uri());

    run_crawl(create_test_config(&seed, 1, &db_path))
        .await
        .unwrap();

    let storage = SqliteStorage::new(&db_path).unwrap();

    // Stored under the URL that was dispatched
    let home = storage.get_page_by_url(&seed).unwrap().unwrap();
    assert_eq!(
        decode_links(&home.links),
        vec![format!("{}/docs/guide.html", server.uri())]
    );
    assert!(storage
        .get_page_by_url(&format!("{}/docs/guide.html", server.uri()))
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_unwritable_database_is_fatal() {
    let server = MockServer::start().await;
    mount_small_site(&server).await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("no-such-dir").join("crawl.db");
    let seed = format!("{}/", server.uri());

    let result = run_crawl(create_test_config(&seed, 1, &db_path)).await;

    assert!(matches!(result, Err(CrawlError::Storage(_))));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_invalid_seed_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("crawl.db");

    let result = run_crawl(create_test_config("not a url", 1, &db_path)).await;

    assert!(matches!(result, Err(CrawlError::Config(_))));
    assert!(!db_path.exists());
}
