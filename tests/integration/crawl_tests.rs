//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end, from HTTP fetch to SQLite rows.

use std::collections::HashMap;
use std::path::Path;
use tempfile::TempDir;
use webstack_census::config::{
    Bound, Config, CrawlerConfig, FetcherConfig, InputConfig, OutputConfig,
};
use webstack_census::crawler::crawl;
use webstack_census::storage::{open_database, Database};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration crawling internal links to `depth`
fn create_test_config(seeds: Vec<String>, db_path: &Path, depth: u32) -> Config {
    Config {
        crawler: CrawlerConfig {
            depth: Bound::Limited(depth),
            breadth: Bound::Unbounded,
            follow_external: false,
            follow_internal: true,
            concurrency: 2,
        },
        fetcher: FetcherConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            timeout_secs: 5,
        },
        input: InputConfig {
            seeds,
            ..Default::default()
        },
        output: OutputConfig {
            database_path: db_path.display().to_string(),
            lock_timeout_ms: 5_000,
        },
    }
}

async fn mount_html(server: &MockServer, page: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(page))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/html"))
        .mount(server)
        .await;
}

/// Mounts a three-page site: an index linking to two pages and one external site
async fn mount_site(server: &MockServer) {
    let base_url = server.uri();

    mount_html(
        server,
        "/",
        format!(
            r#"<html><head><title>Home</title>
            <script src="/static/jquery.min.js?v=3.2.1"></script>
            </head><body>
            <a href="{0}/page1">Page 1</a>
            <a href="/page2">Page 2</a>
            <a href="https://other.example/elsewhere">Elsewhere</a>
            </body></html>"#,
            base_url
        ),
    )
    .await;

    mount_html(
        server,
        "/page1",
        r#"<html><head>
            <meta name="generator" content="Hugo 0.120.4">
            <script src="/static/jquery.min.js?v=3.2.1"></script>
            </head><body><a href="/">Home</a></body></html>"#
            .to_string(),
    )
    .await;

    mount_html(
        server,
        "/page2",
        r#"<html><body>
            <img src="/p?id=1" width="1" height="1">
            <a href="/missing">Gone</a>
            </body></html>"#
            .to_string(),
    )
    .await;
}

async fn table_counts(db: &Database) -> HashMap<&'static str, i64> {
    let session = db.session().await.expect("Failed to acquire session");
    session
        .table_counts()
        .expect("Failed to count rows")
        .into_iter()
        .collect()
}

#[tokio::test]
async fn test_full_crawl_single_site() {
    let mock_server = MockServer::start().await;
    mount_site(&mock_server).await;

    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("census.db");
    let seeds = vec![format!("{}/", mock_server.uri())];
    let config = create_test_config(seeds.clone(), &db_path, 1);

    let db = open_database(&db_path, config.output.lock_timeout_ms).expect("Failed to open DB");
    let report = crawl(&config, &seeds, db.clone())
        .await
        .expect("Crawl failed");

    // Index, page1 and page2; the external link is filtered out
    assert_eq!(report.visited, 3);
    assert_eq!(report.stored, 3);
    assert_eq!(report.failed, 0);
    assert_eq!(report.waves, 1);

    let counts = table_counts(&db).await;
    assert_eq!(counts["website"], 3);
    // Same script on two pages: one library, two relations
    assert_eq!(counts["library"], 1);
    assert_eq!(counts["contains_library"], 2);
    assert_eq!(counts["framework"], 1);
    assert_eq!(counts["src_language"], 1);

    let session = db.session().await.unwrap();
    let (root, pixel): (String, Option<String>) = session
        .conn()
        .query_row(
            "SELECT w.root, a.tracking_pixel FROM website w
             JOIN ad_tracking a ON a.website_id = w.website_id
             WHERE w.url LIKE '%/page2'",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .expect("page2 should be stored");
    assert_eq!(root, seeds[0]);
    assert_eq!(pixel, Some(format!("{}/p?id=1", mock_server.uri())));
}

#[tokio::test]
async fn test_recrawl_is_idempotent() {
    let mock_server = MockServer::start().await;
    mount_site(&mock_server).await;

    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("census.db");
    let seeds = vec![format!("{}/", mock_server.uri())];
    let config = create_test_config(seeds.clone(), &db_path, 1);

    let db = open_database(&db_path, config.output.lock_timeout_ms).unwrap();
    crawl(&config, &seeds, db.clone()).await.unwrap();
    let first = table_counts(&db).await;

    // A fresh handle on the same file, as a second run would have
    let db = open_database(&db_path, config.output.lock_timeout_ms).unwrap();
    let report = crawl(&config, &seeds, db.clone()).await.unwrap();
    let second = table_counts(&db).await;

    assert_eq!(report.visited, 0);
    assert_eq!(report.skipped, 1);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_broken_links_do_not_abort_crawl() {
    let mock_server = MockServer::start().await;
    mount_site(&mock_server).await;

    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("census.db");
    let seeds = vec![format!("{}/page2", mock_server.uri())];
    let config = create_test_config(seeds.clone(), &db_path, 3);

    let db = open_database(&db_path, config.output.lock_timeout_ms).unwrap();
    let report = crawl(&config, &seeds, db.clone()).await.unwrap();

    // page2 is stored, /missing answers 404 and yields nothing further
    assert_eq!(report.visited, 1);
    assert_eq!(report.failed, 1);

    let counts = table_counts(&db).await;
    assert_eq!(counts["website"], 1);
    assert_eq!(counts["hyperlink"], 1);
}
