//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and tempfile for
//! local trees, and run the full fetch, decode and follow cycle end-to-end.

use std::time::Duration;
use sumi_trawl::config::{Config, CrawlerConfig, ProtocolConfig, UserAgentConfig};
use sumi_trawl::crawler::run_crawl;
use sumi_trawl::decode::DecoderKind;
use sumi_trawl::output::{drain, CrawlStatistics};
use sumi_trawl::proto::ProtoError;
use sumi_trawl::{CrawlError, Crawler, Document, DocumentKind};
use tempfile::TempDir;
use tokio::io::AsyncReadExt;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const HOME: &str = r#"<html>
<head><title>  Home  </title><meta name="description" content="The front page"></head>
<body>
  <header><a href="/">Home</a></header>
  <main>
    <h1>Welcome</h1>
    <p>This is the front page of a small test site with enough words to matter.</p>
    <a href="/about">About us</a>
    <a href="/missing">Gone</a>
  </main>
  <footer>Copyright</footer>
</body>
</html>"#;

const ABOUT: &str = r#"<html>
<body>
  <div>
    <h1>About</h1>
    <p>We crawl things.</p>
    <a href="/">Back home</a>
  </div>
</body>
</html>"#;

const NOT_FOUND: &str = r#"<html>
<head><title>Not Found</title></head>
<body><p>Nothing here. Try the <a href="/hidden">archive</a>.</p></body>
</html>"#;

fn html(body: &str) -> ResponseTemplate {
    html_with_status(200, body)
}

fn html_with_status(status: u16, body: &str) -> ResponseTemplate {
    ResponseTemplate::new(status)
        .insert_header("content-type", "text/html; charset=utf-8")
        .set_body_bytes(body.as_bytes().to_vec())
}

/// Creates a test configuration that only speaks HTTP
fn create_test_config(seeds: Vec<String>) -> Config {
    Config {
        crawler: CrawlerConfig {
            workers: 2,
            ..CrawlerConfig::default()
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: Some("https://example.com/contact".to_string()),
            contact_email: None,
        },
        protocols: ProtocolConfig {
            timeout_ms: 5000,
            enabled: vec!["http".to_string()],
        },
        seeds,
        ..Config::default()
    }
}

async fn mount_site(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(HOME))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/about"))
        .respond_with(html(ABOUT))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(html_with_status(404, NOT_FOUND))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/hidden"))
        .respond_with(html(ABOUT))
        .mount(server)
        .await;
}

/// Crawls from `seed` until idle, returning documents sorted by location
async fn crawl(config: &Config, seed: &str) -> (Vec<Document>, CrawlStatistics) {
    let (crawler, mut output) = Crawler::new(config.settings().unwrap());
    let errors = crawler.errors();
    crawler.emit([seed]);
    let workers = crawler.run(config.crawler.workers);

    let mut sink: Vec<Document> = Vec::new();
    let mut stats = CrawlStatistics::new();
    tokio::time::timeout(
        Duration::from_secs(20),
        drain(&crawler, &mut output, errors, &mut sink, &mut stats, None),
    )
    .await
    .expect("crawl did not go idle")
    .unwrap();

    output.close();
    crawler.close();
    workers.join().await;

    sink.sort_by(|a, b| a.location.as_str().cmp(b.location.as_str()));
    (sink, stats)
}

#[tokio::test]
async fn test_http_crawl_follows_links() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    let seed = format!("{}/", server.uri());

    let (documents, stats) = crawl(&create_test_config(vec![]), &seed).await;

    // `/`, `/about`, `/hidden` (only linked from the 404 page), `/missing`
    assert_eq!(documents.len(), 4);
    let home = &documents[0];
    assert_eq!(home.location.as_str(), seed);
    assert_eq!(home.content_type, "text/html");
    assert_eq!(home.status, Some(200));
    assert_eq!(home.title.as_deref(), Some("Home"));
    assert_eq!(home.description.as_deref(), Some("The front page"));
    assert!(home.content.contains("front page of a small test site"));
    assert!(!home.content.contains("Copyright"));
    assert_eq!(home.links, vec!["/", "/about", "/missing"]);

    let about = &documents[1];
    assert_eq!(about.location.as_str(), format!("{}/about", server.uri()));
    assert_eq!(about.title.as_deref(), Some("About"));

    let missing = &documents[3];
    assert_eq!(missing.status, Some(404));
    assert_eq!(missing.title.as_deref(), Some("Not Found"));

    assert_eq!(stats.documents, 4);
    assert_eq!(stats.errors, 0);
}

#[tokio::test]
async fn test_error_status_page_is_decoded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(html_with_status(
            404,
            "<html><head><title>Not Found</title></head><body><a href='/home'>home</a></body></html>",
        ))
        .mount(&server)
        .await;

    let (crawler, _output) = Crawler::new(create_test_config(vec![]).settings().unwrap());
    let document = crawler
        .crawl_one(&format!("{}/gone", server.uri()))
        .await
        .unwrap();

    assert_eq!(document.status, Some(404));
    assert_eq!(document.kind, DocumentKind::File);
    assert_eq!(document.title.as_deref(), Some("Not Found"));
    assert_eq!(document.links, vec!["/home"]);
}

#[tokio::test]
async fn test_server_error_keeps_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/busy"))
        .respond_with(
            ResponseTemplate::new(503)
                .insert_header("content-type", "text/plain")
                .set_body_bytes(b"try later".to_vec()),
        )
        .mount(&server)
        .await;

    let (crawler, _output) = Crawler::new(create_test_config(vec![]).settings().unwrap());
    let fetched = crawler
        .fetch(&format!("{}/busy", server.uri()))
        .await
        .unwrap();

    assert_eq!(fetched.document.status, Some(503));
    assert_eq!(fetched.document.content_type, "text/plain");

    let mut body = String::new();
    fetched.body.unwrap().read_to_string(&mut body).await.unwrap();
    assert_eq!(body, "try later");
}

#[tokio::test]
async fn test_requests_carry_user_agent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .and(header(
            "user-agent",
            "TestBot/1.0.0 (+https://example.com/contact)",
        ))
        .respond_with(html(ABOUT))
        .expect(1)
        .mount(&server)
        .await;

    let (crawler, _output) = Crawler::new(create_test_config(vec![]).settings().unwrap());
    let document = crawler
        .crawl_one(&format!("{}/", server.uri()))
        .await
        .unwrap();

    assert_eq!(document.title.as_deref(), Some("About"));
}

#[tokio::test]
async fn test_invalid_media_type_keeps_partial_result() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/odd"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "garbage")
                .set_body_bytes(b"raw bytes".to_vec()),
        )
        .mount(&server)
        .await;

    let (crawler, _output) = Crawler::new(create_test_config(vec![]).settings().unwrap());
    let err = crawler
        .crawl_one(&format!("{}/odd", server.uri()))
        .await
        .unwrap_err();

    match err {
        CrawlError::Protocol(ProtoError::MediaType { value, partial }) => {
            assert_eq!(value, "garbage");
            assert_eq!(partial.document.kind, DocumentKind::File);
            assert!(partial.body.is_some());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_disabled_scheme_is_config_error() {
    let (crawler, _output) = Crawler::new(create_test_config(vec![]).settings().unwrap());
    let err = crawler.crawl_one("file:///etc/hostname").await.unwrap_err();

    assert!(matches!(
        err,
        CrawlError::Protocol(ProtoError::UnknownScheme(ref scheme)) if scheme == "file"
    ));
    assert!(err.is_config());
}

#[tokio::test]
async fn test_run_crawl_from_config() {
    let server = MockServer::start().await;
    mount_site(&server).await;

    let config = create_test_config(vec![format!("{}/", server.uri())]);
    let mut sink: Vec<Document> = Vec::new();
    let stats = run_crawl(&config, &mut sink, None).await.unwrap();

    assert_eq!(sink.len(), 4);
    assert_eq!(stats.documents, 4);
    assert_eq!(stats.by_content_type.get("text/html"), Some(&4));
    assert_eq!(stats.errors, 0);
}

#[tokio::test]
async fn test_run_crawl_respects_limit() {
    let server = MockServer::start().await;
    mount_site(&server).await;

    let config = create_test_config(vec![format!("{}/", server.uri())]);
    let mut sink: Vec<Document> = Vec::new();
    let stats = run_crawl(&config, &mut sink, Some(1)).await.unwrap();

    assert_eq!(sink.len(), 1);
    assert_eq!(stats.documents, 1);
}

#[tokio::test]
async fn test_file_tree_with_decoder_override() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir(dir.path().join("docs")).unwrap();
    std::fs::write(
        dir.path().join("docs").join("index.html"),
        "<html><body><div><h1>Local</h1><p>Local file text</p></div></body></html>",
    )
    .unwrap();

    let seed = url::Url::from_file_path(dir.path()).unwrap().to_string();
    let mut config = Config {
        seeds: vec![seed],
        ..Config::default()
    };
    config.protocols.enabled = vec!["file".to_string()];
    config
        .decoders
        .insert("application/octet-stream".to_string(), DecoderKind::Html);

    let mut sink: Vec<Document> = Vec::new();
    let stats = run_crawl(&config, &mut sink, None).await.unwrap();

    // root/, docs/, docs/index.html
    assert_eq!(sink.len(), 3);
    assert_eq!(stats.by_kind.get(&DocumentKind::Directory), Some(&2));

    let page = sink
        .iter()
        .find(|d| d.location.path().ends_with("index.html"))
        .unwrap();
    assert_eq!(page.title.as_deref(), Some("Local"));
    assert!(page.content.ends_with("Local file text"));
}
