//! Page fetching
//!
//! This module defines the [`PageFetcher`] seam the coordinator loads pages
//! through, and [`HttpFetcher`], its reqwest-backed implementation:
//! - Building HTTP clients with proper user agent strings
//! - GET requests to fetch page content
//! - Error classification
//! - Outgoing hyperlink discovery on loaded pages

use crate::config::FetcherConfig;
use crate::crawler::extractor::extract_hyperlinks;
use crate::ingest::HyperlinkFact;
use crate::url::parse_crawlable;
use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, SET_COOKIE};
use reqwest::{redirect::Policy, Client};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Errors that abort a page visit
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Invalid URL {0}")]
    InvalidUrl(String),

    #[error("HTTP status {status} for {url}")]
    Http { url: String, status: u16 },

    #[error("Not an HTML page ({content_type}): {url}")]
    ContentMismatch { url: String, content_type: String },

    #[error("Request timeout for {0}")]
    Timeout(String),

    #[error("Network error for {url}: {error}")]
    Network { url: String, error: String },
}

/// A loaded page
#[derive(Debug, Clone)]
pub struct PageHandle {
    /// Url the page was requested under
    pub url: String,
    /// Url after redirects; relative links resolve against it
    pub final_url: Url,
    pub body: String,
    /// Raw `Set-Cookie` values sent with the page
    pub cookies: Vec<String>,
}

/// Loads pages for the coordinator
///
/// Every handle returned by [`PageFetcher::load`] is passed back to
/// [`PageFetcher::release`] exactly once, whether the visit succeeded or not.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Loads the page at `url`
    async fn load(&self, url: &str) -> Result<PageHandle, FetchError>;

    /// Absolute http(s) hyperlinks found on the page, with their anchor text
    fn outgoing_links(&self, page: &PageHandle) -> Vec<HyperlinkFact>;

    /// Gives back a handle once the visit is over
    async fn release(&self, page: PageHandle) {
        drop(page);
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The fetcher configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &FetcherConfig) -> Result<Client, reqwest::Error> {
    // Format: CrawlerName/Version
    let user_agent = format!("{}/{}", config.crawler_name, config.crawler_version);

    Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// [`PageFetcher`] over plain HTTP(S)
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &FetcherConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config)?,
        })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn load(&self, url: &str) -> Result<PageHandle, FetchError> {
        let parsed = parse_crawlable(url)
            .map_err(|e| FetchError::InvalidUrl(format!("{}: {}", url, e)))?;

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| classify(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        if !content_type.contains("text/html") {
            return Err(FetchError::ContentMismatch {
                url: url.to_string(),
                content_type,
            });
        }

        let final_url = response.url().clone();
        let cookies = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(str::to_string)
            .collect();

        let body = response.text().await.map_err(|e| classify(url, e))?;

        tracing::trace!("Loaded {} ({} bytes)", final_url, body.len());

        Ok(PageHandle {
            url: url.to_string(),
            final_url,
            body,
            cookies,
        })
    }

    fn outgoing_links(&self, page: &PageHandle) -> Vec<HyperlinkFact> {
        extract_hyperlinks(&page.body, &page.final_url)
    }
}

fn classify(url: &str, e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout(url.to_string())
    } else if e.is_connect() {
        FetchError::Network {
            url: url.to_string(),
            error: "Connection refused".to_string(),
        }
    } else {
        FetchError::Network {
            url: url.to_string(),
            error: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher() -> HttpFetcher {
        HttpFetcher::new(&FetcherConfig::default()).unwrap()
    }

    #[test]
    fn test_build_http_client() {
        let client = build_http_client(&FetcherConfig::default());
        assert!(client.is_ok());
    }

    #[tokio::test]
    async fn test_load_html_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("set-cookie", "session=abc")
                    .set_body_raw(r#"<a href="/about">About us</a>"#, "text/html"),
            )
            .mount(&server)
            .await;

        let fetcher = fetcher();
        let page = fetcher.load(&format!("{}/", server.uri())).await.unwrap();

        assert_eq!(page.cookies, vec!["session=abc".to_string()]);

        let links = fetcher.outgoing_links(&page);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].url, format!("{}/about", server.uri()));
        assert_eq!(links[0].inner_text, "About us");

        fetcher.release(page).await;
    }

    #[tokio::test]
    async fn test_load_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = fetcher()
            .load(&format!("{}/missing", server.uri()))
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Http { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_load_non_html() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw("%PDF", "application/pdf"),
            )
            .mount(&server)
            .await;

        let err = fetcher()
            .load(&format!("{}/doc.pdf", server.uri()))
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::ContentMismatch { .. }));
    }

    #[tokio::test]
    async fn test_load_invalid_url() {
        let err = fetcher().load("not a url").await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl(_)));
    }
}
