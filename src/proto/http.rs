//! HTTP protocol implementation
//!
//! This module handles HTTP and HTTPS locations, including:
//! - Building the shared HTTP client with a proper user agent string
//! - Issuing one GET request per location
//! - Normalizing the declared media type
//! - Streaming the response body back without buffering it, whatever the
//!   status code

use crate::config::UserAgentConfig;
use crate::document::{Document, DocumentKind};
use crate::proto::{Body, Fetched, ProtoError, ProtoResult, Protocol};
use async_trait::async_trait;
use futures::TryStreamExt;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::time::Duration;
use tokio_util::io::StreamReader;
use url::Url;

/// Fetches `http` and `https` locations through one shared client
#[derive(Debug, Clone, Default)]
pub struct HttpProtocol {
    client: Client,
}

impl HttpProtocol {
    /// Creates a protocol around an existing client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds a protocol with the configured user agent and timeout
    pub fn from_config(config: &UserAgentConfig, timeout: Duration) -> Result<Self, reqwest::Error> {
        build_http_client(config, timeout).map(Self::new)
    }
}

#[async_trait]
impl Protocol for HttpProtocol {
    async fn get(&self, location: &Url) -> ProtoResult<Fetched> {
        let mut document = Document::new(location.clone());

        let response = self
            .client
            .get(location.clone())
            .send()
            .await
            .map_err(|source| ProtoError::Http {
                location: location.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!("HTTP {} from {}", status.as_u16(), location);
        }

        document.kind = DocumentKind::File;
        document.status = Some(status.as_u16());
        document.size = response.content_length();

        let declared = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        let stream = response
            .bytes_stream()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e));
        let body: Body = Box::pin(StreamReader::new(stream));

        match parse_media_type(&declared) {
            Some(content_type) => {
                document.content_type = content_type;
                Ok(Fetched::with_body(document, body))
            }
            None => Err(ProtoError::MediaType {
                value: declared,
                partial: Box::new(Fetched::with_body(document, body)),
            }),
        }
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
/// * `timeout` - Overall request timeout
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use sumi_trawl::config::UserAgentConfig;
/// use sumi_trawl::proto::build_http_client;
///
/// let client = build_http_client(&UserAgentConfig::default(), Duration::from_secs(8)).unwrap();
/// ```
pub fn build_http_client(config: &UserAgentConfig, timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .timeout(timeout)
        .connect_timeout(timeout)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Normalizes a `Content-Type` header value to its media type essence
///
/// Parameters are dropped and the result is lowercase. Returns None if the
/// value is not a valid media type (including an empty value).
///
/// # Examples
///
/// ```
/// use sumi_trawl::proto::parse_media_type;
///
/// assert_eq!(
///     parse_media_type("Text/HTML; charset=UTF-8"),
///     Some("text/html".to_string())
/// );
/// assert_eq!(parse_media_type(""), None);
/// ```
pub fn parse_media_type(value: &str) -> Option<String> {
    value
        .trim()
        .parse::<mime::Mime>()
        .ok()
        .map(|m| m.essence_str().to_ascii_lowercase())
}
