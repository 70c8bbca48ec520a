use crate::crawler::{Settings, DEFAULT_ERROR_BUFFER, DEFAULT_OUTPUT_BUFFER, DEFAULT_QUEUE_BUFFER};
use crate::decode::{DecoderKind, DecoderTable};
use crate::proto::{HttpProtocol, ProtocolTable};
use crate::ConfigResult;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for Sumi-Trawl
///
/// Every section is optional; a missing section takes its defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub protocols: ProtocolConfig,
    /// Content type to decoder overrides, applied on top of the defaults
    #[serde(default)]
    pub decoders: BTreeMap<String, DecoderKind>,
    #[serde(default)]
    pub output: OutputConfig,
    /// Locations the frontier starts from
    #[serde(default)]
    pub seeds: Vec<String>,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Number of concurrent workers
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Capacity of the frontier queue before sends are deferred
    #[serde(rename = "queue-buffer", default = "default_queue_buffer")]
    pub queue_buffer: usize,

    /// Capacity of the document output stream
    #[serde(rename = "output-buffer", default = "default_output_buffer")]
    pub output_buffer: usize,

    /// Capacity of the error stream
    #[serde(rename = "error-buffer", default = "default_error_buffer")]
    pub error_buffer: usize,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            queue_buffer: default_queue_buffer(),
            output_buffer: default_output_buffer(),
            error_buffer: default_error_buffer(),
        }
    }
}

fn default_workers() -> usize {
    4
}

fn default_queue_buffer() -> usize {
    DEFAULT_QUEUE_BUFFER
}

fn default_output_buffer() -> usize {
    DEFAULT_OUTPUT_BUFFER
}

fn default_error_buffer() -> usize {
    DEFAULT_ERROR_BUFFER
}

/// Protocol layer configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ProtocolConfig {
    /// Request and session operation timeout (milliseconds)
    #[serde(rename = "timeout-ms", default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Schemes to register; anything else is an unknown scheme
    #[serde(default = "default_enabled")]
    pub enabled: Vec<String>,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            enabled: default_enabled(),
        }
    }
}

fn default_timeout_ms() -> u64 {
    8000
}

fn default_enabled() -> Vec<String> {
    ["http", "https", "ftp", "sftp", "file"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name", default = "default_crawler_name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version", default = "default_crawler_version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url", default)]
    pub contact_url: Option<String>,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email", default)]
    pub contact_email: Option<String>,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: default_crawler_name(),
            crawler_version: default_crawler_version(),
            contact_url: None,
            contact_email: None,
        }
    }
}

fn default_crawler_name() -> String {
    "Sumi-Trawl".to_string()
}

fn default_crawler_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

impl UserAgentConfig {
    /// Formats the `User-Agent` header value, e.g.
    /// `Sumi-Trawl/1.0 (+https://example.com/bot; bot@example.com)`
    pub fn header_value(&self) -> String {
        let base = format!("{}/{}", self.crawler_name, self.crawler_version);
        match (self.contact_url.as_deref(), self.contact_email.as_deref()) {
            (Some(url), Some(email)) => format!("{} (+{}; {})", base, url, email),
            (Some(url), None) => format!("{} (+{})", base, url),
            (None, Some(email)) => format!("{} ({})", base, email),
            (None, None) => base,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    /// JSON lines output file; standard output when absent
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl Config {
    /// Request and session operation timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.protocols.timeout_ms)
    }

    /// Builds crawler settings: the enabled protocols, the default decoders
    /// with overrides applied, and the buffer sizes
    ///
    /// # Returns
    ///
    /// * `Ok(Settings)` - Ready to hand to [`crate::Crawler::new`]
    /// * `Err(ConfigError)` - The HTTP client could not be built
    pub fn settings(&self) -> ConfigResult<Settings> {
        let http = HttpProtocol::from_config(&self.user_agent, self.timeout())?;
        let mut protocols = ProtocolTable::standard(http, self.timeout());
        for scheme in protocols
            .schemes()
            .into_iter()
            .map(str::to_string)
            .collect::<Vec<_>>()
        {
            if !self.protocols.enabled.iter().any(|s| s.eq_ignore_ascii_case(&scheme)) {
                protocols.remove(&scheme);
            }
        }

        let mut decoders = DecoderTable::standard();
        for (content_type, kind) in &self.decoders {
            decoders.set(content_type, *kind);
        }

        Ok(Settings {
            protocols,
            decoders,
            queue_buffer: self.crawler.queue_buffer,
            output_buffer: self.crawler.output_buffer,
            error_buffer: self.crawler.error_buffer,
        })
    }
}
