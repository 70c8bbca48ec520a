//! Sumi-Trawl: a protocol-agnostic crawler for search indexing
//!
//! This crate fetches resources over HTTP(S), FTP, SFTP and the local file
//! system, deduplicates the links it discovers, and extracts structured
//! content (title, links, main body text) for a downstream indexer.

pub mod config;
pub mod crawler;
pub mod decode;
pub mod document;
pub mod output;
pub mod proto;
pub mod url;

use thiserror::Error;

/// Main error type for Sumi-Trawl operations
#[derive(Debug, Error)]
pub enum TrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Output error: {0}")]
    Sink(#[from] output::SinkError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Errors produced while crawling a single location
///
/// The steady-state loop logs these and moves on; `Crawler::crawl_one` and
/// `Crawler::fetch` hand them to the caller.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Invalid location {location}: {source}")]
    InvalidLocation {
        location: String,
        source: ::url::ParseError,
    },

    #[error(transparent)]
    Protocol(#[from] proto::ProtoError),

    #[error("Failed to decode {}: {source}", partial.location)]
    Decode {
        /// The document as far as it got before decoding failed
        partial: Box<document::Document>,
        source: decode::DecodeError,
    },
}

impl CrawlError {
    /// Returns true for configuration problems (unknown scheme, missing
    /// credentials, unparseable location) as opposed to transient failures
    pub fn is_config(&self) -> bool {
        match self {
            Self::InvalidLocation { .. } => true,
            Self::Protocol(e) => e.is_config(),
            Self::Decode { .. } => false,
        }
    }
}

/// Result type alias for Sumi-Trawl operations
pub type Result<T> = std::result::Result<T, TrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Crawler, Frontier, Settings};
pub use document::{Document, DocumentKind};
