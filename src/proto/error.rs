//! Protocol error types

use crate::proto::Fetched;
use thiserror::Error;

/// Errors that can occur while fetching a location
#[derive(Debug, Error)]
pub enum ProtoError {
    // ===== Configuration Errors =====
    #[error("No protocol registered for scheme '{0}'")]
    UnknownScheme(String),

    #[error("Missing credentials in {scheme} location for {host}")]
    MissingCredentials { scheme: String, host: String },

    #[error("Location has no host: {0}")]
    MissingHost(String),

    #[error("Location is not a local path: {0}")]
    InvalidPath(String),

    // ===== Transient I/O Errors =====
    #[error("Failed to connect to {host}: {source}")]
    Connect {
        host: String,
        source: std::io::Error,
    },

    #[error("{operation} failed for {location}: {source}")]
    Io {
        operation: &'static str,
        location: String,
        source: std::io::Error,
    },

    #[error("HTTP request to {location} failed: {source}")]
    Http {
        location: String,
        source: reqwest::Error,
    },

    #[error("FTP {operation} failed on {host}: {source}")]
    Ftp {
        host: String,
        operation: &'static str,
        source: suppaftp::FtpError,
    },

    #[error("SFTP {operation} failed on {host}: {source}")]
    Ssh {
        host: String,
        operation: &'static str,
        source: ssh2::Error,
    },

    #[error("Session task for {host} did not complete: {source}")]
    Join {
        host: String,
        source: tokio::task::JoinError,
    },

    // ===== Partial Results =====
    /// The resource was fetched but its declared media type could not be
    /// parsed. The document and body are kept so the caller can decide
    /// whether to use them anyway.
    #[error("Invalid media type {value:?} for {}", partial.document.location)]
    MediaType {
        value: String,
        partial: Box<Fetched>,
    },
}

impl ProtoError {
    /// Returns true for errors caused by configuration rather than I/O
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Self::UnknownScheme(_)
                | Self::MissingCredentials { .. }
                | Self::MissingHost(_)
                | Self::InvalidPath(_)
        )
    }

    /// Recovers the fetched document and body carried by a partial failure
    pub fn into_partial(self) -> Option<Fetched> {
        match self {
            Self::MediaType { partial, .. } => Some(*partial),
            _ => None,
        }
    }
}

/// Result type for protocol operations
pub type ProtoResult<T> = Result<T, ProtoError>;
