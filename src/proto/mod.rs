//! Protocol layer for fetching locations
//!
//! Each transport implements the single [`Protocol`] capability: turn a
//! location into a [`Document`] plus an optional byte stream. The crawler
//! picks an implementation by URL scheme through a [`ProtocolTable`].
//!
//! - `http`: stateless requests over a shared `reqwest` client
//! - `ftp`: one pooled session per host, anonymous unless credentials given
//! - `sftp`: one pooled SSH session per host, credentials required
//! - `file`: the local file system, no pooling
//!
//! Remote sessions live in a [`SessionPool`]: one pool-wide lock guards the
//! host map, a per-host lock serializes I/O on that host's session.

mod error;
mod file;
mod ftp;
mod http;
mod pool;
mod sftp;

pub use error::{ProtoError, ProtoResult};
pub use file::FileProtocol;
pub use ftp::FtpProtocol;
pub use http::{build_http_client, parse_media_type, HttpProtocol};
pub use pool::SessionPool;
pub use sftp::SftpProtocol;

use crate::document::Document;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncRead;
use url::Url;

/// Default timeout for a single request or session operation
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(8);

/// Byte stream of a fetched resource
///
/// Dropping the stream releases the underlying connection or file handle.
pub type Body = Pin<Box<dyn AsyncRead + Send>>;

/// A fetched location: the document and, for files, its content
pub struct Fetched {
    pub document: Document,
    pub body: Option<Body>,
}

impl Fetched {
    /// Creates a fetch result without a body (directories, special files)
    pub fn empty(document: Document) -> Self {
        Self {
            document,
            body: None,
        }
    }

    /// Creates a fetch result with a body
    pub fn with_body(document: Document, body: Body) -> Self {
        Self {
            document,
            body: Some(body),
        }
    }
}

impl fmt::Debug for Fetched {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fetched")
            .field("document", &self.document)
            .field("body", &self.body.as_ref().map(|_| "<stream>"))
            .finish()
    }
}

/// A transport that can fetch locations of one or more URL schemes
#[async_trait]
pub trait Protocol: Send + Sync {
    /// Fetches `location`
    ///
    /// Implementations return errors rather than panicking; the caller owns
    /// the returned body and is responsible for dropping it.
    async fn get(&self, location: &Url) -> ProtoResult<Fetched>;
}

/// Mapping from URL scheme to the protocol that serves it
#[derive(Clone, Default)]
pub struct ProtocolTable {
    protocols: HashMap<String, Arc<dyn Protocol>>,
}

impl ProtocolTable {
    /// Creates an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the default table: http, https, ftp, sftp and file
    ///
    /// # Arguments
    ///
    /// * `http` - The HTTP protocol shared by `http` and `https`
    /// * `timeout` - Connect/read timeout for the remote session protocols
    pub fn standard(http: HttpProtocol, timeout: Duration) -> Self {
        let http: Arc<dyn Protocol> = Arc::new(http);
        let mut table = Self::new();
        table.insert_shared("http", http.clone());
        table.insert_shared("https", http);
        table.insert("ftp", FtpProtocol::new(timeout));
        table.insert("sftp", SftpProtocol::new(timeout));
        table.insert("file", FileProtocol::new());
        table
    }

    /// Registers `protocol` for `scheme`, replacing any previous entry
    pub fn insert<P: Protocol + 'static>(&mut self, scheme: &str, protocol: P) {
        self.insert_shared(scheme, Arc::new(protocol));
    }

    /// Registers an already shared protocol for `scheme`
    pub fn insert_shared(&mut self, scheme: &str, protocol: Arc<dyn Protocol>) {
        self.protocols.insert(scheme.to_ascii_lowercase(), protocol);
    }

    /// Removes the protocol registered for `scheme`
    pub fn remove(&mut self, scheme: &str) -> Option<Arc<dyn Protocol>> {
        self.protocols.remove(scheme)
    }

    /// Looks up the protocol for `scheme`
    pub fn get(&self, scheme: &str) -> Option<&Arc<dyn Protocol>> {
        self.protocols.get(scheme)
    }

    /// Returns the registered schemes in sorted order
    pub fn schemes(&self) -> Vec<&str> {
        let mut schemes: Vec<&str> = self.protocols.keys().map(String::as_str).collect();
        schemes.sort_unstable();
        schemes
    }
}

impl fmt::Debug for ProtocolTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProtocolTable")
            .field("schemes", &self.schemes())
            .finish()
    }
}
