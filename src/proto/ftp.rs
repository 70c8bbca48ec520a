//! FTP protocol implementation
//!
//! Sessions are pooled per host and serialized by the pool's per-host lock.
//! A location ending in `/` is listed, anything else is retrieved in binary
//! mode. FTP carries no MIME metadata, so retrieved files are always
//! `application/octet-stream`.

use crate::document::{Document, DocumentKind, OCTET_STREAM};
use crate::proto::{Fetched, ProtoError, ProtoResult, Protocol, SessionPool};
use crate::url::{credentials, decoded_path, host_key};
use async_trait::async_trait;
use std::io::Cursor;
use std::net::{SocketAddr, ToSocketAddrs};
use std::str::FromStr;
use std::time::Duration;
use suppaftp::list::File as ListEntry;
use suppaftp::types::FileType;
use suppaftp::FtpStream;
use url::Url;

/// Default FTP control port
pub const FTP_PORT: u16 = 21;

const ANONYMOUS: &str = "anonymous";

/// Fetches `ftp` locations over pooled, per-host sessions
pub struct FtpProtocol {
    pool: SessionPool<FtpStream>,
    timeout: Duration,
}

impl FtpProtocol {
    /// Creates a protocol with an empty session pool
    pub fn new(timeout: Duration) -> Self {
        Self {
            pool: SessionPool::new(),
            timeout,
        }
    }

    /// Number of hosts with a pooled session slot
    pub fn pooled_hosts(&self) -> usize {
        self.pool.len()
    }
}

#[async_trait]
impl Protocol for FtpProtocol {
    async fn get(&self, location: &Url) -> ProtoResult<Fetched> {
        let key = host_key(location, FTP_PORT)
            .ok_or_else(|| ProtoError::MissingHost(location.to_string()))?;
        let (user, password) = match credentials(location) {
            Some(creds) => (
                creds.user,
                creds.password.unwrap_or_else(|| ANONYMOUS.to_string()),
            ),
            None => (ANONYMOUS.to_string(), ANONYMOUS.to_string()),
        };
        let connect = connector(key.clone(), user, password, self.timeout);
        let path = decoded_path(location);
        let mut document = Document::new(location.clone());

        if path.ends_with('/') {
            let host = key.clone();
            let lines = self
                .pool
                .with_session(&key, connect, move |ftp| {
                    ftp.list(Some(&path)).map_err(|source| ProtoError::Ftp {
                        host,
                        operation: "list",
                        source,
                    })
                })
                .await?;

            document.mark_directory();
            document.links = listing_links(&lines);
            tracing::debug!("Listed {} entries in {}", document.links.len(), location);
            return Ok(Fetched::empty(document));
        }

        let host = key.clone();
        let data = self
            .pool
            .with_session(&key, connect, move |ftp| {
                ftp.retr_as_buffer(&path)
                    .map(Cursor::into_inner)
                    .map_err(|source| ProtoError::Ftp {
                        host,
                        operation: "retrieve",
                        source,
                    })
            })
            .await?;

        document.kind = DocumentKind::File;
        document.size = Some(data.len() as u64);
        document.content_type = OCTET_STREAM.to_string();
        Ok(Fetched::with_body(document, Box::pin(Cursor::new(data))))
    }
}

/// Builds the closure that opens and logs in a new session for `key`
fn connector(
    key: String,
    user: String,
    password: String,
    timeout: Duration,
) -> impl FnOnce() -> ProtoResult<FtpStream> + Send + 'static {
    move || {
        let addr = resolve(&key)?;
        let ftp_err = |operation, source| ProtoError::Ftp {
            host: key.clone(),
            operation,
            source,
        };

        let mut ftp =
            FtpStream::connect_timeout(addr, timeout).map_err(|e| ftp_err("connect", e))?;
        ftp.get_ref()
            .set_read_timeout(Some(timeout))
            .map_err(|source| ProtoError::Connect {
                host: key.clone(),
                source,
            })?;
        ftp.login(user.as_str(), password.as_str())
            .map_err(|e| ftp_err("login", e))?;
        ftp.transfer_type(FileType::Binary)
            .map_err(|e| ftp_err("type", e))?;

        tracing::debug!("Opened FTP session to {} as {}", key, user);
        Ok(ftp)
    }
}

fn resolve(key: &str) -> ProtoResult<SocketAddr> {
    let connect_err = |source| ProtoError::Connect {
        host: key.to_string(),
        source,
    };
    key.to_socket_addrs()
        .map_err(connect_err)?
        .next()
        .ok_or_else(|| connect_err(std::io::Error::from(std::io::ErrorKind::AddrNotAvailable)))
}

/// Turns raw `LIST` output into link names
///
/// Directories get a trailing `/`; `.`, `..` and lines that do not parse as a
/// listing entry are skipped.
fn listing_links(lines: &[String]) -> Vec<String> {
    lines
        .iter()
        .filter_map(|line| match ListEntry::from_str(line) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::debug!("Skipping unparseable FTP listing line {:?}: {:?}", line, e);
                None
            }
        })
        .filter(|entry| entry.name() != "." && entry.name() != "..")
        .map(|entry| {
            if entry.is_directory() {
                format!("{}/", entry.name())
            } else {
                entry.name().to_string()
            }
        })
        .collect()
}
