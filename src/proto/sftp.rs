//! SFTP protocol implementation
//!
//! Same pooling discipline as FTP, over an authenticated SSH transport.
//! Credentials must be part of the location; there is no anonymous fallback.
//! The target is stat'ed first to tell directories, regular files, symlinks
//! and special files apart.

use crate::document::{Document, DocumentKind, OCTET_STREAM};
use crate::proto::{Fetched, ProtoError, ProtoResult, Protocol, SessionPool};
use crate::url::{credentials, decoded_path, host_key, Credentials};
use async_trait::async_trait;
use ssh2::{Session, Sftp};
use std::io::{Cursor, Read};
use std::net::{TcpStream, ToSocketAddrs};
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Default SSH port
pub const SFTP_PORT: u16 = 22;

/// A logged-in SSH session and its SFTP channel
pub struct SftpSession {
    // Keeps the transport alive for as long as the channel is pooled
    _session: Session,
    sftp: Sftp,
}

/// What a stat'ed SFTP path turned out to be
enum Entry {
    Directory(Vec<String>),
    File(Vec<u8>),
    Link(String),
    Special,
}

/// Fetches `sftp` locations over pooled, per-host sessions
pub struct SftpProtocol {
    pool: SessionPool<SftpSession>,
    timeout: Duration,
}

impl SftpProtocol {
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
impl Protocol for SftpProtocol {
    async fn get(&self, location: &Url) -> ProtoResult<Fetched> {
        let key = host_key(location, SFTP_PORT)
            .ok_or_else(|| ProtoError::MissingHost(location.to_string()))?;
        let creds = credentials(location).ok_or_else(|| ProtoError::MissingCredentials {
            scheme: location.scheme().to_string(),
            host: key.clone(),
        })?;

        let connect = connector(key.clone(), creds, self.timeout);
        let path = decoded_path(location);
        let host = key.clone();

        let entry = self
            .pool
            .with_session(&key, connect, move |session| {
                read_entry(&session.sftp, Path::new(&path), &host)
            })
            .await?;

        let mut document = Document::new(location.clone());
        match entry {
            Entry::Directory(links) => {
                document.mark_directory();
                document.links = links;
                Ok(Fetched::empty(document))
            }
            Entry::Link(target) => {
                document.kind = DocumentKind::Link;
                document.links.push(target);
                Ok(Fetched::empty(document))
            }
            Entry::Special => {
                document.kind = DocumentKind::Special;
                Ok(Fetched::empty(document))
            }
            Entry::File(data) => {
                document.kind = DocumentKind::File;
                document.size = Some(data.len() as u64);
                document.content_type = OCTET_STREAM.to_string();
                Ok(Fetched::with_body(document, Box::pin(Cursor::new(data))))
            }
        }
    }
}

/// Stats `path` and lists or reads it depending on its type
fn read_entry(sftp: &Sftp, path: &Path, host: &str) -> ProtoResult<Entry> {
    let ssh_err = |operation, source| ProtoError::Ssh {
        host: host.to_string(),
        operation,
        source,
    };

    let stat = sftp.lstat(path).map_err(|e| ssh_err("stat", e))?;

    if stat.is_dir() {
        let mut links: Vec<String> = sftp
            .readdir(path)
            .map_err(|e| ssh_err("readdir", e))?
            .into_iter()
            .filter_map(|(entry, stat)| {
                let name = entry.file_name()?.to_string_lossy().into_owned();
                Some(if stat.is_dir() { format!("{}/", name) } else { name })
            })
            .collect();
        links.sort();
        return Ok(Entry::Directory(links));
    }

    if stat.file_type().is_symlink() {
        let target = sftp.readlink(path).map_err(|e| ssh_err("readlink", e))?;
        return Ok(Entry::Link(target.to_string_lossy().into_owned()));
    }

    if !stat.is_file() {
        return Ok(Entry::Special);
    }

    let mut data = Vec::with_capacity(stat.size.unwrap_or(0) as usize);
    sftp.open(path)
        .map_err(|e| ssh_err("open", e))?
        .read_to_end(&mut data)
        .map_err(|source| ProtoError::Io {
            operation: "read",
            location: format!("sftp://{}{}", host, path.display()),
            source,
        })?;
    Ok(Entry::File(data))
}

/// Builds the closure that opens and authenticates a new session for `key`
fn connector(
    key: String,
    creds: Credentials,
    timeout: Duration,
) -> impl FnOnce() -> ProtoResult<SftpSession> + Send + 'static {
    move || {
        let connect_err = |source| ProtoError::Connect {
            host: key.clone(),
            source,
        };
        let ssh_err = |operation, source| ProtoError::Ssh {
            host: key.clone(),
            operation,
            source,
        };

        let addr = key
            .to_socket_addrs()
            .map_err(connect_err)?
            .next()
            .ok_or_else(|| connect_err(std::io::Error::from(std::io::ErrorKind::AddrNotAvailable)))?;
        let tcp = TcpStream::connect_timeout(&addr, timeout).map_err(connect_err)?;

        let mut session = Session::new().map_err(|e| ssh_err("session", e))?;
        session.set_tcp_stream(tcp);
        session.set_timeout(timeout.as_millis().min(u32::MAX as u128) as u32);
        session.handshake().map_err(|e| ssh_err("handshake", e))?;

        match &creds.password {
            Some(password) => session.userauth_password(&creds.user, password),
            None => session.userauth_agent(&creds.user),
        }
        .map_err(|e| ssh_err("auth", e))?;

        let sftp = session.sftp().map_err(|e| ssh_err("sftp", e))?;
        tracing::debug!("Opened SFTP session to {} as {}", key, creds.user);

        Ok(SftpSession {
            _session: session,
            sftp,
        })
    }
}
