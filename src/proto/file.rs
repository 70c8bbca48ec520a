//! Local file system protocol
//!
//! No pooling or locking: every call stats the path without following
//! symlinks and then lists the directory, opens the file, or reports where
//! a symlink points.

use crate::document::{Document, DocumentKind, OCTET_STREAM};
use crate::proto::{Fetched, ProtoError, ProtoResult, Protocol};
use async_trait::async_trait;
use url::Url;

/// Fetches `file` locations from the local file system
#[derive(Debug, Clone, Copy, Default)]
pub struct FileProtocol;

impl FileProtocol {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Protocol for FileProtocol {
    async fn get(&self, location: &Url) -> ProtoResult<Fetched> {
        let path = location
            .to_file_path()
            .map_err(|_| ProtoError::InvalidPath(location.to_string()))?;
        let io_err = |operation| {
            let location = location.to_string();
            move |source| ProtoError::Io {
                operation,
                location,
                source,
            }
        };

        let metadata = tokio::fs::symlink_metadata(&path)
            .await
            .map_err(io_err("stat"))?;
        let mut document = Document::new(location.clone());

        if metadata.is_dir() {
            let mut entries = tokio::fs::read_dir(&path)
                .await
                .map_err(io_err("read_dir"))?;
            let mut links = Vec::new();
            while let Some(entry) = entries.next_entry().await.map_err(io_err("read_dir"))? {
                let name = entry.file_name().to_string_lossy().into_owned();
                let is_dir = entry
                    .file_type()
                    .await
                    .map(|t| t.is_dir())
                    .unwrap_or(false);
                links.push(if is_dir { format!("{}/", name) } else { name });
            }
            links.sort();

            document.mark_directory();
            document.links = links;
            return Ok(Fetched::empty(document));
        }

        if metadata.file_type().is_symlink() {
            let target = tokio::fs::read_link(&path)
                .await
                .map_err(io_err("read_link"))?;
            document.kind = DocumentKind::Link;
            document.links.push(target.to_string_lossy().into_owned());
            return Ok(Fetched::empty(document));
        }

        if !metadata.is_file() {
            tracing::debug!("{} is neither a file nor a directory", path.display());
            document.kind = DocumentKind::Special;
            return Ok(Fetched::empty(document));
        }

        let file = tokio::fs::File::open(&path)
            .await
            .map_err(io_err("open"))?;
        document.kind = DocumentKind::File;
        document.size = Some(metadata.len());
        document.content_type = OCTET_STREAM.to_string();
        Ok(Fetched::with_body(document, Box::pin(file)))
    }
}
