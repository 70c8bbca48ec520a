//! Archive decoders
//!
//! Archives are read fully into memory and walked synchronously. Tar entries
//! are validated but their contents are not decoded as documents of their
//! own.

use crate::decode::{DecodeError, DecodeResult, Decoder};
use crate::document::Document;
use crate::proto::Body;
use async_trait::async_trait;
use flate2::read::GzDecoder;
use std::io::{self, Read};
use tokio::io::AsyncReadExt;

/// `application/zip`; recognized but not inspected
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipDecoder;

#[async_trait]
impl Decoder for ZipDecoder {
    async fn decode(&self, document: &mut Document, _body: &mut Body) -> DecodeResult<()> {
        tracing::trace!("No zip extraction for {}", document.location);
        Ok(())
    }
}

/// `application/x-tar`
#[derive(Debug, Clone, Copy, Default)]
pub struct TarDecoder;

impl TarDecoder {
    /// Walks every entry header, failing on the first malformed one
    ///
    /// Returns the number of entries.
    fn walk<R: Read>(&self, document: &Document, reader: R) -> DecodeResult<usize> {
        let archive_err = |source| DecodeError::Archive {
            format: "tar",
            source,
        };

        let mut archive = tar::Archive::new(reader);
        let mut count = 0;
        for entry in archive.entries().map_err(archive_err)? {
            let entry = entry.map_err(archive_err)?;
            let path = entry.path().map_err(archive_err)?;
            tracing::trace!("{} contains {}", document.location, path.display());
            count += 1;
        }

        tracing::debug!("{} holds {} tar entries", document.location, count);
        Ok(count)
    }
}

#[async_trait]
impl Decoder for TarDecoder {
    async fn decode(&self, document: &mut Document, body: &mut Body) -> DecodeResult<()> {
        let mut data = Vec::new();
        body.read_to_end(&mut data).await?;
        self.walk(document, data.as_slice())?;
        Ok(())
    }
}

/// `application/gzip`
///
/// A payload whose embedded file name ends in `.tar` is handed to the tar
/// walker; otherwise the embedded name, if any, becomes the title.
#[derive(Debug, Clone, Copy, Default)]
pub struct GzipDecoder {
    tar: TarDecoder,
}

#[async_trait]
impl Decoder for GzipDecoder {
    async fn decode(&self, document: &mut Document, body: &mut Body) -> DecodeResult<()> {
        let mut data = Vec::new();
        body.read_to_end(&mut data).await?;

        let gz = GzDecoder::new(data.as_slice());
        let header = gz.header().ok_or_else(|| DecodeError::Archive {
            format: "gzip",
            source: io::Error::new(io::ErrorKind::InvalidData, "invalid gzip header"),
        })?;
        let name = header
            .filename()
            .map(|raw| String::from_utf8_lossy(raw).into_owned());

        match name {
            Some(name) if name.ends_with(".tar") => {
                self.tar.walk(document, gz)?;
            }
            Some(name) if !name.is_empty() => {
                document.title = Some(name);
            }
            _ => {}
        }

        Ok(())
    }
}
