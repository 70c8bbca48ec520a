//! Content decoders
//!
//! A decoder enriches a fetched [`Document`] from its body: title, links,
//! plain-text content and metadata. Decoders are looked up by normalized
//! content type in a [`DecoderTable`]; an unmapped content type leaves the
//! document untouched.
//!
//! Only HTML and the gzip/tar archive formats are actually inspected. PDF,
//! image, media and zip decoders recognize their format and do nothing else.

mod archive;
mod html;
mod media;

pub use archive::{GzipDecoder, TarDecoder, ZipDecoder};
pub use html::{extract, HtmlDecoder};
pub use media::{ImageDecoder, MediaDecoder, PdfDecoder};

use crate::document::Document;
use crate::proto::Body;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised while decoding a body
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Failed to read body: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed {format} archive: {source}")]
    Archive {
        format: &'static str,
        source: std::io::Error,
    },
}

/// Result type for decoder operations
pub type DecodeResult<T> = Result<T, DecodeError>;

/// Turns a body into document fields
#[async_trait]
pub trait Decoder: Send + Sync {
    /// Reads from `body` and fills in `document`
    ///
    /// On error the document may be partially filled. The caller owns the
    /// body and drops it afterwards, however far the decoder read.
    async fn decode(&self, document: &mut Document, body: &mut Body) -> DecodeResult<()>;
}

/// Named decoder implementations, as used in configuration files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecoderKind {
    Html,
    Pdf,
    Image,
    Media,
    Zip,
    Gzip,
    Tar,
    /// Explicitly unmaps a content type
    None,
}

impl DecoderKind {
    /// Instantiates the decoder, or None for [`DecoderKind::None`]
    pub fn build(self) -> Option<Arc<dyn Decoder>> {
        match self {
            Self::Html => Some(Arc::new(HtmlDecoder)),
            Self::Pdf => Some(Arc::new(PdfDecoder)),
            Self::Image => Some(Arc::new(ImageDecoder)),
            Self::Media => Some(Arc::new(MediaDecoder)),
            Self::Zip => Some(Arc::new(ZipDecoder)),
            Self::Gzip => Some(Arc::new(GzipDecoder::default())),
            Self::Tar => Some(Arc::new(TarDecoder)),
            Self::None => None,
        }
    }
}

/// Default content type mapping
const STANDARD: &[(&str, DecoderKind)] = &[
    ("text/html", DecoderKind::Html),
    ("application/xhtml+xml", DecoderKind::Html),
    ("application/pdf", DecoderKind::Pdf),
    ("image/png", DecoderKind::Image),
    ("image/jpeg", DecoderKind::Image),
    ("image/gif", DecoderKind::Image),
    ("video/webm", DecoderKind::Media),
    ("audio/mpeg", DecoderKind::Media),
    ("application/ogg", DecoderKind::Media),
    ("application/zip", DecoderKind::Zip),
    ("application/x-gzip", DecoderKind::Gzip),
    ("application/gzip", DecoderKind::Gzip),
    ("application/x-tar", DecoderKind::Tar),
];

/// Mapping from normalized content type to decoder
#[derive(Clone, Default)]
pub struct DecoderTable {
    decoders: HashMap<String, Arc<dyn Decoder>>,
}

impl DecoderTable {
    /// Creates an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the default table
    pub fn standard() -> Self {
        let mut table = Self::new();
        for (content_type, kind) in STANDARD {
            table.set(content_type, *kind);
        }
        table
    }

    /// Maps `content_type` to a named decoder; [`DecoderKind::None`] unmaps it
    pub fn set(&mut self, content_type: &str, kind: DecoderKind) {
        match kind.build() {
            Some(decoder) => self.insert_shared(content_type, decoder),
            None => {
                self.remove(content_type);
            }
        }
    }

    /// Registers `decoder` for `content_type`, replacing any previous entry
    pub fn insert<D: Decoder + 'static>(&mut self, content_type: &str, decoder: D) {
        self.insert_shared(content_type, Arc::new(decoder));
    }

    /// Registers an already shared decoder for `content_type`
    pub fn insert_shared(&mut self, content_type: &str, decoder: Arc<dyn Decoder>) {
        self.decoders
            .insert(content_type.to_ascii_lowercase(), decoder);
    }

    pub fn remove(&mut self, content_type: &str) -> Option<Arc<dyn Decoder>> {
        self.decoders.remove(&content_type.to_ascii_lowercase())
    }

    pub fn get(&self, content_type: &str) -> Option<&Arc<dyn Decoder>> {
        self.decoders.get(content_type)
    }

    /// Returns the mapped content types in sorted order
    pub fn content_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.decoders.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }
}

impl fmt::Debug for DecoderTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecoderTable")
            .field("content_types", &self.content_types())
            .finish()
    }
}
