//! Placeholder decoders for binary formats
//!
//! These accept their format and leave the document as fetched.

use crate::decode::{DecodeResult, Decoder};
use crate::document::Document;
use crate::proto::Body;
use async_trait::async_trait;

/// `application/pdf`
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfDecoder;

/// `image/png`, `image/jpeg`, `image/gif`
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageDecoder;

/// `video/webm`, `audio/mpeg`, `application/ogg`
#[derive(Debug, Clone, Copy, Default)]
pub struct MediaDecoder;

#[async_trait]
impl Decoder for PdfDecoder {
    async fn decode(&self, document: &mut Document, _body: &mut Body) -> DecodeResult<()> {
        tracing::trace!("No PDF extraction for {}", document.location);
        Ok(())
    }
}

#[async_trait]
impl Decoder for ImageDecoder {
    async fn decode(&self, document: &mut Document, _body: &mut Body) -> DecodeResult<()> {
        tracing::trace!("No image extraction for {}", document.location);
        Ok(())
    }
}

#[async_trait]
impl Decoder for MediaDecoder {
    async fn decode(&self, document: &mut Document, _body: &mut Body) -> DecodeResult<()> {
        tracing::trace!("No media extraction for {}", document.location);
        Ok(())
    }
}
