//! Document sink trait and errors
//!
//! A sink is the consumer end of the crawl: every document the workers
//! produce is handed to exactly one sink, in arrival order.

use crate::document::Document;
use thiserror::Error;

/// Errors that can occur while writing documents
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Failed to serialize document: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for sink operations
pub type SinkResult<T> = Result<T, SinkError>;

/// Trait for document consumers
///
/// Any error returned from a sink ends the crawl.
pub trait DocumentSink: Send {
    /// Records one crawled document
    ///
    /// # Arguments
    ///
    /// * `document` - The decoded document
    fn accept(&mut self, document: &Document) -> SinkResult<()>;

    /// Flushes anything buffered; called once after the last document
    fn finish(&mut self) -> SinkResult<()>;
}

/// Collects documents in memory
impl DocumentSink for Vec<Document> {
    fn accept(&mut self, document: &Document) -> SinkResult<()> {
        self.push(document.clone());
        Ok(())
    }

    fn finish(&mut self) -> SinkResult<()> {
        Ok(())
    }
}
