//! JSON lines document sink

use crate::document::Document;
use crate::output::{DocumentSink, SinkResult};
use std::io::Write;

/// Writes one JSON object per document, newline separated
pub struct JsonLinesSink<W: Write> {
    writer: W,
    written: u64,
}

impl<W: Write> JsonLinesSink<W> {
    /// Creates a sink over `writer`; wrap files in a `BufWriter`
    pub fn new(writer: W) -> Self {
        Self { writer, written: 0 }
    }

    /// Number of documents written so far
    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> DocumentSink for JsonLinesSink<W> {
    fn accept(&mut self, document: &Document) -> SinkResult<()> {
        serde_json::to_writer(&mut self.writer, document)?;
        self.writer.write_all(b"\n")?;
        self.written += 1;
        Ok(())
    }

    fn finish(&mut self) -> SinkResult<()> {
        self.writer.flush()?;
        tracing::debug!("Wrote {} documents", self.written);
        Ok(())
    }
}
