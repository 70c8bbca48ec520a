//! Crawler module for fetching and processing locations
//!
//! This module contains the core crawling logic, including:
//! - The deduplicating frontier of locations to visit
//! - Worker orchestration over the protocol and decoder tables
//! - The configuration-driven crawl entry point

mod coordinator;
mod frontier;

pub use coordinator::{run_crawl, CrawlFailure, Crawler, Workers};
pub use frontier::{Frontier, DEFAULT_QUEUE_BUFFER};

use crate::decode::DecoderTable;
use crate::proto::{HttpProtocol, ProtocolTable, DEFAULT_TIMEOUT};

/// Default capacity of the output stream
pub const DEFAULT_OUTPUT_BUFFER: usize = 65536;

/// Default capacity of the error stream
pub const DEFAULT_ERROR_BUFFER: usize = 1024;

/// Everything a [`Crawler`] is assembled from
///
/// The default uses the standard protocol and decoder tables with a plain
/// HTTP client; [`crate::Config::settings`] builds one from configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Scheme to protocol mapping
    pub protocols: ProtocolTable,

    /// Content type to decoder mapping
    pub decoders: DecoderTable,

    /// Frontier queue capacity
    pub queue_buffer: usize,

    /// Output stream capacity
    pub output_buffer: usize,

    /// Error stream capacity
    pub error_buffer: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            protocols: ProtocolTable::standard(HttpProtocol::default(), DEFAULT_TIMEOUT),
            decoders: DecoderTable::standard(),
            queue_buffer: DEFAULT_QUEUE_BUFFER,
            output_buffer: DEFAULT_OUTPUT_BUFFER,
            error_buffer: DEFAULT_ERROR_BUFFER,
        }
    }
}
