//! Crawl statistics
//!
//! Counters collected while draining the output and error streams, printed
//! once the crawl ends.

use crate::crawler::CrawlFailure;
use crate::document::{Document, DocumentKind};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Crawl statistics summary
#[derive(Debug, Clone)]
pub struct CrawlStatistics {
    /// Total number of documents produced
    pub documents: u64,

    /// Count of documents by kind
    pub by_kind: BTreeMap<DocumentKind, u64>,

    /// Count of documents by content type; empty types are counted as `unknown`
    pub by_content_type: BTreeMap<String, u64>,

    /// Total number of links discovered
    pub links: u64,

    /// Number of reported failures
    pub errors: u64,

    /// Failures caused by configuration rather than I/O
    pub config_errors: u64,

    started: Instant,
}

impl Default for CrawlStatistics {
    fn default() -> Self {
        Self {
            documents: 0,
            by_kind: BTreeMap::new(),
            by_content_type: BTreeMap::new(),
            links: 0,
            errors: 0,
            config_errors: 0,
            started: Instant::now(),
        }
    }
}

impl CrawlStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_document(&mut self, document: &Document) {
        self.documents += 1;
        *self.by_kind.entry(document.kind).or_default() += 1;

        let content_type = if document.content_type.is_empty() {
            "unknown"
        } else {
            document.content_type.as_str()
        };
        *self
            .by_content_type
            .entry(content_type.to_string())
            .or_default() += 1;

        self.links += document.links.len() as u64;
    }

    pub fn record_error(&mut self, failure: &CrawlFailure) {
        self.errors += 1;
        if failure.error.is_config() {
            self.config_errors += 1;
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Documents per second since the statistics were created
    pub fn rate(&self) -> f64 {
        let secs = self.elapsed().as_secs_f64();
        if secs > 0.0 {
            self.documents as f64 / secs
        } else {
            0.0
        }
    }
}

/// Prints statistics to stderr in a formatted manner
///
/// Standard output may be carrying the documents themselves.
pub fn print_statistics(stats: &CrawlStatistics) {
    eprintln!("=== Crawl Statistics ===\n");

    eprintln!("Overview:");
    eprintln!("  Documents: {}", stats.documents);
    eprintln!("  Links found: {}", stats.links);
    eprintln!(
        "  Errors: {} ({} configuration)",
        stats.errors, stats.config_errors
    );
    eprintln!(
        "  Elapsed: {:.1}s ({:.2} documents/sec)",
        stats.elapsed().as_secs_f64(),
        stats.rate()
    );
    eprintln!();

    if !stats.by_kind.is_empty() {
        eprintln!("Documents by Kind:");
        for (kind, count) in &stats.by_kind {
            eprintln!("  {}: {}", kind, count);
        }
        eprintln!();
    }

    if !stats.by_content_type.is_empty() {
        eprintln!("Documents by Content Type:");
        // Sort by count (descending)
        let mut counts: Vec<_> = stats.by_content_type.iter().collect();
        counts.sort_by(|a, b| b.1.cmp(a.1));
        for (content_type, count) in counts {
            let percentage = (*count as f64 / stats.documents.max(1) as f64) * 100.0;
            eprintln!("  {}: {} ({:.1}%)", content_type, count, percentage);
        }
    }
}
