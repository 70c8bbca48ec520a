//! Output module for consuming crawl results
//!
//! This module handles:
//! - Writing documents to a sink (JSON lines by default)
//! - Recording crawl statistics from the output and error streams
//! - Deciding when a crawl is finished

mod jsonl;
pub mod stats;
mod traits;

pub use jsonl::JsonLinesSink;
pub use stats::{print_statistics, CrawlStatistics};
pub use traits::{DocumentSink, SinkError, SinkResult};

use crate::crawler::{CrawlFailure, Crawler};
use crate::document::Document;
use std::time::Duration;
use tokio::sync::mpsc;

/// How often the crawl is checked for idleness
const IDLE_POLL: Duration = Duration::from_millis(250);

/// Consecutive idle observations before the crawl counts as finished
const IDLE_ROUNDS: u32 = 2;

/// Moves documents from the output stream into `sink` until the crawl is
/// done
///
/// Returns when `limit` documents were written, when the crawler stayed idle
/// for [`IDLE_ROUNDS`] consecutive polls, or when the output stream ends.
/// Failures from `errors` are counted but never end the drain. Closing the
/// stream afterwards is up to the caller.
///
/// # Arguments
///
/// * `crawler` - The crawler feeding `output`, polled for idleness
/// * `output` - The crawler's output stream
/// * `errors` - The crawler's error stream, if enabled
/// * `sink` - Destination for documents
/// * `stats` - Updated for every document and failure
/// * `limit` - Optional maximum number of documents
///
/// # Returns
///
/// * `Ok(())` - The crawl finished or reached its limit
/// * `Err(SinkError)` - The sink rejected a document
pub async fn drain(
    crawler: &Crawler,
    output: &mut mpsc::Receiver<Document>,
    mut errors: Option<mpsc::Receiver<CrawlFailure>>,
    sink: &mut dyn DocumentSink,
    stats: &mut CrawlStatistics,
    limit: Option<u64>,
) -> SinkResult<()> {
    let mut ticker = tokio::time::interval(IDLE_POLL);
    let mut idle_rounds = 0;

    loop {
        tokio::select! {
            next = output.recv() => {
                let Some(document) = next else {
                    tracing::debug!("Output stream ended");
                    return Ok(());
                };
                idle_rounds = 0;
                if write(crawler, &document, sink, stats, limit)? {
                    return Ok(());
                }
            }
            Some(failure) = next_failure(&mut errors) => {
                stats.record_error(&failure);
            }
            _ = ticker.tick() => {
                if !crawler.is_idle() {
                    idle_rounds = 0;
                    continue;
                }
                idle_rounds += 1;
                if idle_rounds >= IDLE_ROUNDS {
                    tracing::info!("Frontier exhausted, crawl complete");
                    break;
                }
            }
        }
    }

    // Idle workers produce nothing new; take what is already buffered
    while let Ok(document) = output.try_recv() {
        if write(crawler, &document, sink, stats, limit)? {
            break;
        }
    }
    if let Some(errors) = errors.as_mut() {
        while let Ok(failure) = errors.try_recv() {
            stats.record_error(&failure);
        }
    }

    Ok(())
}

/// Writes one document; returns true once `limit` is reached
fn write(
    crawler: &Crawler,
    document: &Document,
    sink: &mut dyn DocumentSink,
    stats: &mut CrawlStatistics,
    limit: Option<u64>,
) -> SinkResult<bool> {
    sink.accept(document)?;
    stats.record_document(document);

    if stats.documents % 100 == 0 {
        tracing::info!(
            "Progress: {} documents, {} in frontier, {:.2} documents/sec",
            stats.documents,
            crawler.frontier().len(),
            stats.rate()
        );
    }

    let reached = limit.map_or(false, |limit| stats.documents >= limit);
    if reached {
        tracing::info!("Reached limit of {} documents", stats.documents);
    }
    Ok(reached)
}

/// Next failure from an optional error stream; pending forever without one
async fn next_failure(errors: &mut Option<mpsc::Receiver<CrawlFailure>>) -> Option<CrawlFailure> {
    match errors {
        Some(errors) => errors.recv().await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::Settings;
    use crate::decode::DecoderTable;
    use crate::proto::{FileProtocol, ProtocolTable};
    use tempfile::TempDir;
    use url::Url;

    fn file_crawler() -> (Crawler, mpsc::Receiver<Document>) {
        let mut protocols = ProtocolTable::new();
        protocols.insert("file", FileProtocol::new());
        Crawler::new(Settings {
            protocols,
            decoders: DecoderTable::standard(),
            ..Settings::default()
        })
    }

    #[tokio::test]
    async fn test_drain_stops_when_idle() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub").join("a.txt"), "a").unwrap();
        std::fs::write(dir.path().join("b.txt"), "b").unwrap();

        let (crawler, mut output) = file_crawler();
        let errors = crawler.errors();
        crawler.emit([Url::from_file_path(dir.path()).unwrap().to_string()]);
        let workers = crawler.run(2);

        let mut sink: Vec<Document> = Vec::new();
        let mut stats = CrawlStatistics::new();
        tokio::time::timeout(
            Duration::from_secs(10),
            drain(&crawler, &mut output, errors, &mut sink, &mut stats, None),
        )
        .await
        .unwrap()
        .unwrap();

        output.close();
        workers.join().await;

        // root, sub/, sub/a.txt, b.txt
        assert_eq!(sink.len(), 4);
        assert_eq!(stats.documents, 4);
        assert_eq!(stats.errors, 0);
    }

    #[tokio::test]
    async fn test_drain_respects_limit() {
        let dir = TempDir::new().unwrap();
        for i in 0..5 {
            std::fs::write(dir.path().join(format!("{}.txt", i)), "x").unwrap();
        }

        let (crawler, mut output) = file_crawler();
        crawler.emit([Url::from_file_path(dir.path()).unwrap().to_string()]);
        let workers = crawler.run(1);

        let mut sink: Vec<Document> = Vec::new();
        let mut stats = CrawlStatistics::new();
        drain(&crawler, &mut output, None, &mut sink, &mut stats, Some(2))
            .await
            .unwrap();

        output.close();
        workers.join().await;
        assert_eq!(sink.len(), 2);
    }

    #[tokio::test]
    async fn test_drain_counts_failures() {
        let (crawler, mut output) = file_crawler();
        let errors = crawler.errors();
        crawler.emit(["gopher://example.com/", "file:///definitely/not/here"]);
        let workers = crawler.run(1);

        let mut sink: Vec<Document> = Vec::new();
        let mut stats = CrawlStatistics::new();
        tokio::time::timeout(
            Duration::from_secs(10),
            drain(&crawler, &mut output, errors, &mut sink, &mut stats, None),
        )
        .await
        .unwrap()
        .unwrap();

        output.close();
        workers.join().await;

        assert!(sink.is_empty());
        assert_eq!(stats.errors, 2);
        assert_eq!(stats.config_errors, 1);
    }
}
