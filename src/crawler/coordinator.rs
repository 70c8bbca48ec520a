//! Crawler coordinator - worker orchestration
//!
//! A [`Crawler`] owns the protocol and decoder tables, the frontier and the
//! sending half of the output stream. Each worker repeatedly:
//! 1. Takes one location from the frontier
//! 2. Fetches it through the protocol registered for its scheme
//! 3. Decodes the body if a decoder is registered for its content type
//! 4. Sends the document to the output stream
//! 5. Feeds the document's resolved links back into the frontier
//!
//! Closing (or dropping) the output receiver is the shutdown signal. Workers
//! notice it before each dequeue, while waiting on the frontier, and when a
//! send fails. In-flight fetches are not interrupted.

use crate::config::Config;
use crate::crawler::{Frontier, Settings};
use crate::decode::DecoderTable;
use crate::document::Document;
use crate::output::{self, CrawlStatistics, DocumentSink};
use crate::proto::{Fetched, ProtoError, ProtocolTable};
use crate::CrawlError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use url::Url;

/// A location that could not be crawled, as reported on the error stream
#[derive(Debug)]
pub struct CrawlFailure {
    pub location: String,
    pub error: CrawlError,
}

struct Inner {
    protocols: ProtocolTable,
    decoders: DecoderTable,
    frontier: Frontier,
    output: mpsc::Sender<Document>,
    errors: OnceLock<mpsc::Sender<CrawlFailure>>,
    error_buffer: usize,
    /// Workers currently between dequeue and emit
    busy: AtomicUsize,
}

/// Cheaply cloneable handle to a running crawl
#[derive(Clone)]
pub struct Crawler {
    inner: Arc<Inner>,
}

impl Crawler {
    /// Creates a crawler and the receiving half of its output stream
    ///
    /// # Example
    ///
    /// ```no_run
    /// use sumi_trawl::{Crawler, Settings};
    ///
    /// # async fn example() {
    /// let (crawler, mut output) = Crawler::new(Settings::default());
    /// crawler.emit(["https://example.com/"]);
    /// let workers = crawler.run(4);
    ///
    /// while let Some(document) = output.recv().await {
    ///     println!("{} {:?}", document.location, document.title);
    /// }
    /// workers.join().await;
    /// # }
    /// ```
    pub fn new(settings: Settings) -> (Self, mpsc::Receiver<Document>) {
        let (output, receiver) = mpsc::channel(settings.output_buffer.max(1));
        let inner = Inner {
            protocols: settings.protocols,
            decoders: settings.decoders,
            frontier: Frontier::new(settings.queue_buffer),
            output,
            errors: OnceLock::new(),
            error_buffer: settings.error_buffer.max(1),
            busy: AtomicUsize::new(0),
        };
        (
            Self {
                inner: Arc::new(inner),
            },
            receiver,
        )
    }

    /// Enables the error stream and returns its receiver
    ///
    /// Only the first call returns a receiver. Failures are dropped when the
    /// stream is full or was never enabled; they are logged either way.
    pub fn errors(&self) -> Option<mpsc::Receiver<CrawlFailure>> {
        let (tx, rx) = mpsc::channel(self.inner.error_buffer);
        self.inner.errors.set(tx).ok().map(|()| rx)
    }

    /// Queues locations that have not been seen before
    pub fn emit<I, S>(&self, locations: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inner.frontier.emit(locations);
    }

    pub fn frontier(&self) -> &Frontier {
        &self.inner.frontier
    }

    /// Stops handing out new locations; workers exit once the queue drains
    pub fn close(&self) {
        self.inner.frontier.close();
    }

    /// Returns true when nothing is queued and no worker holds a location
    ///
    /// A worker can be between dequeue and bookkeeping, so callers should
    /// confirm over more than one observation.
    pub fn is_idle(&self) -> bool {
        self.inner.busy.load(Ordering::SeqCst) == 0 && self.inner.frontier.is_empty()
    }

    /// Fetches `location` through the protocol for its scheme, without
    /// decoding
    ///
    /// An unknown scheme fails before any I/O.
    pub async fn fetch(&self, location: &str) -> Result<Fetched, CrawlError> {
        let url = Url::parse(location).map_err(|source| CrawlError::InvalidLocation {
            location: location.to_string(),
            source,
        })?;
        let protocol = self
            .inner
            .protocols
            .get(url.scheme())
            .ok_or_else(|| ProtoError::UnknownScheme(url.scheme().to_string()))?;

        Ok(protocol.get(&url).await?)
    }

    /// Fetches and decodes `location`
    ///
    /// The body is dropped before this returns, whatever the outcome. A
    /// decode failure carries the partially decoded document.
    pub async fn crawl_one(&self, location: &str) -> Result<Document, CrawlError> {
        let Fetched { mut document, body } = self.fetch(location).await?;

        if let Some(mut body) = body {
            match self.inner.decoders.get(&document.content_type) {
                Some(decoder) => {
                    if let Err(source) = decoder.decode(&mut document, &mut body).await {
                        return Err(CrawlError::Decode {
                            partial: Box::new(document),
                            source,
                        });
                    }
                }
                None => {
                    tracing::trace!(
                        "No decoder for {:?} at {}",
                        document.content_type,
                        document.location
                    );
                }
            }
        }

        Ok(document)
    }

    /// Spawns `n` workers on the current runtime
    pub fn run(&self, n: usize) -> Workers {
        tracing::info!("Starting {} crawl workers", n);
        let handles = (0..n)
            .map(|id| {
                let crawler = self.clone();
                tokio::spawn(async move { crawler.work(id).await })
            })
            .collect();
        Workers { handles }
    }

    async fn work(self, id: usize) {
        tracing::debug!("Worker {} started", id);
        let output = &self.inner.output;

        loop {
            if output.is_closed() {
                break;
            }

            let location = tokio::select! {
                _ = output.closed() => break,
                next = self.inner.frontier.recv() => match next {
                    Some(location) => location,
                    None => break,
                },
            };
            let _busy = BusyGuard::enter(&self.inner.busy);

            tracing::debug!("Worker {} crawling {}", id, location);
            let document = match self.crawl_one(&location).await {
                Ok(document) => document,
                Err(error) => {
                    tracing::warn!("Failed to crawl {}: {}", location, error);
                    self.report(location, error);
                    continue;
                }
            };

            let links = document.abs_links();
            if output.send(document).await.is_err() {
                break;
            }
            self.inner.frontier.emit(links);
        }

        tracing::debug!("Worker {} stopped", id);
    }

    fn report(&self, location: String, error: CrawlError) {
        if let Some(errors) = self.inner.errors.get() {
            if errors.try_send(CrawlFailure { location, error }).is_err() {
                tracing::debug!("Error stream full or closed, dropping failure");
            }
        }
    }
}

/// Marks a worker busy for as long as it is alive
struct BusyGuard<'a>(&'a AtomicUsize);

impl<'a> BusyGuard<'a> {
    fn enter(count: &'a AtomicUsize) -> Self {
        count.fetch_add(1, Ordering::SeqCst);
        Self(count)
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Handles of spawned workers
#[derive(Debug)]
pub struct Workers {
    handles: Vec<JoinHandle<()>>,
}

impl Workers {
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Waits for every worker to exit
    pub async fn join(self) {
        for result in futures::future::join_all(self.handles).await {
            if let Err(e) = result {
                tracing::error!("Crawl worker panicked: {}", e);
            }
        }
    }
}

/// Runs a complete crawl from configuration
///
/// This function:
/// 1. Builds the protocol and decoder tables from `config`
/// 2. Seeds the frontier and starts the workers
/// 3. Drains documents into `sink` until the crawl goes idle, `limit`
///    documents were written, or Ctrl-C is received
/// 4. Closes the output stream and waits for the workers
///
/// # Arguments
///
/// * `config` - The validated configuration
/// * `sink` - Where documents are written
/// * `limit` - Optional maximum number of documents
///
/// # Returns
///
/// * `Ok(CrawlStatistics)` - Counts for the finished crawl
/// * `Err(TrawlError)` - Building the tables or writing to the sink failed
pub async fn run_crawl(
    config: &Config,
    sink: &mut dyn DocumentSink,
    limit: Option<u64>,
) -> crate::Result<CrawlStatistics> {
    let (crawler, mut documents) = Crawler::new(config.settings()?);
    let failures = crawler.errors();

    crawler.emit(config.seeds.iter().map(String::as_str));
    tracing::info!("Seeded frontier with {} locations", crawler.frontier().len());
    let workers = crawler.run(config.crawler.workers);

    let mut stats = CrawlStatistics::new();
    let drained = tokio::select! {
        result = output::drain(&crawler, &mut documents, failures, sink, &mut stats, limit) => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted, stopping workers");
            Ok(())
        }
    };

    documents.close();
    crawler.close();
    drop(documents);
    workers.join().await;

    drained?;
    sink.finish()?;
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::{DecodeError, DecodeResult, Decoder};
    use crate::proto::{Body, ProtoResult, Protocol};
    use crate::DocumentKind;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::time::Duration;

    /// Serves a fixed set of pages from memory
    struct StaticProtocol {
        pages: HashMap<String, (&'static str, &'static str)>,
        hits: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Protocol for StaticProtocol {
        async fn get(&self, location: &Url) -> ProtoResult<Fetched> {
            self.hits.fetch_add(1, Ordering::SeqCst);
            let (content_type, body) =
                self.pages.get(location.as_str()).ok_or_else(|| ProtoError::Io {
                    operation: "get",
                    location: location.to_string(),
                    source: std::io::Error::from(std::io::ErrorKind::NotFound),
                })?;
            let mut document = Document::new(location.clone());
            document.content_type = content_type.to_string();
            document.size = Some(body.len() as u64);
            let body: Body = Box::pin(std::io::Cursor::new(body.as_bytes().to_vec()));
            Ok(Fetched::with_body(document, body))
        }
    }

    struct FailingDecoder;

    #[async_trait]
    impl Decoder for FailingDecoder {
        async fn decode(&self, document: &mut Document, _body: &mut Body) -> DecodeResult<()> {
            document.title = Some("half done".to_string());
            Err(DecodeError::Io(std::io::Error::from(std::io::ErrorKind::UnexpectedEof)))
        }
    }

    fn settings(pages: &[(&str, &'static str, &'static str)]) -> (Settings, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let protocol = StaticProtocol {
            pages: pages
                .iter()
                .map(|(location, content_type, body)| (location.to_string(), (*content_type, *body)))
                .collect(),
            hits: hits.clone(),
        };
        let mut protocols = ProtocolTable::new();
        protocols.insert("mem", protocol);

        let settings = Settings {
            protocols,
            decoders: DecoderTable::standard(),
            ..Settings::default()
        };
        (settings, hits)
    }

    #[tokio::test]
    async fn test_unknown_scheme_fails_without_io() {
        let (settings, hits) = settings(&[]);
        let (crawler, _output) = Crawler::new(settings);

        let err = crawler.fetch("gopher://x").await.unwrap_err();

        assert!(matches!(
            err,
            CrawlError::Protocol(ProtoError::UnknownScheme(ref scheme)) if scheme == "gopher"
        ));
        assert!(err.is_config());
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_invalid_location_is_config_error() {
        let (settings, _) = settings(&[]);
        let (crawler, _output) = Crawler::new(settings);

        let err = crawler.crawl_one("not a url").await.unwrap_err();
        assert!(matches!(err, CrawlError::InvalidLocation { .. }));
        assert!(err.is_config());
    }

    #[tokio::test]
    async fn test_crawl_one_decodes_html() {
        let (settings, _) = settings(&[(
            "mem://site/index.html",
            "text/html",
            "<title>Index</title><p>hello <a href='next.html'>next</a></p>",
        )]);
        let (crawler, _output) = Crawler::new(settings);

        let doc = crawler.crawl_one("mem://site/index.html").await.unwrap();

        assert_eq!(doc.title.as_deref(), Some("Index"));
        assert_eq!(doc.links, vec!["next.html"]);
        assert_eq!(doc.abs_links(), vec!["mem://site/next.html"]);
    }

    #[tokio::test]
    async fn test_unmapped_content_type_passes_through() {
        let (settings, _) = settings(&[("mem://site/data.bin", "application/x-custom", "<title>no</title>")]);
        let (crawler, _output) = Crawler::new(settings);

        let doc = crawler.crawl_one("mem://site/data.bin").await.unwrap();

        assert_eq!(doc.kind, DocumentKind::File);
        assert!(doc.title.is_none());
        assert!(doc.links.is_empty());
    }

    #[tokio::test]
    async fn test_decode_error_keeps_partial_document() {
        let (mut settings, _) = settings(&[("mem://site/broken", "text/broken", "x")]);
        settings.decoders.insert("text/broken", FailingDecoder);
        let (crawler, _output) = Crawler::new(settings);

        let err = crawler.crawl_one("mem://site/broken").await.unwrap_err();

        match err {
            CrawlError::Decode { partial, .. } => {
                assert_eq!(partial.title.as_deref(), Some("half done"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_workers_follow_links_once() {
        let (settings, hits) = settings(&[
            (
                "mem://site/",
                "text/html",
                "<a href='a'>a</a><a href='b'>b</a><a href='a'>again</a>",
            ),
            ("mem://site/a", "text/html", "<a href='/'>home</a><a href='b'>b</a>"),
            ("mem://site/b", "text/html", "<a href='missing'>gone</a>"),
        ]);
        let (crawler, mut output) = Crawler::new(settings);
        let mut errors = crawler.errors().unwrap();
        assert!(crawler.errors().is_none());

        crawler.emit(["mem://site/"]);
        let workers = crawler.run(3);

        let mut locations = Vec::new();
        for _ in 0..3 {
            let doc = tokio::time::timeout(Duration::from_secs(5), output.recv())
                .await
                .unwrap()
                .unwrap();
            locations.push(doc.location.to_string());
        }
        let failure = tokio::time::timeout(Duration::from_secs(5), errors.recv())
            .await
            .unwrap()
            .unwrap();

        locations.sort();
        assert_eq!(locations, vec!["mem://site/", "mem://site/a", "mem://site/b"]);
        assert_eq!(failure.location, "mem://site/missing");
        assert!(!failure.error.is_config());

        output.close();
        tokio::time::timeout(Duration::from_secs(5), workers.join())
            .await
            .unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_idle_workers_exit_when_output_closes() {
        let (settings, _) = settings(&[]);
        let (crawler, output) = Crawler::new(settings);
        let workers = crawler.run(2);
        assert_eq!(workers.len(), 2);

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(crawler.is_idle());
        drop(output);

        tokio::time::timeout(Duration::from_secs(5), workers.join())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_workers_exit_when_frontier_closes() {
        let (settings, _) = settings(&[]);
        let (crawler, _output) = Crawler::new(settings);
        let workers = crawler.run(2);

        crawler.close();

        tokio::time::timeout(Duration::from_secs(5), workers.join())
            .await
            .unwrap();
    }
}
