//! Deduplicating work queue of locations to crawl
//!
//! The frontier remembers every location it has ever accepted. A location is
//! queued at most once, no matter how often or from how many workers it is
//! emitted. The queue is bounded; when it is full, the enqueue is handed to a
//! separate task so that the emitting worker never waits on its own queue.
//! Under sustained pressure those pending sends grow without bound.

use async_channel::{Receiver, Sender, TrySendError};
use dashmap::DashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Default queue capacity
pub const DEFAULT_QUEUE_BUFFER: usize = 65536;

/// Seen set plus bounded FIFO of locations
#[derive(Debug)]
pub struct Frontier {
    seen: DashSet<String>,
    tx: Sender<String>,
    rx: Receiver<String>,
    /// Sends parked in overflow tasks
    overflow: Arc<AtomicUsize>,
}

impl Default for Frontier {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_BUFFER)
    }
}

impl Frontier {
    /// Creates an empty frontier whose queue holds up to `capacity` locations
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = async_channel::bounded(capacity.max(1));
        Self {
            seen: DashSet::new(),
            tx,
            rx,
            overflow: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Queues every location not seen before
    ///
    /// Already seen locations are silently dropped. Never blocks: if the
    /// queue is full the send continues on a background task.
    pub fn emit<I, S>(&self, locations: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for location in locations {
            let location = location.into();
            if !self.seen.insert(location.clone()) {
                continue;
            }

            match self.tx.try_send(location) {
                Ok(()) => {}
                Err(TrySendError::Full(location)) => self.send_later(location),
                Err(TrySendError::Closed(location)) => {
                    tracing::debug!("Frontier closed, dropping {}", location);
                }
            }
        }
    }

    fn send_later(&self, location: String) {
        let tx = self.tx.clone();
        let overflow = self.overflow.clone();
        overflow.fetch_add(1, Ordering::SeqCst);
        tracing::trace!("Queue full, deferring {}", location);

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if tx.send(location).await.is_err() {
                        tracing::debug!("Frontier closed before deferred send");
                    }
                    overflow.fetch_sub(1, Ordering::SeqCst);
                });
            }
            Err(_) => {
                std::thread::spawn(move || {
                    if tx.send_blocking(location).is_err() {
                        tracing::debug!("Frontier closed before deferred send");
                    }
                    overflow.fetch_sub(1, Ordering::SeqCst);
                });
            }
        }
    }

    /// Waits for the next location
    ///
    /// Returns None once the frontier is closed and the queue has drained.
    pub async fn recv(&self) -> Option<String> {
        self.rx.recv().await.ok()
    }

    /// Closes the queue; pending locations can still be received
    ///
    /// Returns false if it was already closed.
    pub fn close(&self) -> bool {
        self.tx.close()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Number of queued locations, including deferred sends
    pub fn len(&self) -> usize {
        self.rx.len() + self.overflow.load(Ordering::SeqCst)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of distinct locations ever accepted
    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }
}
