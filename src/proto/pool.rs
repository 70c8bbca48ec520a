//! Per-host session pool for stateful remote protocols
//!
//! FTP and SFTP sessions cannot run concurrent commands, and logging in is
//! expensive, so each host gets exactly one lazily created session that lives
//! for the lifetime of the pool. There is no eviction or health check.

use crate::proto::{ProtoError, ProtoResult};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::Mutex as AsyncMutex;

/// One host's session slot; `None` until the first successful connect
type Slot<S> = Arc<AsyncMutex<Option<S>>>;

/// Map from `host:port` to a lock-guarded session
///
/// Two locks are involved:
/// - the pool-wide lock, held only for the check-then-insert of a host slot
/// - the per-host lock, held for the whole session operation
///
/// Unrelated hosts therefore never wait on each other, while operations on
/// one host run strictly one at a time.
pub struct SessionPool<S> {
    hosts: Mutex<HashMap<String, Slot<S>>>,
}

impl<S> Default for SessionPool<S> {
    fn default() -> Self {
        Self {
            hosts: Mutex::new(HashMap::new()),
        }
    }
}

impl<S: Send + 'static> SessionPool<S> {
    /// Creates an empty pool
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the slot for `key`, creating it atomically if needed
    fn slot(&self, key: &str) -> Slot<S> {
        let mut hosts = self.hosts.lock().unwrap_or_else(PoisonError::into_inner);
        hosts.entry(key.to_string()).or_default().clone()
    }

    /// Number of hosts that have a slot
    pub fn len(&self) -> usize {
        self.hosts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns whether no host has been used yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Runs `op` on the session for `key`
    ///
    /// The per-host lock is held for the duration. If the host has no live
    /// session yet, `connect` creates one first. Both closures run on the
    /// blocking thread pool since the underlying clients are synchronous.
    ///
    /// A failed connect leaves the slot empty so the next call retries. The
    /// session is returned to the slot after `op`, whatever `op` returned.
    ///
    /// # Arguments
    ///
    /// * `key` - The `host:port` pool key
    /// * `connect` - Opens and authenticates a new session
    /// * `op` - The operation to run on the session
    pub async fn with_session<C, F, T>(&self, key: &str, connect: C, op: F) -> ProtoResult<T>
    where
        C: FnOnce() -> ProtoResult<S> + Send + 'static,
        F: FnOnce(&mut S) -> ProtoResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let slot = self.slot(key);
        let mut guard = slot.lock_owned().await;
        let existing = guard.take();

        let joined = tokio::task::spawn_blocking(move || {
            let mut session = match existing {
                Some(session) => session,
                None => connect()?,
            };
            let result = op(&mut session);
            Ok::<_, ProtoError>((session, result))
        })
        .await
        .map_err(|source| ProtoError::Join {
            host: key.to_string(),
            source,
        })?;

        let (session, result) = joined?;
        *guard = Some(session);
        result
    }
}
