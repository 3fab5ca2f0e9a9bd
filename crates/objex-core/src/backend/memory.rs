//! # In-Memory Backend
//!
//! The volatile default: a lock-guarded map of key to payload plus optional
//! absolute expiry. Identifiers come from a process-local counter, so they
//! are human-friendly (`obj_001`) but only unique within one process.
//!
//! Expiry is lazy: an expired entry is evicted the first time a read
//! touches it. [`InMemoryBackend::purge_expired`] exists for callers that
//! want eager reclamation.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::backend::Backend;
use crate::clock::{Clock, SystemClock};
use crate::error::ObjexError;

/// Prefix for counter-generated identifiers.
const ID_PREFIX: &str = "obj_";

/// Minimum width of the counter portion, left-padded with zeros.
const ID_PAD_WIDTH: usize = 3;

// =============================================================================
// ENTRY
// =============================================================================

#[derive(Debug, Clone)]
struct Entry {
    payload: Vec<u8>,
    /// Absolute expiry in epoch milliseconds. `None` never expires.
    expires_at: Option<u64>,
}

impl Entry {
    fn is_expired(&self, now: u64) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

// =============================================================================
// IN-MEMORY BACKEND
// =============================================================================

/// Volatile in-process backend.
///
/// All state lives behind one mutex; the identifier counter is a separate
/// atomic so concurrent `generate_id` calls never contend on the map lock
/// and never collide.
pub struct InMemoryBackend {
    entries: Mutex<HashMap<String, Entry>>,
    next_id: AtomicU64,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for InMemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBackend")
            .field("entries", &self.entries.lock().len())
            .field("next_id", &self.next_id.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBackend {
    /// Create a backend on the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create a backend on an injected clock. Tests pass a
    /// [`crate::clock::ManualClock`] to drive expiry deterministically.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
            clock,
        }
    }

    /// Evict every expired entry now instead of waiting for reads to
    /// touch them. Returns how many entries were reclaimed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now_millis();
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }
}

#[async_trait]
impl Backend for InMemoryBackend {
    fn generate_id(&self) -> Result<String, ObjexError> {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst).saturating_add(1);
        Ok(format!("{ID_PREFIX}{n:0width$}", width = ID_PAD_WIDTH))
    }

    async fn set(
        &self,
        key: &str,
        payload: &[u8],
        ttl: Option<Duration>,
    ) -> Result<(), ObjexError> {
        let expires_at = ttl.map(|ttl| {
            self.clock
                .now_millis()
                .saturating_add(ttl.as_millis() as u64)
        });
        self.entries.lock().insert(
            key.to_string(),
            Entry {
                payload: payload.to_vec(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, ObjexError> {
        let now = self.clock.now_millis();
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(entry) if entry.is_expired(now) => {
                // Lazy eviction: reclaim the slot at read time.
                entries.remove(key);
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.payload.clone())),
            None => Ok(None),
        }
    }

    async fn delete(&self, key: &str) -> Result<bool, ObjexError> {
        let now = self.clock.now_millis();
        match self.entries.lock().remove(key) {
            // Removing an already-expired entry reports false: the caller
            // could not have read it either.
            Some(entry) => Ok(!entry.is_expired(now)),
            None => Ok(false),
        }
    }

    async fn len(&self) -> Result<usize, ObjexError> {
        let now = self.clock.now_millis();
        let entries = self.entries.lock();
        Ok(entries
            .values()
            .filter(|entry| !entry.is_expired(now))
            .count())
    }
}

// =============================================================================
// TESTS
// =============================================================================
