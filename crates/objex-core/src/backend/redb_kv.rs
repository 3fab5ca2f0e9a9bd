//! # redb-backed Key-Value Backend
//!
//! An embedded single-file backend using the redb database, providing:
//! - ACID transactions
//! - Crash safety (copy-on-write B-trees)
//! - MVCC (concurrent readers, single writer)
//! - Zero configuration
//!
//! Identifier allocation runs inside a write transaction and persists the
//! counter, so identifiers stay unique across restarts. Expiry is lazy,
//! matching the in-memory backend: an expired entry is evicted by the read
//! that discovers it.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};

use crate::backend::Backend;
use crate::clock::{Clock, SystemClock};
use crate::error::ObjexError;

/// Table for objects: key -> (absolute expiry in epoch millis, payload).
/// Expiry 0 means the entry never expires.
const OBJECTS: TableDefinition<&str, (u64, &[u8])> = TableDefinition::new("objects");

/// Table for metadata: key string -> value u64. Holds the id counter.
const METADATA: TableDefinition<&str, u64> = TableDefinition::new("metadata");

/// Metadata key for the last allocated identifier number.
const NEXT_ID_KEY: &str = "next_id";

/// Prefix for counter-generated identifiers.
const ID_PREFIX: &str = "obj_";

/// Minimum width of the counter portion, left-padded with zeros.
const ID_PAD_WIDTH: usize = 3;

// =============================================================================
// REDB BACKEND
// =============================================================================

/// A disk-backed key-value backend using redb.
///
/// Unlike [`crate::backend::InMemoryBackend`], stored objects survive a
/// process restart, and so does the identifier counter.
pub struct RedbBackend {
    /// The redb database handle.
    db: Database,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for RedbBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbBackend").finish_non_exhaustive()
    }
}

impl RedbBackend {
    /// Open or create a backend database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ObjexError> {
        Self::open_with_clock(path, Arc::new(SystemClock))
    }

    /// Open or create a backend database on an injected clock.
    pub fn open_with_clock(
        path: impl AsRef<Path>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ObjexError> {
        let db =
            Database::create(path.as_ref()).map_err(|e| ObjexError::IoError(e.to_string()))?;

        // Initialize tables if they don't exist
        {
            let write_txn = db
                .begin_write()
                .map_err(|e| ObjexError::IoError(e.to_string()))?;
            let _ = write_txn
                .open_table(OBJECTS)
                .map_err(|e| ObjexError::IoError(e.to_string()))?;
            let _ = write_txn
                .open_table(METADATA)
                .map_err(|e| ObjexError::IoError(e.to_string()))?;
            write_txn
                .commit()
                .map_err(|e| ObjexError::IoError(e.to_string()))?;
        }

        Ok(Self { db, clock })
    }

    /// Compact the database (optional optimization).
    pub fn compact(&mut self) -> Result<(), ObjexError> {
        self.db
            .compact()
            .map_err(|e| ObjexError::IoError(e.to_string()))?;
        Ok(())
    }

    /// Evict every expired entry now. Returns how many were reclaimed.
    pub fn purge_expired(&self) -> Result<usize, ObjexError> {
        let now = self.clock.now_millis();
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| ObjexError::IoError(e.to_string()))?;
        let purged = {
            let mut table = write_txn
                .open_table(OBJECTS)
                .map_err(|e| ObjexError::IoError(e.to_string()))?;
            let expired = expired_keys(&table, now)?;
            for key in &expired {
                table
                    .remove(key.as_str())
                    .map_err(|e| ObjexError::IoError(e.to_string()))?;
            }
            expired.len()
        };
        write_txn
            .commit()
            .map_err(|e| ObjexError::IoError(e.to_string()))?;
        Ok(purged)
    }

    fn remove_entry(&self, key: &str) -> Result<Option<(u64, Vec<u8>)>, ObjexError> {
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| ObjexError::IoError(e.to_string()))?;
        let removed = {
            let mut table = write_txn
                .open_table(OBJECTS)
                .map_err(|e| ObjexError::IoError(e.to_string()))?;
            table
                .remove(key)
                .map_err(|e| ObjexError::IoError(e.to_string()))?
                .map(|guard| {
                    let (expires_at, payload) = guard.value();
                    (expires_at, payload.to_vec())
                })
        };
        write_txn
            .commit()
            .map_err(|e| ObjexError::IoError(e.to_string()))?;
        Ok(removed)
    }
}

fn expired_keys(
    table: &impl ReadableTable<&'static str, (u64, &'static [u8])>,
    now: u64,
) -> Result<Vec<String>, ObjexError> {
    let mut expired = Vec::new();
    for entry in table.iter().map_err(|e| ObjexError::IoError(e.to_string()))? {
        let (key, value) = entry.map_err(|e| ObjexError::IoError(e.to_string()))?;
        let (expires_at, _) = value.value();
        if expires_at != 0 && now >= expires_at {
            expired.push(key.value().to_string());
        }
    }
    Ok(expired)
}

#[async_trait]
impl Backend for RedbBackend {
    fn generate_id(&self) -> Result<String, ObjexError> {
        // Allocate inside a write transaction: redb's single-writer model
        // serializes concurrent callers, and commit makes the counter
        // survive a restart before the identifier is ever handed out.
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| ObjexError::IoError(e.to_string()))?;
        let n = {
            let mut table = write_txn
                .open_table(METADATA)
                .map_err(|e| ObjexError::IoError(e.to_string()))?;
            let current = table
                .get(NEXT_ID_KEY)
                .map_err(|e| ObjexError::IoError(e.to_string()))?
                .map(|v| v.value())
                .unwrap_or(0);
            let n = current.saturating_add(1);
            table
                .insert(NEXT_ID_KEY, n)
                .map_err(|e| ObjexError::IoError(e.to_string()))?;
            n
        };
        write_txn
            .commit()
            .map_err(|e| ObjexError::IoError(e.to_string()))?;
        Ok(format!("{ID_PREFIX}{n:0width$}", width = ID_PAD_WIDTH))
    }

    async fn set(
        &self,
        key: &str,
        payload: &[u8],
        ttl: Option<Duration>,
    ) -> Result<(), ObjexError> {
        let expires_at = ttl
            .map(|ttl| {
                self.clock
                    .now_millis()
                    .saturating_add(ttl.as_millis() as u64)
            })
            .unwrap_or(0);

        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| ObjexError::IoError(e.to_string()))?;
        {
            let mut table = write_txn
                .open_table(OBJECTS)
                .map_err(|e| ObjexError::IoError(e.to_string()))?;
            table
                .insert(key, (expires_at, payload))
                .map_err(|e| ObjexError::IoError(e.to_string()))?;
        }
        write_txn
            .commit()
            .map_err(|e| ObjexError::IoError(e.to_string()))?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, ObjexError> {
        let now = self.clock.now_millis();

        let found = {
            let read_txn = self
                .db
                .begin_read()
                .map_err(|e| ObjexError::IoError(e.to_string()))?;
            let table = read_txn
                .open_table(OBJECTS)
                .map_err(|e| ObjexError::IoError(e.to_string()))?;
            table
                .get(key)
                .map_err(|e| ObjexError::IoError(e.to_string()))?
                .map(|guard| {
                    let (expires_at, payload) = guard.value();
                    (expires_at, payload.to_vec())
                })
        };

        match found {
            None => Ok(None),
            Some((expires_at, _)) if expires_at != 0 && now >= expires_at => {
                // Lazy eviction: reclaim the slot before reporting absence.
                self.remove_entry(key)?;
                Ok(None)
            }
            Some((_, payload)) => Ok(Some(payload)),
        }
    }

    async fn delete(&self, key: &str) -> Result<bool, ObjexError> {
        let now = self.clock.now_millis();
        match self.remove_entry(key)? {
            // Removing an already-expired entry reports false.
            Some((expires_at, _)) => Ok(expires_at == 0 || now < expires_at),
            None => Ok(false),
        }
    }

    async fn len(&self) -> Result<usize, ObjexError> {
        let now = self.clock.now_millis();
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| ObjexError::IoError(e.to_string()))?;
        let table = read_txn
            .open_table(OBJECTS)
            .map_err(|e| ObjexError::IoError(e.to_string()))?;

        let mut count = 0;
        for entry in table.iter().map_err(|e| ObjexError::IoError(e.to_string()))? {
            let (_, value) = entry.map_err(|e| ObjexError::IoError(e.to_string()))?;
            let (expires_at, _) = value.value();
            if expires_at == 0 || now < expires_at {
                count += 1;
            }
        }
        Ok(count)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use tempfile::tempdir;

    #[tokio::test]
    async fn set_get_roundtrip() {
        let temp = tempdir().expect("temp dir");
        let backend = RedbBackend::open(temp.path().join("test.redb")).expect("open db");

        backend.set("k", b"payload", None).await.expect("set");
        let got = backend.get("k").await.expect("get");
        assert_eq!(got.as_deref(), Some(b"payload".as_slice()));
    }

    #[tokio::test]
    async fn identifiers_survive_reopen() {
        let temp = tempdir().expect("temp dir");
        let db_path = temp.path().join("test.redb");

        // Phase 1: allocate ids and keep one mapping live
        {
            let backend = RedbBackend::open(&db_path).expect("open db");
            assert_eq!(backend.generate_id().expect("id"), "obj_001");
            assert_eq!(backend.generate_id().expect("id"), "obj_002");
            backend.set("obj_002", b"live", None).await.expect("set");
        }

        // Phase 2: the counter must not rewind onto the live mapping
        {
            let backend = RedbBackend::open(&db_path).expect("reopen db");
            assert_eq!(backend.generate_id().expect("id"), "obj_003");
            let got = backend.get("obj_002").await.expect("get");
            assert_eq!(got.as_deref(), Some(b"live".as_slice()));
        }
    }

    #[tokio::test]
    async fn payloads_survive_reopen() {
        let temp = tempdir().expect("temp dir");
        let db_path = temp.path().join("test.redb");

        {
            let backend = RedbBackend::open(&db_path).expect("open db");
            backend.set("k", b"persistent", None).await.expect("set");
        }

        {
            let backend = RedbBackend::open(&db_path).expect("reopen db");
            let got = backend.get("k").await.expect("get");
            assert_eq!(got.as_deref(), Some(b"persistent".as_slice()));
        }
    }

    #[tokio::test]
    async fn entry_expires_and_is_evicted() {
        let temp = tempdir().expect("temp dir");
        let clock = Arc::new(ManualClock::new(1_000));
        let backend =
            RedbBackend::open_with_clock(temp.path().join("test.redb"), clock.clone())
                .expect("open db");

        backend
            .set("k", b"v", Some(Duration::from_secs(5)))
            .await
            .expect("set");

        clock.advance(Duration::from_millis(4_999));
        assert!(backend.get("k").await.expect("get").is_some());

        clock.advance(Duration::from_millis(1));
        assert!(backend.get("k").await.expect("get").is_none());
        // The read evicted the row, not just masked it.
        assert_eq!(backend.len().await.expect("len"), 0);
    }

    #[tokio::test]
    async fn overwrite_replaces_payload_and_ttl() {
        let temp = tempdir().expect("temp dir");
        let clock = Arc::new(ManualClock::new(0));
        let backend =
            RedbBackend::open_with_clock(temp.path().join("test.redb"), clock.clone())
                .expect("open db");

        backend
            .set("k", b"short-lived", Some(Duration::from_secs(5)))
            .await
            .expect("set");
        backend.set("k", b"forever", None).await.expect("overwrite");

        clock.advance(Duration::from_secs(60));
        let got = backend.get("k").await.expect("get");
        assert_eq!(got.as_deref(), Some(b"forever".as_slice()));
    }

    #[tokio::test]
    async fn delete_reports_whether_removed() {
        let temp = tempdir().expect("temp dir");
        let backend = RedbBackend::open(temp.path().join("test.redb")).expect("open db");

        backend.set("k", b"v", None).await.expect("set");
        assert!(backend.delete("k").await.expect("delete"));
        assert!(!backend.delete("k").await.expect("delete again"));
    }

    #[tokio::test]
    async fn purge_reclaims_expired_rows() {
        let temp = tempdir().expect("temp dir");
        let clock = Arc::new(ManualClock::new(0));
        let backend =
            RedbBackend::open_with_clock(temp.path().join("test.redb"), clock.clone())
                .expect("open db");

        backend
            .set("a", b"1", Some(Duration::from_secs(1)))
            .await
            .expect("set");
        backend.set("b", b"2", None).await.expect("set");

        clock.advance(Duration::from_secs(2));
        assert_eq!(backend.purge_expired().expect("purge"), 1);
        assert_eq!(backend.len().await.expect("len"), 1);
    }
}
