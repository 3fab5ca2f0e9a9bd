//! # Object Store
//!
//! The unit of "persist a value, get an identifier back". Values are
//! serialized to canonical JSON bytes, written to the configured backend
//! under a fresh identifier, and decoded back into [`serde_json::Value`]
//! trees on read.
//!
//! ## Lossy By Design
//!
//! The store is short-lived scratch space for agent workflows, not a
//! durable object graph. Encoding preserves data shape only: set-like
//! collections come back as sequences, numeric subtypes collapse to JSON
//! numbers, and custom type identity is gone after a round-trip. Anything
//! `serde` cannot represent fails with an encoding error — the store does
//! not guess.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use crate::backend::Backend;
use crate::error::ObjexError;

/// Default lifetime of a stored object in seconds.
pub const DEFAULT_TTL_SECONDS: i64 = 600;

// =============================================================================
// OBJECT STORE
// =============================================================================

/// Encoding/decoding layer over exactly one [`Backend`].
///
/// Cheap to clone; clones share the backend and configuration.
#[derive(Clone)]
pub struct ObjectStore {
    backend: Arc<dyn Backend>,
    default_ttl: Option<Duration>,
}

impl std::fmt::Debug for ObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStore")
            .field("default_ttl", &self.default_ttl)
            .finish_non_exhaustive()
    }
}

impl ObjectStore {
    /// Create a store with the default TTL of [`DEFAULT_TTL_SECONDS`].
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self::with_ttl_seconds(backend, DEFAULT_TTL_SECONDS)
    }

    /// Create a store with an explicit default TTL. Zero or negative
    /// means stored objects never expire.
    #[must_use]
    pub fn with_ttl_seconds(backend: Arc<dyn Backend>, ttl_seconds: i64) -> Self {
        let default_ttl = (ttl_seconds > 0).then(|| Duration::from_secs(ttl_seconds as u64));
        Self {
            backend,
            default_ttl,
        }
    }

    /// The TTL applied by [`ObjectStore::put`], if any.
    #[must_use]
    pub fn default_ttl(&self) -> Option<Duration> {
        self.default_ttl
    }

    /// Serialize a value and store it under a fresh identifier with the
    /// default TTL.
    ///
    /// Accepts anything `Serialize`: scalars, sequences, mappings,
    /// set-like collections (stored as sequences) and structured records
    /// (stored as field-name to value mappings).
    pub async fn put<T>(&self, value: &T) -> Result<String, ObjexError>
    where
        T: Serialize + ?Sized,
    {
        self.put_with_ttl(value, self.default_ttl).await
    }

    /// Serialize a value and store it with an explicit lifetime,
    /// bypassing the configured default.
    pub async fn put_with_ttl<T>(
        &self,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<String, ObjexError>
    where
        T: Serialize + ?Sized,
    {
        let bytes =
            serde_json::to_vec(value).map_err(|e| ObjexError::EncodingError(e.to_string()))?;
        let id = self.backend.generate_id()?;
        self.backend.set(&id, &bytes, ttl).await?;
        Ok(id)
    }

    /// Fetch and decode a stored value. `None` when the identifier is
    /// absent or expired; a present-but-corrupt payload is a
    /// [`ObjexError::DecodingError`], not absence.
    pub async fn get(&self, id: &str) -> Result<Option<Value>, ObjexError> {
        match self.backend.get(id).await? {
            None => Ok(None),
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| ObjexError::DecodingError(e.to_string())),
        }
    }

    /// Fetch a stored value, turning absence into [`ObjexError::NotFound`].
    pub async fn get_required(&self, id: &str) -> Result<Value, ObjexError> {
        self.get(id)
            .await?
            .ok_or_else(|| ObjexError::NotFound(id.to_string()))
    }

    /// Remove a stored value. Returns whether a live value was removed.
    pub async fn delete(&self, id: &str) -> Result<bool, ObjexError> {
        self.backend.delete(id).await
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::backend::InMemoryBackend;
    use crate::clock::ManualClock;
    use serde_json::json;
    use std::collections::BTreeSet;

    fn volatile_store() -> ObjectStore {
        ObjectStore::with_ttl_seconds(Arc::new(InMemoryBackend::new()), 0)
    }

    #[tokio::test]
    async fn put_get_roundtrip_preserves_shape() {
        let store = volatile_store();
        let value = json!({
            "name": "indexing",
            "nodes": [{"kind": "reader", "batch": 32}, {"kind": "writer"}],
            "enabled": true,
            "threshold": null,
        });

        let id = store.put(&value).await.expect("put");
        let got = store.get(&id).await.expect("get").expect("present");
        assert_eq!(got, value);
    }

    #[tokio::test]
    async fn structured_records_encode_as_mappings() {
        #[derive(Serialize)]
        struct Pipeline {
            name: String,
            nodes: Vec<String>,
        }

        let store = volatile_store();
        let record = Pipeline {
            name: "ingest".to_string(),
            nodes: vec!["reader".to_string(), "splitter".to_string()],
        };

        let id = store.put(&record).await.expect("put");
        let got = store.get(&id).await.expect("get").expect("present");
        assert_eq!(got, json!({"name": "ingest", "nodes": ["reader", "splitter"]}));
    }

    #[tokio::test]
    async fn set_like_collections_become_sequences() {
        let store = volatile_store();
        let set: BTreeSet<&str> = ["reader", "writer"].into_iter().collect();

        let id = store.put(&set).await.expect("put");
        let got = store.get(&id).await.expect("get").expect("present");
        assert_eq!(got, json!(["reader", "writer"]));
    }

    #[tokio::test]
    async fn unencodable_value_is_an_encoding_error() {
        let store = volatile_store();
        let err = store.put(&f64::NAN).await.expect_err("must fail");
        assert!(matches!(err, ObjexError::EncodingError(_)));
    }

    #[tokio::test]
    async fn delete_then_get_is_absent() {
        let store = volatile_store();
        let id = store.put(&json!([1, 2, 3])).await.expect("put");

        assert!(store.delete(&id).await.expect("delete"));
        assert!(store.get(&id).await.expect("get").is_none());

        let err = store.get_required(&id).await.expect_err("must be gone");
        assert!(matches!(err, ObjexError::NotFound(_)));
    }

    #[tokio::test]
    async fn default_ttl_expires_objects() {
        let clock = Arc::new(ManualClock::new(0));
        let backend = Arc::new(InMemoryBackend::with_clock(clock.clone()));
        let store = ObjectStore::with_ttl_seconds(backend, 5);

        let id = store.put(&json!("ephemeral")).await.expect("put");
        assert!(store.get(&id).await.expect("get").is_some());

        clock.advance(Duration::from_secs(5));
        assert!(store.get(&id).await.expect("get").is_none());
    }

    #[tokio::test]
    async fn zero_ttl_means_no_expiry() {
        let clock = Arc::new(ManualClock::new(0));
        let backend = Arc::new(InMemoryBackend::with_clock(clock.clone()));
        let store = ObjectStore::with_ttl_seconds(backend, 0);

        let id = store.put(&json!("durable")).await.expect("put");
        clock.advance(Duration::from_secs(86_400));
        assert!(store.get(&id).await.expect("get").is_some());
    }

    #[tokio::test]
    async fn put_with_ttl_overrides_default() {
        let clock = Arc::new(ManualClock::new(0));
        let backend = Arc::new(InMemoryBackend::with_clock(clock.clone()));
        let store = ObjectStore::with_ttl_seconds(backend, 0);

        let id = store
            .put_with_ttl(&json!("ephemeral"), Some(Duration::from_secs(2)))
            .await
            .expect("put");
        clock.advance(Duration::from_secs(3));
        assert!(store.get(&id).await.expect("get").is_none());
    }

    #[tokio::test]
    async fn corrupt_payload_is_a_decoding_error() {
        let backend = Arc::new(InMemoryBackend::new());
        let store = ObjectStore::with_ttl_seconds(backend.clone(), 0);

        use crate::backend::Backend as _;
        backend
            .set("obj_999", b"not json at all {", None)
            .await
            .expect("raw set");

        let err = store.get("obj_999").await.expect_err("must fail");
        assert!(matches!(err, ObjexError::DecodingError(_)));
    }
}
