//! # Storage Backends
//!
//! The raw key-value substrate under the object store: opaque bytes in,
//! opaque bytes out, optional expiry. Three variants behind one trait:
//!
//! - [`InMemoryBackend`] — volatile in-process map, counter identifiers
//! - [`RedbBackend`] — embedded single-file store, counter identifiers
//!   persisted across restarts
//! - [`RemoteBackend`] — the objex daemon over HTTP, UUID identifiers
//!
//! Backends know nothing about value shapes or previews; encoding lives in
//! [`crate::store::ObjectStore`].

use std::time::Duration;

use async_trait::async_trait;

use crate::error::ObjexError;

mod memory;
mod redb_kv;
mod remote;

pub use memory::InMemoryBackend;
pub use redb_kv::RedbBackend;
pub use remote::RemoteBackend;

// =============================================================================
// BACKEND TRAIT
// =============================================================================

/// Raw storage capability: identifier generation plus byte-level
/// get/set/delete with optional expiry.
///
/// ## Contract
///
/// - `generate_id` never returns an identifier that currently maps to a
///   live value, and is safe under concurrent invocation.
/// - A `set` with a TTL makes the value unreadable once the TTL elapses;
///   a second `set` on the same key overwrites both payload and TTL.
/// - `get` after expiry behaves exactly like `get` of a missing key.
/// - Per-key linearizability only: a `get` issued after a `set` on the
///   same connection observes that value or a newer one. No cross-key
///   ordering is promised.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Produce a fresh, currently-unused identifier.
    fn generate_id(&self) -> Result<String, ObjexError>;

    /// Store a payload. `ttl` of `None` means the value never expires.
    async fn set(
        &self,
        key: &str,
        payload: &[u8],
        ttl: Option<Duration>,
    ) -> Result<(), ObjexError>;

    /// Fetch a payload if present and unexpired.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, ObjexError>;

    /// Remove a mapping. Returns whether a live mapping was removed.
    async fn delete(&self, key: &str) -> Result<bool, ObjexError>;

    /// Count of live (unexpired) entries. Used for status reporting.
    async fn len(&self) -> Result<usize, ObjexError>;
}
