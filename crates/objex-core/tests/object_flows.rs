//! # Object Flow Tests
//!
//! End-to-end scenarios across the public API.
//!
//! ## Flows
//! - Persistence: large payloads survive intact, previews stay bounded
//! - Exploration: path traversal, slicing and search on stored values
//! - Referencing: `@id.path` substitution through intercepted calls
//! - Identifiers: uniqueness under concurrency, persistence across reopen
//! - Expiry: lazily observed deadlines

use std::sync::Arc;

use objex_core::{InMemoryBackend, ObjectStore};

fn memory_store() -> ObjectStore {
    ObjectStore::with_ttl_seconds(Arc::new(InMemoryBackend::new()), 0)
}

// =============================================================================
// FLOW: PERSISTENCE
// =============================================================================

mod persistence {
    use super::*;
    use objex_core::{Explorer, TRUNCATION_MARKER};
    use serde_json::json;

    /// A 10,000 character result can be persisted and retrieved in full,
    /// even though its preview is truncated.
    #[tokio::test]
    async fn large_payload_round_trips_in_full() {
        let store = memory_store();
        let explorer = Explorer::new(store.clone());
        let payload = "abcdefghij".repeat(1_000);

        let id = store.put(&json!(payload)).await.expect("put");

        let preview = explorer.preview(&id, None).await.expect("preview");
        assert!(preview.truncated);
        assert!(preview.text.ends_with(TRUNCATION_MARKER));
        assert!(preview.text.chars().count() < payload.chars().count());

        let full = explorer.fetch(&id, None).await.expect("fetch");
        assert!(!full.truncated);
        assert_eq!(full.text, payload);
        assert_eq!(full.text.chars().count(), 10_000);
    }

    /// Truncation is presentational: after a truncated preview the stored
    /// value is still byte-for-byte intact.
    #[tokio::test]
    async fn preview_never_rewrites_the_stored_value() {
        let store = memory_store();
        let explorer = Explorer::new(store.clone());
        let wide: Vec<u64> = (0..200).collect();

        let id = store.put(&json!(wide)).await.expect("put");
        let preview = explorer.preview(&id, None).await.expect("preview");
        assert!(preview.truncated);

        let stored = store.get_required(&id).await.expect("get");
        assert_eq!(stored, json!((0..200).collect::<Vec<u64>>()));
    }
}

// =============================================================================
// FLOW: EXPLORATION
// =============================================================================

mod exploration {
    use super::*;
    use objex_core::{Explorer, ObjexError};
    use serde_json::json;

    async fn sample() -> (Explorer, String) {
        let store = memory_store();
        let explorer = Explorer::new(store.clone());
        let id = store
            .put(&json!({"a": [1, 2, {"b": "hello"}]}))
            .await
            .expect("put");
        (explorer, id)
    }

    #[tokio::test]
    async fn path_traversal_reaches_nested_scalars() {
        let (explorer, id) = sample().await;

        let hello = explorer.fetch(&id, Some("a[2].b")).await.expect("fetch");
        assert_eq!(hello.text, "hello");

        let two = explorer.fetch(&id, Some("a[1]")).await.expect("fetch");
        assert_eq!(two.text, "2");
    }

    #[tokio::test]
    async fn failed_traversal_names_segment_and_resolved_prefix() {
        let (explorer, id) = sample().await;

        let err = explorer.fetch(&id, Some("a[2].z")).await.expect_err("fail");
        let msg = err.to_string();
        assert!(msg.contains("`z`"), "message should name the segment: {msg}");
        assert!(msg.contains("a[2]"), "message should name the prefix: {msg}");

        let err = explorer.fetch(&id, Some("a[-1]")).await.expect_err("fail");
        assert!(matches!(err, ObjexError::PathError { .. }));
    }

    #[tokio::test]
    async fn slicing_strings_counts_characters() {
        let (explorer, id) = sample().await;

        let sliced = explorer
            .slice(&id, Some("a[2].b"), 1, Some(3))
            .await
            .expect("slice");
        assert_eq!(sliced.text, "el");
    }

    #[tokio::test]
    async fn search_reports_hit_paths() {
        let (explorer, id) = sample().await;

        let hits = explorer.search(&id, "hell", None).await.expect("search");
        assert_eq!(hits.text, "a[2].b: hello");
    }
}

// =============================================================================
// FLOW: REFERENCING
// =============================================================================

mod referencing {
    use super::*;
    use objex_core::{
        Explored, Explorer, ObjexError, ReferenceResolver, Tool, ToolArgs,
        explorable_and_referenceable,
    };
    use serde_json::{Value, json};

    /// A value produced by one intercepted call is consumed by the next
    /// through its reference alone.
    #[tokio::test]
    async fn results_flow_between_calls_by_reference() {
        let store = memory_store();
        let explorer = Explorer::new(store.clone());

        let produce = explorable_and_referenceable(
            |_args: ToolArgs| async move { Ok(json!({"rows": ["alpha", "beta", "gamma"]})) },
            explorer.clone(),
        );
        let consume = explorable_and_referenceable(
            |args: ToolArgs| async move { Ok(json!({"picked": args.get("row")})) },
            explorer,
        );

        let produced = produce.call(ToolArgs::new()).await.expect("produce");
        let produced: Explored = serde_json::from_value(produced).expect("envelope");

        let mut args = ToolArgs::new();
        args.insert(
            "row".to_string(),
            json!(format!("@{}.rows[1]", produced.obj_id)),
        );
        let consumed = consume.call(args).await.expect("consume");
        let consumed: Explored = serde_json::from_value(consumed).expect("envelope");

        let stored = store.get_required(&consumed.obj_id).await.expect("get");
        assert_eq!(stored, json!({"picked": "beta"}));
    }

    /// Strings that merely mention a reference are not rewritten.
    #[tokio::test]
    async fn partial_reference_mentions_pass_through() {
        let store = memory_store();
        let id = store.put(&json!("secret")).await.expect("put");
        let resolver = ReferenceResolver::new(store);

        let mut args = serde_json::Map::new();
        args.insert("text".to_string(), json!(format!("see @{id} for details")));
        resolver.resolve_arguments(&mut args).await.expect("resolve");

        assert_eq!(
            args.get("text"),
            Some(&Value::String(format!("see @{id} for details")))
        );
    }

    /// A dangling reference fails the call before the wrapped function
    /// runs, naming the argument that carried it.
    #[tokio::test]
    async fn dangling_reference_identifies_the_argument() {
        let store = memory_store();
        let resolver = ReferenceResolver::new(store);

        let mut args = serde_json::Map::new();
        args.insert("input".to_string(), json!("@obj_999"));

        let err = resolver.resolve_arguments(&mut args).await.expect_err("fail");
        assert!(matches!(err, ObjexError::ResolutionError { .. }));
        assert!(err.to_string().contains("`input`"));
    }
}

// =============================================================================
// FLOW: IDENTIFIERS
// =============================================================================

mod identifiers {
    use super::*;
    use objex_core::RedbBackend;
    use serde_json::json;
    use std::collections::BTreeSet;

    /// Concurrent stores never hand out the same identifier twice.
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_stores_allocate_unique_identifiers() {
        let store = memory_store();

        let mut tasks = tokio::task::JoinSet::new();
        for task in 0..16u64 {
            let store = store.clone();
            tasks.spawn(async move {
                let mut ids = Vec::new();
                for i in 0..16u64 {
                    ids.push(store.put(&json!([task, i])).await.expect("put"));
                }
                ids
            });
        }

        let mut seen = BTreeSet::new();
        while let Some(result) = tasks.join_next().await {
            for id in result.expect("join") {
                assert!(seen.insert(id.clone()), "identifier reused: {id}");
            }
        }
        assert_eq!(seen.len(), 256);
    }

    /// The embedded backend continues its identifier sequence across a
    /// close and reopen instead of reissuing old identifiers.
    #[tokio::test]
    async fn redb_identifier_sequence_survives_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("objects.redb");

        let first_ids = {
            let backend = RedbBackend::open(&path).expect("open");
            let store = ObjectStore::with_ttl_seconds(Arc::new(backend), 0);
            let a = store.put(&json!({"n": 1})).await.expect("put");
            let b = store.put(&json!({"n": 2})).await.expect("put");
            (a, b)
        };
        assert_eq!(first_ids, ("obj_001".to_string(), "obj_002".to_string()));

        let backend = RedbBackend::open(&path).expect("reopen");
        let store = ObjectStore::with_ttl_seconds(Arc::new(backend), 0);

        let next = store.put(&json!({"n": 3})).await.expect("put");
        assert_eq!(next, "obj_003");

        let stored = store.get_required("obj_001").await.expect("get");
        assert_eq!(stored, json!({"n": 1}));
    }
}

// =============================================================================
// FLOW: EXPIRY
// =============================================================================

mod expiry {
    use super::*;
    use objex_core::ManualClock;
    use serde_json::json;
    use std::time::Duration;

    /// Values with a TTL are visible right up to the deadline and gone
    /// from it onward; deletion after expiry reports nothing deleted.
    #[tokio::test]
    async fn deadlines_are_observed_lazily() {
        let clock = Arc::new(ManualClock::new(0));
        let backend = Arc::new(InMemoryBackend::with_clock(clock.clone()));
        let store = ObjectStore::with_ttl_seconds(backend, 60);

        let id = store.put(&json!({"k": "v"})).await.expect("put");

        clock.advance(Duration::from_secs(59));
        assert!(store.get(&id).await.expect("get").is_some());

        clock.advance(Duration::from_secs(1));
        assert!(store.get(&id).await.expect("get").is_none());
        assert!(!store.delete(&id).await.expect("delete"));
    }
}
