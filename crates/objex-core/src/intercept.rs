//! # Call Interceptors
//!
//! Two orthogonal wrappers around a [`Tool`], composable in either
//! direction:
//!
//! - [`Explorable`] persists the wrapped call's result and hands the
//!   caller an identifier plus a bounded preview instead of the raw
//!   value.
//! - [`Referenceable`] resolves whole-string references in the incoming
//!   named arguments before invoking the wrapped call.
//!
//! Composed via [`explorable_and_referenceable`], a call can consume a
//! reference produced by an earlier call and produce a new one for a
//! later call: resolution runs first on the way in, persistence runs
//! last on the way out.

use std::collections::BTreeSet;
use std::fmt;
use std::future::Future;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ObjexError;
use crate::explorer::Explorer;
use crate::reference::ReferenceResolver;

/// Named arguments passed to a tool call.
pub type ToolArgs = serde_json::Map<String, Value>;

// =============================================================================
// TOOL TRAIT
// =============================================================================

/// A callable taking named arguments and returning a JSON-shaped value.
///
/// Implemented for any `Fn(ToolArgs) -> impl Future<Output = Result<..>>`,
/// so plain async closures work without a wrapper type.
#[async_trait]
pub trait Tool: Send + Sync {
    async fn call(&self, args: ToolArgs) -> Result<Value, ObjexError>;
}

#[async_trait]
impl<F, Fut> Tool for F
where
    F: Fn(ToolArgs) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, ObjexError>> + Send,
{
    async fn call(&self, args: ToolArgs) -> Result<Value, ObjexError> {
        (self)(args).await
    }
}

// =============================================================================
// EXPLORED RESULT
// =============================================================================

/// What an [`Explorable`] call returns in place of the raw result: the
/// identifier the result was stored under, a bounded preview, and
/// whether the preview elided anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Explored {
    /// Identifier of the persisted result.
    pub obj_id: String,
    /// Bounded preview of the result.
    pub preview: String,
    /// True when the preview differs from the full form.
    pub truncated: bool,
}

impl fmt::Display for Explored {
    /// Reference line first so later calls can pick it up, preview after.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}\n{}", self.obj_id, self.preview)
    }
}

// =============================================================================
// EXPLORABLE
// =============================================================================

/// Persists the wrapped call's result and returns an [`Explored`]
/// envelope instead of the raw value.
///
/// Persistence happens only after the wrapped call succeeds; an error
/// from the inner call propagates with nothing stored.
#[derive(Debug, Clone)]
pub struct Explorable<T> {
    inner: T,
    explorer: Explorer,
}

impl<T> Explorable<T> {
    #[must_use]
    pub fn new(inner: T, explorer: Explorer) -> Self {
        Self { inner, explorer }
    }

    /// Unwrap, dropping the persistence behavior.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

#[async_trait]
impl<T: Tool> Tool for Explorable<T> {
    async fn call(&self, args: ToolArgs) -> Result<Value, ObjexError> {
        let result = self.inner.call(args).await?;
        let obj_id = self.explorer.store().put(&result).await?;
        let rendered = self.explorer.preview_value(&result);
        let explored = Explored {
            obj_id,
            preview: rendered.text,
            truncated: rendered.truncated,
        };
        serde_json::to_value(&explored).map_err(|e| ObjexError::EncodingError(e.to_string()))
    }
}

// =============================================================================
// REFERENCEABLE
// =============================================================================

/// Resolves whole-string references in the incoming arguments before
/// invoking the wrapped call.
///
/// By default every argument is eligible; [`Referenceable::with_eligible`]
/// restricts resolution to a named subset, leaving the rest verbatim even
/// when they look like references.
#[derive(Debug, Clone)]
pub struct Referenceable<T> {
    inner: T,
    resolver: ReferenceResolver,
    eligible: Option<BTreeSet<String>>,
}

impl<T> Referenceable<T> {
    #[must_use]
    pub fn new(inner: T, resolver: ReferenceResolver) -> Self {
        Self {
            inner,
            resolver,
            eligible: None,
        }
    }

    /// Restrict resolution to the named parameters.
    #[must_use]
    pub fn with_eligible<I, S>(inner: T, resolver: ReferenceResolver, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            inner,
            resolver,
            eligible: Some(params.into_iter().map(Into::into).collect()),
        }
    }

    /// Unwrap, dropping the resolution behavior.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

#[async_trait]
impl<T: Tool> Tool for Referenceable<T> {
    async fn call(&self, mut args: ToolArgs) -> Result<Value, ObjexError> {
        match &self.eligible {
            None => self.resolver.resolve_arguments(&mut args).await?,
            Some(params) => {
                for name in params {
                    if let Some(value) = args.get_mut(name) {
                        self.resolver
                            .resolve_value(value)
                            .await
                            .map_err(|err| err.for_argument(name.as_str()))?;
                    }
                }
            }
        }
        self.inner.call(args).await
    }
}

// =============================================================================
// COMPOSITION
// =============================================================================

/// Wrap a tool with both behaviors: references resolve on the way in,
/// the result persists on the way out.
#[must_use]
pub fn explorable_and_referenceable<T: Tool>(
    inner: T,
    explorer: Explorer,
) -> Referenceable<Explorable<T>> {
    let resolver = ReferenceResolver::new(explorer.store().clone());
    Referenceable::new(Explorable::new(inner, explorer), resolver)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::backend::{Backend, InMemoryBackend};
    use crate::store::ObjectStore;
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn harness() -> (Arc<InMemoryBackend>, Explorer) {
        let backend = Arc::new(InMemoryBackend::new());
        let store = ObjectStore::with_ttl_seconds(backend.clone(), 0);
        (backend, Explorer::new(store))
    }

    async fn echo(args: ToolArgs) -> Result<Value, ObjexError> {
        Ok(Value::Object(args))
    }

    #[tokio::test]
    async fn closures_are_tools() {
        let tool = |args: ToolArgs| async move { Ok(json!(args.len())) };
        let result = tool.call(ToolArgs::new()).await.expect("call");
        assert_eq!(result, json!(0));
    }

    #[tokio::test]
    async fn explorable_persists_result_and_returns_envelope() {
        let (_, explorer) = harness();
        let store = explorer.store().clone();
        let tool = Explorable::new(
            |_args: ToolArgs| async move { Ok(json!({"a": [1, 2, {"b": "hello"}]})) },
            explorer,
        );

        let result = tool.call(ToolArgs::new()).await.expect("call");
        let explored: Explored = serde_json::from_value(result).expect("envelope");

        assert!(!explored.truncated);
        assert!(explored.preview.contains("\"hello\""));

        let stored = store.get_required(&explored.obj_id).await.expect("stored");
        assert_eq!(stored, json!({"a": [1, 2, {"b": "hello"}]}));
    }

    #[tokio::test]
    async fn explorable_flags_truncated_previews() {
        let (_, explorer) = harness();
        let tool = Explorable::new(
            |_args: ToolArgs| async move { Ok(json!("x".repeat(10_000))) },
            explorer,
        );

        let result = tool.call(ToolArgs::new()).await.expect("call");
        let explored: Explored = serde_json::from_value(result).expect("envelope");
        assert!(explored.truncated);
        assert!(explored.preview.chars().count() < 10_000);
    }

    #[tokio::test]
    async fn explorable_persists_nothing_on_inner_error() {
        let (backend, explorer) = harness();
        let tool = Explorable::new(
            |_args: ToolArgs| async move {
                Err::<Value, _>(ObjexError::RangeError("boom".to_string()))
            },
            explorer,
        );

        let err = tool.call(ToolArgs::new()).await.expect_err("fail");
        assert!(matches!(err, ObjexError::RangeError(_)));
        assert_eq!(backend.len().await.expect("len"), 0);
    }

    #[tokio::test]
    async fn referenceable_resolves_arguments_before_invocation() {
        let (_, explorer) = harness();
        let store = explorer.store().clone();
        let id = store
            .put(&json!({"a": [1, 2, {"b": "hello"}]}))
            .await
            .expect("put");

        let resolver = ReferenceResolver::new(store);
        let tool = Referenceable::new(echo, resolver);

        let mut args = ToolArgs::new();
        args.insert("payload".to_string(), json!(format!("@{id}.a[2].b")));
        args.insert("note".to_string(), json!("value is @nobody.home"));

        let result = tool.call(args).await.expect("call");
        assert_eq!(result["payload"], json!("hello"));
        assert_eq!(result["note"], json!("value is @nobody.home"));
    }

    #[tokio::test]
    async fn eligible_subset_limits_resolution() {
        let (_, explorer) = harness();
        let store = explorer.store().clone();
        let id = store.put(&json!("resolved")).await.expect("put");

        let resolver = ReferenceResolver::new(store);
        let tool = Referenceable::with_eligible(echo, resolver, ["payload"]);

        let mut args = ToolArgs::new();
        args.insert("payload".to_string(), json!(format!("@{id}")));
        args.insert("verbatim".to_string(), json!(format!("@{id}")));

        let result = tool.call(args).await.expect("call");
        assert_eq!(result["payload"], json!("resolved"));
        assert_eq!(result["verbatim"], json!(format!("@{id}")));
    }

    #[tokio::test]
    async fn resolution_failure_skips_invocation() {
        let (_, explorer) = harness();
        let called = Arc::new(AtomicBool::new(false));
        let seen = called.clone();
        let tool = Referenceable::new(
            move |_args: ToolArgs| {
                let seen = seen.clone();
                async move {
                    seen.store(true, Ordering::SeqCst);
                    Ok(json!(null))
                }
            },
            ReferenceResolver::new(explorer.store().clone()),
        );

        let mut args = ToolArgs::new();
        args.insert("payload".to_string(), json!("@obj_404"));

        let err = tool.call(args).await.expect_err("fail");
        assert!(matches!(err, ObjexError::ResolutionError { .. }));
        assert!(!called.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn composed_wrappers_resolve_inbound_and_persist_outbound() {
        let (_, explorer) = harness();
        let store = explorer.store().clone();
        let source = store
            .put(&json!({"a": [1, 2, {"b": "hello"}]}))
            .await
            .expect("put");

        let tool = explorable_and_referenceable(
            |args: ToolArgs| async move { Ok(json!({"echo": args.get("payload")})) },
            explorer,
        );

        let mut args = ToolArgs::new();
        args.insert("payload".to_string(), json!(format!("@{source}.a[2].b")));

        let result = tool.call(args).await.expect("call");
        let explored: Explored = serde_json::from_value(result).expect("envelope");

        let stored = store.get_required(&explored.obj_id).await.expect("stored");
        assert_eq!(stored, json!({"echo": "hello"}));
    }

    #[tokio::test]
    async fn chained_calls_pass_results_by_reference() {
        let (_, explorer) = harness();
        let store = explorer.store().clone();

        let first = explorable_and_referenceable(
            |_args: ToolArgs| async move { Ok(json!({"step": 1})) },
            explorer.clone(),
        );
        let second = explorable_and_referenceable(echo, explorer);

        let first_out = first.call(ToolArgs::new()).await.expect("first");
        let first_env: Explored = serde_json::from_value(first_out).expect("envelope");

        let mut args = ToolArgs::new();
        args.insert(
            "input".to_string(),
            json!(format!("@{}.step", first_env.obj_id)),
        );
        let second_out = second.call(args).await.expect("second");
        let second_env: Explored = serde_json::from_value(second_out).expect("envelope");

        let stored = store
            .get_required(&second_env.obj_id)
            .await
            .expect("stored");
        assert_eq!(stored, json!({"input": 1}));
    }

    #[test]
    fn explored_display_leads_with_the_reference() {
        let explored = Explored {
            obj_id: "obj_007".to_string(),
            preview: "{}".to_string(),
            truncated: false,
        };
        assert_eq!(explored.to_string(), "@obj_007\n{}");
    }
}
