//! # References
//!
//! The `@` micro-syntax that lets one call name the output of another:
//! `@obj_001` denotes a whole stored value, `@obj_001.a[2].b` a sub-value
//! reached by path traversal.
//!
//! Detection is whole-string only. A string that merely contains a
//! reference (`"value is @obj_001.a[2].b"`) is never rewritten; a string
//! that is not exactly grammar-valid passes through as a literal.

use std::fmt;

use serde_json::Value;

use crate::error::ObjexError;
use crate::path::{PathSegment, format_path, is_key_char, parse_path, traverse};
use crate::store::ObjectStore;

/// First character of every reference.
pub const REFERENCE_SIGIL: char = '@';

// =============================================================================
// REFERENCE
// =============================================================================

/// A parsed reference: an object identifier plus an optional path into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// The identifier of the stored object.
    pub obj_id: String,
    /// Path into the stored value; empty means the whole value.
    pub path: Vec<PathSegment>,
}

impl Reference {
    /// A reference to a whole stored object.
    #[must_use]
    pub fn to_object(obj_id: impl Into<String>) -> Self {
        Self {
            obj_id: obj_id.into(),
            path: Vec::new(),
        }
    }

    /// Strict parse of `@<identifier>` or `@<identifier>.<path>`.
    ///
    /// Identifiers use the key alphabet (`[A-Za-z0-9_-]+`), which covers
    /// both counter identifiers and UUIDs. Index segments may follow the
    /// identifier directly: `@obj_001[0]`.
    pub fn parse(input: &str) -> Result<Self, ObjexError> {
        let syntax = |reason: String| ObjexError::ReferenceSyntaxError {
            input: input.to_string(),
            reason,
        };

        let Some(rest) = input.strip_prefix(REFERENCE_SIGIL) else {
            return Err(syntax("expected leading `@`".to_string()));
        };

        let id_end = rest
            .find(|c: char| !is_key_char(c))
            .unwrap_or(rest.len());
        let (obj_id, tail) = rest.split_at(id_end);
        if obj_id.is_empty() {
            return Err(syntax("missing identifier after `@`".to_string()));
        }

        let path = if tail.is_empty() {
            Vec::new()
        } else if let Some(path_text) = tail.strip_prefix('.') {
            if path_text.is_empty() {
                return Err(syntax("trailing `.` without a path".to_string()));
            }
            reattribute(parse_path(path_text), &syntax)?
        } else if tail.starts_with('[') {
            reattribute(parse_path(tail), &syntax)?
        } else {
            let found = tail.chars().next().unwrap_or_default();
            return Err(syntax(format!(
                "expected `.` or `[` after identifier, found `{found}`"
            )));
        };

        Ok(Self {
            obj_id: obj_id.to_string(),
            path,
        })
    }

    /// Whole-string reference detection: `Some` only when `input` is
    /// exactly a grammar-valid reference, `None` otherwise.
    #[must_use]
    pub fn detect(input: &str) -> Option<Self> {
        if !input.starts_with(REFERENCE_SIGIL) {
            return None;
        }
        Self::parse(input).ok()
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{REFERENCE_SIGIL}{}", self.obj_id)?;
        if let Some(first) = self.path.first() {
            if matches!(first, PathSegment::Key(_)) {
                write!(f, ".")?;
            }
            write!(f, "{}", format_path(&self.path))?;
        }
        Ok(())
    }
}

/// Syntax errors from the path sub-parse should name the full reference,
/// not just its path part.
fn reattribute(
    parsed: Result<Vec<PathSegment>, ObjexError>,
    syntax: &impl Fn(String) -> ObjexError,
) -> Result<Vec<PathSegment>, ObjexError> {
    parsed.map_err(|err| match err {
        ObjexError::ReferenceSyntaxError { reason, .. } => syntax(reason),
        other => other,
    })
}

// =============================================================================
// RESOLVER
// =============================================================================

/// Resolves references against an [`ObjectStore`].
///
/// Cheap to clone; clones share the store.
#[derive(Debug, Clone)]
pub struct ReferenceResolver {
    store: ObjectStore,
}

impl ReferenceResolver {
    #[must_use]
    pub fn new(store: ObjectStore) -> Self {
        Self { store }
    }

    /// Fetch the referenced object and traverse its path, returning the
    /// resolved sub-value.
    pub async fn resolve(&self, reference: &Reference) -> Result<Value, ObjexError> {
        let root = self.store.get_required(&reference.obj_id).await?;
        if reference.path.is_empty() {
            Ok(root)
        } else {
            Ok(traverse(&root, &reference.path)?.clone())
        }
    }

    /// Strict-parse `input` as a reference and resolve it.
    pub async fn resolve_str(&self, input: &str) -> Result<Value, ObjexError> {
        let reference = Reference::parse(input)?;
        self.resolve(&reference).await
    }

    /// If `value` is a whole-string reference, replace it in place with
    /// the resolved value. Returns whether a substitution happened.
    pub async fn resolve_value(&self, value: &mut Value) -> Result<bool, ObjexError> {
        let reference = match value {
            Value::String(s) => match Reference::detect(s) {
                Some(reference) => reference,
                None => return Ok(false),
            },
            _ => return Ok(false),
        };
        *value = self.resolve(&reference).await?;
        Ok(true)
    }

    /// Resolve every whole-string reference in a named-argument map,
    /// leaving all other values untouched. Failures are wrapped as
    /// [`ObjexError::ResolutionError`] naming the offending argument.
    pub async fn resolve_arguments(
        &self,
        args: &mut serde_json::Map<String, Value>,
    ) -> Result<(), ObjexError> {
        for (name, value) in args.iter_mut() {
            self.resolve_value(value)
                .await
                .map_err(|err| err.for_argument(name.as_str()))?;
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
