//! # Path Segments, Parsing and Traversal
//!
//! The dotted micro-syntax used by references and the explorer tools:
//! `users[2].address.city`, `[0].name`, `items[10][3]`.
//!
//! Grammar: a path is a sequence of segments. Key segments are bare names
//! (`[A-Za-z0-9_-]+`) joined with `.`; index segments are bracketed
//! integers appended without a dot. The first segment may be either form.
//!
//! Traversal is strict: keys match exactly and case-sensitively, indices
//! are zero-based, and a negative index is a path error rather than
//! wraparound. On failure the error names the failing segment, the shape
//! it was applied to, and the deepest successfully resolved prefix.

use std::fmt;

use serde_json::Value;

use crate::error::ObjexError;

// =============================================================================
// PATH SEGMENTS
// =============================================================================

/// One step of descent into a stored value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// A mapping key or structured-record field name.
    Key(String),
    /// A zero-based sequence index. Kept signed so a negative index can
    /// be rejected at traversal time with a proper path error.
    Index(i64),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => write!(f, "{key}"),
            Self::Index(idx) => write!(f, "[{idx}]"),
        }
    }
}

/// Render segments back into path text. The inverse of [`parse_path`]
/// for every path that parses.
#[must_use]
pub fn format_path(segments: &[PathSegment]) -> String {
    let mut out = String::new();
    for segment in segments {
        match segment {
            PathSegment::Key(key) => {
                if !out.is_empty() {
                    out.push('.');
                }
                out.push_str(key);
            }
            PathSegment::Index(idx) => {
                out.push('[');
                out.push_str(&idx.to_string());
                out.push(']');
            }
        }
    }
    out
}

// =============================================================================
// PARSING
// =============================================================================

pub(crate) fn is_key_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

fn syntax_error(input: &str, reason: impl Into<String>) -> ObjexError {
    ObjexError::ReferenceSyntaxError {
        input: input.to_string(),
        reason: reason.into(),
    }
}

/// Parse path text into segments.
///
/// Fails with [`ObjexError::ReferenceSyntaxError`] on empty input, empty
/// segments, unclosed or non-integer brackets, and characters outside the
/// key alphabet.
pub fn parse_path(input: &str) -> Result<Vec<PathSegment>, ObjexError> {
    if input.is_empty() {
        return Err(syntax_error(input, "empty path"));
    }

    let mut segments = Vec::new();
    let mut chars = input.chars().peekable();

    loop {
        match chars.peek().copied() {
            None => break,
            Some('[') => {
                chars.next();
                let mut digits = String::new();
                if chars.peek() == Some(&'-') {
                    digits.push('-');
                    chars.next();
                }
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_digit() {
                        digits.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                match chars.next() {
                    Some(']') => {}
                    Some(c) => {
                        return Err(syntax_error(input, format!("expected `]`, found `{c}`")));
                    }
                    None => return Err(syntax_error(input, "unclosed `[`")),
                }
                if digits.is_empty() || digits == "-" {
                    return Err(syntax_error(input, "empty index"));
                }
                let idx: i64 = digits
                    .parse()
                    .map_err(|_| syntax_error(input, format!("invalid index `{digits}`")))?;
                segments.push(PathSegment::Index(idx));
            }
            Some('.') => {
                if segments.is_empty() {
                    return Err(syntax_error(input, "path cannot start with `.`"));
                }
                chars.next();
                let key = take_key(&mut chars);
                if key.is_empty() {
                    return Err(syntax_error(input, "empty segment after `.`"));
                }
                segments.push(PathSegment::Key(key));
            }
            Some(c) if is_key_char(c) => {
                if !segments.is_empty() {
                    return Err(syntax_error(
                        input,
                        format!("expected `.` or `[` before `{c}`"),
                    ));
                }
                let key = take_key(&mut chars);
                segments.push(PathSegment::Key(key));
            }
            Some(c) => {
                return Err(syntax_error(input, format!("unexpected character `{c}`")));
            }
        }
    }

    Ok(segments)
}

fn take_key(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut key = String::new();
    while let Some(&c) = chars.peek() {
        if is_key_char(c) {
            key.push(c);
            chars.next();
        } else {
            break;
        }
    }
    key
}

// =============================================================================
// TRAVERSAL
// =============================================================================

/// Human-readable name for a value's shape, used in error messages.
#[must_use]
pub fn shape_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "mapping",
    }
}

fn resolved_prefix(segments: &[PathSegment], upto: usize) -> String {
    if upto == 0 {
        "<root>".to_string()
    } else {
        format_path(&segments[..upto])
    }
}

/// Resolve segments left-to-right against a value, returning the
/// addressed sub-value.
///
/// Empty segments resolve to the root itself.
pub fn traverse<'a>(root: &'a Value, segments: &[PathSegment]) -> Result<&'a Value, ObjexError> {
    let mut current = root;

    for (i, segment) in segments.iter().enumerate() {
        let fail = |reason: String| ObjexError::PathError {
            segment: segment.to_string(),
            resolved: resolved_prefix(segments, i),
            reason,
        };

        current = match (segment, current) {
            (PathSegment::Key(key), Value::Object(map)) => map
                .get(key)
                .ok_or_else(|| fail(format!("key `{key}` not found in mapping")))?,
            (PathSegment::Key(key), other) => {
                return Err(fail(format!(
                    "cannot access key `{key}` in {}",
                    shape_name(other)
                )));
            }
            (PathSegment::Index(idx), Value::Array(items)) => {
                if *idx < 0 {
                    return Err(fail(format!("negative index `{idx}` is not allowed")));
                }
                items.get(*idx as usize).ok_or_else(|| {
                    fail(format!(
                        "index {idx} out of bounds for sequence of length {}",
                        items.len()
                    ))
                })?
            }
            (PathSegment::Index(idx), other) => {
                return Err(fail(format!(
                    "cannot index {} with [{idx}]",
                    shape_name(other)
                )));
            }
        };
    }

    Ok(current)
}

// =============================================================================
// TESTS
// =============================================================================
