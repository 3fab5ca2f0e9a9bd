//! # Error Types
//!
//! One error enum for the whole engine. Every fallible operation returns
//! `Result<T, ObjexError>`; the apps translate variants into HTTP statuses
//! or MCP error payloads at their boundary.
//!
//! ## Failure Policy
//!
//! - Only `BackendUnavailable` during backend construction is fatal to a
//!   process; everything else is recovered at the call boundary.
//! - Absent and expired entries are indistinguishable: both are `NotFound`.
//! - The engine never panics. Truncation, clamping and lazy eviction are
//!   silent; everything else reports an error.

use thiserror::Error;

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the Objex engine.
///
/// - No silent failures
/// - Use `Result<T, ObjexError>` for fallible operations
/// - Traversal errors carry the deepest successfully resolved prefix so an
///   agent can repair its path instead of guessing
#[derive(Debug, Error)]
pub enum ObjexError {
    /// The configured backend cannot be reached. Fatal when raised during
    /// backend construction, recoverable when raised by a later operation.
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// The value cannot be serialized to the canonical byte encoding.
    #[error("Encoding error: {0}")]
    EncodingError(String),

    /// Stored bytes are not valid for the expected decode. Distinct from
    /// `NotFound`: the mapping exists but its payload is corrupt.
    #[error("Decoding error: {0}")]
    DecodingError(String),

    /// No live value under this identifier. Never-stored, expired and
    /// deleted entries are indistinguishable to callers.
    #[error("Object not found: {0}")]
    NotFound(String),

    /// A traversal segment cannot be resolved against the shape it reached.
    #[error("Path error at `{segment}` (after `{resolved}`): {reason}")]
    PathError {
        /// The segment that failed to resolve.
        segment: String,
        /// The deepest successfully resolved prefix, `<root>` if none.
        resolved: String,
        /// What went wrong, including the shape the segment was applied to.
        reason: String,
    },

    /// Slice bounds are invalid or the sliced value is not sliceable.
    #[error("Range error: {0}")]
    RangeError(String),

    /// A string starts like a reference or path but does not parse.
    #[error("Syntax error in `{input}`: {reason}")]
    ReferenceSyntaxError {
        /// The offending input, verbatim.
        input: String,
        /// Why it failed to parse.
        reason: String,
    },

    /// A reference in a named argument failed to resolve. Wraps the
    /// underlying `NotFound`/`PathError` and names the argument.
    #[error("Failed to resolve argument `{argument}`: {source}")]
    ResolutionError {
        /// The argument whose reference failed to resolve.
        argument: String,
        /// The underlying failure.
        #[source]
        source: Box<ObjexError>,
    },

    /// An I/O error occurred in an embedded backend.
    #[error("I/O error: {0}")]
    IoError(String),
}

impl ObjexError {
    /// Wrap an error as a resolution failure for the named argument.
    #[must_use]
    pub fn for_argument(self, argument: impl Into<String>) -> Self {
        Self::ResolutionError {
            argument: argument.into(),
            source: Box::new(self),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
