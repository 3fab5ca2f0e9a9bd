//! # objex-core
//!
//! The object store and explorer engine for Objex - THE LOGIC.
//!
//! This crate implements the substrate that keeps large intermediate
//! values out of a conversation: callers persist values into a
//! backend-agnostic store, receive short identifiers, and explore the
//! stored values through bounded previews, path traversal, slicing and
//! search instead of reading them whole.
//!
//! ## Layering
//!
//! - `backend` - byte-level keyed storage with expiry (memory, redb, remote)
//! - `store` - canonical JSON encoding over a backend
//! - `path` / `explorer` - traversal, slicing and bounded rendering
//! - `reference` / `intercept` - the `@id.path` micro-syntax and the
//!   call wrappers that apply it transparently
//!
//! ## Architectural Constraints
//!
//! - The store is the ONLY place where values live; truncation is
//!   presentational and never rewrites stored bytes
//! - Expiry is lazy: a read past the deadline observes absence, no
//!   background task exists
//! - Per-key operations are linearizable within a backend

// =============================================================================
// MODULES
// =============================================================================

pub mod backend;
pub mod clock;
pub mod error;
pub mod explorer;
pub mod intercept;
pub mod path;
pub mod reference;
pub mod store;

// =============================================================================
// RE-EXPORTS: Errors and Time
// =============================================================================

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::ObjexError;

// =============================================================================
// RE-EXPORTS: Storage
// =============================================================================

pub use backend::{Backend, InMemoryBackend, RedbBackend, RemoteBackend};
pub use store::{DEFAULT_TTL_SECONDS, ObjectStore};

// =============================================================================
// RE-EXPORTS: Exploration
// =============================================================================

pub use explorer::{Explorer, ExplorerConfig, Rendered, TRUNCATION_MARKER};
pub use path::{PathSegment, format_path, parse_path, traverse};

// =============================================================================
// RE-EXPORTS: References and Interceptors
// =============================================================================

pub use intercept::{Explorable, Explored, Referenceable, Tool, ToolArgs, explorable_and_referenceable};
pub use reference::{Reference, ReferenceResolver};
