//! # Explorer
//!
//! The read side of the store: path/slice-addressable views of stored
//! values, rendered as text an agent can afford to look at.
//!
//! Two rendering modes share one engine:
//!
//! - **preview** — bounded by [`ExplorerConfig`]: container element caps,
//!   nesting depth caps, inline string caps and an overall character
//!   budget. Any elision sets the `truncated` flag.
//! - **fetch** — unbounded. The explicit fetch is the escape hatch from a
//!   truncated preview, so it returns the full form exactly.
//!
//! Truncation is purely presentational; the stored value never changes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ObjexError;
use crate::path::{PathSegment, format_path, parse_path, shape_name, traverse};
use crate::store::ObjectStore;

/// Marker appended when a rendering is cut at the character budget.
pub const TRUNCATION_MARKER: &str = "… [truncated]";

/// Default overall character budget for previews.
pub const DEFAULT_PREVIEW_CHARS: usize = 2_000;

/// Default cap on elements shown per container.
pub const DEFAULT_MAX_ITEMS: usize = 25;

/// Default nesting depth before a container renders as a summary.
pub const DEFAULT_MAX_DEPTH: usize = 4;

/// Default cap on string scalars nested inside containers.
pub const DEFAULT_INLINE_CHARS: usize = 120;

/// Default cap on reported search hits.
pub const DEFAULT_SEARCH_HITS: usize = 50;

// =============================================================================
// CONFIG
// =============================================================================

/// Preview and search bounds for an [`Explorer`].
#[derive(Debug, Clone)]
pub struct ExplorerConfig {
    /// Overall character budget for previews.
    pub preview_chars: usize,
    /// Elements shown per container before "… N more".
    pub max_items: usize,
    /// Nesting depth before containers summarize as `{…}` / `[…]`.
    pub max_depth: usize,
    /// Characters shown of a string scalar nested inside a container.
    pub inline_chars: usize,
    /// Search hits reported before the result is cut.
    pub search_hits: usize,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            preview_chars: DEFAULT_PREVIEW_CHARS,
            max_items: DEFAULT_MAX_ITEMS,
            max_depth: DEFAULT_MAX_DEPTH,
            inline_chars: DEFAULT_INLINE_CHARS,
            search_hits: DEFAULT_SEARCH_HITS,
        }
    }
}

// =============================================================================
// RENDERED OUTPUT
// =============================================================================

/// A textual rendering plus whether anything was elided from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rendered {
    /// The rendered text.
    pub text: String,
    /// True when the text differs from the full form in any way.
    pub truncated: bool,
}

// =============================================================================
// EXPLORER
// =============================================================================

/// Read-side component over an [`ObjectStore`].
///
/// Cheap to clone; clones share the store and configuration.
#[derive(Debug, Clone)]
pub struct Explorer {
    store: ObjectStore,
    config: ExplorerConfig,
}

impl Explorer {
    /// Create an explorer with default bounds.
    #[must_use]
    pub fn new(store: ObjectStore) -> Self {
        Self::with_config(store, ExplorerConfig::default())
    }

    /// Create an explorer with explicit bounds.
    #[must_use]
    pub fn with_config(store: ObjectStore, config: ExplorerConfig) -> Self {
        Self { store, config }
    }

    /// The configured bounds.
    #[must_use]
    pub fn config(&self) -> &ExplorerConfig {
        &self.config
    }

    /// The store this explorer reads from.
    #[must_use]
    pub fn store(&self) -> &ObjectStore {
        &self.store
    }

    /// Render the full form of a stored value or sub-value. Never
    /// truncates; the flag is carried for interface uniformity.
    pub async fn fetch(&self, id: &str, path: Option<&str>) -> Result<Rendered, ObjexError> {
        let value = self.resolve(id, path).await?;
        Ok(render(&value, RenderLimits::NONE))
    }

    /// Render a bounded preview of a stored value or sub-value.
    pub async fn preview(&self, id: &str, path: Option<&str>) -> Result<Rendered, ObjexError> {
        let value = self.resolve(id, path).await?;
        Ok(self.preview_value(&value))
    }

    /// Render a bounded preview of a value already in hand, without
    /// touching the store. This is what the persistence wrapper shows
    /// next to a fresh identifier.
    #[must_use]
    pub fn preview_value(&self, value: &Value) -> Rendered {
        render(value, self.limits())
    }

    /// Extract `[start, end)` from a string-like or sequence-like value
    /// reached by `path`, and render the sub-range in full.
    ///
    /// `end` of `None` means "to the end". Ends past the value clamp;
    /// a negative `start`, an `end` before `start`, or a non-sliceable
    /// target is a [`ObjexError::RangeError`].
    pub async fn slice(
        &self,
        id: &str,
        path: Option<&str>,
        start: i64,
        end: Option<i64>,
    ) -> Result<Rendered, ObjexError> {
        let value = self.resolve(id, path).await?;
        let sliced = slice_value(&value, start, end)?;
        Ok(render(&sliced, RenderLimits::NONE))
    }

    /// Scan scalars under `path` for text containing `pattern`
    /// (case-insensitive), reporting one `path: text` line per hit.
    ///
    /// An empty pattern matches every scalar. The hit list is capped at
    /// the configured bound, setting the truncation flag when cut.
    pub async fn search(
        &self,
        id: &str,
        pattern: &str,
        path: Option<&str>,
    ) -> Result<Rendered, ObjexError> {
        let value = self.resolve(id, path).await?;
        let needle = pattern.to_lowercase();

        let mut hits = Vec::new();
        let mut stack = Vec::new();
        let overflowed = collect_hits(
            &value,
            &needle,
            &mut stack,
            &mut hits,
            self.config.search_hits,
            self.config.inline_chars,
        );

        let text = if hits.is_empty() {
            format!("no matches for `{pattern}`")
        } else {
            hits.join("\n")
        };
        Ok(Rendered {
            text,
            truncated: overflowed,
        })
    }

    fn limits(&self) -> RenderLimits {
        RenderLimits {
            max_chars: Some(self.config.preview_chars),
            max_items: Some(self.config.max_items),
            max_depth: Some(self.config.max_depth),
            inline_chars: Some(self.config.inline_chars),
        }
    }

    /// Fetch the object and resolve the optional path against it. An
    /// empty path string addresses the root, like no path at all.
    async fn resolve(&self, id: &str, path: Option<&str>) -> Result<Value, ObjexError> {
        let root = self.store.get_required(id).await?;
        match path {
            None | Some("") => Ok(root),
            Some(text) => {
                let segments = parse_path(text)?;
                Ok(traverse(&root, &segments)?.clone())
            }
        }
    }
}

// =============================================================================
// SLICING
// =============================================================================

fn slice_value(value: &Value, start: i64, end: Option<i64>) -> Result<Value, ObjexError> {
    if start < 0 {
        return Err(ObjexError::RangeError(format!(
            "start must be non-negative, got {start}"
        )));
    }
    if let Some(end) = end
        && end < start
    {
        return Err(ObjexError::RangeError(format!(
            "end {end} precedes start {start}"
        )));
    }

    let start = start as usize;
    let take = end.map(|end| (end as usize).saturating_sub(start));

    match value {
        Value::String(s) => {
            let sliced: String = match take {
                Some(n) => s.chars().skip(start).take(n).collect(),
                None => s.chars().skip(start).collect(),
            };
            Ok(Value::String(sliced))
        }
        Value::Array(items) => {
            let sliced: Vec<Value> = match take {
                Some(n) => items.iter().skip(start).take(n).cloned().collect(),
                None => items.iter().skip(start).cloned().collect(),
            };
            Ok(Value::Array(sliced))
        }
        other => Err(ObjexError::RangeError(format!(
            "cannot slice {}, only strings and sequences",
            shape_name(other)
        ))),
    }
}

// =============================================================================
// RENDERING
// =============================================================================

#[derive(Debug, Clone, Copy)]
struct RenderLimits {
    max_chars: Option<usize>,
    max_items: Option<usize>,
    max_depth: Option<usize>,
    inline_chars: Option<usize>,
}

impl RenderLimits {
    /// Unbounded: the full form.
    const NONE: Self = Self {
        max_chars: None,
        max_items: None,
        max_depth: None,
        inline_chars: None,
    };
}

fn render(value: &Value, limits: RenderLimits) -> Rendered {
    let mut renderer = Renderer {
        limits,
        out: String::new(),
        truncated: false,
    };

    // A root-level string renders raw: fetching a stored string returns
    // its characters, not a quoted JSON literal.
    if let Value::String(s) = value {
        renderer.out.push_str(s);
    } else {
        renderer.render_value(value, 0);
    }

    let Renderer {
        mut out,
        mut truncated,
        ..
    } = renderer;

    if let Some(budget) = limits.max_chars
        && out.chars().count() > budget
    {
        let cut = out
            .char_indices()
            .nth(budget)
            .map(|(i, _)| i)
            .unwrap_or(out.len());
        out.truncate(cut);
        out.push_str(TRUNCATION_MARKER);
        truncated = true;
    }

    Rendered {
        text: out,
        truncated,
    }
}

struct Renderer {
    limits: RenderLimits,
    out: String,
    truncated: bool,
}

impl Renderer {
    fn render_value(&mut self, value: &Value, depth: usize) {
        match value {
            Value::Null => self.out.push_str("null"),
            Value::Bool(b) => self.out.push_str(if *b { "true" } else { "false" }),
            Value::Number(n) => self.out.push_str(&n.to_string()),
            Value::String(s) => self.push_string(s),
            Value::Array(items) => self.render_array(items, depth),
            Value::Object(map) => self.render_object(map, depth),
        }
    }

    fn render_array(&mut self, items: &[Value], depth: usize) {
        if items.is_empty() {
            self.out.push_str("[]");
            return;
        }
        if self.limits.max_depth.is_some_and(|cap| depth >= cap) {
            self.out.push_str("[…]");
            self.truncated = true;
            return;
        }

        let shown = self.limits.max_items.map_or(items.len(), |cap| cap.min(items.len()));
        let hidden = items.len() - shown;

        self.out.push('[');
        for (i, item) in items.iter().take(shown).enumerate() {
            self.newline_indent(depth + 1);
            self.render_value(item, depth + 1);
            if i + 1 < shown || hidden > 0 {
                self.out.push(',');
            }
        }
        if hidden > 0 {
            self.newline_indent(depth + 1);
            self.out.push_str(&format!("… {hidden} more"));
            self.truncated = true;
        }
        self.newline_indent(depth);
        self.out.push(']');
    }

    fn render_object(&mut self, map: &serde_json::Map<String, Value>, depth: usize) {
        if map.is_empty() {
            self.out.push_str("{}");
            return;
        }
        if self.limits.max_depth.is_some_and(|cap| depth >= cap) {
            self.out.push_str("{…}");
            self.truncated = true;
            return;
        }

        let shown = self.limits.max_items.map_or(map.len(), |cap| cap.min(map.len()));
        let hidden = map.len() - shown;

        self.out.push('{');
        for (i, (key, item)) in map.iter().take(shown).enumerate() {
            self.newline_indent(depth + 1);
            self.push_quoted(key, false);
            self.out.push_str(": ");
            self.render_value(item, depth + 1);
            if i + 1 < shown || hidden > 0 {
                self.out.push(',');
            }
        }
        if hidden > 0 {
            self.newline_indent(depth + 1);
            self.out.push_str(&format!("… {hidden} more"));
            self.truncated = true;
        }
        self.newline_indent(depth);
        self.out.push('}');
    }

    /// Quoted string scalar inside a container, capped at the inline
    /// limit.
    fn push_string(&mut self, s: &str) {
        match self.limits.inline_chars {
            Some(cap) if s.chars().count() > cap => {
                let prefix: String = s.chars().take(cap).collect();
                self.push_quoted(&prefix, true);
                self.truncated = true;
            }
            _ => self.push_quoted(s, false),
        }
    }

    /// JSON string escaping, with an optional ellipsis before the
    /// closing quote.
    fn push_quoted(&mut self, s: &str, elided: bool) {
        self.out.push('"');
        for c in s.chars() {
            match c {
                '"' => self.out.push_str("\\\""),
                '\\' => self.out.push_str("\\\\"),
                '\n' => self.out.push_str("\\n"),
                '\r' => self.out.push_str("\\r"),
                '\t' => self.out.push_str("\\t"),
                c if (c as u32) < 0x20 => {
                    self.out.push_str(&format!("\\u{:04x}", c as u32));
                }
                c => self.out.push(c),
            }
        }
        if elided {
            self.out.push('…');
        }
        self.out.push('"');
    }

    fn newline_indent(&mut self, depth: usize) {
        self.out.push('\n');
        for _ in 0..depth {
            self.out.push_str("  ");
        }
    }
}

// =============================================================================
// SEARCH
// =============================================================================

/// Depth-first scalar scan. Returns true when the hit cap cut the scan
/// short.
fn collect_hits(
    value: &Value,
    needle: &str,
    stack: &mut Vec<PathSegment>,
    hits: &mut Vec<String>,
    cap: usize,
    excerpt_chars: usize,
) -> bool {
    if hits.len() >= cap {
        return true;
    }

    match value {
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                stack.push(PathSegment::Index(i as i64));
                let overflowed = collect_hits(item, needle, stack, hits, cap, excerpt_chars);
                stack.pop();
                if overflowed {
                    return true;
                }
            }
            false
        }
        Value::Object(map) => {
            for (key, item) in map {
                stack.push(PathSegment::Key(key.clone()));
                let overflowed = collect_hits(item, needle, stack, hits, cap, excerpt_chars);
                stack.pop();
                if overflowed {
                    return true;
                }
            }
            false
        }
        scalar => {
            let text = match scalar {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            if text.to_lowercase().contains(needle) {
                let location = if stack.is_empty() {
                    "<root>".to_string()
                } else {
                    format_path(stack)
                };
                let excerpt: String = if text.chars().count() > excerpt_chars {
                    let prefix: String = text.chars().take(excerpt_chars).collect();
                    format!("{prefix}…")
                } else {
                    text
                };
                hits.push(format!("{location}: {excerpt}"));
            }
            hits.len() >= cap
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
