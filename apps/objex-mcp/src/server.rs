//! # Objex MCP Server
//!
//! Implements `ServerHandler` with 5 MCP tools over the object store.

use objex_core::{Explorer, Rendered, TRUNCATION_MARKER};
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, ServerCapabilities, ServerInfo},
    schemars, tool, tool_handler, tool_router,
};
use serde::Deserialize;

// =============================================================================
// MCP SERVER
// =============================================================================

/// MCP server over an [`Explorer`] and its store.
#[derive(Clone)]
pub struct ObjexMcp {
    explorer: Explorer,
    #[allow(dead_code)]
    tool_router: ToolRouter<Self>,
}

// =============================================================================
// TOOL PARAMETER STRUCTS
// =============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct StoreParams {
    /// The JSON value to store (any shape).
    #[schemars(description = "The JSON value to store (any shape)")]
    pub value: serde_json::Value,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct FetchParams {
    /// The object identifier returned by store_object.
    #[schemars(description = "The object identifier returned by store_object")]
    pub id: String,
    /// Optional path into the object (e.g. "users[0].name").
    #[schemars(description = "Optional path into the object (e.g. 'users[0].name')")]
    pub path: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SliceParams {
    /// The object identifier returned by store_object.
    #[schemars(description = "The object identifier returned by store_object")]
    pub id: String,
    /// Optional path to the string or sequence to slice.
    #[schemars(description = "Optional path to the string or sequence to slice")]
    pub path: Option<String>,
    /// Start of the range (0-based, inclusive).
    #[schemars(description = "Start of the range (0-based, inclusive)")]
    pub start: i64,
    /// End of the range (exclusive; omit to slice to the end).
    #[schemars(description = "End of the range (exclusive; omit to slice to the end)")]
    pub end: Option<i64>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SearchParams {
    /// The object identifier returned by store_object.
    #[schemars(description = "The object identifier returned by store_object")]
    pub id: String,
    /// Substring to look for (case-insensitive).
    #[schemars(description = "Substring to look for (case-insensitive)")]
    pub pattern: String,
    /// Optional path restricting the search to a sub-value.
    #[schemars(description = "Optional path restricting the search to a sub-value")]
    pub path: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct DeleteParams {
    /// The object identifier to delete.
    #[schemars(description = "The object identifier to delete")]
    pub id: String,
}

// =============================================================================
// TOOL IMPLEMENTATIONS
// =============================================================================

#[tool_router]
impl ObjexMcp {
    pub fn new(explorer: Explorer) -> Self {
        Self {
            explorer,
            tool_router: Self::tool_router(),
        }
    }

    #[tool(
        description = "Store a JSON value, returning a short identifier plus a bounded preview"
    )]
    async fn store_object(
        &self,
        params: Parameters<StoreParams>,
    ) -> Result<CallToolResult, McpError> {
        let value = params.0.value;
        let store = self.explorer.store();
        match store.put(&value).await {
            Ok(id) => {
                let preview = self.explorer.preview_value(&value);
                let ttl_note = match store.default_ttl() {
                    Some(ttl) => format!(" (expires in {}s)", ttl.as_secs()),
                    None => String::new(),
                };
                let text = format!("Stored as `{id}`{ttl_note}.\n{}", preview.text);
                Ok(CallToolResult::success(vec![Content::text(text)]))
            }
            Err(e) => Err(McpError::internal_error(format!("{e}"), None)),
        }
    }

    #[tool(description = "Fetch the full form of a stored object, or of a sub-value at a path")]
    async fn fetch_object(
        &self,
        params: Parameters<FetchParams>,
    ) -> Result<CallToolResult, McpError> {
        let FetchParams { id, path } = params.0;
        match self.explorer.fetch(&id, path.as_deref()).await {
            Ok(rendered) => Ok(CallToolResult::success(vec![Content::text(finish_text(
                rendered,
            ))])),
            Err(e) => Err(McpError::internal_error(format!("{e}"), None)),
        }
    }

    #[tool(description = "Extract a [start, end) range from a stored string or sequence")]
    async fn slice_object(
        &self,
        params: Parameters<SliceParams>,
    ) -> Result<CallToolResult, McpError> {
        let SliceParams {
            id,
            path,
            start,
            end,
        } = params.0;
        match self.explorer.slice(&id, path.as_deref(), start, end).await {
            Ok(rendered) => Ok(CallToolResult::success(vec![Content::text(finish_text(
                rendered,
            ))])),
            Err(e) => Err(McpError::internal_error(format!("{e}"), None)),
        }
    }

    #[tool(
        description = "Search a stored object for scalars containing a pattern (case-insensitive)"
    )]
    async fn search_object(
        &self,
        params: Parameters<SearchParams>,
    ) -> Result<CallToolResult, McpError> {
        let SearchParams { id, pattern, path } = params.0;
        match self.explorer.search(&id, &pattern, path.as_deref()).await {
            Ok(rendered) => Ok(CallToolResult::success(vec![Content::text(finish_text(
                rendered,
            ))])),
            Err(e) => Err(McpError::internal_error(format!("{e}"), None)),
        }
    }

    #[tool(description = "Delete a stored object by identifier")]
    async fn delete_object(
        &self,
        params: Parameters<DeleteParams>,
    ) -> Result<CallToolResult, McpError> {
        let id = params.0.id;
        match self.explorer.store().delete(&id).await {
            Ok(true) => Ok(CallToolResult::success(vec![Content::text(format!(
                "Deleted `{id}`"
            ))])),
            Ok(false) => Ok(CallToolResult::success(vec![Content::text(format!(
                "No live object `{id}` (already deleted or expired)"
            ))])),
            Err(e) => Err(McpError::internal_error(format!("{e}"), None)),
        }
    }
}

// =============================================================================
// SERVER HANDLER
// =============================================================================

#[tool_handler]
impl ServerHandler for ObjexMcp {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Objex object store. Use store_object to persist a JSON value and \
                 get a short id, then fetch_object, slice_object and search_object \
                 to explore it in bounded pieces instead of re-reading it whole."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

// =============================================================================
// RESPONSE FORMATTING
// =============================================================================

/// Append the truncation marker when a rendering was cut without an
/// inline marker of its own (search hit lists).
fn finish_text(rendered: Rendered) -> String {
    if rendered.truncated {
        format!("{}\n{}", rendered.text, TRUNCATION_MARKER)
    } else {
        rendered.text
    }
}
