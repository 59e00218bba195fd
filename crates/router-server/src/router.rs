//! The Router Server: the host-facing MCP endpoint. Handles
//! `initialize`, `tools/list`, and `tools/call` over whatever transport
//! the host reader feeds it JSON-RPC requests from.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use router_catalog::{Catalog, SEARCH_TOOLS_NAME};
use router_core::{
    JsonRpcError, JsonRpcRequest, JsonRpcResponse, PublicTool, RouterConfig, RouterError,
};
use router_embed::EmbeddingProvider;
use router_index::ToolIndex;
use router_upstream::UpstreamSession;
use serde_json::{json, Value};

use crate::search::search_tools;

pub struct RouterServer {
    catalog: Catalog,
    index: ToolIndex,
    provider: Arc<dyn EmbeddingProvider>,
    sessions: HashMap<String, Arc<UpstreamSession>>,
    config: RouterConfig,
}

impl RouterServer {
    pub fn new(
        catalog: Catalog,
        index: ToolIndex,
        provider: Arc<dyn EmbeddingProvider>,
        sessions: HashMap<String, Arc<UpstreamSession>>,
        config: RouterConfig,
    ) -> Self {
        Self {
            catalog,
            index,
            provider,
            sessions,
            config,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn sessions(&self) -> &HashMap<String, Arc<UpstreamSession>> {
        &self.sessions
    }

    /// Dispatch one JSON-RPC request to the appropriate handler.
    /// Notifications (`id: null`) are handled but never produce a
    /// response the caller needs to write back.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let id = request.id.clone();
        if request.is_notification() {
            tracing::debug!(method = %request.method, "received notification");
            return None;
        }
        let id = id.unwrap_or(Value::Null);

        let result = match request.method.as_str() {
            "initialize" => Ok(self.handle_initialize()),
            "tools/list" => Ok(self.handle_tools_list()),
            "tools/call" => self.handle_tools_call(request.params).await,
            other => Err(RouterError::MethodNotFound(other.to_string())),
        };

        Some(match result {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(err) => JsonRpcResponse::failure(id, err.to_jsonrpc_error(None)),
        })
    }

    fn handle_initialize(&self) -> Value {
        json!({
            "protocolVersion": "2024-11-05",
            "capabilities": { "tools": {} },
            "serverInfo": { "name": "mcp-router", "version": env!("CARGO_PKG_VERSION") }
        })
    }

    fn handle_tools_list(&self) -> Value {
        let n = self.config.default_subset_size;
        let mut names = vec![SEARCH_TOOLS_NAME.to_string()];
        if n > 1 {
            names.extend(
                self.index
                    .default_subset(n - 1, |name| name != SEARCH_TOOLS_NAME),
            );
        }

        let tools: Vec<Value> = names
            .iter()
            .filter_map(|name| self.catalog.describe(name))
            .map(|tool| {
                json!({
                    "name": tool.public_name,
                    "description": tool.description,
                    "inputSchema": tool.input_schema,
                })
            })
            .collect();

        json!({ "tools": tools })
    }

    async fn handle_tools_call(&self, params: Value) -> Result<Value, RouterError> {
        let name = params
            .get("name")
            .and_then(|n| n.as_str())
            .ok_or_else(|| RouterError::InvalidParams("tools/call requires 'name'".to_string()))?;
        let arguments = params.get("arguments").cloned().unwrap_or(json!({}));

        if name == SEARCH_TOOLS_NAME {
            return self.call_search_tools(arguments).await;
        }

        // §4.6: the router splits the public name at the first period
        // before it ever looks the entry up.
        PublicTool::split_public_name(name)
            .ok_or_else(|| RouterError::MethodNotFound(name.to_string()))?;

        let (upstream_id, native_name) = self
            .catalog
            .lookup(name)
            .ok_or_else(|| RouterError::MethodNotFound(name.to_string()))?;

        let session = self
            .sessions
            .get(upstream_id)
            .ok_or_else(|| RouterError::UpstreamClosed {
                upstream_id: upstream_id.to_string(),
                name: name.to_string(),
            })?;

        let deadline = Instant::now() + self.config.call_deadline_default;
        session.call(native_name, name, arguments, deadline).await
    }

    async fn call_search_tools(&self, arguments: Value) -> Result<Value, RouterError> {
        let query = arguments
            .get("query")
            .and_then(|q| q.as_str())
            .unwrap_or("");
        let context: Vec<String> = arguments
            .get("context")
            .and_then(|c| c.as_array())
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|e| e.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();

        let results = search_tools(
            self.provider.as_ref(),
            &self.index,
            &self.catalog,
            query,
            &context,
            self.config.search_default_k,
        )
        .await?;

        let payload = serde_json::to_string(&results)?;
        Ok(json!({
            "content": [{ "type": "text", "text": payload }]
        }))
    }
}

/// Helper for the CLI's host loop: build a JSON-RPC error response
/// for a request that failed to parse at all (no `method` available).
pub fn parse_error_response(id: Value, message: impl Into<String>) -> JsonRpcResponse {
    JsonRpcResponse::failure(
        id,
        JsonRpcError {
            code: -32700,
            message: message.into(),
            data: None,
        },
    )
}
