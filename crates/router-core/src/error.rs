//! The router's error taxonomy, per-call and fatal-startup alike.

use thiserror::Error;

use crate::jsonrpc::JsonRpcError;

/// All errors the core can produce, grouped by whether they are
/// surfaced on the wire (per-call) or abort the process (fatal startup).
#[derive(Debug, Error)]
pub enum RouterError {
    #[error("missing or malformed arguments: {0}")]
    InvalidParams(String),

    #[error("unknown tool: {0}")]
    MethodNotFound(String),

    #[error("upstream '{upstream_id}' timed out waiting for a response to '{name}'")]
    UpstreamTimeout { upstream_id: String, name: String },

    #[error("upstream '{upstream_id}' returned an error: {message}")]
    UpstreamError {
        upstream_id: String,
        name: String,
        code: i64,
        message: String,
        data: Option<serde_json::Value>,
    },

    #[error("upstream '{upstream_id}' is not ready")]
    UpstreamClosed { upstream_id: String, name: String },

    #[error("embedding provider unavailable while serving search_tools: {0}")]
    SearchUnavailable(String),

    #[error("call was cancelled")]
    Cancelled,

    #[error("duplicate public tool name: {0}")]
    CatalogConflict(String),

    #[error("embedding provider unavailable: {0}")]
    EmbeddingUnavailable(String),

    #[error("every configured upstream failed to start")]
    AllUpstreamsFailed,

    #[error("upstream unreachable: {0}")]
    UpstreamUnreachable(String),

    #[error("MCP handshake failed: {0}")]
    HandshakeFailed(String),

    #[error("tools/list failed: {0}")]
    ListToolsFailed(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

/// The taxonomy groups from spec.md §7, used to pick a wire code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidParams,
    MethodNotFound,
    UpstreamTimeout,
    UpstreamError,
    UpstreamClosed,
    SearchUnavailable,
    Cancelled,
    Fatal,
    Internal,
}

impl RouterError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RouterError::InvalidParams(_) => ErrorKind::InvalidParams,
            RouterError::MethodNotFound(_) => ErrorKind::MethodNotFound,
            RouterError::UpstreamTimeout { .. } => ErrorKind::UpstreamTimeout,
            RouterError::UpstreamError { .. } => ErrorKind::UpstreamError,
            RouterError::UpstreamClosed { .. } => ErrorKind::UpstreamClosed,
            RouterError::SearchUnavailable(_) => ErrorKind::SearchUnavailable,
            RouterError::Cancelled => ErrorKind::Cancelled,
            RouterError::CatalogConflict(_)
            | RouterError::EmbeddingUnavailable(_)
            | RouterError::AllUpstreamsFailed
            | RouterError::UpstreamUnreachable(_)
            | RouterError::HandshakeFailed(_)
            | RouterError::ListToolsFailed(_)
            | RouterError::InvalidConfig(_) => ErrorKind::Fatal,
            RouterError::Io(_) | RouterError::Serialization(_) => ErrorKind::Internal,
        }
    }

    /// Translate a per-call failure into a JSON-RPC error object, per §7.
    ///
    /// Fatal-startup variants are never expected here; they abort the
    /// process before a wire response is possible.
    pub fn to_jsonrpc_error(&self, name: Option<&str>) -> JsonRpcError {
        let mut data = serde_json::Map::new();
        if let Some(name) = name {
            data.insert("name".to_string(), serde_json::json!(name));
        }

        let code = match self {
            RouterError::InvalidParams(_) => -32602,
            RouterError::MethodNotFound(n) => {
                data.insert("name".to_string(), serde_json::json!(n));
                -32601
            }
            RouterError::UpstreamTimeout { upstream_id, name } => {
                data.insert("upstreamId".to_string(), serde_json::json!(upstream_id));
                data.insert("name".to_string(), serde_json::json!(name));
                -32000
            }
            RouterError::UpstreamError {
                upstream_id,
                name,
                code,
                message,
                data: upstream_data,
            } => {
                data.insert("upstreamId".to_string(), serde_json::json!(upstream_id));
                data.insert("name".to_string(), serde_json::json!(name));
                data.insert(
                    "upstreamError".to_string(),
                    serde_json::json!({
                        "code": code,
                        "message": message,
                        "data": upstream_data,
                    }),
                );
                -32603
            }
            RouterError::UpstreamClosed { upstream_id, name } => {
                data.insert("upstreamId".to_string(), serde_json::json!(upstream_id));
                data.insert("name".to_string(), serde_json::json!(name));
                -32000
            }
            RouterError::SearchUnavailable(_) => -32000,
            RouterError::Cancelled => -32000,
            _ => -32603,
        };

        JsonRpcError {
            code,
            message: self.to_string(),
            data: if data.is_empty() {
                None
            } else {
                Some(serde_json::Value::Object(data))
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_tool_carries_method_not_found_code_and_name() {
        let err = RouterError::MethodNotFound("nope.thing".to_string());
        let wire = err.to_jsonrpc_error(None);
        assert_eq!(wire.code, -32601);
        assert_eq!(wire.data.unwrap()["name"], "nope.thing");
    }

    #[test]
    fn upstream_timeout_carries_upstream_id_and_name() {
        let err = RouterError::UpstreamTimeout {
            upstream_id: "A".to_string(),
            name: "a.one".to_string(),
        };
        let wire = err.to_jsonrpc_error(None);
        assert_eq!(wire.code, -32000);
        let data = wire.data.unwrap();
        assert_eq!(data["upstreamId"], "A");
        assert_eq!(data["name"], "a.one");
    }

    #[test]
    fn upstream_error_carries_original_code_and_message_in_data() {
        let err = RouterError::UpstreamError {
            upstream_id: "B".to_string(),
            name: "b.one".to_string(),
            code: 7,
            message: "boom".to_string(),
            data: None,
        };
        let wire = err.to_jsonrpc_error(None);
        assert_eq!(wire.code, -32603);
        let data = wire.data.unwrap();
        assert_eq!(data["upstreamError"]["code"], 7);
        assert_eq!(data["upstreamError"]["message"], "boom");
    }

    #[test]
    fn kind_groups_fatal_startup_errors_together() {
        assert_eq!(RouterError::AllUpstreamsFailed.kind(), ErrorKind::Fatal);
        assert_eq!(
            RouterError::CatalogConflict("x".into()).kind(),
            ErrorKind::Fatal
        );
    }
}
