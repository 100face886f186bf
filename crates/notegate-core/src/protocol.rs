//! MCP (Model Context Protocol) JSON-RPC 2.0 message types, server side.

use serde::{Deserialize, Serialize};

/// Protocol revision advertised in the `initialize` response.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// JSON-RPC error code: request body was not valid JSON.
pub const PARSE_ERROR: i64 = -32700;
/// JSON-RPC error code: method name not recognized.
pub const METHOD_NOT_FOUND: i64 = -32601;
/// JSON-RPC error code: params missing or malformed.
pub const INVALID_PARAMS: i64 = -32602;
/// JSON-RPC error code: execution failed after a well-formed request.
pub const INTERNAL_ERROR: i64 = -32603;

/// JSON-RPC 2.0 request as received from a client.
///
/// The `id` is kept opaque: clients may send numbers or strings and must
/// get the same value back. A missing (or null) `id` marks a notification,
/// which never receives a response body.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcRequest {
    #[serde(default)]
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    #[serde(default)]
    pub params: Option<serde_json::Value>,
}

impl RpcRequest {
    /// True when the request expects no response.
    pub fn is_notification(&self) -> bool {
        match &self.id {
            None => true,
            Some(v) => v.is_null(),
        }
    }
}

/// JSON-RPC 2.0 response. Exactly one of `result` or `error` is set.
#[derive(Debug, Clone, Serialize)]
pub struct RpcResponse {
    pub jsonrpc: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl RpcResponse {
    /// Build a success response echoing the request id.
    pub fn success(id: Option<serde_json::Value>, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Build an error response echoing the request id.
    pub fn error(id: Option<serde_json::Value>, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(RpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

/// JSON-RPC 2.0 error object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

/// One content block inside a tool result. Notegate only emits text blocks.
#[derive(Debug, Clone, Serialize)]
pub struct ToolContent {
    #[serde(rename = "type")]
    pub content_type: &'static str,
    pub text: String,
}

impl ToolContent {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content_type: "text",
            text: text.into(),
        }
    }
}

/// The `tools/call` success payload: a list of content blocks.
#[derive(Debug, Clone, Serialize)]
pub struct ToolCallResult {
    pub content: Vec<ToolContent>,
}

impl ToolCallResult {
    /// Wrap a tool's textual output in the single supported block shape.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::text(text)],
        }
    }
}
