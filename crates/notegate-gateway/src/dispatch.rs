//! JSON-RPC dispatch: envelope parsing, method routing, and tool execution
//! against the vault client.

use notegate_core::protocol::{
    RpcRequest, RpcResponse, ToolCallResult, INTERNAL_ERROR, INVALID_PARAMS, METHOD_NOT_FOUND,
    PARSE_ERROR, PROTOCOL_VERSION,
};
use notegate_core::{NotegateError, NotegateResult, Tool};
use notegate_security::{sanitize_content, validate_path, AuditLog, AuditOutcome};
use notegate_vault::VaultApi;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, error};

const SERVER_NAME: &str = "notegate";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Routes parsed JSON-RPC requests to handlers and tools to the vault.
pub struct Dispatcher {
    vault: Arc<dyn VaultApi>,
    audit: Arc<AuditLog>,
}

impl Dispatcher {
    pub fn new(vault: Arc<dyn VaultApi>, audit: Arc<AuditLog>) -> Self {
        Self { vault, audit }
    }

    /// Handle one raw JSON-RPC message. Returns `None` for notifications,
    /// which expect no response body.
    pub async fn dispatch(&self, client_ip: &str, body: &[u8]) -> Option<RpcResponse> {
        let request: RpcRequest = match serde_json::from_slice(body) {
            Ok(req) => req,
            Err(_) => {
                self.audit
                    .record(client_ip, "parse_error", AuditOutcome::Failed, None);
                return Some(RpcResponse::error(None, PARSE_ERROR, "Parse error"));
            }
        };

        if request.is_notification() {
            debug!(method = %request.method, "notification, no response");
            return None;
        }

        let response = match request.method.as_str() {
            "initialize" => self.handle_initialize(request.id),
            "tools/list" => self.handle_tools_list(request.id),
            "tools/call" => {
                self.handle_tools_call(client_ip, request.id, request.params)
                    .await
            }
            other => RpcResponse::error(
                request.id,
                METHOD_NOT_FOUND,
                format!("Method not found: {other}"),
            ),
        };
        Some(response)
    }

    /// The `initialize` handshake: a fixed capability descriptor.
    pub fn handle_initialize(&self, id: Option<Value>) -> RpcResponse {
        RpcResponse::success(
            id,
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {
                    "tools": { "listChanged": false },
                    "resources": { "subscribe": false, "listChanged": false },
                },
                "serverInfo": {
                    "name": SERVER_NAME,
                    "version": SERVER_VERSION,
                },
            }),
        )
    }

    /// The static tool catalogue.
    pub fn handle_tools_list(&self, id: Option<Value>) -> RpcResponse {
        RpcResponse::success(id, json!({ "tools": Tool::catalogue() }))
    }

    /// Validate, sanitize, and execute a `tools/call` request. Every call
    /// attempt produces exactly one audit entry.
    pub async fn handle_tools_call(
        &self,
        client_ip: &str,
        id: Option<Value>,
        params: Option<Value>,
    ) -> RpcResponse {
        let Some(params) = params.as_ref().and_then(Value::as_object) else {
            self.audit
                .record(client_ip, "invalid_params", AuditOutcome::Failed, None);
            return RpcResponse::error(id, INVALID_PARAMS, "Invalid params");
        };
        let Some(tool_name) = params.get("name").and_then(Value::as_str) else {
            self.audit
                .record(client_ip, "missing_tool_name", AuditOutcome::Failed, None);
            return RpcResponse::error(id, INVALID_PARAMS, "Missing tool name");
        };
        let mut arguments = params
            .get("arguments")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        // Path-shaped arguments are validated before any tool logic runs.
        for key in ["path", "folder"] {
            if let Some(value) = arguments.get(key).and_then(Value::as_str) {
                if let Err(e) = validate_path(value) {
                    self.audit.record(
                        client_ip,
                        format!("invalid_path_{tool_name}"),
                        AuditOutcome::Failed,
                        Some(value.to_string()),
                    );
                    return RpcResponse::error(id, INVALID_PARAMS, format!("Invalid path: {e}"));
                }
            }
        }

        if let Some(content) = arguments.get("content").and_then(Value::as_str) {
            let clean = sanitize_content(content);
            arguments.insert("content".to_string(), Value::String(clean));
        }

        // An unknown tool is an execution failure, not a protocol error.
        let Some(tool) = Tool::parse(tool_name) else {
            self.audit
                .record(client_ip, tool_name, AuditOutcome::Failed, None);
            return RpcResponse::error(id, INTERNAL_ERROR, format!("unknown tool: {tool_name}"));
        };

        let note_path = arguments
            .get("path")
            .and_then(Value::as_str)
            .map(str::to_string);
        match self.execute(tool, &arguments).await {
            Ok(text) => {
                self.audit
                    .record(client_ip, tool_name, AuditOutcome::Success, note_path);
                match serde_json::to_value(ToolCallResult::text(text)) {
                    Ok(result) => RpcResponse::success(id, result),
                    Err(e) => RpcResponse::error(id, INTERNAL_ERROR, e.to_string()),
                }
            }
            Err(e) => {
                error!(tool = tool_name, error = %e, "tool execution failed");
                self.audit
                    .record(client_ip, tool_name, AuditOutcome::Failed, note_path);
                RpcResponse::error(id, INTERNAL_ERROR, e.to_string())
            }
        }
    }

    /// Audit a body that failed to parse on one of the direct endpoints,
    /// where the caller builds the error response itself.
    pub fn record_parse_error(&self, client_ip: &str) {
        self.audit
            .record(client_ip, "parse_error", AuditOutcome::Failed, None);
    }

    async fn execute(&self, tool: Tool, args: &Map<String, Value>) -> NotegateResult<String> {
        match tool {
            Tool::GetNote => self.vault.get_note(required_str(args, "path")?).await,
            Tool::CreateNote => {
                let path = required_str(args, "path")?;
                let content = required_str(args, "content")?;
                self.vault.create_note(path, content).await
            }
            Tool::UpdateNote => {
                let path = required_str(args, "path")?;
                let content = required_str(args, "content")?;
                self.vault.update_note(path, content).await
            }
            Tool::DeleteNote => self.vault.delete_note(required_str(args, "path")?).await,
            Tool::ListNotes => {
                let folder = args.get("folder").and_then(Value::as_str).unwrap_or("");
                self.vault.list_notes(folder).await
            }
            Tool::SearchNotes => self.vault.search_notes(required_str(args, "query")?).await,
            Tool::GetVaultInfo => self.vault.vault_info().await,
        }
    }
}

fn required_str<'a>(args: &'a Map<String, Value>, key: &'static str) -> NotegateResult<&'a str> {
    args.get(key)
        .and_then(Value::as_str)
        .ok_or(NotegateError::MissingArgument(key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// In-memory vault that records calls and replies with canned strings.
    struct FakeVault {
        calls: Mutex<Vec<String>>,
    }

    impl FakeVault {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
            })
        }

        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl VaultApi for FakeVault {
        async fn get_note(&self, path: &str) -> NotegateResult<String> {
            self.record(format!("get:{path}"));
            Ok(format!("# Note: {path}\n\nbody"))
        }
        async fn create_note(&self, path: &str, content: &str) -> NotegateResult<String> {
            self.record(format!("create:{path}:{content}"));
            Ok(format!("Successfully created note: {path}"))
        }
        async fn update_note(&self, path: &str, _content: &str) -> NotegateResult<String> {
            self.record(format!("update:{path}"));
            Ok(format!("Successfully updated note: {path}"))
        }
        async fn delete_note(&self, path: &str) -> NotegateResult<String> {
            self.record(format!("delete:{path}"));
            Ok(format!("Successfully deleted note: {path}"))
        }
        async fn list_notes(&self, folder: &str) -> NotegateResult<String> {
            self.record(format!("list:{folder}"));
            Ok("Found 1 notes:\n- a.md\n".to_string())
        }
        async fn search_notes(&self, query: &str) -> NotegateResult<String> {
            self.record(format!("search:{query}"));
            Err(NotegateError::Vault("failed to search notes: 500".into()))
        }
        async fn vault_info(&self) -> NotegateResult<String> {
            self.record("info".to_string());
            Ok("# Vault Information\n\n".to_string())
        }
    }

    fn dispatcher(vault: Arc<FakeVault>) -> Dispatcher {
        Dispatcher::new(vault, Arc::new(AuditLog::disabled()))
    }

    fn call_body(name: &str, arguments: Value) -> Vec<u8> {
        serde_json::to_vec(&json!({
            "jsonrpc": "2.0",
            "method": "tools/call",
            "id": 1,
            "params": { "name": name, "arguments": arguments },
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_parse_error() {
        let d = dispatcher(FakeVault::new());
        let resp = d.dispatch("1.1.1.1", b"{not json").await.unwrap();
        let err = resp.error.unwrap();
        assert_eq!(err.code, PARSE_ERROR);
        assert_eq!(err.message, "Parse error");
        assert!(resp.id.is_none());
    }

    #[tokio::test]
    async fn test_notification_gets_no_response() {
        let d = dispatcher(FakeVault::new());
        let body = br#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#;
        assert!(d.dispatch("1.1.1.1", body).await.is_none());

        // Explicit null id is also a notification.
        let body = br#"{"jsonrpc":"2.0","method":"tools/list","id":null}"#;
        assert!(d.dispatch("1.1.1.1", body).await.is_none());
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let d = dispatcher(FakeVault::new());
        let body = br#"{"jsonrpc":"2.0","method":"resources/list","id":7}"#;
        let resp = d.dispatch("1.1.1.1", body).await.unwrap();
        let err = resp.error.unwrap();
        assert_eq!(err.code, METHOD_NOT_FOUND);
        assert_eq!(err.message, "Method not found: resources/list");
        assert_eq!(resp.id, Some(json!(7)));
    }

    #[tokio::test]
    async fn test_initialize_descriptor() {
        let d = dispatcher(FakeVault::new());
        let body = br#"{"jsonrpc":"2.0","method":"initialize","id":1}"#;
        let resp = d.dispatch("1.1.1.1", body).await.unwrap();
        let result = resp.result.unwrap();
        assert_eq!(result["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(result["capabilities"]["tools"]["listChanged"], false);
        assert_eq!(result["capabilities"]["resources"]["subscribe"], false);
        assert_eq!(result["serverInfo"]["name"], SERVER_NAME);
    }

    #[tokio::test]
    async fn test_tools_list_catalogue() {
        let d = dispatcher(FakeVault::new());
        let body = br#"{"jsonrpc":"2.0","method":"tools/list","id":2}"#;
        let resp = d.dispatch("1.1.1.1", body).await.unwrap();
        let tools = resp.result.unwrap()["tools"].as_array().unwrap().clone();
        assert_eq!(tools.len(), 7);
        assert_eq!(tools[0]["name"], "get_note");
        assert!(tools[0]["inputSchema"]["required"]
            .as_array()
            .unwrap()
            .contains(&json!("path")));
    }

    #[tokio::test]
    async fn test_call_without_params_is_invalid() {
        let d = dispatcher(FakeVault::new());
        let body = br#"{"jsonrpc":"2.0","method":"tools/call","id":3}"#;
        let resp = d.dispatch("1.1.1.1", body).await.unwrap();
        let err = resp.error.unwrap();
        assert_eq!(err.code, INVALID_PARAMS);
        assert_eq!(err.message, "Invalid params");
    }

    #[tokio::test]
    async fn test_call_without_name_is_invalid() {
        let d = dispatcher(FakeVault::new());
        let body = br#"{"jsonrpc":"2.0","method":"tools/call","id":3,"params":{}}"#;
        let resp = d.dispatch("1.1.1.1", body).await.unwrap();
        assert_eq!(resp.error.unwrap().message, "Missing tool name");
    }

    #[tokio::test]
    async fn test_traversal_path_rejected_before_execution() {
        let vault = FakeVault::new();
        let d = dispatcher(vault.clone());
        let body = call_body("get_note", json!({"path": "x/../y.md"}));
        let resp = d.dispatch("1.1.1.1", &body).await.unwrap();
        let err = resp.error.unwrap();
        assert_eq!(err.code, INVALID_PARAMS);
        assert!(err.message.starts_with("Invalid path:"));
        assert!(vault.calls().is_empty());
    }

    #[tokio::test]
    async fn test_traversal_rejection_reaches_the_audit_file() {
        let tmp = tempfile::tempdir().unwrap();
        let d = Dispatcher::new(
            FakeVault::new(),
            Arc::new(AuditLog::new(tmp.path().to_path_buf())),
        );
        let body = call_body("get_note", json!({"path": "x/../y.md"}));
        let resp = d.dispatch("10.0.0.5", &body).await.unwrap();
        assert_eq!(resp.error.unwrap().code, INVALID_PARAMS);

        let file = tmp.path().join("audit.jsonl");
        for _ in 0..50 {
            if file.exists() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        let line = tokio::fs::read_to_string(&file).await.unwrap();
        let entry: Value = serde_json::from_str(line.lines().next().unwrap()).unwrap();
        assert_eq!(entry["client_ip"], "10.0.0.5");
        assert_eq!(entry["action"], "invalid_path_get_note");
        assert_eq!(entry["outcome"], "failed");
        assert_eq!(entry["path"], "x/../y.md");
    }

    #[tokio::test]
    async fn test_folder_argument_is_validated_too() {
        let vault = FakeVault::new();
        let d = dispatcher(vault.clone());
        let body = call_body("list_notes", json!({"folder": "/etc"}));
        let resp = d.dispatch("1.1.1.1", &body).await.unwrap();
        assert_eq!(resp.error.unwrap().code, INVALID_PARAMS);
        assert!(vault.calls().is_empty());
    }

    #[tokio::test]
    async fn test_list_notes_defaults_to_empty_folder() {
        let vault = FakeVault::new();
        let d = dispatcher(vault.clone());
        let body = call_body("list_notes", json!({}));
        let resp = d.dispatch("1.1.1.1", &body).await.unwrap();
        assert!(resp.error.is_none());
        assert_eq!(vault.calls(), vec!["list:"]);
    }

    #[tokio::test]
    async fn test_content_is_sanitized_before_forwarding() {
        let vault = FakeVault::new();
        let d = dispatcher(vault.clone());
        let body = call_body("create_note", json!({"path": "a.md", "content": "he\u{0}llo"}));
        let resp = d.dispatch("1.1.1.1", &body).await.unwrap();
        assert!(resp.error.is_none());
        assert_eq!(vault.calls(), vec!["create:a.md:hello"]);
    }

    #[tokio::test]
    async fn test_unknown_tool_is_internal_error() {
        let d = dispatcher(FakeVault::new());
        let body = call_body("drop_vault", json!({}));
        let resp = d.dispatch("1.1.1.1", &body).await.unwrap();
        let err = resp.error.unwrap();
        assert_eq!(err.code, INTERNAL_ERROR);
        assert_eq!(err.message, "unknown tool: drop_vault");
    }

    #[tokio::test]
    async fn test_missing_required_argument() {
        let d = dispatcher(FakeVault::new());
        let body = call_body("get_note", json!({}));
        let resp = d.dispatch("1.1.1.1", &body).await.unwrap();
        let err = resp.error.unwrap();
        assert_eq!(err.code, INTERNAL_ERROR);
        assert_eq!(err.message, "missing or invalid path parameter");
    }

    #[tokio::test]
    async fn test_successful_call_wraps_text_content() {
        let d = dispatcher(FakeVault::new());
        let body = call_body("get_note", json!({"path": "daily.md"}));
        let resp = d.dispatch("1.1.1.1", &body).await.unwrap();
        let result = resp.result.unwrap();
        assert_eq!(result["content"][0]["type"], "text");
        assert_eq!(result["content"][0]["text"], "# Note: daily.md\n\nbody");
    }

    #[tokio::test]
    async fn test_backend_failure_surfaces_as_internal_error() {
        let d = dispatcher(FakeVault::new());
        let body = call_body("search_notes", json!({"query": "x"}));
        let resp = d.dispatch("1.1.1.1", &body).await.unwrap();
        let err = resp.error.unwrap();
        assert_eq!(err.code, INTERNAL_ERROR);
        assert!(err.message.contains("failed to search notes"));
    }
}
