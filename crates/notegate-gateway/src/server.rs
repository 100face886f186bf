//! HTTP transport: route layout and response framing.
//!
//! The root endpoint routes by JSON-RPC method; the `/mcp/*` endpoints
//! are direct aliases kept for clients that address methods by URL.
//! Error envelopes ride on HTTP 400, results on 200.

use crate::admission::{admission_middleware, AdmissionState, ClientIp, MAX_BODY_BYTES};
use crate::dispatch::Dispatcher;
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    middleware as axum_mw,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Extension, Router,
};
use notegate_core::protocol::{RpcRequest, RpcResponse, PARSE_ERROR};
use std::sync::Arc;

/// The main gateway server.
pub struct GatewayServer;

impl GatewayServer {
    /// Build the router: gated JSON-RPC endpoints plus an ungated
    /// `/health` for monitoring.
    pub fn build(dispatcher: Arc<Dispatcher>, admission: Arc<AdmissionState>) -> Router {
        let protected = Router::new()
            .route("/", post(rpc_handler))
            .route("/mcp/initialize", post(initialize_handler))
            .route("/mcp/tools/list", post(tools_list_handler))
            .route("/mcp/tools/call", post(tools_call_handler))
            .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
            .layer(axum_mw::from_fn_with_state(admission, admission_middleware))
            .with_state(dispatcher);

        Router::new()
            .route("/health", get(health_handler))
            .merge(protected)
    }
}

fn rpc_response(response: RpcResponse) -> Response {
    let status = if response.error.is_some() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::OK
    };
    (status, Json(response)).into_response()
}

async fn rpc_handler(
    State(dispatcher): State<Arc<Dispatcher>>,
    Extension(ClientIp(client)): Extension<ClientIp>,
    body: Bytes,
) -> Response {
    match dispatcher.dispatch(&client, &body).await {
        Some(response) => rpc_response(response),
        // Notifications get an empty 200.
        None => StatusCode::OK.into_response(),
    }
}

async fn initialize_handler(
    State(dispatcher): State<Arc<Dispatcher>>,
    body: Bytes,
) -> Response {
    match serde_json::from_slice::<RpcRequest>(&body) {
        Ok(req) => rpc_response(dispatcher.handle_initialize(req.id)),
        Err(_) => rpc_response(RpcResponse::error(None, PARSE_ERROR, "Parse error")),
    }
}

async fn tools_list_handler(
    State(dispatcher): State<Arc<Dispatcher>>,
    body: Bytes,
) -> Response {
    match serde_json::from_slice::<RpcRequest>(&body) {
        Ok(req) => rpc_response(dispatcher.handle_tools_list(req.id)),
        Err(_) => rpc_response(RpcResponse::error(None, PARSE_ERROR, "Parse error")),
    }
}

async fn tools_call_handler(
    State(dispatcher): State<Arc<Dispatcher>>,
    Extension(ClientIp(client)): Extension<ClientIp>,
    body: Bytes,
) -> Response {
    match serde_json::from_slice::<RpcRequest>(&body) {
        Ok(req) => rpc_response(dispatcher.handle_tools_call(&client, req.id, req.params).await),
        Err(_) => {
            dispatcher.record_parse_error(&client);
            rpc_response(RpcResponse::error(None, PARSE_ERROR, "Parse error"))
        }
    }
}

async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({"status": "healthy"}))
}
