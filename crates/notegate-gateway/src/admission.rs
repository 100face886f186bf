//! Admission gates applied to every HTTP request before dispatch.
//!
//! Gates run in a fixed order: IP allow-list, bearer auth, rate limit,
//! CORS. A rejection stops the pipeline at that gate, so an unauthorized
//! caller never consumes rate-limit budget and never sees CORS headers.

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use notegate_security::{AuditLog, AuditOutcome, RateLimiter, SecurityPolicy};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::warn;

/// Resolved client IP, stored in request extensions for the handlers.
#[derive(Debug, Clone)]
pub struct ClientIp(pub String);

/// Largest request body accepted, in bytes. Declared sizes are rejected
/// here in the middleware (so they get audited); the routing layer
/// enforces the same cap on the bytes actually read.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Shared state for the admission middleware.
pub struct AdmissionState {
    pub policy: SecurityPolicy,
    pub limiter: Arc<RateLimiter>,
    pub audit: Arc<AuditLog>,
}

/// The ordered admission stages. Order is load-bearing: auth failures must
/// not consume rate-limit budget, and only admitted traffic reaches CORS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Gate {
    IpAllowList,
    Auth,
    RateLimit,
    Cors,
}

impl Gate {
    const ORDER: [Gate; 4] = [Gate::IpAllowList, Gate::Auth, Gate::RateLimit, Gate::Cors];
}

enum GateOutcome {
    Pass,
    /// Status, response body, audit tag.
    Reject(StatusCode, &'static str, &'static str),
    /// CORS preflight short-circuit: respond 200 immediately.
    Preflight,
}

struct RequestFacts<'a> {
    client_ip: &'a str,
    auth_header: Option<&'a str>,
    origin: Option<&'a str>,
    method: &'a Method,
}

impl Gate {
    async fn apply(
        self,
        state: &AdmissionState,
        facts: &RequestFacts<'_>,
        cors_headers: &mut Vec<(HeaderName, HeaderValue)>,
    ) -> GateOutcome {
        match self {
            Gate::IpAllowList => {
                if state.policy.ip_allowed(facts.client_ip) {
                    GateOutcome::Pass
                } else {
                    GateOutcome::Reject(
                        StatusCode::FORBIDDEN,
                        "Forbidden: IP not allowed",
                        "ip_blocked",
                    )
                }
            }
            Gate::Auth => {
                if !state.policy.enable_auth || state.policy.token_matches(facts.auth_header) {
                    GateOutcome::Pass
                } else {
                    GateOutcome::Reject(StatusCode::UNAUTHORIZED, "Unauthorized", "auth_failed")
                }
            }
            Gate::RateLimit => {
                if !state.policy.enable_rate_limit
                    || state
                        .limiter
                        .allow(facts.client_ip, state.policy.rate_limit_per_minute)
                        .await
                {
                    GateOutcome::Pass
                } else {
                    GateOutcome::Reject(
                        StatusCode::TOO_MANY_REQUESTS,
                        "Too Many Requests",
                        "rate_limited",
                    )
                }
            }
            Gate::Cors => {
                if !state.policy.enable_cors {
                    return GateOutcome::Pass;
                }
                if let Some(origin) = facts.origin {
                    if state.policy.origin_allowed(origin) {
                        if let Ok(value) = HeaderValue::from_str(origin) {
                            cors_headers.push((header::ACCESS_CONTROL_ALLOW_ORIGIN, value));
                            cors_headers.push((
                                header::ACCESS_CONTROL_ALLOW_METHODS,
                                HeaderValue::from_static("GET, POST, OPTIONS"),
                            ));
                            cors_headers.push((
                                header::ACCESS_CONTROL_ALLOW_HEADERS,
                                HeaderValue::from_static("Content-Type, Authorization"),
                            ));
                        }
                    }
                }
                if facts.method == Method::OPTIONS {
                    GateOutcome::Preflight
                } else {
                    GateOutcome::Pass
                }
            }
        }
    }
}

/// Extract the client IP: first entry of `X-Forwarded-For`, then
/// `X-Real-IP`, then the peer address.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    if let Some(xff) = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
    {
        if let Some(first) = xff.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }
    if let Some(xri) = headers.get("x-real-ip").and_then(|v| v.to_str().ok()) {
        if !xri.is_empty() {
            return xri.to_string();
        }
    }
    peer.map(|p| p.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn attach_headers(response: &mut Response, headers: &[(HeaderName, HeaderValue)]) {
    for (name, value) in headers {
        response.headers_mut().insert(name.clone(), value.clone());
    }
}

/// The admission middleware. Runs every gate, then the content-type and
/// body checks, then hands the request on with the resolved [`ClientIp`]
/// in its extensions.
pub async fn admission_middleware(
    State(state): State<Arc<AdmissionState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|c| c.0);
    let client = client_ip(request.headers(), peer);
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let origin = request
        .headers()
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let method = request.method().clone();

    let facts = RequestFacts {
        client_ip: &client,
        auth_header: auth_header.as_deref(),
        origin: origin.as_deref(),
        method: &method,
    };

    let mut cors_headers = Vec::new();
    for gate in Gate::ORDER {
        match gate.apply(&state, &facts, &mut cors_headers).await {
            GateOutcome::Pass => {}
            GateOutcome::Reject(status, body, tag) => {
                warn!(client_ip = %client, gate = ?gate, "request rejected");
                state.audit.record(&client, tag, AuditOutcome::Failed, None);
                return (status, body).into_response();
            }
            GateOutcome::Preflight => {
                let mut response = StatusCode::OK.into_response();
                attach_headers(&mut response, &cors_headers);
                return response;
            }
        }
    }

    // Transport hygiene runs after the gates so its rejections still carry
    // the CORS headers. These are admission failures too, so they audit.
    if method == Method::POST {
        let content_type = request
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if content_type != "application/json" {
            warn!(client_ip = %client, content_type, "request rejected");
            state
                .audit
                .record(&client, "invalid_content_type", AuditOutcome::Failed, None);
            let mut response = (
                StatusCode::BAD_REQUEST,
                "Content-Type must be application/json",
            )
                .into_response();
            attach_headers(&mut response, &cors_headers);
            return response;
        }
    }

    let declared_length = request
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());
    if declared_length.is_some_and(|len| len > MAX_BODY_BYTES) {
        warn!(client_ip = %client, "request rejected: body too large");
        state
            .audit
            .record(&client, "body_too_large", AuditOutcome::Failed, None);
        let mut response =
            (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response();
        attach_headers(&mut response, &cors_headers);
        return response;
    }

    request.extensions_mut().insert(ClientIp(client));
    let mut response = next.run(request).await;
    attach_headers(&mut response, &cors_headers);
    response
}
