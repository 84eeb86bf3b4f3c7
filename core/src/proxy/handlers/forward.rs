//! Forward handler
//! Relays one inbound /api request to the downstream service

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Json, Path},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use serde_json::{json, Value};
use tracing::{debug, error, info};

use crate::error::ProxyError;
use crate::proxy::common::body::{decode_inbound, encode_form, relay_json};
use crate::proxy::routes::{ContentMode, ForwardRule};
use crate::proxy::server::AppState;
use crate::proxy::upstream::{OutboundBody, OutboundRequest};

const DEFAULT_HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// Parts of the inbound call that survive into the outbound one
#[derive(Debug, Clone, Default)]
pub struct InboundRequest {
    pub params: HashMap<String, String>,
    pub query: Option<String>,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl InboundRequest {
    pub fn from_parts(params: Option<Path<HashMap<String, String>>>, uri: &Uri, headers: &HeaderMap, body: Bytes) -> Self {
        Self {
            params: params.map(|Path(p)| p).unwrap_or_default(),
            query: uri.query().map(str::to_string),
            content_type: headers
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
            body,
        }
    }
}

fn new_trace_id() -> String {
    use rand::Rng;
    rand::rng()
        .sample_iter(&rand::distr::Alphanumeric)
        .take(6)
        .map(char::from)
        .collect::<String>()
        .to_lowercase()
}

fn method_carries_body(method: &Method) -> bool {
    !matches!(*method, Method::GET | Method::HEAD | Method::DELETE | Method::OPTIONS)
}

/// Encode the decoded inbound body for the rule's content mode
pub fn build_outbound_body(rule: &ForwardRule, decoded: Option<Value>) -> OutboundBody {
    match rule.mode {
        ContentMode::Json => match decoded {
            Some(value) => OutboundBody::Json(value),
            None if method_carries_body(&rule.downstream_method) => OutboundBody::Json(json!({})),
            None => OutboundBody::Empty,
        },
        ContentMode::Form => {
            let encoded = encode_form(decoded.as_ref());
            if encoded.is_empty() {
                OutboundBody::Empty
            } else {
                OutboundBody::Form(encoded)
            }
        }
    }
}

/// Error body returned once the attempt budget is spent
pub fn gateway_error(rule: &ForwardRule, err: &ProxyError) -> Response {
    (
        StatusCode::BAD_GATEWAY,
        Json(json!({
            "detail": format!("Downstream request failed [{}]", rule.label()),
            "error": err.to_string(),
        })),
    )
        .into_response()
}

fn bad_request(err: &ProxyError) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "detail": "Invalid request body",
            "error": err.to_string(),
        })),
    )
        .into_response()
}

async fn relay_response(rule: &ForwardRule, resp: reqwest::Response, trace_id: &str) -> Response {
    let status = resp.status();
    let content_type = resp.headers().get(header::CONTENT_TYPE).cloned();

    let bytes = match resp.bytes().await {
        Ok(b) => b,
        Err(e) => {
            let err = ProxyError::from(e);
            error!("[{}] Failed to read downstream body for {}: {}", trace_id, rule.label(), err);
            return gateway_error(rule, &err);
        }
    };

    info!("[{}] {} -> {} ({} bytes)", trace_id, rule.label(), status, bytes.len());

    match rule.mode {
        ContentMode::Json => (status, Json(relay_json(&bytes))).into_response(),
        ContentMode::Form => {
            let content_type = content_type
                .unwrap_or_else(|| HeaderValue::from_static(DEFAULT_HTML_CONTENT_TYPE));
            (status, [(header::CONTENT_TYPE, content_type)], bytes).into_response()
        }
    }
}

/// Forward one request according to `rule`
pub async fn handle_forward(state: AppState, rule: Arc<ForwardRule>, inbound: InboundRequest) -> Response {
    let trace_id = new_trace_id();

    let decoded = match decode_inbound(inbound.content_type.as_deref(), &inbound.body) {
        Ok(v) => v,
        Err(e) => {
            debug!("[{}] Rejected body for {}: {}", trace_id, rule.label(), e);
            return bad_request(&e);
        }
    };

    let client = state.downstream.clone();
    let url = rule.downstream_url(
        &client.config().downstream_base,
        &inbound.params,
        inbound.query.as_deref(),
    );

    debug!("[{}] Forwarding {} {} -> {}", trace_id, rule.method, rule.path, url);

    let request = OutboundRequest {
        method: rule.downstream_method.clone(),
        url,
        mode: rule.mode,
        body: build_outbound_body(&rule, decoded),
    };

    match client.call_with_wake(&rule, &request, &trace_id).await {
        Ok(resp) => relay_response(&rule, resp, &trace_id).await,
        Err(e) => {
            error!("[{}] Downstream proxy error [{}]: {}", trace_id, rule.label(), e);
            gateway_error(&rule, &e)
        }
    }
}
