//! Forward rules
//! Static mapping from inbound routes to downstream paths and retry profiles

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use reqwest::{Method, Url};

use crate::proxy::config::ProxyConfig;

/// How bodies are encoded on the way out and relayed on the way back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentMode {
    /// JSON in, JSON out
    Json,
    /// URL-encoded in, raw text/HTML passthrough out
    Form,
}

impl fmt::Display for ContentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentMode::Json => f.pad("json"),
            ContentMode::Form => f.pad("form"),
        }
    }
}

/// One inbound route and how it reaches the downstream service.
///
/// Path patterns use axum's `:name` syntax. The downstream template may
/// reference the same names; captured values are percent-encoded as single
/// path segments when substituted.
#[derive(Debug, Clone)]
pub struct ForwardRule {
    pub method: Method,
    pub path: String,
    pub downstream_method: Method,
    pub downstream: String,
    pub mode: ContentMode,
    pub timeout: Duration,
    pub attempts: u32,
    pub wake_delay: Duration,
}

impl ForwardRule {
    /// Rule with the default profile taken from `config`
    pub fn new(
        config: &ProxyConfig,
        method: Method,
        path: &str,
        downstream: &str,
        mode: ContentMode,
    ) -> Self {
        Self {
            downstream_method: method.clone(),
            method,
            path: path.to_string(),
            downstream: downstream.to_string(),
            mode,
            timeout: config.request_timeout,
            attempts: config.attempts,
            wake_delay: config.wake_delay,
        }
    }

    pub fn with_downstream_method(mut self, method: Method) -> Self {
        self.downstream_method = method;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts.max(1);
        self
    }

    pub fn with_wake_delay(mut self, wake_delay: Duration) -> Self {
        self.wake_delay = wake_delay;
        self
    }

    /// Label used in logs and gateway errors, e.g. `POST /api/notebook/chat`
    pub fn label(&self) -> String {
        format!("{} {}", self.downstream_method, self.downstream)
    }

    /// Resolve the downstream URL for one request.
    ///
    /// Literal template segments are copied, `:name` segments are replaced
    /// by the captured parameter. `query` is appended verbatim.
    pub fn downstream_url(
        &self,
        base: &Url,
        params: &HashMap<String, String>,
        query: Option<&str>,
    ) -> Url {
        let mut url = base.clone();
        {
            // Base URLs always have a host, so segments are available
            if let Ok(mut segments) = url.path_segments_mut() {
                segments.pop_if_empty();
                for part in self.downstream.split('/').filter(|s| !s.is_empty()) {
                    match part.strip_prefix(':') {
                        Some(name) => {
                            let value = params.get(name).map(String::as_str).unwrap_or_default();
                            segments.push(value);
                        }
                        None => {
                            segments.push(part);
                        }
                    }
                }
            }
        }
        url.set_query(query.filter(|q| !q.is_empty()));
        url
    }
}

/// The gateway's forward table, in registration order
pub fn builtin_routes(config: &ProxyConfig) -> Vec<ForwardRule> {
    use ContentMode::{Form, Json};

    let rule = |method: Method, path: &str, mode: ContentMode| {
        ForwardRule::new(config, method, path, &format!("/api{}", path), mode)
    };

    vec![
        rule(Method::POST, "/notebook/analyze", Json),
        rule(Method::POST, "/notebook/chat", Json),
        rule(Method::POST, "/notebook/diagram", Json),
        rule(Method::POST, "/notebook/image", Json),
        rule(Method::POST, "/notebook/diagram-image", Json),
        rule(Method::GET, "/notebook/diagram-image/status", Json),
        rule(Method::GET, "/notebook/image/status", Json),
        rule(Method::POST, "/workflow/start-review", Json),
        rule(Method::POST, "/workflow/resend-review", Json),
        rule(Method::GET, "/workflow/review", Form),
        rule(Method::POST, "/workflow/review-feedback", Form),
        rule(Method::POST, "/project/create", Json),
        ForwardRule::new(
            config,
            Method::GET,
            "/project/:project_id",
            "/api/project/:project_id",
            Json,
        ),
    ]
}
