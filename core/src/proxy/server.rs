//! Gateway Server - Axum HTTP server
//! Mounts the forward table under /api

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Path, State},
    http::{HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Json, Response},
    routing::{get, on, MethodFilter, MethodRouter},
    Router,
};
use bytes::Bytes;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::ProxyResult;
use crate::proxy::config::ProxyConfig;
use crate::proxy::handlers::forward::{handle_forward, InboundRequest};
use crate::proxy::routes::{builtin_routes, ForwardRule};
use crate::proxy::upstream::DownstreamClient;

/// Inbound bodies larger than this are rejected with 413
const BODY_LIMIT_BYTES: usize = 15 * 1024 * 1024;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub downstream: Arc<DownstreamClient>,
}

/// Gateway server instance
pub struct ProxyServer {
    host: String,
    port: u16,
    state: AppState,
    routes: Vec<ForwardRule>,
}

impl ProxyServer {
    pub fn new(host: String, port: u16, config: ProxyConfig) -> ProxyResult<Self> {
        let routes = builtin_routes(&config);
        let downstream = Arc::new(DownstreamClient::new(config)?);

        Ok(Self {
            host,
            port,
            state: AppState { downstream },
            routes,
        })
    }

    /// Replace the forward table
    pub fn with_routes(mut self, routes: Vec<ForwardRule>) -> Self {
        self.routes = routes;
        self
    }

    pub fn routes(&self) -> &[ForwardRule] {
        &self.routes
    }

    /// Build the full application router
    pub fn router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        Router::new()
            // Health check
            .route("/healthz", get(health_check_handler))
            .route("/health", get(health_check_handler))
            .nest("/api", forward_router(&self.routes))
            .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(cors),
            )
            .with_state(self.state.clone())
    }

    /// Run the gateway server (blocking)
    pub async fn run(self) -> anyhow::Result<()> {
        let app = self.router();

        let addr = format!("{}:{}", self.host, self.port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;

        tracing::info!("Gateway listening on {}", addr);
        tracing::info!("Forwarding to {}", self.state.downstream.config().base_str());

        // Handle graceful shutdown
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Gateway stopped");
        Ok(())
    }
}

/// One method router per inbound path, each method bound to its rule
fn forward_router(rules: &[ForwardRule]) -> Router<AppState> {
    let mut by_path: BTreeMap<String, MethodRouter<AppState>> = BTreeMap::new();

    for rule in rules {
        let filter = match MethodFilter::try_from(rule.method.clone()) {
            Ok(f) => f,
            Err(_) => {
                tracing::warn!("Skipping route {} {}: unsupported method", rule.method, rule.path);
                continue;
            }
        };

        let path = rule.path.clone();
        let rule = Arc::new(rule.clone());
        let handler = move |State(state): State<AppState>,
                            params: Option<Path<HashMap<String, String>>>,
                            uri: Uri,
                            headers: HeaderMap,
                            body: Bytes| {
            let rule = rule.clone();
            async move {
                let inbound = InboundRequest::from_parts(params, &uri, &headers, body);
                handle_forward(state, rule, inbound).await
            }
        };

        let method_router = match by_path.remove(&path) {
            Some(existing) => existing.on(filter, handler),
            None => on(filter, handler),
        };
        by_path.insert(path, method_router);
    }

    by_path
        .into_iter()
        .fold(Router::new(), |router, (path, method_router)| router.route(&path, method_router))
}

/// Health check handler
async fn health_check_handler() -> Response {
    (StatusCode::OK, Json(serde_json::json!({"status": "ok"}))).into_response()
}

/// Shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn server() -> ProxyServer {
        let config = ProxyConfig::new("http://127.0.0.1:9").unwrap();
        ProxyServer::new("127.0.0.1".to_string(), 0, config).unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoints() {
        let app = server().router();
        for path in ["/health", "/healthz"] {
            let resp = app
                .clone()
                .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::OK);
        }
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let resp = server()
            .router()
            .oneshot(Request::builder().uri("/api/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_wrong_method_is_405() {
        let resp = server()
            .router()
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/api/notebook/chat")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_malformed_json_is_400() {
        let resp = server()
            .router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/notebook/chat")
                    .header("content-type", "application/json")
                    .body(Body::from("{oops"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["detail"], "Invalid request body");
        assert!(body["error"].as_str().is_some());
    }
}
