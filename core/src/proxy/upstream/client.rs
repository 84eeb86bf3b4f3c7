//! Downstream client for calling the document generation service

use reqwest::{header, Client, Method, Response, Url};
use serde_json::Value;
use tokio::time::{sleep, Duration};

use crate::error::{ProxyError, ProxyResult};
use crate::proxy::config::ProxyConfig;
use crate::proxy::routes::{ContentMode, ForwardRule};

const JSON_CONTENT_TYPE: &str = "application/json";
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Body of an outbound call, already encoded for its content mode
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundBody {
    Empty,
    Json(Value),
    Form(String),
}

/// One fully resolved downstream call, replayed unchanged on every attempt
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: Url,
    pub mode: ContentMode,
    pub body: OutboundBody,
}

#[derive(Clone)]
pub struct DownstreamClient {
    http_client: Client,
    config: ProxyConfig,
}

impl DownstreamClient {
    pub fn new(config: ProxyConfig) -> ProxyResult<Self> {
        let http_client = Client::builder()
            .connect_timeout(Duration::from_secs(20))
            .pool_max_idle_per_host(16)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .user_agent(concat!("docuverse-gateway/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ProxyError::Client(e.to_string()))?;

        Ok(Self { http_client, config })
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    async fn send_once(&self, request: &OutboundRequest, timeout: Duration) -> Result<Response, reqwest::Error> {
        let content_type = match request.mode {
            ContentMode::Json => JSON_CONTENT_TYPE,
            ContentMode::Form => FORM_CONTENT_TYPE,
        };

        let builder = self.http_client
            .request(request.method.clone(), request.url.clone())
            .header(header::CONTENT_TYPE, content_type)
            .timeout(timeout);

        let builder = match &request.body {
            OutboundBody::Empty => builder,
            OutboundBody::Json(value) => builder.json(value),
            OutboundBody::Form(encoded) => builder.body(encoded.clone()),
        };

        builder.send().await
    }

    /// Best-effort `GET /health` to nudge a cold downstream awake.
    /// Returns whether any response came back; failures are only logged.
    pub async fn probe_health(&self, trace_id: &str) -> bool {
        let url = self.config.health_url();
        match self.http_client
            .get(&url)
            .timeout(self.config.probe_timeout)
            .send()
            .await
        {
            Ok(resp) => {
                tracing::debug!("[{}] Wake probe {} returned {}", trace_id, url, resp.status());
                true
            }
            Err(e) => {
                tracing::debug!("[{}] Wake probe {} failed: {}", trace_id, url, ProxyError::from(e));
                false
            }
        }
    }

    /// Call the downstream service, retrying transport failures.
    ///
    /// Any HTTP response counts as delivered, whatever its status. Between
    /// attempts the client probes `/health` and waits the rule's wake delay.
    /// The error of the final attempt is returned once the budget is spent.
    pub async fn call_with_wake(
        &self,
        rule: &ForwardRule,
        request: &OutboundRequest,
        trace_id: &str,
    ) -> ProxyResult<Response> {
        let max_attempts = rule.attempts.max(1);
        let mut last_err: Option<ProxyError> = None;

        for attempt in 1..=max_attempts {
            match self.send_once(request, rule.timeout).await {
                Ok(resp) => {
                    if attempt > 1 {
                        tracing::info!(
                            "[{}] Downstream reachable after retry: {} (attempt {})",
                            trace_id,
                            request.url,
                            attempt
                        );
                    }
                    return Ok(resp);
                }
                Err(e) => {
                    let err = ProxyError::from(e);
                    tracing::warn!(
                        "[{}] {} attempt {}/{} failed: {}",
                        trace_id,
                        rule.label(),
                        attempt,
                        max_attempts,
                        err
                    );

                    if attempt < max_attempts {
                        self.probe_health(trace_id).await;
                        sleep(rule.wake_delay).await;
                    }
                    last_err = Some(err);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| ProxyError::Client("no attempt was made".to_string())))
    }
}
