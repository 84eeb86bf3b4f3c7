use docuverse_core::config::Config;
use docuverse_core::proxy::{ProxyConfig, ProxyServer};

pub async fn run(
    mut config: Config,
    port_override: Option<u16>,
    downstream_override: Option<String>,
) -> anyhow::Result<()> {
    // Apply overrides if provided
    if let Some(port) = port_override {
        config.server.port = port;
    }
    if let Some(base) = downstream_override {
        config.downstream.base_url = base;
    }

    let proxy_config = ProxyConfig::from_config(&config)?;

    tracing::info!("Starting DocuVerse gateway...");
    tracing::info!("  Host: {}", config.server.bind_host());
    tracing::info!("  Port: {}", config.server.port);
    tracing::info!("  Downstream: {}", proxy_config.base_str());
    tracing::info!(
        "  Retry: {} attempt(s), wake delay {}ms, probe timeout {}ms",
        proxy_config.attempts,
        proxy_config.wake_delay.as_millis(),
        proxy_config.probe_timeout.as_millis()
    );

    let server = ProxyServer::new(
        config.server.bind_host().to_string(),
        config.server.port,
        proxy_config,
    )?;

    tracing::info!("Forwarding {} route(s) under /api", server.routes().len());
    tracing::info!("Press Ctrl+C to stop");

    // Run server (blocks until shutdown)
    server.run().await?;

    Ok(())
}
