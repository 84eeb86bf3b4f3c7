use std::time::Duration;

use docuverse_core::config::{default_config_path, Config};
use docuverse_core::proxy::ProxyConfig;

async fn reachable(client: &reqwest::Client, url: &str) -> Option<reqwest::StatusCode> {
    client.get(url).send().await.ok().map(|resp| resp.status())
}

pub async fn run(config: Config) -> anyhow::Result<()> {
    let proxy_config = ProxyConfig::from_config(&config)?;

    println!("DocuVerse Gateway Status");
    println!("========================");
    println!();
    println!("Configuration:");
    println!("  Config file: {:?}", default_config_path());
    println!();
    println!("Server settings:");
    println!("  Host: {}", config.server.host);
    println!("  Port: {}", config.server.port);
    println!();
    println!("Downstream:");
    println!("  Base URL: {}", proxy_config.base_str());
    println!("  Request timeout: {}ms", proxy_config.request_timeout.as_millis());
    println!("  Attempts: {}", proxy_config.attempts);
    println!("  Wake delay: {}ms", proxy_config.wake_delay.as_millis());
    println!();

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()?;

    let gateway_url = format!("http://{}:{}/healthz", config.server.host, config.server.port);
    match reachable(&client, &gateway_url).await {
        Some(status) if status.is_success() => println!("Gateway: RUNNING ✓"),
        _ => println!("Gateway: NOT RUNNING"),
    }

    match reachable(&client, &proxy_config.health_url()).await {
        Some(status) if status.is_success() => println!("Downstream: RUNNING ✓"),
        Some(status) => println!("Downstream: RESPONDING ({})", status),
        None => println!("Downstream: UNREACHABLE (may be cold; first request will try to wake it)"),
    }

    Ok(())
}
