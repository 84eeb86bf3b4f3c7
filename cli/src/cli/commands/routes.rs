use docuverse_core::config::Config;
use docuverse_core::proxy::{builtin_routes, ProxyConfig};

pub fn run(config: Config) -> anyhow::Result<()> {
    let proxy_config = ProxyConfig::from_config(&config)?;
    let routes = builtin_routes(&proxy_config);

    println!("Forwarding to {}", proxy_config.base_str());
    println!();
    println!(
        "{:<7} {:<36} {:<44} {:<5} {:>9} {:>8} {:>7}",
        "METHOD", "INBOUND", "DOWNSTREAM", "MODE", "TIMEOUT", "ATTEMPTS", "WAKE"
    );

    for rule in &routes {
        println!(
            "{:<7} {:<36} {:<44} {:<5} {:>7}ms {:>8} {:>5}ms",
            rule.method.as_str(),
            format!("/api{}", rule.path),
            format!("{} {}", rule.downstream_method, rule.downstream),
            rule.mode,
            rule.timeout.as_millis(),
            rule.attempts,
            rule.wake_delay.as_millis()
        );
    }

    Ok(())
}
