//! Runtime proxy configuration
//! Built once from the file-level `Config` and handed to the client and server

use std::time::Duration;

use reqwest::Url;

use crate::config::Config;
use crate::error::{ProxyError, ProxyResult};

/// Validated settings shared by every forward rule
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Downstream base address, without trailing slash
    pub downstream_base: Url,
    /// Default per-attempt deadline
    pub request_timeout: Duration,
    /// Deadline for the wake-up probe
    pub probe_timeout: Duration,
    /// Default attempt budget
    pub attempts: u32,
    /// Default pause after a failed attempt
    pub wake_delay: Duration,
}

impl ProxyConfig {
    /// Default profile pointed at `downstream_base`
    pub fn new(downstream_base: &str) -> ProxyResult<Self> {
        let mut config = Config::default();
        config.downstream.base_url = downstream_base.to_string();
        Self::from_config(&config)
    }

    pub fn from_config(config: &Config) -> ProxyResult<Self> {
        Ok(Self {
            downstream_base: parse_base_url(&config.downstream.base_url)?,
            request_timeout: Duration::from_millis(config.timeouts.request_timeout_ms),
            probe_timeout: Duration::from_millis(config.timeouts.probe_timeout_ms),
            attempts: config.retry.attempts.max(1),
            wake_delay: Duration::from_millis(config.retry.wake_delay_ms),
        })
    }

    /// Base URL as text, without trailing slash
    pub fn base_str(&self) -> &str {
        self.downstream_base.as_str().trim_end_matches('/')
    }

    pub fn health_url(&self) -> String {
        format!("{}/health", self.base_str())
    }
}

/// Normalize a user-supplied base address.
///
/// Whitespace and trailing slashes are stripped. A bare host gets a scheme:
/// `http://` for localhost/127.0.0.1, `https://` for everything else.
pub fn normalize_base_url(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return String::new();
    }

    let lower = raw.to_ascii_lowercase();
    let with_scheme = if lower.starts_with("http://") || lower.starts_with("https://") {
        raw.to_string()
    } else if is_loopback_host(&lower) {
        format!("http://{}", raw)
    } else {
        format!("https://{}", raw)
    };

    with_scheme.trim_end_matches('/').to_string()
}

fn is_loopback_host(host: &str) -> bool {
    let name = host.split(['/', ':']).next().unwrap_or_default();
    name == "localhost" || name == "127.0.0.1"
}

fn parse_base_url(raw: &str) -> ProxyResult<Url> {
    let normalized = normalize_base_url(raw);
    if normalized.is_empty() {
        return Err(ProxyError::InvalidBaseUrl("empty base URL".to_string()));
    }

    let url = Url::parse(&normalized)
        .map_err(|e| ProxyError::InvalidBaseUrl(format!("{}: {}", normalized, e)))?;

    if url.cannot_be_a_base() || url.host_str().is_none() {
        return Err(ProxyError::InvalidBaseUrl(normalized));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(ProxyError::InvalidBaseUrl(format!(
            "{}: query and fragment are not allowed",
            normalized
        )));
    }

    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_trailing_slashes() {
        assert_eq!(normalize_base_url("http://127.0.0.1:8000///"), "http://127.0.0.1:8000");
        assert_eq!(normalize_base_url("  https://srs.example.com/ "), "https://srs.example.com");
    }

    #[test]
    fn test_normalize_adds_scheme() {
        assert_eq!(normalize_base_url("localhost:8000"), "http://localhost:8000");
        assert_eq!(normalize_base_url("127.0.0.1"), "http://127.0.0.1");
        assert_eq!(normalize_base_url("srs-engine.onrender.com/"), "https://srs-engine.onrender.com");
    }

    #[test]
    fn test_normalize_empty() {
        assert_eq!(normalize_base_url("   "), "");
    }

    #[test]
    fn test_from_config_defaults() {
        let config = ProxyConfig::from_config(&Config::default()).unwrap();
        assert_eq!(config.base_str(), "http://127.0.0.1:8000");
        assert_eq!(config.health_url(), "http://127.0.0.1:8000/health");
        assert_eq!(config.attempts, 2);
        assert_eq!(config.wake_delay, Duration::from_millis(1500));
        assert_eq!(config.probe_timeout, Duration::from_secs(65));
    }

    #[test]
    fn test_new_matches_file_defaults() {
        let from_new = ProxyConfig::new("http://127.0.0.1:8000").unwrap();
        let from_file = ProxyConfig::from_config(&Config::default()).unwrap();
        assert_eq!(from_new.downstream_base, from_file.downstream_base);
        assert_eq!(from_new.request_timeout, from_file.request_timeout);
        assert_eq!(from_new.probe_timeout, from_file.probe_timeout);
        assert_eq!(from_new.attempts, from_file.attempts);
        assert_eq!(from_new.wake_delay, from_file.wake_delay);
    }

    #[test]
    fn test_zero_attempts_clamped() {
        let mut file = Config::default();
        file.retry.attempts = 0;
        let config = ProxyConfig::from_config(&file).unwrap();
        assert_eq!(config.attempts, 1);
    }

    #[test]
    fn test_base_with_path_prefix() {
        let config = ProxyConfig::new("http://10.0.0.5:8000/engine/").unwrap();
        assert_eq!(config.base_str(), "http://10.0.0.5:8000/engine");
        assert_eq!(config.health_url(), "http://10.0.0.5:8000/engine/health");
    }

    #[test]
    fn test_invalid_base_rejected() {
        assert!(ProxyConfig::new("").is_err());
        assert!(ProxyConfig::new("http://host:8000/?x=1").is_err());
    }
}
