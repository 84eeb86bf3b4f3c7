use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("Invalid downstream base URL: {0}")]
    InvalidBaseUrl(String),

    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    #[error("HTTP client error: {0}")]
    Client(String),

    #[error("{}", describe_transport(.0))]
    Transport(#[from] reqwest::Error),
}

pub type ProxyResult<T> = Result<T, ProxyError>;

/// Flatten a reqwest error and its sources into one line, so the
/// underlying cause (e.g. "Connection refused") reaches the caller.
fn describe_transport(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}
