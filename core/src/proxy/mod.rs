//! Proxy module - forwards /api requests to the document generation service

pub mod config;
pub mod routes;
pub mod server;
pub mod handlers;
pub mod upstream;
pub mod common;

pub use config::ProxyConfig;
pub use routes::{builtin_routes, ContentMode, ForwardRule};
pub use server::ProxyServer;
pub use upstream::DownstreamClient;
