//! DocuVerse Core Library
//! Forward rules, downstream client and the gateway server

pub mod config;
pub mod error;
pub mod proxy;

pub use error::{ProxyError, ProxyResult};
