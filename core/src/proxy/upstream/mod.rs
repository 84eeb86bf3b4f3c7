pub mod client;

pub use client::{DownstreamClient, OutboundBody, OutboundRequest};
