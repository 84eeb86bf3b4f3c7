pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "docuverse-gateway")]
#[command(author, version, about = "DocuVerse gateway - forward /api requests to the document generation service")]
pub struct Cli {
    /// Path to config file (checked in order: local config.toml, ~/.config/docuverse-gateway/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the gateway server
    Start {
        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,

        /// Downstream base URL (overrides config and PY_API_BASE)
        #[arg(short, long)]
        downstream: Option<String>,
    },

    /// Show gateway and downstream status
    Status,

    /// List the forward table
    Routes,
}
