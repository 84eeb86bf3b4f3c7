use clap::Parser;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, reload, EnvFilter};

mod cli;

use cli::{Cli, Commands};
use docuverse_core::config::load_config;

/// Filter for our crates at `level`, on top of whatever RUST_LOG asks for
fn log_filter(level: &str) -> anyhow::Result<EnvFilter> {
    Ok(EnvFilter::from_default_env()
        .add_directive(format!("docuverse_gateway={}", level).parse()?)
        .add_directive(format!("docuverse_core={}", level).parse()?)
        .add_directive("tower_http=debug".parse()?))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging; the level is raised or lowered once config is read
    let (filter, filter_handle) = reload::Layer::new(log_filter("info")?);
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config)?;
    filter_handle.reload(log_filter(&config.logging.level)?)?;

    match cli.command {
        Commands::Start { port, downstream } => {
            cli::commands::start::run(config, port, downstream).await?;
        }
        Commands::Status => {
            cli::commands::status::run(config).await?;
        }
        Commands::Routes => {
            cli::commands::routes::run(config)?;
        }
    }

    Ok(())
}
