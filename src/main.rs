use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use oracle_swap::application::{Cli, CommandExecutor};
use oracle_swap::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    let cli = Cli::parse();

    // Priority: CLI args > Config file > Defaults
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if let Some(state) = cli.state {
        config.state.path = state;
    }
    if let Some(url) = cli.hermes_url {
        config.hermes.url = url;
    }

    CommandExecutor::new(config).execute(cli.command).await
}
