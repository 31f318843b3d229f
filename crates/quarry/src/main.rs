use anyhow::Result;
use clap::Parser;

use quarry::cli::{Cli, Commands};
use quarry_core::Config;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Run(args) => quarry::cli::run::run(&config, &args).await,
        Commands::Triples { file } => quarry::cli::triples::run(&config, &file),
        Commands::Ask { question, endpoint } => {
            quarry::cli::ask::run(&config, &question, endpoint.as_deref()).await
        }
        Commands::Config => quarry::cli::config::run(&config),
    }
}
