use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

mod cli;
mod config;
mod consolidate;
mod error;
mod ingest;
mod output;
mod pipeline;
mod prompt;
mod provider;
mod redact;
mod runner;
mod schema;
mod store;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins; otherwise only show debug logs with --verbose
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("contract_consensus=debug")
        } else {
            EnvFilter::new("contract_consensus=warn")
        }
    });

    if cli.json_logs {
        fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    let config = cli.config.as_path();
    match cli.command {
        Commands::Run(args) => cli::run::execute(config, args).await,
        Commands::Status(args) => cli::jobs::status(config, args),
        Commands::List(args) => cli::jobs::list(config, args),
        Commands::Consolidate(args) => cli::jobs::consolidate(config, args),
        Commands::Feedback(args) => cli::jobs::feedback(config, args),
        Commands::Cleanup(args) => cli::jobs::cleanup(config, args),
        Commands::Providers(args) => cli::providers::execute(config, args).await,
        Commands::Schema(args) => cli::schema::execute(args),
    }
}
