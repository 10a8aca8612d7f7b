mod commands;
mod pipeline;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "gitship",
    about = "Build and deploy functions from git pushes, then collect the ones a repository dropped"
)]
#[command(version)]
struct Cli {
    /// Path to gitship.toml (default: ./gitship.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline for one push event
    Run {
        /// Push event JSON file (default: read from stdin)
        #[arg(long)]
        event: Option<PathBuf>,
    },
    /// Delete functions an owner no longer declares
    Collect {
        /// Garbage-collect request JSON file (default: read from stdin)
        #[arg(long)]
        request: Option<PathBuf>,
    },
    /// Print the image reference a function would be deployed with
    Tag {
        /// Registry host, e.g. registry:5000
        #[arg(long)]
        registry: Option<String>,
        /// Declared image, e.g. someuser/fn:0.1
        #[arg(long)]
        image: String,
        /// Commit SHA
        #[arg(long)]
        sha: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = dotenvy::dotenv() {
        tracing::debug!(error = %e, "no .env file loaded");
    }

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { event } => commands::run(event.as_deref(), cli.config.as_deref()).await?,
        Commands::Collect { request } => {
            commands::collect(request.as_deref(), cli.config.as_deref()).await?
        }
        Commands::Tag {
            registry,
            image,
            sha,
        } => commands::tag(registry.as_deref(), &image, &sha, cli.config.as_deref())?,
    }

    Ok(())
}
