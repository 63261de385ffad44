use anyhow::Result;
use clap::{Parser, Subcommand};
use forumfeed_backend::api;
use forumfeed_backend::bootstrap;
use forumfeed_backend::cli;
use forumfeed_backend::config::ForumConfig;
use forumfeed_backend::telemetry;
use forumfeed_backend::utils;

#[derive(Parser)]
#[command(author, version, about = "Forumfeed backend daemon and CLI")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (Axum) for REST/API access
    Serve,
    /// Start the interactive CLI for posting, voting, and browsing the feed
    Cli,
}

#[tokio::main]
async fn main() -> Result<()> {
    utils::print_banner();
    telemetry::init_tracing();

    let args = Args::parse();

    let config = ForumConfig::from_env()?;
    let resources = bootstrap::initialize(&config)?;

    match args.command.unwrap_or(Command::Cli) {
        Command::Serve => api::serve_http(config, resources.database).await,
        Command::Cli => cli::run_cli(config, resources.database).await,
    }
}
