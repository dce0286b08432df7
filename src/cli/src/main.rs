//! Gather CLI - Command-line interface for operating a Gather server.
//!
//! Provides commands for events, registrations, profiles, health checks,
//! and CLI configuration.

mod client;
mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{config, event, health, profile, registration};
use output::OutputFormat;

/// Gather - Community Events CLI
#[derive(Parser)]
#[command(
    name = "gather",
    version = "0.1.0",
    about = "Gather - Community Events CLI",
    long_about = "CLI tool for operating a Gather community-events server: browse and manage events, registrations, and profiles.",
    propagate_version = true
)]
pub struct Cli {
    /// Output format
    #[arg(short, long, global = true, default_value = "table")]
    output: OutputFormat,

    /// API server URL
    #[arg(long, global = true, env = "GATHER_API_URL")]
    api_url: Option<String>,

    /// Bearer token for authenticated operations
    #[arg(long, global = true, env = "GATHER_TOKEN")]
    token: Option<String>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Event operations
    #[command(subcommand)]
    Event(event::EventCommands),

    /// Registration operations
    #[command(subcommand)]
    Registration(registration::RegistrationCommands),

    /// Profile operations
    #[command(subcommand)]
    Profile(profile::ProfileCommands),

    /// Check server health
    Health(health::HealthArgs),

    /// Configuration management
    #[command(subcommand)]
    Config(config::ConfigCommands),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    let api_url = cli
        .api_url
        .clone()
        .or_else(config::load_api_url)
        .unwrap_or_else(|| "http://localhost:8080".to_string());
    let token = cli.token.clone().or_else(config::load_token);

    let client = client::ApiClient::new(&api_url, token)?;
    let format = cli.output;

    let result = match cli.command {
        Commands::Event(cmd) => event::execute(cmd, &client, format).await,
        Commands::Registration(cmd) => registration::execute(cmd, &client, format).await,
        Commands::Profile(cmd) => profile::execute(cmd, &client, format).await,
        Commands::Health(args) => health::execute(args, &client, format).await,
        Commands::Config(cmd) => config::execute(cmd, format).await,
    };

    if let Err(e) = result {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}
