//! SQLMan CLI - bootstrap and drive the local AI server.

use clap::{Parser, Subcommand};

mod commands;

/// SQLMan - natural-language SQL with a local model
#[derive(Parser)]
#[command(name = "sqlman")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Bootstrap the AI server and open an interactive session
    Start {
        /// Install a missing Python runtime without asking
        #[arg(short, long)]
        yes: bool,
        /// Model to load once the server is ready (storage identifier)
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Manage the Python virtual environment
    Env {
        #[command(subcommand)]
        action: EnvAction,
    },

    /// Show data locations and defaults
    Paths,
}

#[derive(Subcommand)]
enum EnvAction {
    /// Show Python and virtual environment status
    Status,
    /// Reinstall the server dependencies into the virtual environment
    Update,
    /// Delete the virtual environment
    Delete,
}

fn main() -> miette::Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose { "debug" } else { "warn" };
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();

    match cli.command {
        Commands::Start { yes, model } => {
            runtime()?.block_on(commands::start::run(yes, model.as_deref()))
        }
        Commands::Env { action } => {
            let runtime = runtime()?;
            match action {
                EnvAction::Status => runtime.block_on(commands::env::status()),
                EnvAction::Update => runtime.block_on(commands::env::update()),
                EnvAction::Delete => commands::env::delete(),
            }
        }
        Commands::Paths => commands::paths::run(),
    }
}

fn runtime() -> miette::Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new()
        .map_err(|e| miette::miette!("Failed to start async runtime: {}", e))
}
