//! Circuit Sphere CLI - Database migrations and catalog management.
//!
//! # Usage
//!
//! ```bash
//! # Apply database migrations
//! cs-cli migrate
//!
//! # Load kits from a YAML catalog
//! cs-cli seed --file crates/cli/seed/kits.yaml
//!
//! # Replace the catalog (drops existing kits and their reviews)
//! cs-cli seed --file crates/cli/seed/kits.yaml --clear
//!
//! # Restock a kit
//! cs-cli stock adjust --kit 3 --delta 25
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "cs-cli")]
#[command(author, version, about = "Circuit Sphere CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Insert kits from a YAML catalog file
    Seed {
        /// Path to the YAML file
        #[arg(short, long)]
        file: String,

        /// Delete existing kits and reviews first
        #[arg(long)]
        clear: bool,
    },
    /// Manage stock levels
    Stock {
        #[command(subcommand)]
        action: StockAction,
    },
}

#[derive(Subcommand)]
enum StockAction {
    /// Add to (or, with a negative delta, remove from) a kit's stock
    Adjust {
        /// Kit id
        #[arg(short, long)]
        kit: i32,

        /// Units to add; negative to remove
        #[arg(short, long, allow_hyphen_values = true)]
        delta: i32,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed { file, clear } => commands::seed::kits(&file, clear).await?,
        Commands::Stock { action } => match action {
            StockAction::Adjust { kit, delta } => commands::stock::adjust(kit, delta).await?,
        },
    }
    Ok(())
}
