use std::path::PathBuf;

use clap::{Parser, Subcommand};
use colored::Colorize;

use catalog_access::config::Config;
use catalog_access::observability::init_tracing;

mod commands;
mod fixture;
mod output;

use commands::categories::CategoryCommands;
use commands::orders::OrderCommands;
use commands::products::ProductCommands;
use commands::users::UserCommands;
use fixture::Fixture;

/// catalog - Search catalog and order fixtures and edit the category hierarchy
#[derive(Parser)]
#[command(name = "catalog")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// JSON fixture with `products`, `users`, `orders` and `categories` arrays
    #[arg(short, long, global = true, env = "CATALOG_FIXTURE", value_name = "FILE", default_value = "catalog.json")]
    fixture: PathBuf,

    /// Configuration file, in place of the standard search locations
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Product search and lookup
    Products {
        #[command(subcommand)]
        command: ProductCommands,
    },
    /// User search and lookup
    Users {
        #[command(subcommand)]
        command: UserCommands,
    },
    /// Order search and lookup
    Orders {
        #[command(subcommand)]
        command: OrderCommands,
    },
    /// Category search and hierarchy changes
    Categories {
        #[command(subcommand)]
        command: CategoryCommands,
    },
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    init_tracing(&config)?;

    let fixture = Fixture::load(&cli.fixture)?;

    match cli.command {
        Commands::Products { command } => {
            commands::products::execute(command, fixture, config.query).await
        }
        Commands::Users { command } => commands::users::execute(command, fixture, config.query).await,
        Commands::Orders { command } => {
            commands::orders::execute(command, fixture, config.query).await
        }
        Commands::Categories { command } => {
            commands::categories::execute(command, fixture, config.query).await
        }
    }
}

#[tokio::main]
async fn main() {
    // Parse command line arguments
    let cli = Cli::parse();

    // Handle result
    match run(cli).await {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);

            // Show context if available
            if let Some(source) = e.source() {
                eprintln!("\n{} {}", "Caused by:".yellow(), source);
            }

            std::process::exit(1);
        }
    }
}
