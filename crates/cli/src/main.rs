//! Qui CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations
//! qui-cli migrate
//!
//! # Load stores and products from YAML
//! qui-cli seed crates/cli/fixtures/catalog.yaml
//!
//! # Create a coupon
//! qui-cli coupon create -c WELCOME10 -d 10 -t percentage --new-user
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `seed` - Upsert seller stores and products
//! - `coupon create` - Create discount codes

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "qui-cli")]
#[command(author, version, about = "Qui storefront CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run storefront database migrations
    Migrate,
    /// Upsert stores and products from a YAML file
    Seed {
        /// Path to the catalog file
        file: String,
    },
    /// Manage coupons
    Coupon {
        #[command(subcommand)]
        action: CouponAction,
    },
}

#[derive(Subcommand)]
enum CouponAction {
    /// Create a new coupon
    Create(commands::coupon::CreateArgs),
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
        Commands::Migrate => commands::migrate::storefront().await?,
        Commands::Seed { file } => commands::seed::catalog(&file).await?,
        Commands::Coupon { action } => match action {
            CouponAction::Create(args) => commands::coupon::create(args).await?,
        },
    }
    Ok(())
}
