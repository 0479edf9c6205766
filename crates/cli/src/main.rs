//! Vitrine CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! vitrine migrate
//!
//! # Copy the JSON data directory into PostgreSQL
//! vitrine import --data-dir data
//!
//! # Generate an idempotent SQL script from the JSON data directory
//! vitrine export-sql --data-dir data --out migration_full.sql
//!
//! # Set (or create) an admin password
//! vitrine user set-password --username admin --create
//!
//! # Print live carrier rates for every state capital
//! vitrine freight-table
//!
//! # Check the configured Stripe key
//! vitrine stripe verify
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "vitrine")]
#[command(author, version, about = "Vitrine CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations against `DATABASE_URL`
    Migrate,
    /// Upsert the JSON data directory into `PostgreSQL`
    Import {
        /// JSON data directory
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,
    },
    /// Write an idempotent SQL script from the JSON data directory
    ExportSql {
        /// JSON data directory
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,

        /// Output file
        #[arg(long, default_value = "migration_full.sql")]
        out: PathBuf,
    },
    /// Manage admin panel users
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Query the carrier for every state capital and print PAC/SEDEX prices
    FreightTable,
    /// Stripe helpers
    Stripe {
        #[command(subcommand)]
        action: StripeAction,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Hash and store a new password
    SetPassword {
        /// Login name
        #[arg(short, long)]
        username: String,

        /// New password (read from stdin when omitted)
        #[arg(short, long)]
        password: Option<String>,

        /// Create the user if it does not exist
        #[arg(long)]
        create: bool,

        /// Display name for a created user
        #[arg(short, long, default_value = "Administrador")]
        name: String,

        /// Role for a created user (`admin`, `editor`)
        #[arg(short, long, default_value = "admin")]
        role: String,

        /// JSON data directory, used when `DATABASE_URL` is unset
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,
    },
}

#[derive(Subcommand)]
enum StripeAction {
    /// Check that `STRIPE_SECRET_KEY` is accepted by Stripe
    Verify,
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
        Commands::Import { data_dir } => {
            commands::import::run(&data_dir).await?;
        }
        Commands::ExportSql { data_dir, out } => {
            commands::export_sql::run(&data_dir, &out).await?;
        }
        Commands::User { action } => match action {
            UserAction::SetPassword {
                username,
                password,
                create,
                name,
                role,
                data_dir,
            } => {
                let options = commands::user::SetPassword {
                    username,
                    password,
                    create,
                    name,
                    role,
                    data_dir,
                };
                commands::user::set_password(options).await?;
            }
        },
        Commands::FreightTable => commands::freight_table::run().await,
        Commands::Stripe { action } => match action {
            StripeAction::Verify => commands::stripe::verify().await?,
        },
    }
    Ok(())
}
