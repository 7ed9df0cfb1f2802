//! Boutique CLI - Database migrations and shop management tools.
//!
//! # Usage
//!
//! ```bash
//! # Apply the shop schema and the session table
//! boutique migrate
//!
//! # Create a user with a password
//! boutique user create -e marie@example.com -p 'correct horse'
//!
//! # Load products from a YAML file, owned by an existing user
//! boutique seed products -f products.yaml -o marie@example.com
//!
//! # Print a user's cart with product resolution
//! boutique cart show -e marie@example.com
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string
//! - `STRIPE_CURRENCY` - Currency used to price products (default: eur)

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "boutique")]
#[command(author, version, about = "Boutique CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations (shop schema and session table)
    Migrate,
    /// Manage users
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Seed the database
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
    /// Inspect carts
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Create a new user with a password
    Create {
        /// Email address
        #[arg(short, long)]
        email: String,

        /// Password (at least 8 characters)
        #[arg(short, long)]
        password: String,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Insert products listed in a YAML file
    Products {
        /// Path to the YAML file
        #[arg(short, long, default_value = "products.yaml")]
        file: String,

        /// Email of the user who will own the products
        #[arg(short, long)]
        owner: String,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Show the cart of a user
    Show {
        /// Email of the cart owner
        #[arg(short, long)]
        email: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::User { action } => match action {
            UserAction::Create { email, password } => {
                commands::user::create(&email, &password).await?;
            }
        },
        Commands::Seed { target } => match target {
            SeedTarget::Products { file, owner } => {
                commands::seed::products(&file, &owner).await?;
            }
        },
        Commands::Cart { action } => match action {
            CartAction::Show { email } => commands::cart::show(&email).await?,
        },
    }
    Ok(())
}
