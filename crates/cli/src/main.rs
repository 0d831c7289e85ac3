//! Contraband management CLI - database migrations and account tools.
//!
//! # Usage
//!
//! ```bash
//! # Apply database migrations
//! cms migrate
//!
//! # Create the first administrator (password from CMS_USER_PASSWORD or stdin)
//! CMS_USER_PASSWORD=... cms user create -e admin@police.gov.et -n "Admin Name" -r admin
//!
//! # List accounts
//! cms user list
//!
//! # Restore the default contraband categories
//! cms seed categories
//! ```
//!
//! # Environment Variables
//!
//! - `CMS_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `CMS_USER_PASSWORD` - Password for `user create`

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "cms")]
#[command(author, version, about = "Contraband management CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage user accounts
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Insert reference data
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Create an account with any role
    Create {
        /// Email address
        #[arg(short, long)]
        email: String,

        /// Full name
        #[arg(short, long)]
        name: String,

        /// Role (`admin`, `supervisor`, `field_officer`, `warehouse_manager`, `auditor`)
        #[arg(short, long, default_value = "field_officer")]
        role: String,

        /// Badge number
        #[arg(long)]
        badge: Option<String>,

        /// Department
        #[arg(long)]
        department: Option<String>,

        /// Phone number
        #[arg(long)]
        phone: Option<String>,
    },
    /// List all accounts
    List,
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Insert the default contraband categories that are missing
    Categories,
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
            UserAction::Create {
                email,
                name,
                role,
                badge,
                department,
                phone,
            } => {
                let account = commands::user::NewAccount {
                    email,
                    full_name: name,
                    role,
                    badge_number: badge,
                    department,
                    phone,
                };
                commands::user::create(account).await?;
            }
            UserAction::List => commands::user::list().await?,
        },
        Commands::Seed { target } => match target {
            SeedTarget::Categories => commands::seed::categories().await?,
        },
    }
    Ok(())
}
