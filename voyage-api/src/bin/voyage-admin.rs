//! Operator commands run against the configured database.

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use voyage_booking::{AccountService, AdminOutcome};
use voyage_shared::pii::Masked;
use voyage_store::app_config::Config;
use voyage_store::{DbClient, Repositories};

#[derive(Parser)]
#[command(name = "voyage-admin", about = "Voyage operator commands")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the administrator account unless one already exists
    CreateAdmin {
        #[arg(long, default_value = "admin")]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Delete the first administrator account
    DeleteAdmin,
    /// Apply pending database migrations
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "voyage_admin=info,voyage_booking=info,voyage_store=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = Config::load().context("Failed to load config")?;
    let db = DbClient::new(&config.database.url, 1)
        .await
        .context("Failed to connect to Postgres")?;

    if let Command::Migrate = cli.command {
        db.migrate().await?;
        return Ok(());
    }

    let repos = Repositories::postgres(db.pool.clone());
    let accounts = AccountService::new(repos.users, config.auth.bcrypt_cost);

    match cli.command {
        Command::CreateAdmin {
            username,
            email,
            password,
        } => match accounts.ensure_admin(&username, &email, Masked(password)).await? {
            AdminOutcome::Created(user) => {
                println!("Admin user created: {} <{}> (id {})", user.username, user.email, user.id)
            }
            AdminOutcome::AlreadyExists(user) => {
                println!("Admin user already exists: {} <{}>", user.username, user.email)
            }
        },
        Command::DeleteAdmin => match accounts.delete_admin().await? {
            Some(user) => println!("Admin user deleted: {} <{}>", user.username, user.email),
            None => println!("No admin user found"),
        },
        Command::Migrate => {}
    }
    Ok(())
}
