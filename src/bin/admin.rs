//! Operational maintenance for a fintrack deployment: purge expired
//! sessions, seed demo data.

use anyhow::Context;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use sqlx::{postgres::PgPoolOptions, PgPool};
use time::{macros::datetime, OffsetDateTime};
use tracing::info;
use uuid::Uuid;

use fintrack::auth::{password, repo::User, session};
use fintrack::config::AppConfig;
use fintrack::transactions::dto::{CreateTransactionRequest, TxKind};
use fintrack::transactions::repo as transactions;

#[derive(Parser)]
#[command(name = "fintrack-admin", about = "Maintenance commands for a fintrack deployment")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Delete session records past their expiry
    CleanupSessions,
    /// Insert demo users and sample transactions
    Seed,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()))
        .init();

    let cli = Cli::parse();

    let config = AppConfig::from_env()?;
    let db = PgPoolOptions::new()
        .max_connections(2)
        .connect(&config.database_url)
        .await
        .context("connect to database")?;
    sqlx::migrate!("./migrations")
        .run(&db)
        .await
        .context("run migrations")?;

    match cli.command {
        Command::CleanupSessions => {
            let purged = session::purge_expired(&db).await?;
            info!(purged, "expired sessions deleted");
        }
        Command::Seed => seed(&db).await?,
    }

    Ok(())
}

async fn seed(db: &PgPool) -> anyhow::Result<()> {
    let demo_users = [
        ("alice", "alice@example.com", "password123"),
        ("bob", "bob@example.com", "securepass456"),
        ("charlie", "charlie@example.com", "charlie789"),
    ];

    let mut owner: Option<Uuid> = None;
    for (username, email, plaintext) in demo_users {
        let user = match User::find_by_email(db, email).await? {
            Some(existing) => {
                info!(%email, "demo user already exists");
                existing
            }
            None => {
                let hash = password::hash_password(plaintext)?;
                let created = User::create(db, username, email, &hash).await?;
                info!(%email, "demo user created");
                created
            }
        };
        // Sample transactions belong to the first demo user.
        owner.get_or_insert(user.id);
    }
    let Some(owner) = owner else {
        return Ok(());
    };

    let existing: i64 =
        sqlx::query_scalar("SELECT count(*) FROM transactions WHERE user_id = $1")
            .bind(owner)
            .fetch_one(db)
            .await?;
    if existing > 0 {
        info!(count = existing, "sample transactions already present, skipping");
        return Ok(());
    }

    let samples: [(TxKind, i64, &str, OffsetDateTime); 5] = [
        (TxKind::Income, 1200, "Salary", datetime!(2024-07-01 0:00 UTC)),
        (TxKind::Expense, 300, "Groceries", datetime!(2024-07-03 0:00 UTC)),
        (TxKind::Income, 200, "Freelance", datetime!(2024-07-05 0:00 UTC)),
        (TxKind::Expense, 150, "Utilities", datetime!(2024-07-07 0:00 UTC)),
        (TxKind::Expense, 80, "Transport", datetime!(2024-07-08 0:00 UTC)),
    ];
    for (kind, amount, category, date) in samples {
        let req = CreateTransactionRequest {
            kind,
            amount: Decimal::from(amount),
            category: Some(category.to_string()),
            date: Some(date),
            note: None,
            payment_method: None,
        };
        transactions::create(db, owner, &req).await?;
    }
    info!(count = samples.len(), "sample transactions inserted");

    Ok(())
}
