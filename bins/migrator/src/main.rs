//! Database migration runner for Fixedledger.
//!
//! Usage:
//!   migrator up      - Run all pending migrations (default)
//!   migrator down    - Roll back the last migration
//!   migrator status  - Show migration status
//!   migrator fresh   - Drop all tables and re-run migrations
//!
//! The database URL comes from the same configuration as the server
//! (`FIXEDLEDGER__DATABASE__URL` or `config/*.toml`).

use anyhow::{Context, bail};
use fixedledger_db::migration::Migrator;
use fixedledger_shared::AppConfig;
use sea_orm_migration::MigratorTrait;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sea_orm_migration=info,migrator=info".into()),
        )
        .init();

    let command = std::env::args().nth(1).unwrap_or_else(|| "up".to_string());

    let config = AppConfig::load().context("failed to load configuration")?;
    let db = fixedledger_db::connect_with(&config.database)
        .await
        .context("failed to connect to database")?;

    match command.as_str() {
        "up" => Migrator::up(&db, None).await?,
        "down" => Migrator::down(&db, Some(1)).await?,
        "status" => Migrator::status(&db).await?,
        "fresh" => Migrator::fresh(&db).await?,
        other => bail!("unknown command `{other}`, expected up, down, status or fresh"),
    }

    info!(%command, "Migration command finished");
    Ok(())
}
