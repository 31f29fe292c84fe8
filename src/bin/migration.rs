//! Schema management for the product catalog.
//!
//! Run with: cargo run --bin migration -- up

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sea_orm_migration::MigratorTrait;
use store_api::{
    config,
    db::{self, DbConfig},
    migrator::Migrator,
};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "migration", about = "Apply or roll back catalog migrations")]
struct Cli {
    /// Overrides the configured database URL
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply pending migrations
    Up {
        #[arg(long)]
        steps: Option<u32>,
    },
    /// Roll back applied migrations, one step by default
    Down {
        #[arg(long, default_value_t = 1)]
        steps: u32,
    },
    /// Drop every table and re-apply all migrations
    Fresh,
    /// Show which migrations are applied
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config()?;
    config::init_tracing(cfg.log_level(), cfg.log_json);

    let mut db_config = DbConfig::from(&cfg);
    if let Some(url) = cli.database_url {
        db_config.url = url;
    }
    let pool = db::establish_connection_with_config(&db_config)
        .await
        .context("failed to connect to the database")?;

    match cli.command {
        Command::Up { steps } => {
            Migrator::up(&pool, steps).await?;
            info!("migrations applied");
        }
        Command::Down { steps } => {
            Migrator::down(&pool, Some(steps)).await?;
            info!(steps, "migrations rolled back");
        }
        Command::Fresh => {
            Migrator::fresh(&pool).await?;
            info!("schema recreated");
        }
        Command::Status => Migrator::status(&pool).await?,
    }

    Ok(())
}
