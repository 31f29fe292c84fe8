//! Seed data script - fills an empty catalog with demo products
//!
//! Run with: cargo run --bin seed-data
//!
//! Writes SKU001..SKU030 unless the products table already has visible rows.

use anyhow::{Context, Result};
use std::sync::Arc;
use store_api::{config, db, services::seed_products};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = config::load_config()?;
    config::init_tracing(cfg.log_level(), cfg.log_json);

    info!(environment = %cfg.environment, "connecting to database");
    let pool = db::establish_connection_from_app_config(&cfg)
        .await
        .context("failed to connect to the database")?;
    db::run_migrations(&pool).await?;

    let provider = store_api::build_services(Arc::new(pool))?;
    let seeded = seed_products(&provider).await?;
    info!(seeded, "seeding finished");

    Ok(())
}
