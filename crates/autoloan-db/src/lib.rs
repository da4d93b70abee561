//! # AutoLoan DB
//!
//! PostgreSQL pool initialization, embedded migrations, and the startup
//! reconciliation of staged attachments.
//!
//! # Example
//!
//! ```ignore
//! use autoloan_db::{init_db_pool, run_migrations};
//!
//! let pool = init_db_pool().await?;
//! run_migrations(&pool).await?;
//! ```

use std::env;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

pub mod reconcile;

pub use reconcile::{ReconcileReport, reconcile_staging};
pub use sqlx::PgPool;

/// Connects to `DATABASE_URL`, sized by `DATABASE_MAX_CONNECTIONS` (default 10).
pub async fn init_db_pool() -> anyhow::Result<PgPool> {
    let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let max_connections = env::var("DATABASE_MAX_CONNECTIONS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(10);

    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(&database_url)
        .await
        .context("Failed to connect to database")?;

    info!(max_connections, "Database pool ready");
    Ok(pool)
}

/// Applies the migrations embedded from `migrations/`.
pub async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("../../migrations")
        .run(pool)
        .await
        .context("Failed to run database migrations")?;
    Ok(())
}
