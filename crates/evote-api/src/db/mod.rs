//! # Database Persistence Layer
//!
//! Postgres persistence via SQLx.
//!
//! The database layer is optional. When `DATABASE_URL` is set the API
//! persists registrations, elections, ballot markers, candidate tallies and
//! vote receipts, and reloads everything but receipts into memory on startup.
//! When absent the API runs in-memory only (development and tests).
//!
//! Writes go to Postgres first and to the in-memory stores second, so a
//! failed write never leaves memory ahead of the database.

pub mod ballots;
pub mod elections;
pub mod receipts;
pub mod registrations;

use sqlx::postgres::{PgPool, PgPoolOptions};

/// Initialize the database connection pool and run migrations.
///
/// Returns `None` if `DATABASE_URL` is not set (in-memory-only mode).
/// Returns `Err` if the URL is set but the connection or migration fails.
pub async fn init_pool() -> Result<Option<PgPool>, sqlx::Error> {
    let url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            tracing::warn!(
                "DATABASE_URL not set, running in-memory only. \
                 Votes and receipts will not survive restarts."
            );
            return Ok(None);
        }
    };

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(&url)
        .await?;

    tracing::info!("connected to PostgreSQL");

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("database migrations applied");

    Ok(Some(pool))
}

/// Build a decode error for a stored value that fails domain validation.
pub(crate) fn corrupt(column: &str, detail: impl std::fmt::Display) -> sqlx::Error {
    sqlx::Error::Protocol(format!("invalid stored {column}: {detail}"))
}
