//! SQLite backend for the points ledger.

pub mod balances;
pub mod ledger;
mod sqlite_impl;

use std::env;

use log::info;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
pub use sqlite_impl::SqliteDatabase;

use crate::traits::LedgerStoreError;

const SQLITE_DB_URL: &str = "sqlite://data/points_store.db";

pub fn db_url() -> String {
    let result = env::var("PLG_DATABASE_URL").unwrap_or_else(|_| {
        info!("PLG_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("Using database URL: {result}");
    result
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, LedgerStoreError> {
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect(url).await?;
    Ok(pool)
}

/// Brings the schema up to date. Called once at process start, and by the test harness when it
/// spins up a throwaway database.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), LedgerStoreError> {
    sqlx::migrate!("./src/db/sqlite/migrations")
        .run(pool)
        .await
        .map_err(|e| LedgerStoreError::DatabaseError(e.to_string()))?;
    Ok(())
}
