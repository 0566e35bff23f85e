//! Persistence and authentication layer of the Dockyard registry.
//!
//! [`Storage`] owns the connection pool and the schema. Repositories are
//! zero-sized structs with async methods taking a pool or connection as
//! their first argument; services combine them into the operations the
//! registry protocol layer calls.

pub mod config;
pub mod error;
pub mod models;
pub mod repositories;
pub mod services;
pub mod storage;

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;

pub use config::DbConfig;
pub use error::{DbError, DbResult, StartupError};
pub use storage::{initialize_storage, Filter, Record, Storage};

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from the given configuration.
pub async fn create_pool(config: &DbConfig) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect_with(config.connect_options()?)
        .await
}

/// Round-trip a trivial query to prove the pool can reach the server.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply the embedded migrations under `db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../db/migrations").run(pool).await
}
