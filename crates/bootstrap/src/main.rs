//! Startup sequence for the registry's metadata store.
//!
//! Loads connection settings, opens the pool, checks the server answers,
//! and brings the schema up to date. Any failure terminates the process
//! with a non-zero exit status; there is no retry.

use std::process::ExitCode;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dockyard_db::{initialize_storage, DbConfig};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "dockyard_bootstrap=debug,dockyard_db=debug".into());
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    // --- Configuration ---
    let config = match DbConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid database configuration");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(?config, "Loaded database configuration");

    // --- Storage ---
    let storage = match initialize_storage(&config).await {
        Ok(storage) => storage,
        Err(e) => {
            tracing::error!(error = %e, "Storage initialisation failed; refusing to continue");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!("Storage ready");
    storage.close().await;
    ExitCode::SUCCESS
}
