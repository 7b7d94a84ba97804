//! cohortq - submit SQL cohort queries to a remote query service.

mod cli;
mod client;
mod config;
mod error;
mod identity;
mod logging;
mod metadata;
mod response;

use cli::Cli;
use client::CohortClient;
use error::ConfigError;
use serde_json::Value;
use tracing::error;

#[tokio::main]
async fn main() {
    // Pick up .env files before reading configuration
    let _ = dotenvy::dotenv();
    logging::init_stderr_logging();

    match run().await {
        Ok(result) => {
            // Per-call failures are data, not process faults
            println!("{}", serde_json::to_string_pretty(&result).unwrap_or_default());
        }
        Err(e) => {
            error!("configuration error: {e}");
            std::process::exit(1);
        }
    }
}

/// Builds the client from configuration and runs the requested operation.
///
/// Only configuration errors are fatal; every per-call failure comes back as
/// a normalized `{"error": ...}` result.
async fn run() -> Result<Value, ConfigError> {
    let cli = Cli::parse_args();
    let config = cli.to_client_config()?;
    let client = CohortClient::new(config)?;

    let result = if cli.list_cohorts {
        client.list_cohorts().await
    } else {
        match &cli.sql {
            Some(sql) => client.execute(sql).await,
            None => {
                return Err(ConfigError::invalid(
                    "arguments",
                    "expected a SQL statement or --list-cohorts",
                ))
            }
        }
    };

    Ok(result)
}
