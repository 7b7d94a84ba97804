//! Command-line argument parsing for cohortq.

use clap::Parser;

use crate::config::{ClientConfig, PayloadEnvelope};
use crate::error::ConfigError;

/// Submit SQL cohort queries to a remote query service.
#[derive(Parser, Debug)]
#[command(name = "cohortq")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// SQL statement to execute
    #[arg(value_name = "SQL")]
    pub sql: Option<String>,

    /// List cohorts visible to the resolved role instead of executing a query
    #[arg(long, conflicts_with = "sql")]
    pub list_cohorts: bool,

    /// Payload envelope shape: "flat" or "data"
    #[arg(long, value_name = "SHAPE", env = "COHORT_PAYLOAD_ENVELOPE")]
    pub envelope: Option<PayloadEnvelope>,

    /// Project identifier sent with every request
    #[arg(long, value_name = "NAME", env = "COHORT_PROJECT")]
    pub project: Option<String>,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Builds the client configuration from the environment, applying CLI
    /// overrides.
    pub fn to_client_config(&self) -> Result<ClientConfig, ConfigError> {
        let mut config = ClientConfig::from_env()?;
        if let Some(envelope) = self.envelope {
            config.envelope = envelope;
        }
        if self.project.is_some() {
            config.project = self.project.clone();
        }
        Ok(config)
    }
}
