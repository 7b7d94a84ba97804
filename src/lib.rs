//! cohort-query - client for submitting SQL cohort queries.
//!
//! This library exposes the core modules for use in integration tests.

pub mod client;
pub mod config;
pub mod error;
pub mod identity;
pub mod logging;
pub mod metadata;
pub mod response;

pub use client::CohortClient;
pub use config::{ClientConfig, PayloadEnvelope};
