//! Reqwest-based warehouse client.
//!
//! # Example
//!
//! ```rust,ignore
//! use cachebench_ingest::kusto::{KustoClient, KustoConfig};
//!
//! let config = KustoConfig::default().with_access_token(token);
//! let client = KustoClient::new(config, &settings.warehouse_uri, &settings.ingest_uri)?;
//! let rows = client.query_count("Benchmarks", "Results | count").await?;
//! ```

mod client;
mod config;
mod error;

pub use client::KustoClient;
pub use config::KustoConfig;
pub use error::{Error, Result};

/// Tracing target for warehouse REST calls.
pub const TRACING_TARGET: &str = "cachebench_ingest::kusto";
