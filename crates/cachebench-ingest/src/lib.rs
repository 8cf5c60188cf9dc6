#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for configuration loading.
pub const TRACING_TARGET_CONFIG: &str = "cachebench_ingest::config";

/// Tracing target for schema and batching policy commands.
pub const TRACING_TARGET_SCHEMA: &str = "cachebench_ingest::schema";

/// Tracing target for ingestion mapping commands.
pub const TRACING_TARGET_MAPPING: &str = "cachebench_ingest::mapping";

/// Tracing target for per-artifact ingestion.
pub const TRACING_TARGET_EXECUTOR: &str = "cachebench_ingest::executor";

/// Tracing target for row-count queries.
pub const TRACING_TARGET_VALIDATION: &str = "cachebench_ingest::validation";

/// Tracing target for the phase as a whole.
pub const TRACING_TARGET_PHASE: &str = "cachebench_ingest::phase";

mod command;
mod config;
mod connector;
mod executor;
mod mapping;
mod phase;
mod schema;
mod validation;
mod waiter;

#[cfg(feature = "reqwest")]
#[cfg_attr(docsrs, doc(cfg(feature = "reqwest")))]
pub mod kusto;

pub use command::{ControlCommand, row_count_query};
pub use config::{
    AuthenticationMode, BatchingPolicy, DEFAULT_BATCHING_TIME_SPAN, DataSourceSpec,
    IngestionConfig,
};
#[cfg(feature = "reqwest")]
pub use connector::KustoConnector;
pub use connector::WarehouseConnector;
pub use executor::{IngestionBatch, IngestionExecutor, staged_artifacts};
pub use mapping::{GENERATED_MAPPING_PREFIX, MappingManager, MappingOutcome};
pub use phase::{IngestionFailure, IngestionPhase, IngestionSummary};
pub use schema::{SchemaOutcome, SchemaReconciler};
pub use validation::ValidationQuery;
pub use waiter::CompletionWaiter;
