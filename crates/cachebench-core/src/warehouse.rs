//! Capability surface of the analytical warehouse.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{DataFormat, Result};

/// How the warehouse obtains the bytes of an ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IngestionSource {
    /// The client uploads a local file.
    LocalFile,
    /// The warehouse pulls from a remote blob URI.
    Blob,
}

/// A single queued-ingestion call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionRequest {
    /// Target database.
    pub database: String,
    /// Target table.
    pub table: String,
    /// Local path or blob URI of the data.
    pub source_uri: String,
    /// Format sent to the backend, already normalized.
    pub format: DataFormat,
    /// Ingestion mapping to apply, if any.
    pub mapping_name: Option<String>,
    /// Whether `source_uri` is a local file or a blob.
    pub source: IngestionSource,
}

/// Control commands, queries and queued ingestion against the warehouse.
#[async_trait::async_trait]
pub trait WarehouseClient: Send + Sync {
    /// Runs an administrative control command.
    async fn execute_control(&self, database: &str, command: &str) -> Result<()>;

    /// Runs a query whose single result cell is a row count.
    async fn query_count(&self, database: &str, query: &str) -> Result<u64>;

    /// Queues data for eventually-consistent ingestion.
    async fn queue_ingestion(&self, request: &IngestionRequest) -> Result<()>;
}

/// Shared handle to a warehouse client.
pub type SharedWarehouse = Arc<dyn WarehouseClient>;
