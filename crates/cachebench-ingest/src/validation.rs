//! Row-count reporting.

use cachebench_core::{IngestionStage, PipelineContext, Result, WarehouseClient};

use crate::TRACING_TARGET_VALIDATION;
use crate::command::row_count_query;

/// Reports how many rows the target table holds.
///
/// Informational only; the count does not prove that the artifacts of the
/// current cycle have landed.
#[derive(Debug, Clone, Copy)]
pub struct ValidationQuery<'a> {
    database: &'a str,
    table: &'a str,
}

impl<'a> ValidationQuery<'a> {
    pub fn new(database: &'a str, table: &'a str) -> Self {
        Self { database, table }
    }

    /// Announces `description` as a step and runs the row-count query.
    pub async fn run(
        &self,
        warehouse: &dyn WarehouseClient,
        context: &mut PipelineContext,
        description: &str,
    ) -> Result<u64> {
        context
            .announce(&format!("{description} '{}.{}'", self.database, self.table))
            .await;

        let rows = warehouse
            .query_count(self.database, &row_count_query(self.table))
            .await
            .map_err(|e| e.in_stage(IngestionStage::Query))?;

        tracing::info!(
            target: TRACING_TARGET_VALIDATION,
            database = self.database,
            table = self.table,
            rows,
            "Row count"
        );

        Ok(rows)
    }
}
