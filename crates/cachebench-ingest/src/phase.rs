//! The ingestion phase of a cycle.
//!
//! Runs pre-ingestion schema work, the ingestion batch and post-ingestion
//! validation against one warehouse client. The caller owns the client and
//! the [`PipelineContext`]; the context should be created with the
//! configuration's `waitForUser` policy.

use cachebench_core::{ArtifactFile, Error, PipelineContext, PipelineState, WarehouseClient};

use crate::TRACING_TARGET_PHASE;
use crate::config::IngestionConfig;
use crate::executor::IngestionExecutor;
use crate::schema::{SchemaOutcome, SchemaReconciler};
use crate::validation::ValidationQuery;

/// What the ingestion phase did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestionSummary {
    pub schema: SchemaOutcome,
    pub batching_policy_applied: bool,
    /// Row count before ingestion, when an existing table was queried.
    pub rows_before: Option<u64>,
    /// Artifacts ingested and deleted, in order.
    pub ingested: Vec<ArtifactFile>,
    /// Row count after ingestion, when `queryData` is set.
    pub rows_after: Option<u64>,
}

/// A failed ingestion phase.
#[derive(Debug)]
pub struct IngestionFailure {
    pub error: Error,
    /// Artifacts ingested and deleted before the failure, in order.
    pub ingested: Vec<ArtifactFile>,
}

impl From<Error> for IngestionFailure {
    fn from(error: Error) -> Self {
        Self {
            error,
            ingested: Vec::new(),
        }
    }
}

/// Drives the three ingestion steps for one batch of staged artifacts.
#[derive(Debug, Clone, Copy)]
pub struct IngestionPhase<'a> {
    config: &'a IngestionConfig,
}

impl<'a> IngestionPhase<'a> {
    pub fn new(config: &'a IngestionConfig) -> Self {
        Self { config }
    }

    /// Runs the phase over `artifacts`, ingesting them in the given order.
    ///
    /// Any warehouse failure ends the phase; the artifacts that were not
    /// ingested stay in the staging directory.
    pub async fn run(
        &self,
        warehouse: &dyn WarehouseClient,
        context: &mut PipelineContext,
        artifacts: Vec<ArtifactFile>,
    ) -> Result<IngestionSummary, IngestionFailure> {
        let config = self.config;
        tracing::info!(
            target: TRACING_TARGET_PHASE,
            database = %config.database_name,
            table = %config.table_name,
            "Data ingestion started"
        );

        if config.authentication_mode.is_interactive() {
            context
                .announce(
                    "You may be prompted for credentials during this run. \
                     Please return to the console after authenticating.",
                )
                .await;
        }

        let query = ValidationQuery::new(&config.database_name, &config.table_name);
        let reconciler = SchemaReconciler::new(config);

        context.transition(PipelineState::SchemaCheck);
        let schema = reconciler.reconcile(warehouse, context).await?;
        let rows_before = if config.use_existing_table && config.query_data {
            Some(query.run(warehouse, context, "Get existing row count in").await?)
        } else {
            None
        };
        let batching_policy_applied = reconciler.apply_batching_policy(warehouse, context).await?;

        let ingested = if config.ingest_data {
            tracing::info!(
                target: TRACING_TARGET_PHASE,
                staged = artifacts.len(),
                "Ingesting staged artifacts"
            );
            let batch = IngestionExecutor::new(config)
                .ingest_all(warehouse, context, artifacts)
                .await;
            if let Some(error) = batch.error {
                return Err(IngestionFailure {
                    error,
                    ingested: batch.ingested,
                });
            }
            batch.ingested
        } else {
            Vec::new()
        };

        let rows_after = if config.query_data {
            let description = if config.ingest_data {
                "Get post-ingestion row count for"
            } else {
                "Get row count for"
            };
            context.transition(PipelineState::Validating);
            Some(query.run(warehouse, context, description).await?)
        } else {
            None
        };

        tracing::info!(
            target: TRACING_TARGET_PHASE,
            schema = %schema,
            ingested = ingested.len(),
            rows_after,
            "Data ingestion completed"
        );

        Ok(IngestionSummary {
            schema,
            batching_policy_applied,
            rows_before,
            ingested,
            rows_after,
        })
    }
}
