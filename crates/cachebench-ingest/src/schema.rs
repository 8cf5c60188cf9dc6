//! Table schema reconciliation.

use cachebench_core::{IngestionStage, PipelineContext, Result, WarehouseClient};
use strum::{AsRefStr, Display};

use crate::TRACING_TARGET_SCHEMA;
use crate::command::ControlCommand;
use crate::config::IngestionConfig;

/// What reconciliation did to the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(AsRefStr, Display)]
#[strum(serialize_all = "snake_case")]
pub enum SchemaOutcome {
    /// Existing table left as is.
    Unchanged,
    /// Configured schema merged into the existing table.
    AlterMerged,
    /// Table created from the configured schema.
    Created,
}

/// Brings the target table in line with the configured schema.
#[derive(Debug, Clone, Copy)]
pub struct SchemaReconciler<'a> {
    config: &'a IngestionConfig,
}

impl<'a> SchemaReconciler<'a> {
    pub fn new(config: &'a IngestionConfig) -> Self {
        Self { config }
    }

    /// Creates the table, or alter-merges an existing one when `alterTable`
    /// is set.
    ///
    /// The alter-merge command only adds missing columns, so running it
    /// against a conforming table changes nothing.
    pub async fn reconcile(
        &self,
        warehouse: &dyn WarehouseClient,
        context: &mut PipelineContext,
    ) -> Result<SchemaOutcome> {
        let config = self.config;
        let qualified = format!("{}.{}", config.database_name, config.table_name);

        let (command, outcome) = match (config.use_existing_table, config.alter_table) {
            (true, false) => {
                tracing::debug!(
                    target: TRACING_TARGET_SCHEMA,
                    table = %qualified,
                    "Using existing table without schema changes"
                );
                return Ok(SchemaOutcome::Unchanged);
            }
            (true, true) => {
                context
                    .announce(&format!(
                        "Alter-merge existing table '{qualified}' to align with the provided schema"
                    ))
                    .await;
                let command = ControlCommand::AlterMergeTable {
                    table: &config.table_name,
                    schema: &config.table_schema,
                };
                (command, SchemaOutcome::AlterMerged)
            }
            (false, _) => {
                context
                    .announce(&format!("Create table '{qualified}'"))
                    .await;
                let command = ControlCommand::CreateTable {
                    table: &config.table_name,
                    schema: &config.table_schema,
                };
                (command, SchemaOutcome::Created)
            }
        };

        warehouse
            .execute_control(&config.database_name, &command.to_string())
            .await
            .map_err(|e| e.in_stage(IngestionStage::Schema))?;

        tracing::info!(
            target: TRACING_TARGET_SCHEMA,
            table = %qualified,
            outcome = %outcome,
            "Table schema reconciled"
        );

        Ok(outcome)
    }

    /// Applies the configured batching policy.
    ///
    /// A policy in the configuration is not enough: nothing is sent unless
    /// `enableBatchingPolicy` is also set, so an existing table policy is
    /// never changed by accident. Returns whether a command was issued.
    pub async fn apply_batching_policy(
        &self,
        warehouse: &dyn WarehouseClient,
        context: &mut PipelineContext,
    ) -> Result<bool> {
        let config = self.config;
        let Some(policy) = config.effective_batching_policy() else {
            if config.batching_policy.is_some() {
                tracing::debug!(
                    target: TRACING_TARGET_SCHEMA,
                    table = %config.table_name,
                    "Batching policy configured but not enabled"
                );
            }
            return Ok(false);
        };

        context
            .announce(&format!(
                "Alter the batching policy for table '{}.{}'",
                config.database_name, config.table_name
            ))
            .await;

        let command = ControlCommand::AlterBatchingPolicy {
            table: &config.table_name,
            policy,
        };
        warehouse
            .execute_control(&config.database_name, &command.to_string())
            .await
            .map_err(|e| e.in_stage(IngestionStage::BatchingPolicy))?;

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use cachebench_test::MockWarehouse;

    use super::*;

    fn config(use_existing_table: bool, alter_table: bool) -> IngestionConfig {
        let document = serde_json::json!({
            "useExistingTable": use_existing_table,
            "alterTable": alter_table,
            "databaseName": "Benchmarks",
            "tableName": "Results",
            "tableSchema": "(TestId:string, Ops:real)",
            "warehouseUri": "https://cluster.example.net",
            "ingestUri": "https://ingest-cluster.example.net",
            "data": {},
            "batchingPolicy": { "maximumBatchingTimeSpan": "00:00:10" }
        });
        IngestionConfig::from_json_str(&document.to_string()).unwrap()
    }

    #[tokio::test]
    async fn creates_table_when_not_reusing() {
        let warehouse = MockWarehouse::new();
        let config = config(false, true);
        let outcome = SchemaReconciler::new(&config)
            .reconcile(&warehouse, &mut PipelineContext::default())
            .await
            .unwrap();

        assert_eq!(outcome, SchemaOutcome::Created);
        assert_eq!(
            warehouse.controls(),
            vec![".create table Results (TestId:string, Ops:real)"]
        );
        assert_eq!(warehouse.columns("Results").unwrap().len(), 2);
    }

    #[tokio::test]
    async fn existing_table_without_alter_issues_nothing() {
        let warehouse = MockWarehouse::new();
        let config = config(true, false);
        let outcome = SchemaReconciler::new(&config)
            .reconcile(&warehouse, &mut PipelineContext::default())
            .await
            .unwrap();

        assert_eq!(outcome, SchemaOutcome::Unchanged);
        assert!(warehouse.controls().is_empty());
    }

    #[tokio::test]
    async fn alter_merge_is_idempotent() {
        let warehouse =
            MockWarehouse::new().with_table("Results", "(TestId:string, Ops:real)");
        let config = config(true, true);
        let reconciler = SchemaReconciler::new(&config);
        let mut context = PipelineContext::default();

        let first = reconciler.reconcile(&warehouse, &mut context).await.unwrap();
        let before = warehouse.columns("Results");
        let second = reconciler.reconcile(&warehouse, &mut context).await.unwrap();

        assert_eq!(first, SchemaOutcome::AlterMerged);
        assert_eq!(second, SchemaOutcome::AlterMerged);
        assert_eq!(warehouse.controls().len(), 2);
        assert_eq!(warehouse.schema_changes(), 0);
        assert_eq!(warehouse.columns("Results"), before);
    }

    #[tokio::test]
    async fn control_failure_is_schema_stage_error() {
        let warehouse = MockWarehouse::new().failing_control(".create table");
        let config = config(false, false);
        let error = SchemaReconciler::new(&config)
            .reconcile(&warehouse, &mut PipelineContext::default())
            .await
            .unwrap_err();

        assert_eq!(error.ingestion_stage(), Some(IngestionStage::Schema));
    }

    #[tokio::test]
    async fn present_batching_policy_is_not_applied_without_switch() {
        let warehouse = MockWarehouse::new();
        let config = config(false, false);
        let mut context = PipelineContext::default();

        let issued = SchemaReconciler::new(&config)
            .apply_batching_policy(&warehouse, &mut context)
            .await
            .unwrap();

        assert!(!issued);
        assert!(
            !warehouse
                .controls()
                .iter()
                .any(|c| c.contains("ingestionbatching"))
        );
        assert_eq!(context.next_step(), 1);
    }

    #[tokio::test]
    async fn enabled_batching_policy_is_applied() {
        let warehouse = MockWarehouse::new();
        let mut config = config(false, false);
        config.enable_batching_policy = true;

        let issued = SchemaReconciler::new(&config)
            .apply_batching_policy(&warehouse, &mut PipelineContext::default())
            .await
            .unwrap();

        assert!(issued);
        assert!(warehouse.controls()[0].contains("policy ingestionbatching"));
    }
}
