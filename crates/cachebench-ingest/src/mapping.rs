//! Ingestion mapping management.

use cachebench_core::{IngestionStage, PipelineContext, PipelineState, Result, WarehouseClient};
use strum::{AsRefStr, Display};
use uuid::Uuid;

use crate::TRACING_TARGET_MAPPING;
use crate::command::ControlCommand;
use crate::config::IngestionConfig;

/// Prefix of generated mapping names.
pub const GENERATED_MAPPING_PREFIX: &str = "DefaultQuickstartMapping";

/// Result of [`MappingManager::ensure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(AsRefStr, Display)]
#[strum(serialize_all = "snake_case")]
pub enum MappingOutcome {
    /// An existing mapping is reused or there is nothing to create.
    Skipped,
    /// The mapping was created or overwritten.
    Applied,
}

/// Creates the ingestion mapping for the configured data source.
///
/// The mapping name is fixed when the manager is built, so every artifact
/// of one ingestion invocation overwrites the same mapping and is queued
/// with the same name.
#[derive(Debug, Clone)]
pub struct MappingManager<'a> {
    config: &'a IngestionConfig,
    name: Option<String>,
}

impl<'a> MappingManager<'a> {
    pub fn new(config: &'a IngestionConfig) -> Self {
        let configured = config
            .data
            .as_ref()
            .and_then(|data| data.mapping_name.clone())
            .filter(|name| !name.trim().is_empty());

        let mut manager = Self { config, name: None };
        manager.name = match configured {
            Some(name) => Some(name),
            None if manager.is_required() => Some(generate_mapping_name()),
            None => None,
        };
        manager
    }

    /// Returns whether a mapping command has to be issued.
    pub fn is_required(&self) -> bool {
        self.config
            .data
            .as_ref()
            .is_some_and(|data| !data.use_existing_mapping && data.mapping_value.is_some())
    }

    /// Returns the mapping name to queue ingestions with.
    #[inline]
    pub fn mapping_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Creates or overwrites the mapping.
    ///
    /// A no-op when `useExistingMapping` is set or no `mappingValue` is
    /// configured, whatever the mapping name. Safe to repeat.
    pub async fn ensure(
        &self,
        warehouse: &dyn WarehouseClient,
        context: &mut PipelineContext,
    ) -> Result<MappingOutcome> {
        context.transition(PipelineState::MappingCheck);

        let data = self.config.data()?;
        let (Some(value), Some(name), false) = (
            data.mapping_value.as_deref(),
            self.name.as_deref(),
            data.use_existing_mapping,
        ) else {
            return Ok(MappingOutcome::Skipped);
        };

        let kind = data.format.mapping_kind();
        context
            .announce(&format!("Create a '{kind}' mapping reference named '{name}'"))
            .await;

        let command = ControlCommand::CreateOrAlterMapping {
            table: &self.config.table_name,
            kind,
            name,
            value,
        };
        warehouse
            .execute_control(&self.config.database_name, &command.to_string())
            .await
            .map_err(|e| e.in_stage(IngestionStage::Mapping))?;

        tracing::debug!(
            target: TRACING_TARGET_MAPPING,
            table = %self.config.table_name,
            mapping = name,
            kind = %kind,
            "Ingestion mapping applied"
        );

        Ok(MappingOutcome::Applied)
    }
}

fn generate_mapping_name() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{GENERATED_MAPPING_PREFIX}{}", &suffix[..5])
}

#[cfg(test)]
mod tests {
    use cachebench_test::MockWarehouse;

    use super::*;

    fn config(data: serde_json::Value) -> IngestionConfig {
        let document = serde_json::json!({
            "databaseName": "Benchmarks",
            "tableName": "Results",
            "tableSchema": "(TestId:string)",
            "warehouseUri": "https://cluster.example.net",
            "ingestUri": "https://ingest-cluster.example.net",
            "data": data,
        });
        IngestionConfig::from_json_str(&document.to_string()).unwrap()
    }

    #[tokio::test]
    async fn skipped_when_reusing_existing_mapping() {
        let warehouse = MockWarehouse::new();
        let config = config(serde_json::json!({
            "useExistingMapping": true,
            "mappingName": "Existing",
            "mappingValue": "[]"
        }));
        let manager = MappingManager::new(&config);

        let outcome = manager
            .ensure(&warehouse, &mut PipelineContext::default())
            .await
            .unwrap();

        assert_eq!(outcome, MappingOutcome::Skipped);
        assert_eq!(manager.mapping_name(), Some("Existing"));
        assert!(warehouse.controls().is_empty());
    }

    #[tokio::test]
    async fn skipped_without_mapping_value_regardless_of_name() {
        let warehouse = MockWarehouse::new();
        for data in [
            serde_json::json!({ "mappingName": "Named" }),
            serde_json::json!({}),
        ] {
            let config = config(data);
            let outcome = MappingManager::new(&config)
                .ensure(&warehouse, &mut PipelineContext::default())
                .await
                .unwrap();
            assert_eq!(outcome, MappingOutcome::Skipped);
        }
        assert!(warehouse.controls().is_empty());
    }

    #[tokio::test]
    async fn generated_name_is_stable_across_calls() {
        let warehouse = MockWarehouse::new();
        let config = config(serde_json::json!({ "format": "json", "mappingValue": "[]" }));
        let manager = MappingManager::new(&config);
        let mut context = PipelineContext::default();

        let name = manager.mapping_name().unwrap().to_owned();
        assert!(name.starts_with(GENERATED_MAPPING_PREFIX));
        assert_eq!(name.len(), GENERATED_MAPPING_PREFIX.len() + 5);

        manager.ensure(&warehouse, &mut context).await.unwrap();
        manager.ensure(&warehouse, &mut context).await.unwrap();

        let controls = warehouse.controls();
        assert_eq!(controls.len(), 2);
        assert_eq!(controls[0], controls[1]);
        assert_eq!(
            controls[0],
            format!(".create-or-alter table Results ingestion json mapping '{name}' '[]'")
        );
    }

    #[test]
    fn configured_name_is_kept() {
        let config = config(serde_json::json!({ "mappingName": "Mine", "mappingValue": "[]" }));
        assert_eq!(MappingManager::new(&config).mapping_name(), Some("Mine"));
    }
}
