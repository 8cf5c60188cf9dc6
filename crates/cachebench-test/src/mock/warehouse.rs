//! Recording warehouse with a minimal schema model.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use cachebench_core::{
    Error, IngestionRequest, IngestionSource, IngestionStage, Result, SharedWarehouse,
    WarehouseClient,
};

use super::lock;

#[derive(Debug, Default)]
struct WarehouseState {
    controls: Vec<String>,
    queries: Vec<String>,
    ingestions: Vec<IngestionRequest>,
    payloads: Vec<Vec<u8>>,
    tables: BTreeMap<String, Vec<(String, String)>>,
    schema_changes: usize,
    row_count: u64,
    fail_ingestion_at: Option<usize>,
    failing_controls: Vec<String>,
}

/// A warehouse that records every call made against it.
#[derive(Debug, Clone, Default)]
pub struct MockWarehouse {
    state: Arc<Mutex<WarehouseState>>,
}

impl MockWarehouse {
    /// Creates an empty warehouse.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the value returned by row-count queries.
    pub fn with_row_count(self, rows: u64) -> Self {
        lock(&self.state).row_count = rows;
        self
    }

    /// Creates a table with the given schema, e.g. `(a:string, b:int)`.
    pub fn with_table(self, table: impl Into<String>, schema: &str) -> Self {
        lock(&self.state)
            .tables
            .insert(table.into(), parse_columns(schema));
        self
    }

    /// Fails the ingestion call with the given zero-based index.
    pub fn failing_ingestion_at(self, index: usize) -> Self {
        lock(&self.state).fail_ingestion_at = Some(index);
        self
    }

    /// Fails control commands containing `pattern`.
    pub fn failing_control(self, pattern: impl Into<String>) -> Self {
        lock(&self.state).failing_controls.push(pattern.into());
        self
    }

    /// Returns a shared handle usable as a [`WarehouseClient`].
    pub fn shared(&self) -> SharedWarehouse {
        Arc::new(self.clone())
    }

    /// Returns every control command, in order.
    pub fn controls(&self) -> Vec<String> {
        lock(&self.state).controls.clone()
    }

    /// Returns every query, in order.
    pub fn queries(&self) -> Vec<String> {
        lock(&self.state).queries.clone()
    }

    /// Returns every accepted ingestion request, in order.
    pub fn ingestions(&self) -> Vec<IngestionRequest> {
        lock(&self.state).ingestions.clone()
    }

    /// Returns the bytes read for each accepted local-file ingestion.
    pub fn payloads(&self) -> Vec<Vec<u8>> {
        lock(&self.state).payloads.clone()
    }

    /// Returns the columns of a table, if it exists.
    pub fn columns(&self, table: &str) -> Option<Vec<(String, String)>> {
        lock(&self.state).tables.get(table).cloned()
    }

    /// Returns how many control commands actually changed a table schema.
    pub fn schema_changes(&self) -> usize {
        lock(&self.state).schema_changes
    }

    fn apply_control(state: &mut WarehouseState, command: &str) -> Result<()> {
        let mut words = command.split_whitespace();
        let verb = words.next().unwrap_or_default();
        if words.next() != Some("table") {
            return Ok(());
        }
        let table = words.next().unwrap_or_default().to_owned();
        let rest: Vec<_> = words.collect();
        let schema = rest.join(" ");

        match verb {
            ".create" => {
                let columns = parse_columns(&schema);
                match state.tables.get(&table) {
                    Some(existing) if *existing == columns => {}
                    Some(_) => {
                        return Err(Error::ingestion(
                            IngestionStage::Schema,
                            format!("table '{table}' already exists with a different schema"),
                        ));
                    }
                    None => {
                        state.tables.insert(table, columns);
                        state.schema_changes += 1;
                    }
                }
            }
            ".alter-merge" => {
                let columns = state.tables.entry(table).or_default();
                let mut changed = false;
                for (name, kind) in parse_columns(&schema) {
                    if !columns.iter().any(|(existing, _)| *existing == name) {
                        columns.push((name, kind));
                        changed = true;
                    }
                }
                if changed {
                    state.schema_changes += 1;
                }
            }
            _ => {}
        }

        Ok(())
    }
}

fn parse_columns(schema: &str) -> Vec<(String, String)> {
    schema
        .trim()
        .trim_start_matches('(')
        .trim_end_matches(')')
        .split(',')
        .filter_map(|column| {
            let (name, kind) = column.split_once(':')?;
            Some((name.trim().to_owned(), kind.trim().to_owned()))
        })
        .collect()
}

#[async_trait::async_trait]
impl WarehouseClient for MockWarehouse {
    async fn execute_control(&self, _database: &str, command: &str) -> Result<()> {
        let mut state = lock(&self.state);
        state.controls.push(command.to_owned());

        if state.failing_controls.iter().any(|p| command.contains(p.as_str())) {
            return Err(Error::ingestion(
                IngestionStage::Schema,
                format!("scripted control failure: {command}"),
            ));
        }

        Self::apply_control(&mut state, command)
    }

    async fn query_count(&self, _database: &str, query: &str) -> Result<u64> {
        let mut state = lock(&self.state);
        state.queries.push(query.to_owned());
        Ok(state.row_count)
    }

    async fn queue_ingestion(&self, request: &IngestionRequest) -> Result<()> {
        let payload = match request.source {
            IngestionSource::LocalFile => Some(
                tokio::fs::read(&request.source_uri)
                    .await
                    .map_err(|e| Error::ingestion(IngestionStage::Queue, e.to_string()))?,
            ),
            IngestionSource::Blob => None,
        };

        let mut state = lock(&self.state);
        let index = state.ingestions.len();
        if state.fail_ingestion_at == Some(index) {
            state.fail_ingestion_at = None;
            return Err(Error::ingestion(
                IngestionStage::Queue,
                format!("scripted ingestion failure for '{}'", request.source_uri),
            ));
        }

        state.ingestions.push(request.clone());
        if let Some(payload) = payload {
            state.payloads.push(payload);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn alter_merge_only_counts_real_changes() {
        let warehouse = MockWarehouse::new().with_table("Results", "(a:string)");

        warehouse
            .execute_control("db", ".alter-merge table Results (a:string, b:int)")
            .await
            .unwrap();
        warehouse
            .execute_control("db", ".alter-merge table Results (a:string, b:int)")
            .await
            .unwrap();

        assert_eq!(warehouse.schema_changes(), 1);
        assert_eq!(warehouse.columns("Results").unwrap().len(), 2);
    }

    #[tokio::test]
    async fn create_is_a_no_op_for_a_matching_table() {
        let warehouse = MockWarehouse::new();

        warehouse
            .execute_control("db", ".create table Results (a:string, b:int)")
            .await
            .unwrap();
        warehouse
            .execute_control("db", ".create table Results (a:string, b:int)")
            .await
            .unwrap();
        assert_eq!(warehouse.schema_changes(), 1);

        let conflict = warehouse
            .execute_control("db", ".create table Results (a:string)")
            .await;
        assert!(conflict.is_err());
        assert_eq!(warehouse.columns("Results").unwrap().len(), 2);
    }

    #[tokio::test]
    async fn scripted_ingestion_failure_fires_once() {
        let warehouse = MockWarehouse::new().failing_ingestion_at(0);
        let request = IngestionRequest {
            database: "db".into(),
            table: "Results".into(),
            source_uri: "https://blob/1".into(),
            format: cachebench_core::DataFormat::Csv,
            mapping_name: None,
            source: IngestionSource::Blob,
        };

        assert!(warehouse.queue_ingestion(&request).await.is_err());
        assert!(warehouse.queue_ingestion(&request).await.is_ok());
        assert_eq!(warehouse.ingestions().len(), 1);
    }
}
