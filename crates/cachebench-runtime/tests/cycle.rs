//! End-to-end cycles against a scripted remote host and warehouse.

use std::path::Path;
use std::sync::Arc;

use cachebench_core::{
    ArtifactState, CustomLoad, Environment, ErrorKind, IngestionStage, PipelineStage,
    PipelineState, RemoteConnector, Result, SharedWarehouse,
};
use cachebench_ingest::IngestionConfig;
use cachebench_remote::{CustomEndpoint, RunMode};
use cachebench_runtime::{CycleOptions, PhaseOutcome, Pipeline, PipelineSettings};
use cachebench_test::{MockRemote, MockWarehouse, ScriptedPrompter};
use serde_json::{Value, json};
use tempfile::TempDir;

const INSTALL_COMMAND: &str = "install-memtier --quiet";

struct Fixture {
    root: TempDir,
    settings: PipelineSettings,
}

impl Fixture {
    fn new(ingest_overrides: Value) -> Self {
        Self::with_remote(json!({}), ingest_overrides)
    }

    fn with_remote(remote_overrides: Value, ingest_overrides: Value) -> Self {
        let root = tempfile::tempdir().unwrap();
        let install_script = root.path().join("memtier.sh");
        std::fs::write(&install_script, INSTALL_COMMAND).unwrap();

        let mut remote = json!({
            "DefaultLoad": ["cmd_a {0} {1}", "cmd_b {0} {1}"],
            "CustomLoad": "memtier {0} -c {1} -t {2} -d {3} --out-file={4} --test-time={5} --ratio={6}",
            "Lab": { "User": "lab", "Host": "10.0.0.6", "Server": "lab-cache" },
            "installScript": install_script,
        });
        merge(&mut remote, remote_overrides);

        let mut ingest = json!({
            "databaseName": "Benchmarks",
            "tableName": "Results",
            "tableSchema": "(TestId:string, Command:string)",
            "warehouseUri": "https://cluster.example.net",
            "ingestUri": "https://ingest-cluster.example.net",
            "authenticationMode": "AppKey",
            "ingestData": true,
            "queryData": true,
            "data": { "sourceType": "localFile", "format": "json" },
        });
        merge(&mut ingest, ingest_overrides);

        let settings_path = root.path().join("appsettings.json");
        let ingest_settings_path = root.path().join("kustoSettings.json");
        std::fs::write(&settings_path, json!({ "Redis": remote }).to_string()).unwrap();
        std::fs::write(&ingest_settings_path, ingest.to_string()).unwrap();

        let settings = PipelineSettings {
            settings_path,
            section: "redis".to_owned(),
            ingest_settings_path,
            staging_dir: root.path().join("Results"),
        };

        Self { root, settings }
    }

    fn pipeline(&self, remote: &MockRemote, warehouse: &MockWarehouse) -> Pipeline {
        let remote = remote.clone();
        let warehouse = warehouse.clone();
        Pipeline::new(
            self.settings.clone(),
            move |_: Option<&Path>| -> Box<dyn RemoteConnector> { Box::new(remote.connector()) },
            move |_: &IngestionConfig| -> Result<SharedWarehouse> { Ok(warehouse.shared()) },
        )
    }

    fn staged_files(&self) -> usize {
        std::fs::read_dir(&self.settings.staging_dir)
            .unwrap()
            .filter(|entry| entry.as_ref().unwrap().path().is_file())
            .count()
    }
}

fn merge(target: &mut Value, overrides: Value) {
    for (key, value) in overrides.as_object().unwrap() {
        if value.is_null() {
            target.as_object_mut().unwrap().remove(key);
        } else {
            target[key] = value.clone();
        }
    }
}

#[tokio::test]
async fn lab_cycle_runs_collects_and_ingests_every_entry() {
    let fixture = Fixture::new(json!({}));
    let remote = MockRemote::new().producing_artifacts();
    let warehouse = MockWarehouse::new().with_row_count(2);

    let report = fixture
        .pipeline(&remote, &warehouse)
        .run_cycle(&CycleOptions::standard(Environment::Lab))
        .await;

    assert_eq!(report.state, PipelineState::Done);
    assert_eq!(report.planned, 2);
    assert_eq!(report.staged, 2);
    assert_eq!(report.ingested, 2);
    assert_eq!(report.row_count, Some(2));
    assert_eq!(report.remote, Some(PhaseOutcome::Completed));
    assert_eq!(report.ingestion, Some(PhaseOutcome::Completed));
    assert!(report.failed_commands.is_empty());

    let commands = remote.commands();
    assert_eq!(commands.len(), 3);
    assert_eq!(commands[0], INSTALL_COMMAND);
    assert!(commands[1].starts_with("cmd_a lab-cache Test_"));
    assert!(commands[2].starts_with("cmd_b lab-cache Test_"));
    assert_ne!(commands[1].split(' ').nth(2), commands[2].split(' ').nth(2));

    let ingestions = warehouse.ingestions();
    assert_eq!(ingestions.len(), 2);
    assert!(ingestions.iter().all(|r| r.database == "Benchmarks"));
    for (request, command) in ingestions.iter().zip(&commands[1..]) {
        let test_id = command.split(' ').nth(2).unwrap();
        assert!(request.source_uri.ends_with(test_id));
    }
    assert_eq!(warehouse.queries().len(), 1);
    assert_eq!(fixture.staged_files(), 0);

    assert_eq!(remote.opens(), 1);
    assert_eq!(remote.closes(), 1);
}

#[tokio::test]
async fn invalid_ingestion_settings_fail_before_connecting() {
    let fixture = Fixture::new(json!({ "tableSchema": null }));
    let remote = MockRemote::new().producing_artifacts();
    let warehouse = MockWarehouse::new();

    let report = fixture
        .pipeline(&remote, &warehouse)
        .run_cycle(&CycleOptions::standard(Environment::Lab))
        .await;

    assert!(report.state.is_failed());
    assert_eq!(report.state.stage(), PipelineStage::Idle);
    assert_eq!(report.error_kind, Some(ErrorKind::Configuration));
    assert!(report.state.to_string().contains("tableSchema"));
    assert_eq!(report.remote, None);
    assert_eq!(remote.opens(), 0);
    assert!(warehouse.controls().is_empty());
}

#[tokio::test]
async fn custom_environment_without_host_fails_before_connecting() {
    let fixture = Fixture::new(json!({}));
    let remote = MockRemote::new();
    let options = CycleOptions {
        environment: Environment::Custom,
        mode: RunMode::Standard,
        custom: CustomEndpoint {
            user: Some("bench".to_owned()),
            server: Some("cache".to_owned()),
            ..CustomEndpoint::default()
        },
    };

    let report = fixture
        .pipeline(&remote, &MockWarehouse::new())
        .run_cycle(&options)
        .await;

    assert_eq!(report.error_kind, Some(ErrorKind::Configuration));
    assert_eq!(remote.opens(), 0);
}

#[tokio::test]
async fn custom_run_targets_operator_endpoint() {
    let fixture = Fixture::new(json!({}));
    let remote = MockRemote::new().producing_artifacts();
    let warehouse = MockWarehouse::new();
    let options = CycleOptions {
        environment: Environment::Custom,
        mode: RunMode::Custom(CustomLoad::default()),
        custom: CustomEndpoint {
            host: Some("192.0.2.10".to_owned()),
            user: Some("bench".to_owned()),
            server: Some("custom-cache".to_owned()),
            private_key: None,
        },
    };

    let report = fixture
        .pipeline(&remote, &warehouse)
        .run_cycle(&options)
        .await;

    assert!(report.is_done());
    assert_eq!(report.planned, 1);
    let commands = remote.commands();
    assert!(commands[1].starts_with("memtier custom-cache -c 2 -t 2 -d 2000 --out-file=Test_"));
    assert!(commands[1].ends_with("--test-time=300 --ratio=1:10"));
    assert!(remote.fetch_attempts()[0].starts_with("/home/bench/Test_"));
    assert_eq!(warehouse.ingestions().len(), 1);
}

#[tokio::test]
async fn failed_command_degrades_the_batch() {
    let fixture = Fixture::new(json!({}));
    let remote = MockRemote::new()
        .producing_artifacts()
        .with_failing_command("cmd_b");
    let warehouse = MockWarehouse::new();

    let report = fixture
        .pipeline(&remote, &warehouse)
        .run_cycle(&CycleOptions::standard(Environment::Lab))
        .await;

    assert!(report.is_done());
    assert_eq!(report.failed_commands.len(), 1);
    assert_eq!(report.staged, 1);
    assert_eq!(report.remote, Some(PhaseOutcome::Degraded { missing: 1 }));
    assert_eq!(report.ingested, 1);
    assert_eq!(warehouse.ingestions().len(), 1);

    // Both locations are tried for the failed run.
    assert_eq!(remote.fetch_attempts().len(), 3);
}

#[tokio::test]
async fn results_in_tool_directory_are_collected() {
    let fixture = Fixture::new(json!({}));
    let remote = MockRemote::new().producing_artifacts_in("memtier_benchmark");
    let warehouse = MockWarehouse::new();

    let report = fixture
        .pipeline(&remote, &warehouse)
        .run_cycle(&CycleOptions::standard(Environment::Lab))
        .await;

    assert!(report.is_done());
    assert_eq!(report.staged, 2);
    let attempts = remote.fetch_attempts();
    assert_eq!(attempts.len(), 4);
    assert!(attempts[1].starts_with("/home/lab/memtier_benchmark/Test_"));
}

#[tokio::test]
async fn refused_connection_fails_the_cycle() {
    let fixture = Fixture::new(json!({}));
    let remote = MockRemote::new().refusing_connections();
    let warehouse = MockWarehouse::new();

    let report = fixture
        .pipeline(&remote, &warehouse)
        .run_cycle(&CycleOptions::standard(Environment::Lab))
        .await;

    assert_eq!(report.state.stage(), PipelineStage::Connecting);
    assert!(report.state.is_failed());
    assert_eq!(report.error_kind, Some(ErrorKind::Connection));
    assert!(matches!(report.remote, Some(PhaseOutcome::Failed { .. })));
    assert_eq!(report.ingestion, None);
    assert!(remote.commands().is_empty());
    assert!(warehouse.controls().is_empty());
}

#[tokio::test]
async fn ingestion_failure_keeps_remaining_artifacts() {
    let fixture = Fixture::new(json!({}));
    let remote = MockRemote::new().producing_artifacts();
    let warehouse = MockWarehouse::new().failing_ingestion_at(1);

    let report = fixture
        .pipeline(&remote, &warehouse)
        .run_cycle(&CycleOptions::standard(Environment::Lab))
        .await;

    assert_eq!(report.state.stage(), PipelineStage::Ingesting);
    assert_eq!(report.error_kind, Some(ErrorKind::Ingestion));
    assert_eq!(report.remote, Some(PhaseOutcome::Completed));
    assert_eq!(report.staged, 2);
    assert_eq!(report.ingested, 1);
    assert_eq!(warehouse.ingestions().len(), 1);
    assert_eq!(fixture.staged_files(), 1);
    assert!(warehouse.queries().is_empty());
    assert_eq!(remote.closes(), remote.opens());
}

#[tokio::test]
async fn schema_failure_is_reported_at_schema_check() {
    let fixture = Fixture::new(json!({}));
    let remote = MockRemote::new().producing_artifacts();
    let warehouse = MockWarehouse::new().failing_control(".create table");

    let report = fixture
        .pipeline(&remote, &warehouse)
        .run_cycle(&CycleOptions::standard(Environment::Lab))
        .await;

    assert_eq!(report.state.stage(), PipelineStage::SchemaCheck);
    assert!(report.state.to_string().contains(IngestionStage::Schema.as_ref()));
    assert!(warehouse.ingestions().is_empty());
    assert_eq!(fixture.staged_files(), 2);
}

#[tokio::test]
async fn warehouse_connection_failure_ends_cycle_after_collection() {
    let fixture = Fixture::new(json!({}));
    let remote = MockRemote::new().producing_artifacts();
    let pipeline = Pipeline::new(
        fixture.settings.clone(),
        {
            let remote = remote.clone();
            move |_: Option<&Path>| -> Box<dyn RemoteConnector> { Box::new(remote.connector()) }
        },
        |_: &IngestionConfig| -> Result<SharedWarehouse> {
            Err(cachebench_core::Error::configuration("no credentials"))
        },
    );

    let report = pipeline
        .run_cycle(&CycleOptions::standard(Environment::Lab))
        .await;

    assert_eq!(report.state.stage(), PipelineStage::SchemaCheck);
    assert_eq!(report.error_kind, Some(ErrorKind::Configuration));
    assert_eq!(report.staged, 2);
    assert_eq!(remote.closes(), 1);
}

#[tokio::test]
async fn stale_artifacts_are_cleared_between_cycles() {
    let fixture = Fixture::new(json!({ "ingestData": false, "queryData": false }));
    let remote = MockRemote::new().producing_artifacts();
    let warehouse = MockWarehouse::new();
    let pipeline = fixture.pipeline(&remote, &warehouse);

    std::fs::create_dir_all(&fixture.settings.staging_dir).unwrap();
    std::fs::write(fixture.settings.staging_dir.join("Test_stale"), "{}").unwrap();

    let first = pipeline
        .run_cycle(&CycleOptions::standard(Environment::Lab))
        .await;
    assert!(first.is_done());
    assert_eq!(fixture.staged_files(), 2);
    assert!(!fixture.settings.staging_dir.join("Test_stale").exists());

    let second = pipeline
        .run_cycle(&CycleOptions::standard(Environment::Lab))
        .await;
    assert_eq!(second.state, PipelineState::Done);
    assert_eq!(fixture.staged_files(), 2);
    assert_eq!(warehouse.schema_changes(), 1);
    assert_eq!(
        warehouse
            .controls()
            .iter()
            .filter(|c| c.starts_with(".create table"))
            .count(),
        2
    );
    assert_eq!(remote.opens(), 2);
    assert_eq!(remote.closes(), 2);

    let artifacts = pipeline.staging().artifacts().await.unwrap();
    assert!(artifacts.iter().all(|a| a.state() == ArtifactState::Downloaded));
}

#[tokio::test]
async fn waiting_for_user_acknowledges_each_step() {
    let fixture = Fixture::new(json!({ "waitForUser": true }));
    let remote = MockRemote::new().producing_artifacts();
    let warehouse = MockWarehouse::new();
    let prompter = ScriptedPrompter::default();

    let report = fixture
        .pipeline(&remote, &warehouse)
        .with_prompter(Arc::new(prompter.clone()))
        .run_cycle(&CycleOptions::standard(Environment::Lab))
        .await;

    assert!(report.is_done());
    let acknowledged = prompter.acknowledged();
    assert!(acknowledged[0].starts_with("Step 1: Create table 'Benchmarks.Results'"));
    assert!(acknowledged.iter().any(|m| m.contains("Ingest '")));
    assert!(
        acknowledged
            .last()
            .unwrap()
            .contains("Get post-ingestion row count for")
    );
    assert!(fixture.root.path().join("kustoSettings.json").exists());
}
