//! Per-artifact ingestion.

use std::path::Path;
use std::time::SystemTime;

use cachebench_core::{
    ArtifactFile, Error, IngestionRequest, IngestionSource, IngestionStage, PipelineContext,
    PipelineState, Result, SourceType, TestId, WarehouseClient,
};

use crate::TRACING_TARGET_EXECUTOR;
use crate::config::IngestionConfig;
use crate::mapping::MappingManager;
use crate::waiter::CompletionWaiter;

/// Lists the artifacts left in a staging directory.
///
/// Files are ordered by modification time, then by name. Subdirectories
/// are ignored. Files written within the same clock tick keep no reliable
/// arrival order; callers that collected the artifacts should pass that
/// order along instead.
pub async fn staged_artifacts(staging_dir: &Path) -> Result<Vec<ArtifactFile>> {
    let mut entries = tokio::fs::read_dir(staging_dir).await?;
    let mut staged = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        let metadata = entry.metadata().await?;
        if !metadata.is_file() {
            continue;
        }

        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        let name = entry.file_name().to_string_lossy().into_owned();
        staged.push((modified, name, entry.path()));
    }

    staged.sort();
    Ok(staged
        .into_iter()
        .map(|(_, name, path)| ArtifactFile::downloaded(TestId::from_existing(name), path))
        .collect())
}

/// Outcome of one ingestion batch.
///
/// A batch stops at its first failure, so `ingested` holds the artifacts
/// queued and deleted before `error` was raised.
#[derive(Debug, Default)]
pub struct IngestionBatch {
    pub ingested: Vec<ArtifactFile>,
    pub error: Option<Error>,
}

impl IngestionBatch {
    /// Returns the ingested artifacts, or the error that aborted the batch.
    pub fn into_result(self) -> Result<Vec<ArtifactFile>> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.ingested),
        }
    }
}

/// Queues staged artifacts one after another.
#[derive(Debug, Clone)]
pub struct IngestionExecutor<'a> {
    config: &'a IngestionConfig,
    mapping: MappingManager<'a>,
    waiter: CompletionWaiter,
}

impl<'a> IngestionExecutor<'a> {
    pub fn new(config: &'a IngestionConfig) -> Self {
        Self {
            config,
            mapping: MappingManager::new(config),
            waiter: CompletionWaiter::new(config.wait_for_ingest()),
        }
    }

    /// Returns the mapping manager shared by every artifact of the batch.
    #[inline]
    pub fn mapping(&self) -> &MappingManager<'a> {
        &self.mapping
    }

    /// Ingests every artifact in the given order.
    ///
    /// The first failure ends the batch and the rest is not attempted.
    /// Artifacts that were not ingested stay in the staging directory.
    pub async fn ingest_all(
        &self,
        warehouse: &dyn WarehouseClient,
        context: &mut PipelineContext,
        artifacts: Vec<ArtifactFile>,
    ) -> IngestionBatch {
        let total = artifacts.len();
        let mut batch = IngestionBatch {
            ingested: Vec::with_capacity(total),
            error: None,
        };

        for (index, mut artifact) in artifacts.into_iter().enumerate() {
            let position = (index + 1, total);
            if let Err(error) = self.ingest(warehouse, context, &mut artifact, position).await {
                tracing::error!(
                    target: TRACING_TARGET_EXECUTOR,
                    test_id = %artifact.test_id(),
                    state = %artifact.state(),
                    ingested = batch.ingested.len(),
                    abandoned = total - batch.ingested.len(),
                    error = %error,
                    "Ingestion batch aborted"
                );
                batch.error = Some(error);
                break;
            }
            batch.ingested.push(artifact);
        }

        batch
    }

    /// Ingests one artifact and removes it from the staging directory.
    ///
    /// `position` is the 1-based index of the artifact and the batch size.
    async fn ingest(
        &self,
        warehouse: &dyn WarehouseClient,
        context: &mut PipelineContext,
        artifact: &mut ArtifactFile,
        (index, total): (usize, usize),
    ) -> Result<()> {
        let data = self.config.data()?;
        let source_uri = artifact.path().to_string_lossy().into_owned();

        self.mapping.ensure(warehouse, context).await?;
        context.transition(PipelineState::Ingesting {
            artifact: index,
            total,
        });

        context
            .announce(&format!("Ingest '{source_uri}' from '{}'", data.source_type))
            .await;

        let source = match data.source_type {
            SourceType::LocalFile => IngestionSource::LocalFile,
            SourceType::Blob => IngestionSource::Blob,
            SourceType::NoSource => {
                return Err(Error::ingestion(
                    IngestionStage::Queue,
                    format!("unknown source '{}' for file '{source_uri}'", data.source_type),
                ));
            }
        };

        let request = IngestionRequest {
            database: self.config.database_name.clone(),
            table: self.config.table_name.clone(),
            source_uri,
            format: data.format.normalized_for_ingestion(),
            mapping_name: self.mapping.mapping_name().map(str::to_owned),
            source,
        };

        warehouse
            .queue_ingestion(&request)
            .await
            .map_err(|e| e.in_stage(IngestionStage::Queue))?;

        tracing::info!(
            target: TRACING_TARGET_EXECUTOR,
            test_id = %artifact.test_id(),
            format = %request.format,
            source = ?request.source,
            "Artifact queued for ingestion"
        );

        context.transition(PipelineState::Waiting);
        self.waiter.wait().await;
        artifact.mark_ingested();

        tokio::fs::remove_file(artifact.path())
            .await
            .map_err(|e| Error::from(e).in_stage(IngestionStage::Cleanup))?;
        artifact.mark_deleted();

        tracing::debug!(
            target: TRACING_TARGET_EXECUTOR,
            test_id = %artifact.test_id(),
            "Staged artifact deleted"
        );

        Ok(())
    }
}
