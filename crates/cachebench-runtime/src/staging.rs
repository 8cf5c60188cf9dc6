//! The local staging directory artifacts are downloaded into.

use std::path::{Path, PathBuf};

use cachebench_core::{ArtifactFile, Result};
use cachebench_ingest::staged_artifacts;

use crate::TRACING_TARGET_STAGING;

/// Directory holding the artifacts of the current cycle.
///
/// Artifacts left over from a previous cycle are removed when the next one
/// starts, so only files produced by the current cycle are ingested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingDirectory {
    path: PathBuf,
}

impl StagingDirectory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates the directory if needed and removes the files in it.
    ///
    /// Subdirectories are left alone. Returns the number of files removed.
    pub async fn prepare(&self) -> Result<usize> {
        tokio::fs::create_dir_all(&self.path).await?;

        let mut entries = tokio::fs::read_dir(&self.path).await?;
        let mut removed = 0;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            tokio::fs::remove_file(entry.path()).await?;
            removed += 1;
        }

        if removed > 0 {
            tracing::info!(
                target: TRACING_TARGET_STAGING,
                path = %self.path.display(),
                removed,
                "Cleared stale artifacts"
            );
        }

        Ok(removed)
    }

    /// Lists the staged artifacts in arrival order.
    pub async fn artifacts(&self) -> Result<Vec<ArtifactFile>> {
        staged_artifacts(&self.path).await
    }
}
