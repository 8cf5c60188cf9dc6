//! Staged benchmark artifacts and their lifecycle.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

use super::TestId;

/// Lifecycle of a result file.
///
/// `Pending -> Downloaded -> Ingested -> Deleted`. A failed ingestion leaves
/// the artifact `Downloaded`, so it stays on disk for inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[derive(AsRefStr, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ArtifactState {
    #[default]
    Pending,
    Downloaded,
    Ingested,
    Deleted,
}

/// A result file produced by one benchmark run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactFile {
    path: PathBuf,
    test_id: TestId,
    state: ArtifactState,
}

impl ArtifactFile {
    /// Creates a pending artifact that will be written to `path`.
    pub fn pending(test_id: TestId, path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            test_id,
            state: ArtifactState::Pending,
        }
    }

    /// Creates an artifact for a file already present on disk.
    pub fn downloaded(test_id: TestId, path: impl Into<PathBuf>) -> Self {
        Self {
            state: ArtifactState::Downloaded,
            ..Self::pending(test_id, path)
        }
    }

    /// Returns the local path of the artifact.
    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the test identifier the artifact belongs to.
    #[inline]
    pub fn test_id(&self) -> &TestId {
        &self.test_id
    }

    /// Returns the current lifecycle state.
    #[inline]
    pub fn state(&self) -> ArtifactState {
        self.state
    }

    /// Marks the artifact as downloaded.
    pub fn mark_downloaded(&mut self) {
        debug_assert_eq!(self.state, ArtifactState::Pending);
        self.state = ArtifactState::Downloaded;
    }

    /// Marks the artifact as ingested.
    pub fn mark_ingested(&mut self) {
        debug_assert_eq!(self.state, ArtifactState::Downloaded);
        self.state = ArtifactState::Ingested;
    }

    /// Marks the artifact as removed from the staging directory.
    pub fn mark_deleted(&mut self) {
        debug_assert_eq!(self.state, ArtifactState::Ingested);
        self.state = ArtifactState::Deleted;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_walks_through_lifecycle() {
        let mut artifact = ArtifactFile::pending(TestId::from_existing("Test_a"), "/tmp/Test_a");
        assert_eq!(artifact.state(), ArtifactState::Pending);

        artifact.mark_downloaded();
        artifact.mark_ingested();
        artifact.mark_deleted();
        assert_eq!(artifact.state(), ArtifactState::Deleted);
        assert_eq!(artifact.path(), Path::new("/tmp/Test_a"));
    }
}
