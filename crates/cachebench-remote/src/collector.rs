//! Result collection.
//!
//! The benchmark tool writes its result file to `<home>/<testId>`, but some
//! installations write it under the tool's own directory instead. The
//! collector tries the primary location first and falls back to
//! `<home>/<tool-dir>/<testId>` exactly once.

use std::path::Path;

use cachebench_core::{ArtifactFile, Error, RemoteSession, Result, ServerEndpoint, TestId};

use crate::TRACING_TARGET_COLLECTOR;

/// Fetches run artifacts into the staging directory.
#[derive(Debug, Clone)]
pub struct ResultCollector {
    tool_directory: String,
}

impl ResultCollector {
    /// Creates a collector that falls back to `tool_directory`.
    pub fn new(tool_directory: impl Into<String>) -> Self {
        Self {
            tool_directory: tool_directory.into(),
        }
    }

    /// Returns the primary remote location of an artifact.
    #[must_use]
    pub fn primary_path(&self, endpoint: &ServerEndpoint, test_id: &TestId) -> String {
        format!("{}/{test_id}", endpoint.home_dir())
    }

    /// Returns the fallback remote location of an artifact.
    #[must_use]
    pub fn fallback_path(&self, endpoint: &ServerEndpoint, test_id: &TestId) -> String {
        format!("{}/{}/{test_id}", endpoint.home_dir(), self.tool_directory)
    }

    /// Stages the artifact of one run as `<staging_dir>/<testId>`.
    ///
    /// Fails with [`Error::Download`] when neither location can be fetched;
    /// no partial file is left behind in that case.
    pub async fn collect(
        &self,
        session: &dyn RemoteSession,
        endpoint: &ServerEndpoint,
        test_id: &TestId,
        staging_dir: &Path,
    ) -> Result<ArtifactFile> {
        let local_path = staging_dir.join(test_id.as_str());
        let mut artifact = ArtifactFile::pending(test_id.clone(), &local_path);

        let primary = self.primary_path(endpoint, test_id);
        let primary_error = match session.fetch(&primary, &local_path).await {
            Ok(bytes) => {
                artifact.mark_downloaded();
                log_staged(test_id, &primary, bytes);
                return Ok(artifact);
            }
            Err(error) => error,
        };

        tracing::debug!(
            target: TRACING_TARGET_COLLECTOR,
            test_id = %test_id,
            path = %primary,
            error = %primary_error,
            "Primary artifact path failed, trying fallback"
        );

        let fallback = self.fallback_path(endpoint, test_id);
        match session.fetch(&fallback, &local_path).await {
            Ok(bytes) => {
                artifact.mark_downloaded();
                log_staged(test_id, &fallback, bytes);
                Ok(artifact)
            }
            Err(fallback_error) => {
                discard_partial(&local_path).await;
                Err(Error::download(
                    test_id.as_str(),
                    format!("{primary}: {primary_error}; {fallback}: {fallback_error}"),
                ))
            }
        }
    }
}

fn log_staged(test_id: &TestId, remote_path: &str, bytes: u64) {
    tracing::info!(
        target: TRACING_TARGET_COLLECTOR,
        test_id = %test_id,
        path = %remote_path,
        bytes,
        "Result is downloaded"
    );
}

async fn discard_partial(local_path: &Path) {
    match tokio::fs::remove_file(local_path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(
            target: TRACING_TARGET_COLLECTOR,
            path = %local_path.display(),
            error = %e,
            "Failed to remove partial artifact"
        ),
    }
}

#[cfg(test)]
mod tests {
    use cachebench_core::{ArtifactState, ErrorKind};
    use cachebench_test::MockRemote;

    use super::*;

    fn endpoint() -> ServerEndpoint {
        ServerEndpoint::new("10.0.0.2", "lab", "lab-cache")
    }

    #[tokio::test]
    async fn primary_path_skips_fallback() {
        let staging = tempfile::tempdir().unwrap();
        let test_id = TestId::generate();
        let remote = MockRemote::new().with_file(format!("/home/lab/{test_id}"), "primary");
        let session = remote.session();
        let collector = ResultCollector::new("memtier_benchmark");

        let artifact = collector
            .collect(&session, &endpoint(), &test_id, staging.path())
            .await
            .unwrap();

        assert_eq!(artifact.state(), ArtifactState::Downloaded);
        assert_eq!(std::fs::read_to_string(artifact.path()).unwrap(), "primary");
        assert_eq!(remote.fetch_attempts(), vec![format!("/home/lab/{test_id}")]);
    }

    #[tokio::test]
    async fn falls_back_to_tool_directory() {
        let staging = tempfile::tempdir().unwrap();
        let test_id = TestId::generate();
        let fallback = format!("/home/lab/memtier_benchmark/{test_id}");
        let remote = MockRemote::new().with_file(fallback.clone(), "fallback");
        let session = remote.session();

        let artifact = ResultCollector::new("memtier_benchmark")
            .collect(&session, &endpoint(), &test_id, staging.path())
            .await
            .unwrap();

        assert_eq!(std::fs::read_to_string(artifact.path()).unwrap(), "fallback");
        assert_eq!(remote.fetch_attempts().len(), 2);
        assert_eq!(remote.fetch_attempts()[1], fallback);
    }

    #[tokio::test]
    async fn both_paths_missing_is_download_error() {
        let staging = tempfile::tempdir().unwrap();
        let test_id = TestId::generate();
        let remote = MockRemote::new();
        let session = remote.session();

        let error = ResultCollector::new("memtier_benchmark")
            .collect(&session, &endpoint(), &test_id, staging.path())
            .await
            .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::Download);
        assert!(!staging.path().join(test_id.as_str()).exists());
    }
}
