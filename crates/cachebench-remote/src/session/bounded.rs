//! Timeout policy for remote commands and transfers.

use std::path::Path;
use std::time::Duration;

use cachebench_core::{
    CommandOutput, Error, RemoteConnector, RemoteSession, Result, ServerEndpoint,
};
use tokio::time::timeout;

use crate::TRACING_TARGET_SESSION;

/// Wraps a connector so every session it opens is a [`BoundedSession`].
#[derive(Debug, Clone)]
pub struct BoundedConnector<C> {
    inner: C,
    limit: Option<Duration>,
}

impl<C> BoundedConnector<C> {
    /// Bounds sessions of `inner` by `limit`; `None` leaves them unbounded.
    pub fn new(inner: C, limit: Option<Duration>) -> Self {
        Self { inner, limit }
    }
}

#[async_trait::async_trait]
impl<C> RemoteConnector for BoundedConnector<C>
where
    C: RemoteConnector,
{
    async fn open(&self, endpoint: &ServerEndpoint) -> Result<Box<dyn RemoteSession>> {
        let inner = self.inner.open(endpoint).await?;
        Ok(Box::new(BoundedSession::new(inner, self.limit)))
    }
}

/// A session whose commands and transfers fail with
/// [`Error::CommandExecution`] once they exceed a time limit.
pub struct BoundedSession {
    inner: Box<dyn RemoteSession>,
    limit: Option<Duration>,
}

impl BoundedSession {
    /// Wraps a session.
    pub fn new(inner: Box<dyn RemoteSession>, limit: Option<Duration>) -> Self {
        Self { inner, limit }
    }

    fn timed_out(&self, operation: &str, limit: Duration) -> Error {
        tracing::warn!(
            target: TRACING_TARGET_SESSION,
            operation,
            limit_secs = limit.as_secs(),
            "Remote operation timed out"
        );
        Error::command_execution(operation, format!("timed out after {}s", limit.as_secs()))
    }
}

#[async_trait::async_trait]
impl RemoteSession for BoundedSession {
    async fn run(&self, command: &str) -> Result<CommandOutput> {
        match self.limit {
            Some(limit) => timeout(limit, self.inner.run(command))
                .await
                .map_err(|_| self.timed_out(command, limit))?,
            None => self.inner.run(command).await,
        }
    }

    async fn fetch(&self, remote_path: &str, local_path: &Path) -> Result<u64> {
        match self.limit {
            Some(limit) => timeout(limit, self.inner.fetch(remote_path, local_path))
                .await
                .map_err(|_| self.timed_out(remote_path, limit))?,
            None => self.inner.fetch(remote_path, local_path).await,
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.inner.close().await
    }
}

#[cfg(test)]
mod tests {
    use cachebench_core::ErrorKind;
    use cachebench_test::MockRemote;

    use super::*;

    fn endpoint() -> ServerEndpoint {
        ServerEndpoint::new("10.0.0.2", "lab", "lab-cache")
    }

    #[tokio::test(start_paused = true)]
    async fn hung_command_times_out() {
        let remote = MockRemote::new().with_hanging_command("memtier_benchmark");
        let connector = BoundedConnector::new(remote.connector(), Some(Duration::from_secs(30)));
        let session = connector.open(&endpoint()).await.unwrap();

        let error = session.run("memtier_benchmark -s lab-cache").await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::CommandExecution);
        assert!(error.to_string().contains("timed out after 30s"));

        let output = session.run("echo ok").await.unwrap();
        assert!(output.is_success());
    }

    #[tokio::test]
    async fn unbounded_session_passes_through() {
        let remote = MockRemote::new();
        let connector = BoundedConnector::new(remote.connector(), None);
        let mut session = connector.open(&endpoint()).await.unwrap();

        assert!(session.run("echo ok").await.unwrap().is_success());
        session.close().await.unwrap();
        assert_eq!(remote.closes(), 1);
    }
}
