//! Capability surface of a remote shell transport.
//!
//! A transport exposes exactly three operations on an open session:
//! execute a command, fetch a file and close. Connection establishment lives
//! in [`RemoteConnector`] so alternate transports (OpenSSH, in-memory test
//! doubles) can be swapped without touching the pipeline.

use std::path::Path;

use crate::{Error, Result, ServerEndpoint};

/// Captured result of a remote command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit status, `None` when the process was terminated by a signal.
    pub exit_status: Option<i32>,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

impl CommandOutput {
    /// Creates a successful output with the given stdout.
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            exit_status: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Creates a failed output with the given status and stderr.
    pub fn failure(exit_status: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_status: Some(exit_status),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Returns whether the command exited with status zero.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.exit_status == Some(0)
    }

    /// Converts a non-zero exit into a command execution error.
    pub fn into_result(self, command: &str) -> Result<Self> {
        if self.is_success() {
            return Ok(self);
        }

        let status = self
            .exit_status
            .map_or_else(|| "terminated by signal".to_owned(), |s| format!("exit status {s}"));
        let stderr = self.stderr.trim();
        let reason = if stderr.is_empty() {
            status
        } else {
            format!("{status}: {stderr}")
        };

        Err(Error::command_execution(command, reason))
    }
}

/// An authenticated connection to a remote host.
///
/// Commands are independent: a failed command does not invalidate the
/// session. Implementations must tolerate `close` being called more than
/// once.
#[async_trait::async_trait]
pub trait RemoteSession: Send + Sync {
    /// Executes a shell command and waits for it to finish.
    ///
    /// Returns an error only when the command could not be run or did not
    /// finish; a non-zero exit is reported through [`CommandOutput`].
    async fn run(&self, command: &str) -> Result<CommandOutput>;

    /// Copies a single remote file to `local_path`, returning the number of
    /// bytes written.
    async fn fetch(&self, remote_path: &str, local_path: &Path) -> Result<u64>;

    /// Releases the connection.
    async fn close(&mut self) -> Result<()>;
}

/// Opens [`RemoteSession`]s.
#[async_trait::async_trait]
pub trait RemoteConnector: Send + Sync {
    /// Establishes an authenticated session with the endpoint's host.
    ///
    /// Fails with [`Error::Connection`] on network or authentication failure.
    async fn open(&self, endpoint: &ServerEndpoint) -> Result<Box<dyn RemoteSession>>;
}

#[async_trait::async_trait]
impl<C> RemoteConnector for Box<C>
where
    C: RemoteConnector + ?Sized,
{
    async fn open(&self, endpoint: &ServerEndpoint) -> Result<Box<dyn RemoteSession>> {
        (**self).open(endpoint).await
    }
}
