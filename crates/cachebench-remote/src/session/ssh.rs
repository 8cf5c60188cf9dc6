//! OpenSSH-backed remote sessions.
//!
//! Each [`SshSession`] owns one multiplexed master connection; commands and
//! transfers reuse it instead of re-authenticating per call.

use std::path::{Path, PathBuf};
use std::time::Duration;

use cachebench_core::{
    CommandOutput, Error, RemoteConnector, RemoteSession, Result, ServerEndpoint,
};
#[cfg(feature = "config")]
use clap::ValueEnum;
use openssh::{KnownHosts, Session, SessionBuilder, Stdio};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};

use crate::TRACING_TARGET_SESSION;

/// How unknown host keys are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(ValueEnum))]
pub enum KnownHostsPolicy {
    /// Refuse hosts that are not already known.
    Strict,
    /// Accept and remember hosts seen for the first time.
    #[default]
    Add,
    /// Accept any host key without recording it.
    Accept,
}

impl From<KnownHostsPolicy> for KnownHosts {
    fn from(policy: KnownHostsPolicy) -> Self {
        match policy {
            KnownHostsPolicy::Strict => KnownHosts::Strict,
            KnownHostsPolicy::Add => KnownHosts::Add,
            KnownHostsPolicy::Accept => KnownHosts::Accept,
        }
    }
}

/// Connection settings for [`SshConnector`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SshConfig {
    /// Identity file used for public key authentication.
    pub private_key: Option<PathBuf>,
    /// Remote port, defaults to the ssh client's configuration.
    pub port: Option<u16>,
    /// Connection timeout in seconds.
    pub connect_timeout_secs: Option<u64>,
    /// Host key policy.
    pub known_hosts: KnownHostsPolicy,
}

impl SshConfig {
    /// Creates a configuration authenticating with the given identity file.
    pub fn with_private_key(mut self, private_key: impl Into<PathBuf>) -> Self {
        self.private_key = Some(private_key.into());
        self
    }

    /// Sets the connection timeout in seconds.
    #[must_use]
    pub fn with_connect_timeout_secs(mut self, secs: u64) -> Self {
        self.connect_timeout_secs = Some(secs);
        self
    }

    /// Returns the connection timeout as a Duration, if set.
    #[inline]
    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_secs.map(Duration::from_secs)
    }
}

/// Opens [`SshSession`]s using the system OpenSSH client.
#[derive(Debug, Clone, Default)]
pub struct SshConnector {
    config: SshConfig,
}

impl SshConnector {
    /// Creates a connector with the given settings.
    pub fn new(config: SshConfig) -> Self {
        Self { config }
    }

    /// Returns the connector settings.
    pub fn config(&self) -> &SshConfig {
        &self.config
    }

    fn builder(&self, endpoint: &ServerEndpoint) -> SessionBuilder {
        let mut builder = SessionBuilder::default();
        builder
            .user(endpoint.user.clone())
            .known_hosts_check(self.config.known_hosts.into());

        if let Some(ref private_key) = self.config.private_key {
            builder.keyfile(private_key);
        }
        if let Some(port) = self.config.port {
            builder.port(port);
        }
        if let Some(connect_timeout) = self.config.connect_timeout() {
            builder.connect_timeout(connect_timeout);
        }

        builder
    }
}

#[async_trait::async_trait]
impl RemoteConnector for SshConnector {
    async fn open(&self, endpoint: &ServerEndpoint) -> Result<Box<dyn RemoteSession>> {
        tracing::info!(
            target: TRACING_TARGET_SESSION,
            host = %endpoint.host,
            user = %endpoint.user,
            "Connecting to host"
        );

        let session = self
            .builder(endpoint)
            .connect(&endpoint.host)
            .await
            .map_err(|e| Error::connection(&endpoint.host, e.to_string()))?;

        tracing::info!(
            target: TRACING_TARGET_SESSION,
            host = %endpoint.host,
            "Connected to host"
        );

        Ok(Box::new(SshSession {
            host: endpoint.host.clone(),
            session: Some(session),
        }))
    }
}

/// A live OpenSSH connection.
///
/// Dropping the session without calling [`RemoteSession::close`] still tears
/// the master connection down.
pub struct SshSession {
    host: String,
    session: Option<Session>,
}

impl std::fmt::Debug for SshSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SshSession")
            .field("host", &self.host)
            .field("open", &self.session.is_some())
            .finish()
    }
}

impl SshSession {
    fn session(&self) -> Result<&Session> {
        self.session
            .as_ref()
            .ok_or_else(|| Error::connection(&self.host, "session is closed"))
    }
}

#[async_trait::async_trait]
impl RemoteSession for SshSession {
    async fn run(&self, command: &str) -> Result<CommandOutput> {
        tracing::debug!(
            target: TRACING_TARGET_SESSION,
            host = %self.host,
            command,
            "Running remote command"
        );

        let output = self
            .session()?
            .raw_command(command)
            .output()
            .await
            .map_err(|e| Error::command_execution(command, e.to_string()))?;

        Ok(CommandOutput {
            exit_status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    async fn fetch(&self, remote_path: &str, local_path: &Path) -> Result<u64> {
        tracing::debug!(
            target: TRACING_TARGET_SESSION,
            host = %self.host,
            remote_path,
            local_path = %local_path.display(),
            "Fetching remote file"
        );

        let mut command = self.session()?.command("cat");
        command
            .arg(remote_path)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        let mut child = command
            .spawn()
            .await
            .map_err(|e| Error::download(remote_path, e.to_string()))?;

        let (Some(mut stdout), Some(mut stderr)) = (child.stdout().take(), child.stderr().take())
        else {
            return Err(Error::download(remote_path, "remote output is not piped"));
        };

        let (copied, errors) = stream_to_file(&mut stdout, &mut stderr, local_path)
            .await
            .map_err(|e| Error::download(remote_path, e.to_string()))?;

        let status = child
            .wait()
            .await
            .map_err(|e| Error::download(remote_path, e.to_string()))?;
        if !status.success() {
            let stderr = String::from_utf8_lossy(&errors);
            return Err(Error::download(remote_path, stderr.trim().to_owned()));
        }

        Ok(copied)
    }

    async fn close(&mut self) -> Result<()> {
        let Some(session) = self.session.take() else {
            return Ok(());
        };

        session
            .close()
            .await
            .map_err(|e| Error::connection(&self.host, e.to_string()))?;

        tracing::debug!(
            target: TRACING_TARGET_SESSION,
            host = %self.host,
            "Closed remote session"
        );

        Ok(())
    }
}

/// Copies `stdout` into a new file at `local_path` while draining `stderr`.
///
/// Returns the number of bytes written and the collected stderr.
async fn stream_to_file<O, E>(
    stdout: &mut O,
    stderr: &mut E,
    local_path: &Path,
) -> std::io::Result<(u64, Vec<u8>)>
where
    O: AsyncRead + Unpin,
    E: AsyncRead + Unpin,
{
    let mut file = tokio::fs::File::create(local_path).await?;
    let mut errors = Vec::new();
    let (copied, _) = tokio::try_join!(
        tokio::io::copy(stdout, &mut file),
        stderr.read_to_end(&mut errors),
    )?;
    file.flush().await?;
    Ok((copied, errors))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_adds_unknown_hosts() {
        let config = SshConfig::default();
        assert_eq!(config.known_hosts, KnownHostsPolicy::Add);
        assert_eq!(config.connect_timeout(), None);
    }

    #[test]
    fn builder_methods_set_fields() {
        let config = SshConfig::default()
            .with_private_key("/keys/id_rsa")
            .with_connect_timeout_secs(15);

        assert_eq!(config.private_key, Some(PathBuf::from("/keys/id_rsa")));
        assert_eq!(config.connect_timeout(), Some(Duration::from_secs(15)));
    }

    #[tokio::test]
    async fn remote_output_is_streamed_into_the_staged_file() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("Test_1");
        let payload = vec![b'x'; 256 * 1024];

        let (copied, errors) = stream_to_file(&mut payload.as_slice(), &mut &b"warning"[..], &local)
            .await
            .unwrap();

        assert_eq!(copied, payload.len() as u64);
        assert_eq!(errors, b"warning");
        assert_eq!(std::fs::read(&local).unwrap(), payload);
    }
}
