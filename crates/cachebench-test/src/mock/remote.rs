//! Scripted remote host.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use cachebench_core::{
    CommandOutput, Error, RemoteConnector, RemoteSession, Result, ServerEndpoint,
};

use super::lock;

/// Prefix that marks a token in a command as a test identifier.
const TEST_ID_PREFIX: &str = "Test_";

#[derive(Debug, Default)]
struct RemoteState {
    files: HashMap<String, Vec<u8>>,
    failing_commands: Vec<String>,
    hanging_commands: Vec<String>,
    refuse_connections: bool,
    produce_artifacts: bool,
    artifact_subdirectory: Option<String>,
    commands: Vec<String>,
    fetch_attempts: Vec<String>,
    opens: usize,
    closes: usize,
}

/// A scripted remote host shared by every session opened against it.
#[derive(Debug, Clone, Default)]
pub struct MockRemote {
    state: Arc<Mutex<RemoteState>>,
}

impl MockRemote {
    /// Creates an empty remote host.
    pub fn new() -> Self {
        Self::default()
    }

    /// Places a file on the remote host.
    pub fn with_file(self, path: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        lock(&self.state).files.insert(path.into(), contents.into());
        self
    }

    /// Makes commands containing `pattern` exit with status 1.
    pub fn with_failing_command(self, pattern: impl Into<String>) -> Self {
        lock(&self.state).failing_commands.push(pattern.into());
        self
    }

    /// Makes commands containing `pattern` never finish.
    pub fn with_hanging_command(self, pattern: impl Into<String>) -> Self {
        lock(&self.state).hanging_commands.push(pattern.into());
        self
    }

    /// Makes every connection attempt fail.
    pub fn refusing_connections(self) -> Self {
        lock(&self.state).refuse_connections = true;
        self
    }

    /// Writes `<home>/<testId>` for every test id in a successful command.
    pub fn producing_artifacts(self) -> Self {
        lock(&self.state).produce_artifacts = true;
        self
    }

    /// Writes produced artifacts under `<home>/<subdirectory>/` instead.
    pub fn producing_artifacts_in(self, subdirectory: impl Into<String>) -> Self {
        {
            let mut state = lock(&self.state);
            state.produce_artifacts = true;
            state.artifact_subdirectory = Some(subdirectory.into());
        }
        self
    }

    /// Returns a connector opening sessions against this host.
    pub fn connector(&self) -> MockConnector {
        MockConnector {
            remote: self.clone(),
        }
    }

    /// Returns a session for a default endpoint without going through a
    /// connector.
    pub fn session(&self) -> MockRemoteSession {
        self.session_for(&ServerEndpoint::new("mock-host", "lab", "mock-cache"))
    }

    fn session_for(&self, endpoint: &ServerEndpoint) -> MockRemoteSession {
        lock(&self.state).opens += 1;
        MockRemoteSession {
            remote: self.clone(),
            home: endpoint.home_dir(),
            closed: false,
        }
    }

    /// Returns every command run so far, in order.
    pub fn commands(&self) -> Vec<String> {
        lock(&self.state).commands.clone()
    }

    /// Returns every remote path a fetch was attempted for, in order.
    pub fn fetch_attempts(&self) -> Vec<String> {
        lock(&self.state).fetch_attempts.clone()
    }

    /// Returns the number of sessions opened.
    pub fn opens(&self) -> usize {
        lock(&self.state).opens
    }

    /// Returns the number of sessions closed.
    pub fn closes(&self) -> usize {
        lock(&self.state).closes
    }

    /// Returns whether a file exists on the remote host.
    pub fn has_file(&self, path: &str) -> bool {
        lock(&self.state).files.contains_key(path)
    }
}

/// Opens [`MockRemoteSession`]s.
#[derive(Debug, Clone)]
pub struct MockConnector {
    remote: MockRemote,
}

#[async_trait::async_trait]
impl RemoteConnector for MockConnector {
    async fn open(&self, endpoint: &ServerEndpoint) -> Result<Box<dyn RemoteSession>> {
        if lock(&self.remote.state).refuse_connections {
            return Err(Error::connection(&endpoint.host, "connection refused"));
        }

        Ok(Box::new(self.remote.session_for(endpoint)))
    }
}

/// A session against a [`MockRemote`].
#[derive(Debug)]
pub struct MockRemoteSession {
    remote: MockRemote,
    home: String,
    closed: bool,
}

impl MockRemoteSession {
    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(Error::connection("mock-host", "session is closed"));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl RemoteSession for MockRemoteSession {
    async fn run(&self, command: &str) -> Result<CommandOutput> {
        self.ensure_open()?;

        let hangs = {
            let mut state = lock(&self.remote.state);
            state.commands.push(command.to_owned());
            state.hanging_commands.iter().any(|p| command.contains(p.as_str()))
        };
        if hangs {
            std::future::pending::<()>().await;
        }

        let mut state = lock(&self.remote.state);
        if state.failing_commands.iter().any(|p| command.contains(p.as_str())) {
            return Ok(CommandOutput::failure(1, "scripted failure"));
        }

        if state.produce_artifacts {
            let directory = match state.artifact_subdirectory {
                Some(ref sub) => format!("{}/{sub}", self.home),
                None => self.home.clone(),
            };
            let test_ids: Vec<_> = command
                .split(|c: char| c.is_whitespace() || c == '=')
                .filter(|token| token.starts_with(TEST_ID_PREFIX))
                .map(str::to_owned)
                .collect();

            for test_id in test_ids {
                let contents = serde_json::json!({ "command": command, "testId": test_id });
                state
                    .files
                    .insert(format!("{directory}/{test_id}"), contents.to_string().into_bytes());
            }
        }

        Ok(CommandOutput::success(format!("ran: {command}")))
    }

    async fn fetch(&self, remote_path: &str, local_path: &Path) -> Result<u64> {
        self.ensure_open()?;

        let contents = {
            let mut state = lock(&self.remote.state);
            state.fetch_attempts.push(remote_path.to_owned());
            state.files.get(remote_path).cloned()
        };

        let contents = contents
            .ok_or_else(|| Error::download(remote_path, "No such file or directory"))?;
        tokio::fs::write(local_path, &contents).await?;
        Ok(contents.len() as u64)
    }

    async fn close(&mut self) -> Result<()> {
        if !self.closed {
            self.closed = true;
            lock(&self.remote.state).closes += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn produces_artifacts_for_test_ids_in_commands() {
        let remote = MockRemote::new().producing_artifacts();
        let session = remote.session();

        session.run("bench -s cache --out-file=Test_abc").await.unwrap();
        assert!(remote.has_file("/home/lab/Test_abc"));
    }

    #[tokio::test]
    async fn failing_commands_produce_nothing() {
        let remote = MockRemote::new()
            .producing_artifacts()
            .with_failing_command("cmd_b");
        let session = remote.session();

        let output = session.run("cmd_b cache Test_x").await.unwrap();
        assert!(!output.is_success());
        assert!(!remote.has_file("/home/lab/Test_x"));
    }

    #[tokio::test]
    async fn refused_connections_are_connection_errors() {
        let remote = MockRemote::new().refusing_connections();
        let endpoint = ServerEndpoint::new("h", "u", "s");
        let Err(error) = remote.connector().open(&endpoint).await else {
            panic!("connection should be refused");
        };
        assert_eq!(error.kind(), cachebench_core::ErrorKind::Connection);
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let remote = MockRemote::new();
        let mut session = remote.session();
        session.close().await.unwrap();
        session.close().await.unwrap();
        assert_eq!(remote.closes(), 1);
        assert!(session.run("ls").await.is_err());
    }

    #[tokio::test]
    async fn fetch_copies_contents() {
        let dir = tempfile::tempdir().unwrap();
        let remote = MockRemote::new().with_file("/home/lab/Test_1", "payload");
        let session = remote.session();

        let local = dir.path().join("Test_1");
        assert_eq!(session.fetch("/home/lab/Test_1", &local).await.unwrap(), 7);
        assert_eq!(std::fs::read_to_string(local).unwrap(), "payload");
    }
}
