//! Error taxonomy shared by every phase of a benchmark cycle.

use serde::Serialize;
use strum::{AsRefStr, Display, IntoStaticStr};

/// Result type for all cachebench operations.
///
/// Defaults to [`Error`] as the error type so most signatures read as
/// `Result<T>`.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Categories of errors, used for logging and fatality decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[derive(AsRefStr, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Missing or invalid configuration.
    Configuration,
    /// Remote authentication or network failure.
    Connection,
    /// A remote command returned non-zero, timed out or could not be spawned.
    CommandExecution,
    /// Both the primary and the fallback artifact paths failed.
    Download,
    /// Template and placeholder arity mismatch.
    Format,
    /// Schema, mapping, queue or query failure against the warehouse.
    Ingestion,
    /// Local filesystem failure.
    Io,
    /// (De)serialization failure.
    Serialization,
}

/// The warehouse operation that raised an [`Error::Ingestion`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(AsRefStr, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum IngestionStage {
    /// Table creation or alter-merge.
    Schema,
    /// Batching policy alteration.
    BatchingPolicy,
    /// Ingestion mapping create-or-alter.
    Mapping,
    /// Queueing an artifact for ingestion.
    Queue,
    /// Row-count query.
    Query,
    /// Removing an ingested artifact from the staging directory.
    Cleanup,
}

/// Unified error type for cachebench operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Missing or invalid configuration, raised before any remote or
    /// ingestion work.
    #[error("configuration error: {reason}")]
    Configuration { reason: String },

    /// Remote authentication or network failure.
    #[error("connection to '{host}' failed: {reason}")]
    Connection { host: String, reason: String },

    /// A remote command did not complete successfully.
    #[error("remote command '{command}' failed: {reason}")]
    CommandExecution { command: String, reason: String },

    /// An artifact could not be fetched from any known location.
    #[error("download of '{test_id}' failed: {reason}")]
    Download { test_id: String, reason: String },

    /// A run command template could not be materialized.
    #[error("template '{template}' is invalid: {reason}")]
    Format { template: String, reason: String },

    /// A warehouse operation failed.
    #[error("ingestion failed during {stage}: {reason}")]
    Ingestion {
        stage: IngestionStage,
        reason: String,
    },

    /// Local filesystem failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// (De)serialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Creates a configuration error.
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    /// Creates a connection error.
    pub fn connection(host: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Connection {
            host: host.into(),
            reason: reason.into(),
        }
    }

    /// Creates a command execution error.
    pub fn command_execution(command: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::CommandExecution {
            command: command.into(),
            reason: reason.into(),
        }
    }

    /// Creates a download error.
    pub fn download(test_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Download {
            test_id: test_id.into(),
            reason: reason.into(),
        }
    }

    /// Creates a format error.
    pub fn format(template: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Format {
            template: template.into(),
            reason: reason.into(),
        }
    }

    /// Creates an ingestion error for the given stage.
    pub fn ingestion(stage: IngestionStage, reason: impl Into<String>) -> Self {
        Self::Ingestion {
            stage,
            reason: reason.into(),
        }
    }

    /// Returns the category of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration { .. } => ErrorKind::Configuration,
            Self::Connection { .. } => ErrorKind::Connection,
            Self::CommandExecution { .. } => ErrorKind::CommandExecution,
            Self::Download { .. } => ErrorKind::Download,
            Self::Format { .. } => ErrorKind::Format,
            Self::Ingestion { .. } => ErrorKind::Ingestion,
            Self::Io(_) => ErrorKind::Io,
            Self::Serialization(_) => ErrorKind::Serialization,
        }
    }

    /// Returns whether this error ends the current cycle.
    ///
    /// Command, download and format errors only affect a single run; the
    /// cycle keeps going with fewer artifacts. Ingestion errors end the
    /// ingestion batch, which is the last phase of the cycle.
    #[must_use]
    pub const fn is_fatal_for_cycle(&self) -> bool {
        !matches!(
            self,
            Self::CommandExecution { .. } | Self::Download { .. } | Self::Format { .. }
        )
    }

    /// Attributes a warehouse failure to an ingestion stage.
    ///
    /// Configuration errors pass through unchanged; everything else becomes
    /// an [`Error::Ingestion`] for `stage`, keeping the original message.
    #[must_use]
    pub fn in_stage(self, stage: IngestionStage) -> Self {
        match self {
            Self::Configuration { .. } => self,
            Self::Ingestion { reason, .. } => Self::Ingestion { stage, reason },
            other => Self::Ingestion {
                stage,
                reason: other.to_string(),
            },
        }
    }

    /// Returns the ingestion stage, if this is an ingestion error.
    #[must_use]
    pub const fn ingestion_stage(&self) -> Option<IngestionStage> {
        match self {
            Self::Ingestion { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}
