//! What a cycle did.

use cachebench_core::{Environment, ErrorKind, PipelineStage, PipelineState, TestId};
use jiff::Timestamp;
use serde::Serialize;
use strum::{AsRefStr, Display, IntoStaticStr};

/// How a phase of the cycle ended.
///
/// Returned by each phase and inspected before the next one starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[derive(AsRefStr, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PhaseOutcome {
    /// Everything the phase attempted succeeded.
    Completed,
    /// The phase finished, but `missing` planned artifacts were not staged.
    Degraded { missing: usize },
    /// The phase ended the cycle.
    Failed { stage: PipelineStage, reason: String },
}

impl PhaseOutcome {
    /// Returns whether the next phase may run.
    #[inline]
    pub fn can_continue(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }
}

/// Summary of one cycle, returned whatever the cycle's fate.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub environment: Environment,
    pub started_at: Timestamp,
    pub finished_at: Option<Timestamp>,
    /// Runs planned, including rejected matrix entries.
    pub planned: usize,
    /// Matrix entries rejected at planning time.
    pub rejected: usize,
    /// Runs whose command failed or could not be executed.
    pub failed_commands: Vec<TestId>,
    /// Artifacts downloaded into the staging directory.
    pub staged: usize,
    /// Artifacts queued and deleted by the ingestion phase.
    pub ingested: usize,
    /// Table row count after ingestion, when queried.
    pub row_count: Option<u64>,
    pub remote: Option<PhaseOutcome>,
    pub ingestion: Option<PhaseOutcome>,
    /// Category of the error that failed the cycle.
    pub error_kind: Option<ErrorKind>,
    pub state: PipelineState,
}

impl CycleReport {
    pub(crate) fn new(environment: Environment) -> Self {
        Self {
            environment,
            started_at: Timestamp::now(),
            finished_at: None,
            planned: 0,
            rejected: 0,
            failed_commands: Vec::new(),
            staged: 0,
            ingested: 0,
            row_count: None,
            remote: None,
            ingestion: None,
            error_kind: None,
            state: PipelineState::Idle,
        }
    }

    pub(crate) fn finish(&mut self, state: PipelineState) {
        self.finished_at = Some(Timestamp::now());
        self.state = state;
    }

    /// Returns whether the cycle reached `Done`.
    #[inline]
    pub fn is_done(&self) -> bool {
        self.state == PipelineState::Done
    }

    /// Returns the wall-clock duration of the cycle, once finished.
    pub fn elapsed(&self) -> Option<jiff::SignedDuration> {
        self.finished_at
            .map(|finished| finished.duration_since(self.started_at))
    }
}
