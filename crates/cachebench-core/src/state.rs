//! States of one benchmark cycle.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, IntoStaticStr};

/// Stage of a cycle, without per-stage data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(AsRefStr, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Idle,
    Connecting,
    Installing,
    Running,
    Collecting,
    SchemaCheck,
    MappingCheck,
    Ingesting,
    Waiting,
    Validating,
    Done,
}

/// Where a cycle currently is.
///
/// ```text
/// Idle -> Connecting -> Installing -> Running(i) -> Collecting(i) -> ...
///      -> SchemaCheck -> MappingCheck -> Ingesting(j) -> Waiting -> ...
///      -> Validating -> Done
/// ```
///
/// `Failed` is terminal. After `Done` or `Failed` a fresh cycle starts
/// again from `Idle`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PipelineState {
    #[default]
    Idle,
    Connecting,
    Installing,
    /// Running the command of run `run` (1-based) out of `total`.
    Running { run: usize, total: usize },
    /// Collecting the artifact of run `run` (1-based) out of `total`.
    Collecting { run: usize, total: usize },
    SchemaCheck,
    MappingCheck,
    /// Queueing artifact `artifact` (1-based) out of `total`.
    Ingesting { artifact: usize, total: usize },
    Waiting,
    Validating,
    Done,
    Failed { stage: PipelineStage, reason: String },
}

impl PipelineState {
    /// Returns the stage of this state; for `Failed`, the stage that failed.
    pub fn stage(&self) -> PipelineStage {
        match self {
            Self::Idle => PipelineStage::Idle,
            Self::Connecting => PipelineStage::Connecting,
            Self::Installing => PipelineStage::Installing,
            Self::Running { .. } => PipelineStage::Running,
            Self::Collecting { .. } => PipelineStage::Collecting,
            Self::SchemaCheck => PipelineStage::SchemaCheck,
            Self::MappingCheck => PipelineStage::MappingCheck,
            Self::Ingesting { .. } => PipelineStage::Ingesting,
            Self::Waiting => PipelineStage::Waiting,
            Self::Validating => PipelineStage::Validating,
            Self::Done => PipelineStage::Done,
            Self::Failed { stage, .. } => *stage,
        }
    }

    /// Returns whether the cycle has ended.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed { .. })
    }

    /// Returns whether the cycle ended in failure.
    #[inline]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running { run, total } => write!(f, "running({run}/{total})"),
            Self::Collecting { run, total } => write!(f, "collecting({run}/{total})"),
            Self::Ingesting { artifact, total } => write!(f, "ingesting({artifact}/{total})"),
            Self::Failed { stage, reason } => write!(f, "failed({stage}: {reason})"),
            other => f.write_str(other.stage().as_ref()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_reports_the_failing_stage() {
        let state = PipelineState::Failed {
            stage: PipelineStage::Connecting,
            reason: "refused".into(),
        };
        assert_eq!(state.stage(), PipelineStage::Connecting);
        assert!(state.is_terminal());
        assert_eq!(state.to_string(), "failed(connecting: refused)");
    }

    #[test]
    fn display_includes_progress() {
        assert_eq!(PipelineState::Running { run: 1, total: 2 }.to_string(), "running(1/2)");
        assert_eq!(PipelineState::SchemaCheck.to_string(), "schema_check");
        assert!(!PipelineState::Done.is_failed());
    }
}
