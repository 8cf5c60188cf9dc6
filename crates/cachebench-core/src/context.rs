//! Per-cycle pipeline context and the operator prompt seam.

use std::sync::Arc;

use crate::{PipelineState, TRACING_TARGET_PIPELINE};

/// Interaction with the operator.
#[async_trait::async_trait]
pub trait Prompter: Send + Sync {
    /// Asks a yes/no question.
    async fn confirm(&self, message: &str) -> bool;

    /// Shows a message and waits until the operator lets the step proceed.
    async fn acknowledge(&self, message: &str);
}

/// A prompter that never waits and always answers `false`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unattended;

#[async_trait::async_trait]
impl Prompter for Unattended {
    async fn confirm(&self, _message: &str) -> bool {
        false
    }

    async fn acknowledge(&self, _message: &str) {}
}

/// State threaded explicitly through every phase of one cycle.
///
/// Carries the cycle state, the step counter used to narrate the ingestion
/// steps and the prompt policy deciding whether each step waits for the
/// operator.
#[derive(Clone)]
pub struct PipelineContext {
    state: PipelineState,
    step: u32,
    wait_for_user: bool,
    prompter: Arc<dyn Prompter>,
}

impl std::fmt::Debug for PipelineContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineContext")
            .field("state", &self.state)
            .field("step", &self.step)
            .field("wait_for_user", &self.wait_for_user)
            .finish_non_exhaustive()
    }
}

impl Default for PipelineContext {
    fn default() -> Self {
        Self::new(Arc::new(Unattended))
    }
}

impl PipelineContext {
    /// Creates an idle context starting at step 1 that does not wait.
    pub fn new(prompter: Arc<dyn Prompter>) -> Self {
        Self {
            state: PipelineState::Idle,
            step: 1,
            wait_for_user: false,
            prompter,
        }
    }

    /// Sets whether each announced step waits for the operator.
    #[must_use]
    pub fn with_wait_for_user(mut self, wait_for_user: bool) -> Self {
        self.wait_for_user = wait_for_user;
        self
    }

    /// Returns the current cycle state.
    #[inline]
    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    /// Moves the cycle to `next`.
    ///
    /// Transitions out of a terminal state are ignored; a new cycle needs a
    /// new context.
    pub fn transition(&mut self, next: PipelineState) {
        if self.state.is_terminal() {
            tracing::warn!(
                target: TRACING_TARGET_PIPELINE,
                from = %self.state,
                to = %next,
                "Ignoring transition out of a finished cycle"
            );
            return;
        }

        tracing::debug!(
            target: TRACING_TARGET_PIPELINE,
            from = %self.state,
            to = %next,
            "Pipeline state changed"
        );
        self.state = next;
    }

    /// Returns the number the next announced step will get.
    #[inline]
    pub fn next_step(&self) -> u32 {
        self.step
    }

    /// Returns whether steps wait for the operator.
    #[inline]
    pub fn wait_for_user(&self) -> bool {
        self.wait_for_user
    }

    /// Returns the operator prompter.
    #[inline]
    pub fn prompter(&self) -> &Arc<dyn Prompter> {
        &self.prompter
    }

    /// Announces the next step and, if configured, waits for the operator.
    ///
    /// Returns the number assigned to the step.
    pub async fn announce(&mut self, message: &str) -> u32 {
        let step = self.step;
        self.step += 1;

        tracing::info!(
            target: TRACING_TARGET_PIPELINE,
            step,
            "Step {step}: {message}"
        );

        if self.wait_for_user {
            self.prompter
                .acknowledge(&format!("Step {step}: {message}"))
                .await;
        }

        step
    }
}
