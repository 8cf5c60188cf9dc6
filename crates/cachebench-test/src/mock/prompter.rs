use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use cachebench_core::Prompter;

use super::lock;

#[derive(Debug, Default)]
struct PrompterState {
    answers: VecDeque<bool>,
    questions: Vec<String>,
    acknowledged: Vec<String>,
}

/// A prompter that replays scripted answers and records every prompt.
///
/// Once the scripted answers run out, `confirm` answers `false`.
#[derive(Debug, Clone, Default)]
pub struct ScriptedPrompter {
    state: Arc<Mutex<PrompterState>>,
}

impl ScriptedPrompter {
    /// Creates a prompter answering `confirm` calls with `answers`, in order.
    pub fn new(answers: impl IntoIterator<Item = bool>) -> Self {
        let prompter = Self::default();
        lock(&prompter.state).answers.extend(answers);
        prompter
    }

    /// Returns every question asked through `confirm`.
    pub fn questions(&self) -> Vec<String> {
        lock(&self.state).questions.clone()
    }

    /// Returns every message passed to `acknowledge`.
    pub fn acknowledged(&self) -> Vec<String> {
        lock(&self.state).acknowledged.clone()
    }
}

#[async_trait::async_trait]
impl Prompter for ScriptedPrompter {
    async fn confirm(&self, message: &str) -> bool {
        let mut state = lock(&self.state);
        state.questions.push(message.to_owned());
        state.answers.pop_front().unwrap_or(false)
    }

    async fn acknowledge(&self, message: &str) {
        lock(&self.state).acknowledged.push(message.to_owned());
    }
}
