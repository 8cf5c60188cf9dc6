//! Post-queue delay.

use std::time::Duration;

use crate::TRACING_TARGET_EXECUTOR;

/// Sleeps for a configured time after each queued ingestion.
///
/// This is a heuristic. The backend flushes a batch once its item count,
/// raw size or age threshold is hit, so the data may land before or after
/// the wait ends. Callers must not treat a finished wait as proof of
/// ingestion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompletionWaiter {
    delay: Duration,
}

impl CompletionWaiter {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    #[inline]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Waits for the configured delay.
    pub async fn wait(&self) {
        if self.delay.is_zero() {
            return;
        }

        tracing::info!(
            target: TRACING_TARGET_EXECUTOR,
            seconds = self.delay.as_secs(),
            "Sleeping to allow queued ingestion to complete"
        );
        tokio::time::sleep(self.delay).await;
    }
}
