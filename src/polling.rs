//! Transaction-history polling
//!
//! One [`PollingTask`] exists per mounted controller. Switching between the
//! foreground and background cadence replaces the task, so the two loops never
//! run side by side. A cancelled task may still be finishing its last refresh;
//! every task the controller spawns shares one [`PollGuard`] so the next
//! cadence waits for that refresh instead of overlapping it.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};

use crate::engine::Engine;
use crate::scheduler::RepeatingTask;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    /// Foreground polling
    Normal,
    /// Reduced polling while the app is backgrounded
    Background,
}

impl fmt::Display for Cadence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cadence::Normal => write!(f, "normal"),
            Cadence::Background => write!(f, "background"),
        }
    }
}

/// Result of a single poll cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// Third-party API mode is off; the engine was not called
    Skipped,
    Refreshed,
    /// Engine failed; swallowed until the next tick
    Failed(String),
}

/// Refresh transaction history once.
///
/// Errors are not propagated: the next tick is the retry.
pub async fn poll_transaction_history(
    engine: &dyn Engine,
    third_party_api_mode: bool,
) -> PollOutcome {
    if !third_party_api_mode {
        return PollOutcome::Skipped;
    }

    match engine.refresh_transaction_history().await {
        Ok(()) => PollOutcome::Refreshed,
        Err(e) => {
            tracing::debug!(error = %e, "Transaction history refresh failed");
            PollOutcome::Failed(e.to_string())
        }
    }
}

/// Serializes engine refreshes across successive polling tasks
pub type PollGuard = Arc<Mutex<()>>;

/// Running poll loop for one cadence
#[derive(Debug)]
pub struct PollingTask {
    cadence: Cadence,
    task: RepeatingTask,
}

impl PollingTask {
    pub fn start(
        cadence: Cadence,
        period: Duration,
        fire_immediately: bool,
        engine: Arc<dyn Engine>,
        third_party_api_mode: watch::Receiver<bool>,
        guard: PollGuard,
    ) -> Self {
        let name = match cadence {
            Cadence::Normal => "tx_poll_normal",
            Cadence::Background => "tx_poll_background",
        };

        let task = RepeatingTask::spawn(name, period, fire_immediately, move || {
            let engine = Arc::clone(&engine);
            let mode = third_party_api_mode.clone();
            let guard = Arc::clone(&guard);
            async move {
                let _in_flight = guard.lock().await;
                let enabled = *mode.borrow();
                let outcome = poll_transaction_history(engine.as_ref(), enabled).await;
                tracing::trace!(%cadence, ?outcome, "Poll cycle finished");
            }
        });

        Self { cadence, task }
    }

    pub fn cadence(&self) -> Cadence {
        self.cadence
    }

    pub fn period(&self) -> Duration {
        self.task.period()
    }

    pub fn stop(&self) {
        self.task.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.task.is_cancelled()
    }
}
