//! Cancellable timers
//!
//! [`RepeatingTask`] runs a fire/await/sleep loop on the tokio runtime: the next
//! fire is only scheduled after the previous one resolved, so at most one
//! invocation is ever in flight. [`ScheduledTask`] is the one-shot variant.
//! Both stop on `cancel()` or drop. Cancellation interrupts a pending sleep but
//! never an invocation that is already running.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Self-rescheduling recurring task
#[derive(Debug)]
pub struct RepeatingTask {
    name: &'static str,
    period: Duration,
    cancellation_token: CancellationToken,
    handle: JoinHandle<()>,
}

impl RepeatingTask {
    /// Spawn the loop. With `fire_immediately` the first invocation happens as
    /// soon as the task is polled (unless it was cancelled before that),
    /// otherwise after one `period`.
    pub fn spawn<F, Fut>(
        name: &'static str,
        period: Duration,
        fire_immediately: bool,
        mut tick: F,
    ) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let cancellation_token = CancellationToken::new();
        let token = cancellation_token.clone();

        let handle = tokio::spawn(async move {
            if fire_immediately && !token.is_cancelled() {
                tick().await;
            }

            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(period) => {}
                }

                tick().await;
            }

            tracing::trace!(task = name, "Repeating task stopped");
        });

        tracing::debug!(
            task = name,
            period_ms = period.as_millis() as u64,
            fire_immediately,
            "Repeating task started"
        );

        Self {
            name,
            period,
            cancellation_token,
            handle,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn cancel(&self) {
        if !self.cancellation_token.is_cancelled() {
            tracing::debug!(task = self.name, "Cancelling repeating task");
            self.cancellation_token.cancel();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation_token.is_cancelled()
    }

    /// True once the loop has exited (after cancellation and any in-flight tick)
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for RepeatingTask {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// One-shot delayed task
#[derive(Debug)]
pub struct ScheduledTask {
    name: &'static str,
    cancellation_token: CancellationToken,
    handle: JoinHandle<()>,
}

impl ScheduledTask {
    pub fn spawn<Fut>(name: &'static str, delay: Duration, work: Fut) -> Self
    where
        Fut: Future<Output = ()> + Send + 'static,
    {
        let cancellation_token = CancellationToken::new();
        let token = cancellation_token.clone();

        let handle = tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(delay) => work.await,
            }
        });

        Self {
            name,
            cancellation_token,
            handle,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn cancel(&self) {
        if !self.cancellation_token.is_cancelled() && !self.handle.is_finished() {
            tracing::trace!(task = self.name, "Cancelling scheduled task");
        }
        self.cancellation_token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation_token.is_cancelled()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        self.cancel();
    }
}
