//! Simulated remix progress
//!
//! The remix function gives no progress feedback, so while it runs a ticker
//! advances a local percentage by a random step on a fixed interval. The
//! value never passes [`PROGRESS_CAP`]; only the caller may set 100, after a
//! confirmed success.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Highest value the ticker will report
pub const PROGRESS_CAP: f64 = 90.0;

/// Random step bounds per tick (lower inclusive, upper exclusive)
pub const PROGRESS_STEP: (f64, f64) = (1.0, 10.0);

/// Advance `current` by `step`, never beyond the cap
pub fn next_progress(current: f64, step: f64) -> f64 {
    (current + step.max(0.0)).min(PROGRESS_CAP)
}

/// Background progress simulation bound to one remix request
///
/// Dropping the ticker cancels it; [`ProgressTicker::stop`] additionally
/// waits until the task has exited so no tick can land afterwards.
pub struct ProgressTicker {
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl ProgressTicker {
    /// Start ticking every `interval`, calling `on_tick` with each new value
    ///
    /// The first tick happens one full interval after start. Ticks stop once
    /// the cap is reached.
    pub fn start<F, Fut>(interval: Duration, mut on_tick: F) -> Self
    where
        F: FnMut(f64) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let token = CancellationToken::new();
        let child = token.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;

            let mut progress = 0.0;
            loop {
                tokio::select! {
                    _ = child.cancelled() => break,
                    _ = ticker.tick() => {
                        let step = rand::thread_rng().gen_range(PROGRESS_STEP.0..PROGRESS_STEP.1);
                        let next = next_progress(progress, step);
                        if next <= progress {
                            continue;
                        }
                        progress = next;
                        on_tick(progress).await;
                    }
                }
            }
            debug!(progress, "Progress ticker stopped");
        });

        Self {
            token,
            handle: Some(handle),
        }
    }

    /// Cancel and wait for the ticker task to finish
    pub async fn stop(mut self) {
        self.token.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for ProgressTicker {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
