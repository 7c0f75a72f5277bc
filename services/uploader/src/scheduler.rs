//! Interval scheduler driving the upload cycle.
//!
//! Holds at most one active timer. Reconfiguration shuts the previous timer
//! down before spawning its replacement, so two registrations of the same
//! logical job never coexist. Cycles run inline in the timer task and
//! therefore never overlap; a cycle that outlives its period pushes later
//! ticks back instead of firing a burst.

use crate::upload_cycle::CycleJob;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Scheduler lifecycle errors. These surface to the reconfiguration caller
/// because they mean the single-active-timer guarantee can no longer be made.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("Timer task failed to stop: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Handle to the currently running timer task.
struct ActiveJob {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Owns the recurring upload timer.
#[derive(Default)]
pub struct UploadScheduler {
    active: Option<ActiveJob>,
}

impl UploadScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a timer is currently registered.
    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }

    /// Register `job` to fire every `period`, replacing any existing timer.
    ///
    /// The previous timer is fully shut down before the new one is spawned,
    /// so exactly one timer exists afterwards. The first firing happens one
    /// full period after this call returns.
    pub async fn restart(
        &mut self,
        job: Arc<dyn CycleJob>,
        period: Duration,
    ) -> Result<(), SchedulerError> {
        self.shutdown().await?;

        let cancel = CancellationToken::new();
        let first_tick = Instant::now() + period;
        let task = tokio::spawn(run_timer(job, first_tick, period, cancel.clone()));
        self.active = Some(ActiveJob { cancel, task });

        info!(period_secs = period.as_secs(), "Upload timer started");
        Ok(())
    }

    /// Stop the timer, if any. Future firings cease; a cycle already in
    /// flight runs to completion before this returns. Safe to call again
    /// after it has already stopped.
    pub async fn shutdown(&mut self) -> Result<(), SchedulerError> {
        if let Some(active) = self.active.take() {
            active.cancel.cancel();
            active.task.await?;
            info!("Upload timer stopped");
        }
        Ok(())
    }
}

async fn run_timer(
    job: Arc<dyn CycleJob>,
    first_tick: Instant,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut ticks = interval_at(first_tick, period);
    // A slow cycle delays later ticks rather than firing them back to back.
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticks.tick() => {
                let stats = job.run_cycle().await;
                debug!(
                    candidates = stats.candidates,
                    uploaded = stats.uploaded,
                    upload_failures = stats.upload_failures,
                    "Cycle tick finished"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upload_cycle::CycleStats;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Semaphore;

    /// Counts how many cycles the scheduler has driven.
    #[derive(Default)]
    struct CountingJob {
        runs: AtomicUsize,
    }

    impl CountingJob {
        fn runs(&self) -> usize {
            self.runs.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CycleJob for CountingJob {
        async fn run_cycle(&self) -> CycleStats {
            self.runs.fetch_add(1, Ordering::SeqCst);
            CycleStats::default()
        }
    }

    /// Cycle that blocks until the test releases it.
    struct GatedJob {
        started: AtomicUsize,
        completed: AtomicUsize,
        gate: Semaphore,
    }

    impl GatedJob {
        fn new() -> Self {
            Self {
                started: AtomicUsize::new(0),
                completed: AtomicUsize::new(0),
                gate: Semaphore::new(0),
            }
        }
    }

    #[async_trait]
    impl CycleJob for GatedJob {
        async fn run_cycle(&self) -> CycleStats {
            self.started.fetch_add(1, Ordering::SeqCst);
            let permit = self.gate.acquire().await.unwrap();
            permit.forget();
            self.completed.fetch_add(1, Ordering::SeqCst);
            CycleStats::default()
        }
    }

    const PERIOD: Duration = Duration::from_secs(60);

    /// Let spawned tasks catch up after a clock adjustment.
    async fn settle() {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_firing_waits_one_full_period() {
        let job = Arc::new(CountingJob::default());
        let mut scheduler = UploadScheduler::new();
        scheduler.restart(job.clone(), PERIOD).await.unwrap();

        tokio::time::advance(PERIOD - Duration::from_secs(1)).await;
        settle().await;
        assert_eq!(job.runs(), 0);

        tokio::time::advance(Duration::from_secs(1)).await;
        settle().await;
        assert_eq!(job.runs(), 1);

        scheduler.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_once_per_period() {
        let job = Arc::new(CountingJob::default());
        let mut scheduler = UploadScheduler::new();
        scheduler.restart(job.clone(), PERIOD).await.unwrap();

        for expected in 1..=3 {
            tokio::time::advance(PERIOD).await;
            settle().await;
            assert_eq!(job.runs(), expected);
        }

        scheduler.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_future_firings() {
        let job = Arc::new(CountingJob::default());
        let mut scheduler = UploadScheduler::new();
        scheduler.restart(job.clone(), PERIOD).await.unwrap();

        tokio::time::advance(PERIOD).await;
        settle().await;
        assert_eq!(job.runs(), 1);

        scheduler.shutdown().await.unwrap();
        assert!(!scheduler.is_running());

        tokio::time::advance(PERIOD * 5).await;
        settle().await;
        assert_eq!(job.runs(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_replaces_the_timer() {
        let first = Arc::new(CountingJob::default());
        let second = Arc::new(CountingJob::default());
        let mut scheduler = UploadScheduler::new();

        scheduler.restart(first.clone(), PERIOD).await.unwrap();
        tokio::time::advance(PERIOD).await;
        settle().await;
        assert_eq!(first.runs(), 1);

        // Replacing twice in a row still leaves exactly one live timer.
        scheduler.restart(second.clone(), PERIOD).await.unwrap();
        scheduler.restart(second.clone(), PERIOD).await.unwrap();
        assert!(scheduler.is_running());

        // Advance one period at a time: a single multi-period jump of the
        // paused clock registers as a missed tick, which Delay pushes back.
        for _ in 0..2 {
            tokio::time::advance(PERIOD).await;
            settle().await;
        }
        assert_eq!(first.runs(), 1, "old job must not fire after restart");
        assert_eq!(second.runs(), 2);

        scheduler.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_waits_for_the_inflight_cycle() {
        let job = Arc::new(GatedJob::new());
        let mut scheduler = UploadScheduler::new();
        scheduler.restart(job.clone(), PERIOD).await.unwrap();

        tokio::time::advance(PERIOD).await;
        settle().await;
        assert_eq!(job.started.load(Ordering::SeqCst), 1);

        let shutdown = scheduler.shutdown();
        tokio::pin!(shutdown);

        // Shutdown must not complete while the cycle is still in flight.
        for _ in 0..4 {
            tokio::select! {
                biased;
                _ = &mut shutdown => panic!("shutdown finished with a cycle in flight"),
                _ = tokio::task::yield_now() => {}
            }
        }
        assert_eq!(job.completed.load(Ordering::SeqCst), 0);

        job.gate.add_permits(1);
        shutdown.await.unwrap();
        assert_eq!(job.completed.load(Ordering::SeqCst), 1);

        tokio::time::advance(PERIOD * 5).await;
        settle().await;
        assert_eq!(job.started.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_without_a_timer_is_a_no_op() {
        let mut scheduler = UploadScheduler::new();
        assert!(!scheduler.is_running());
        scheduler.shutdown().await.unwrap();
        scheduler.shutdown().await.unwrap();
    }
}
