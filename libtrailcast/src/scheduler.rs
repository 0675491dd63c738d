//! Tick-driven scheduler
//!
//! Scans for due entries on a fixed interval and hands each to the
//! dispatcher on its own task. A tick never waits on platform APIs
//! beyond the dispatcher's publish deadline, and a slow platform only
//! delays its own entry.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::dispatch::{DispatchOutcome, Dispatcher};
use crate::error::Result;
use crate::store::{RecoveryReport, ScheduleStore};

/// What one tick did
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub dispatched: usize,
    pub skipped: usize,
    pub errors: usize,
}

pub struct Scheduler {
    store: ScheduleStore,
    dispatcher: Arc<Dispatcher>,
    tick_interval: Duration,
    shutdown: Arc<AtomicBool>,
}

impl Scheduler {
    pub fn new(store: ScheduleStore, dispatcher: Arc<Dispatcher>, tick_interval: Duration) -> Self {
        Self {
            store,
            dispatcher,
            tick_interval,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag checked between ticks; flip it to stop `run`
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Reset or fail entries left in mid-dispatch by a previous process
    ///
    /// Run once at startup, before the first tick. The grace period is
    /// twice the tick interval so an entry still being dispatched by a
    /// concurrent process is left alone.
    pub async fn recover(&self, now: i64) -> Result<RecoveryReport> {
        let grace_secs = 2 * self.tick_interval.as_secs() as i64;
        let report = self.store.recover_interrupted(now, grace_secs, 2).await?;

        if !report.retried.is_empty() || !report.failed.is_empty() {
            info!(
                retried = report.retried.len(),
                failed = report.failed.len(),
                "Recovered interrupted dispatches"
            );
        }

        Ok(report)
    }

    /// One scan: dispatch every due entry concurrently
    pub async fn run_once(&self, now: i64) -> Result<TickReport> {
        let due = self.store.due_entries(now).await?;
        if due.is_empty() {
            debug!("No due entries");
            return Ok(TickReport::default());
        }

        info!(count = due.len(), "Dispatching due entries");

        let mut tasks = JoinSet::new();
        for entry in due {
            let dispatcher = Arc::clone(&self.dispatcher);
            tasks.spawn(async move { dispatcher.dispatch(&entry.id).await });
        }

        let mut report = TickReport::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(DispatchOutcome::Dispatched(..))) => report.dispatched += 1,
                Ok(Ok(DispatchOutcome::Skipped)) => report.skipped += 1,
                Ok(Err(e)) => {
                    error!(error = %e, "Dispatch failed");
                    report.errors += 1;
                }
                Err(e) => {
                    error!(error = %e, "Dispatch task panicked");
                    report.errors += 1;
                }
            }
        }

        Ok(report)
    }

    /// Tick until the shutdown flag is set
    ///
    /// Sleeps in one-second increments so shutdown takes effect quickly
    /// even with a long tick interval.
    pub async fn run(&self) -> Result<()> {
        info!(
            tick_interval_secs = self.tick_interval.as_secs(),
            "Scheduler running"
        );

        while !self.shutdown.load(Ordering::Relaxed) {
            let now = chrono::Utc::now().timestamp();
            if let Err(e) = self.run_once(now).await {
                error!(error = %e, "Tick failed");
            }

            let mut remaining = self.tick_interval;
            while !remaining.is_zero() && !self.shutdown.load(Ordering::Relaxed) {
                let step = remaining.min(Duration::from_secs(1));
                tokio::time::sleep(step).await;
                remaining -= step;
            }
        }

        info!("Scheduler stopped");
        Ok(())
    }
}
