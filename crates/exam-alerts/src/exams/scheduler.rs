use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::ingestion::IngestionSource;
use super::reconciler::{ReconciliationReport, Reconciler};
use super::repository::ExamRepository;

/// Whether a reconciliation pass is currently in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    Idle,
    Running,
}

/// Returned to manual callers that collide with an active pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TriggerError {
    #[error("reconciliation already in progress")]
    AlreadyRunning,
}

/// Clears the running flag when the pass ends, including by unwinding.
struct RunGuard<'a> {
    running: &'a AtomicBool,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}

/// Single-flight driver for reconciliation passes.
///
/// Timer ticks and manual triggers share one `Idle`/`Running` flag. A timer tick
/// that finds a pass in flight is dropped; a manual trigger gets
/// [`TriggerError::AlreadyRunning`]. Nothing is ever queued.
pub struct ReconciliationScheduler<R, S> {
    reconciler: Reconciler<R, S>,
    running: AtomicBool,
    last_report: Mutex<Option<ReconciliationReport>>,
}

impl<R, S> ReconciliationScheduler<R, S>
where
    R: ExamRepository + 'static,
    S: IngestionSource + 'static,
{
    pub fn new(reconciler: Reconciler<R, S>) -> Self {
        Self {
            reconciler,
            running: AtomicBool::new(false),
            last_report: Mutex::new(None),
        }
    }

    pub fn state(&self) -> SchedulerState {
        if self.running.load(Ordering::Acquire) {
            SchedulerState::Running
        } else {
            SchedulerState::Idle
        }
    }

    /// Most recent completed pass, whichever path started it.
    pub fn last_report(&self) -> Option<ReconciliationReport> {
        self.last_report
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Run a pass synchronously on behalf of an administrative caller.
    pub fn trigger_now(&self) -> Result<ReconciliationReport, TriggerError> {
        let Some(_guard) = self.try_begin() else {
            warn!("manual reconciliation rejected, a pass is already running");
            return Err(TriggerError::AlreadyRunning);
        };
        Ok(self.run_and_record())
    }

    /// Timer entry point: run a pass unless one is already in flight.
    pub fn tick(&self) -> Option<ReconciliationReport> {
        let Some(_guard) = self.try_begin() else {
            debug!("scheduled tick dropped, a pass is already running");
            return None;
        };
        let report = self.run_and_record();
        if !report.changes.is_empty() {
            info!(changes = ?report.changes, "scheduled exam update check applied changes");
        }
        Some(report)
    }

    fn run_and_record(&self) -> ReconciliationReport {
        let report = self.reconciler.run_pass();
        *self
            .last_report
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(report.clone());
        report
    }

    /// Spawn the fixed-rate timer loop. The first pass fires immediately.
    ///
    /// Each pass runs on the blocking pool so a slow repository never delays the
    /// next tick; an overrunning pass simply causes that tick to be dropped.
    /// Dropping the returned handle also ends the loop.
    pub fn start(self: &Arc<Self>, every: Duration) -> SchedulerHandle {
        let (shutdown, mut shutdown_rx) = watch::channel(false);
        let scheduler = Arc::clone(self);
        info!(interval_secs = every.as_secs_f64(), "exam reconciliation scheduler started");

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let scheduler = Arc::clone(&scheduler);
                        tokio::task::spawn_blocking(move || {
                            scheduler.tick();
                        });
                    }
                    _ = shutdown_rx.changed() => break,
                }
            }
            info!("exam reconciliation scheduler stopped");
        });

        SchedulerHandle { shutdown, task }
    }

    fn try_begin(&self) -> Option<RunGuard<'_>> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunGuard {
                running: &self.running,
            })
    }
}

/// Owner of a running timer loop.
#[derive(Debug)]
pub struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Stop scheduling new passes. A pass already in flight runs to completion.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(err) = self.task.await {
            warn!(error = %err, "scheduler loop ended abnormally");
        }
    }
}
