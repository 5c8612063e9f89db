use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::clock::Clock;
use super::detector::{detect_changes, Delta};
use super::domain::{ExamId, ExamPatch};
use super::emitter::NotificationEmitter;
use super::ingestion::IngestionSource;
use super::repository::{ExamRepository, RepositoryError};

/// Bounds how many newly discovered exams a single pass admits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdmissionPolicy {
    /// `None` admits every new candidate.
    pub max_new_exams_per_pass: Option<usize>,
}

impl AdmissionPolicy {
    pub const UNLIMITED: Self = Self {
        max_new_exams_per_pass: None,
    };

    pub fn capped(limit: usize) -> Self {
        Self {
            max_new_exams_per_pass: Some(limit),
        }
    }

    fn admits(&self, admitted_so_far: usize) -> bool {
        self.max_new_exams_per_pass
            .map_or(true, |limit| admitted_so_far < limit)
    }
}

/// A delta (or pass stage) that could not be applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeltaFailure {
    pub change: String,
    pub error: String,
}

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciliationReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// One line per delta that was persisted and notified.
    pub changes: Vec<String>,
    pub failures: Vec<DeltaFailure>,
}

impl ReconciliationReport {
    pub fn is_noop(&self) -> bool {
        self.changes.is_empty() && self.failures.is_empty()
    }
}

#[derive(Debug, thiserror::Error)]
enum ApplyError {
    #[error("exam {0} no longer exists")]
    ExamVanished(ExamId),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Runs the resolve, detect, mutate, notify pipeline over the full exam set.
///
/// A pass never fails as a whole: every problem is logged and recorded on the
/// returned report, and the remaining deltas still run.
pub struct Reconciler<R, S> {
    repository: Arc<R>,
    source: Arc<S>,
    clock: Arc<dyn Clock>,
    emitter: NotificationEmitter<R>,
    policy: AdmissionPolicy,
}

impl<R, S> Reconciler<R, S>
where
    R: ExamRepository + 'static,
    S: IngestionSource + 'static,
{
    pub fn new(
        repository: Arc<R>,
        source: Arc<S>,
        clock: Arc<dyn Clock>,
        policy: AdmissionPolicy,
    ) -> Self {
        let emitter = NotificationEmitter::new(repository.clone());
        Self {
            repository,
            source,
            clock,
            emitter,
            policy,
        }
    }

    /// Execute one pass. Callers are responsible for keeping passes from overlapping.
    pub fn run_pass(&self) -> ReconciliationReport {
        let started_at = self.clock.now();
        let mut changes = Vec::new();
        let mut failures = Vec::new();
        info!(%started_at, "checking for exam updates");

        let stored = match self.repository.list_exams(None) {
            Ok(exams) => exams,
            Err(err) => {
                error!(error = %err, "unable to load exams, skipping pass");
                failures.push(DeltaFailure {
                    change: "load exams".to_string(),
                    error: err.to_string(),
                });
                return self.finish(started_at, changes, failures);
            }
        };

        let candidates = match self.source.list_candidate_exams() {
            Ok(candidates) => candidates,
            Err(err) => {
                warn!(error = %err, "ingestion source failed, reconciling status only");
                failures.push(DeltaFailure {
                    change: "fetch candidate exams".to_string(),
                    error: err.to_string(),
                });
                Vec::new()
            }
        };

        let deltas = detect_changes(&stored, started_at, candidates);
        debug!(
            exams = stored.len(),
            deltas = deltas.len(),
            "change detection complete"
        );

        let mut admitted = 0usize;
        for delta in deltas {
            let is_new_exam = matches!(delta, Delta::NewExam { .. });
            if is_new_exam && !self.policy.admits(admitted) {
                debug!(title = delta.title(), "admission cap reached, deferring new exam");
                continue;
            }

            match self.apply(&delta) {
                Ok(exam_id) => {
                    if is_new_exam {
                        admitted += 1;
                    }
                    let change = delta.describe();
                    info!(exam_id = %exam_id, change = %change, "exam change applied");
                    changes.push(change);
                }
                Err(err) => {
                    warn!(
                        title = delta.title(),
                        error = %err,
                        "failed to apply exam change, continuing"
                    );
                    failures.push(DeltaFailure {
                        change: delta.describe(),
                        error: err.to_string(),
                    });
                }
            }
        }

        self.finish(started_at, changes, failures)
    }

    /// Persist the delta's mutation, then its notification.
    fn apply(&self, delta: &Delta) -> Result<ExamId, ApplyError> {
        let exam_id = match delta {
            Delta::StatusChange { exam_id, to, .. } => self
                .repository
                .update_exam(*exam_id, ExamPatch::status(*to))?
                .ok_or(ApplyError::ExamVanished(*exam_id))?
                .id,
            Delta::NewExam { exam } => self.repository.create_exam(exam.clone())?.id,
        };

        self.emitter.emit(delta, exam_id)?;
        Ok(exam_id)
    }

    fn finish(
        &self,
        started_at: DateTime<Utc>,
        changes: Vec<String>,
        failures: Vec<DeltaFailure>,
    ) -> ReconciliationReport {
        let report = ReconciliationReport {
            started_at,
            finished_at: self.clock.now(),
            changes,
            failures,
        };
        info!(
            changes = report.changes.len(),
            failures = report.failures.len(),
            "exam update check finished"
        );
        report
    }
}
