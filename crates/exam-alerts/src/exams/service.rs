use std::sync::Arc;

use super::domain::{Exam, ExamFilter, ExamId, ExamPatch, NewExam, Notification};
use super::ingestion::IngestionSource;
use super::repository::{ExamRepository, RepositoryError};
use super::scheduler::{ReconciliationScheduler, TriggerError};
use super::reconciler::ReconciliationReport;

/// Notifications returned by the listing endpoint.
pub const NOTIFICATION_PAGE_SIZE: usize = 50;

/// Facade over the repository and scheduler used by the HTTP layer.
pub struct ExamService<R, S> {
    repository: Arc<R>,
    scheduler: Arc<ReconciliationScheduler<R, S>>,
}

impl<R, S> ExamService<R, S>
where
    R: ExamRepository + 'static,
    S: IngestionSource + 'static,
{
    pub fn new(repository: Arc<R>, scheduler: Arc<ReconciliationScheduler<R, S>>) -> Self {
        Self {
            repository,
            scheduler,
        }
    }

    pub fn scheduler(&self) -> &Arc<ReconciliationScheduler<R, S>> {
        &self.scheduler
    }

    pub fn list(&self, filter: &ExamFilter) -> Result<Vec<Exam>, ExamServiceError> {
        Ok(self.repository.list_exams(Some(filter))?)
    }

    pub fn get(&self, id: ExamId) -> Result<Exam, ExamServiceError> {
        self.repository
            .get_exam(id)?
            .ok_or(ExamServiceError::NotFound(id))
    }

    /// Administrative insert. Does not notify; new exams announced by the
    /// ingestion source go through reconciliation instead.
    pub fn create(&self, exam: NewExam) -> Result<Exam, ExamServiceError> {
        if let Some(field) = exam.missing_required_field() {
            return Err(ExamServiceError::Validation { field });
        }
        Ok(self.repository.create_exam(exam)?)
    }

    pub fn update(&self, id: ExamId, patch: ExamPatch) -> Result<Exam, ExamServiceError> {
        if let Some(field) = patch.blank_required_field() {
            return Err(ExamServiceError::Validation { field });
        }
        self.repository
            .update_exam(id, patch)?
            .ok_or(ExamServiceError::NotFound(id))
    }

    pub fn notifications(&self) -> Result<Vec<Notification>, ExamServiceError> {
        Ok(self.repository.list_notifications(NOTIFICATION_PAGE_SIZE)?)
    }

    pub fn trigger_reconciliation(&self) -> Result<ReconciliationReport, ExamServiceError> {
        Ok(self.scheduler.trigger_now()?)
    }
}

/// Error raised by the exam service.
#[derive(Debug, thiserror::Error)]
pub enum ExamServiceError {
    #[error("exam {0} not found")]
    NotFound(ExamId),
    #[error("{field} must not be empty")]
    Validation { field: &'static str },
    #[error(transparent)]
    Trigger(#[from] TriggerError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
