use super::domain::{Exam, ExamFilter, ExamId, ExamPatch, NewExam, NewNotification, Notification};

/// Storage abstraction so the reconciler and service can be exercised in isolation.
///
/// Each call is expected to be individually atomic; nothing here spans rows.
pub trait ExamRepository: Send + Sync {
    /// Exams matching `filter`, most recently updated first.
    fn list_exams(&self, filter: Option<&ExamFilter>) -> Result<Vec<Exam>, RepositoryError>;
    fn get_exam(&self, id: ExamId) -> Result<Option<Exam>, RepositoryError>;
    /// Assigns the id and stamps `last_updated`.
    fn create_exam(&self, exam: NewExam) -> Result<Exam, RepositoryError>;
    /// Applies `patch` and refreshes `last_updated`; `None` when the exam does not exist.
    fn update_exam(&self, id: ExamId, patch: ExamPatch) -> Result<Option<Exam>, RepositoryError>;
    fn create_notification(
        &self,
        notification: NewNotification,
    ) -> Result<Notification, RepositoryError>;
    /// Newest first, at most `limit` entries.
    fn list_notifications(&self, limit: usize) -> Result<Vec<Notification>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
