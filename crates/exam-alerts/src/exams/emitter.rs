use std::sync::Arc;

use tracing::debug;

use super::detector::Delta;
use super::domain::{ExamId, NewNotification, Notification, NotificationKind};
use super::repository::{ExamRepository, RepositoryError};

pub const STATUS_UPDATED_TITLE: &str = "Exam Status Updated";
pub const NEW_EXAM_TITLE: &str = "New Exam Alert";

/// Persists one notification per applied delta.
///
/// Callers invoke [`NotificationEmitter::emit`] only once the delta's own mutation
/// has been stored; the detector already guarantees one delta per exam per pass.
pub struct NotificationEmitter<R> {
    repository: Arc<R>,
}

impl<R> NotificationEmitter<R>
where
    R: ExamRepository + 'static,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// Build and persist the notification for `delta`, now stored under `exam_id`.
    pub fn emit(&self, delta: &Delta, exam_id: ExamId) -> Result<Notification, RepositoryError> {
        let notification = self.repository.create_notification(draft(delta, exam_id))?;
        debug!(
            exam_id = %exam_id,
            kind = ?notification.kind,
            "notification persisted"
        );
        Ok(notification)
    }
}

/// Notification fields for `delta`.
pub fn draft(delta: &Delta, exam_id: ExamId) -> NewNotification {
    match delta {
        Delta::StatusChange { title, to, .. } => NewNotification {
            exam_id: Some(exam_id),
            title: STATUS_UPDATED_TITLE.to_string(),
            message: format!("Status for {title} has changed to {to}."),
            kind: NotificationKind::Update,
        },
        Delta::NewExam { exam } => NewNotification {
            exam_id: Some(exam_id),
            title: NEW_EXAM_TITLE.to_string(),
            message: format!("New notification released: {}", exam.title),
            kind: NotificationKind::New,
        },
    }
}
