use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::clock::{Clock, SystemClock};
use super::domain::{
    Exam, ExamFilter, ExamId, ExamPatch, NewExam, NewNotification, Notification, NotificationId,
};
use super::repository::{ExamRepository, RepositoryError};

#[derive(Debug, Default)]
struct Tables {
    exams: BTreeMap<ExamId, Exam>,
    notifications: Vec<Notification>,
    next_exam_id: u64,
    next_notification_id: u64,
}

/// Process-local repository backed by mutex-guarded maps.
#[derive(Clone)]
pub struct InMemoryExamRepository {
    tables: Arc<Mutex<Tables>>,
    clock: Arc<dyn Clock>,
}

impl Default for InMemoryExamRepository {
    fn default() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }
}

impl std::fmt::Debug for InMemoryExamRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryExamRepository").finish_non_exhaustive()
    }
}

impl InMemoryExamRepository {
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            tables: Arc::new(Mutex::new(Tables::default())),
            clock,
        }
    }

    /// Every stored notification in insertion order.
    pub fn notifications(&self) -> Vec<Notification> {
        self.lock()
            .map(|tables| tables.notifications.clone())
            .unwrap_or_default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, RepositoryError> {
        self.tables
            .lock()
            .map_err(|_| RepositoryError::Unavailable("repository mutex poisoned".to_string()))
    }
}

impl ExamRepository for InMemoryExamRepository {
    fn list_exams(&self, filter: Option<&ExamFilter>) -> Result<Vec<Exam>, RepositoryError> {
        let tables = self.lock()?;
        let mut exams: Vec<Exam> = tables
            .exams
            .values()
            .filter(|exam| filter.map_or(true, |filter| filter.matches(exam)))
            .cloned()
            .collect();
        exams.sort_by(|a, b| {
            b.last_updated
                .cmp(&a.last_updated)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(exams)
    }

    fn get_exam(&self, id: ExamId) -> Result<Option<Exam>, RepositoryError> {
        Ok(self.lock()?.exams.get(&id).cloned())
    }

    fn create_exam(&self, exam: NewExam) -> Result<Exam, RepositoryError> {
        let now = self.clock.now();
        let mut tables = self.lock()?;
        tables.next_exam_id += 1;
        let id = ExamId(tables.next_exam_id);
        let stored = Exam::from_new(id, exam, now);
        tables.exams.insert(id, stored.clone());
        Ok(stored)
    }

    fn update_exam(&self, id: ExamId, patch: ExamPatch) -> Result<Option<Exam>, RepositoryError> {
        let now = self.clock.now();
        let mut tables = self.lock()?;
        let Some(exam) = tables.exams.get_mut(&id) else {
            return Ok(None);
        };
        exam.apply(patch);
        exam.last_updated = now;
        Ok(Some(exam.clone()))
    }

    fn create_notification(
        &self,
        notification: NewNotification,
    ) -> Result<Notification, RepositoryError> {
        let now = self.clock.now();
        let mut tables = self.lock()?;
        tables.next_notification_id += 1;
        let stored = Notification {
            id: NotificationId(tables.next_notification_id),
            exam_id: notification.exam_id,
            title: notification.title,
            message: notification.message,
            kind: notification.kind,
            created_at: now,
        };
        tables.notifications.push(stored.clone());
        Ok(stored)
    }

    fn list_notifications(&self, limit: usize) -> Result<Vec<Notification>, RepositoryError> {
        let tables = self.lock()?;
        Ok(tables
            .notifications
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect())
    }
}
