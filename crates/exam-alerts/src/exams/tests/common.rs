use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{Receiver, Sender};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::exams::{
    AdmissionPolicy, CandidateExam, Exam, ExamFilter, ExamId, ExamPatch, ExamRepository,
    ExamService, ExamStatus, IngestionError, IngestionSource, InMemoryExamRepository,
    ManualClock, NewExam, NewNotification, Notification, ReconciliationScheduler, Reconciler,
    RepositoryError, StaticCatalogSource,
};

pub(super) fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn new_exam(title: &str, window: Option<(DateTime<Utc>, DateTime<Utc>)>) -> NewExam {
    NewExam {
        title: title.to_string(),
        organization: "Intelligence Bureau".to_string(),
        category: "Intelligence".to_string(),
        description: Some("Assistant Central Intelligence Officer Grade-II".to_string()),
        status: ExamStatus::Upcoming,
        application_start_date: window.map(|(start, _)| start),
        application_end_date: window.map(|(_, end)| end),
        exam_date: None,
        notification_url: Some("https://mha.gov.in".to_string()),
        apply_url: None,
    }
}

pub(super) fn january_window() -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    Some((at(2026, 1, 1), at(2026, 1, 31)))
}

pub(super) fn stored_exam(id: u64, title: &str, status: ExamStatus) -> Exam {
    let mut exam = Exam::from_new(ExamId(id), new_exam(title, january_window()), at(2025, 12, 1));
    exam.status = status;
    exam
}

pub(super) fn candidate(title: &str) -> CandidateExam {
    CandidateExam {
        title: Some(title.to_string()),
        organization: Some("RBI".to_string()),
        category: Some("Banking".to_string()),
        description: None,
        application_start_date: Some(at(2026, 5, 1)),
        application_end_date: Some(at(2026, 6, 1)),
        exam_date: Some(at(2026, 7, 15)),
        notification_url: None,
        apply_url: None,
    }
}

pub(super) type MemoryScheduler<S> = ReconciliationScheduler<InMemoryExamRepository, S>;

/// Scheduler over an in-memory repository and a manual clock.
pub(super) struct Harness<S> {
    pub(super) repository: Arc<InMemoryExamRepository>,
    pub(super) clock: Arc<ManualClock>,
    pub(super) scheduler: Arc<MemoryScheduler<S>>,
}

pub(super) fn harness_with<S>(now: DateTime<Utc>, source: S, policy: AdmissionPolicy) -> Harness<S>
where
    S: IngestionSource + 'static,
{
    let clock = Arc::new(ManualClock::new(now));
    let repository = Arc::new(InMemoryExamRepository::with_clock(clock.clone()));
    let reconciler = Reconciler::new(repository.clone(), Arc::new(source), clock.clone(), policy);
    Harness {
        repository,
        clock,
        scheduler: Arc::new(ReconciliationScheduler::new(reconciler)),
    }
}

pub(super) fn harness(now: DateTime<Utc>) -> Harness<StaticCatalogSource> {
    harness_with(now, StaticCatalogSource::default(), AdmissionPolicy::UNLIMITED)
}

pub(super) fn service_for<S>(harness: &Harness<S>) -> Arc<ExamService<InMemoryExamRepository, S>>
where
    S: IngestionSource + 'static,
{
    Arc::new(ExamService::new(
        harness.repository.clone(),
        harness.scheduler.clone(),
    ))
}

pub(super) struct FailingSource;

impl IngestionSource for FailingSource {
    fn list_candidate_exams(&self) -> Result<Vec<CandidateExam>, IngestionError> {
        Err(IngestionError::Unavailable("exam board portal offline".to_string()))
    }
}

/// Delegates to an in-memory repository but fails writes touching chosen exams.
/// Updates to ids in `vanished_updates` behave as if the row was deleted.
#[derive(Default)]
pub(super) struct FlakyRepository {
    pub(super) inner: InMemoryExamRepository,
    pub(super) failing_updates: Mutex<HashSet<ExamId>>,
    pub(super) vanished_updates: Mutex<HashSet<ExamId>>,
    pub(super) failing_inserts: Mutex<HashSet<String>>,
    pub(super) failing_notifications: Mutex<HashSet<ExamId>>,
    pub(super) fail_listing: std::sync::atomic::AtomicBool,
}

impl FlakyRepository {
    pub(super) fn with_clock(clock: Arc<ManualClock>) -> Self {
        Self {
            inner: InMemoryExamRepository::with_clock(clock),
            ..Self::default()
        }
    }
}

fn offline() -> RepositoryError {
    RepositoryError::Unavailable("database offline".to_string())
}

impl ExamRepository for FlakyRepository {
    fn list_exams(&self, filter: Option<&ExamFilter>) -> Result<Vec<Exam>, RepositoryError> {
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(offline());
        }
        self.inner.list_exams(filter)
    }

    fn get_exam(&self, id: ExamId) -> Result<Option<Exam>, RepositoryError> {
        self.inner.get_exam(id)
    }

    fn create_exam(&self, exam: NewExam) -> Result<Exam, RepositoryError> {
        if self
            .failing_inserts
            .lock()
            .expect("flaky mutex poisoned")
            .contains(&exam.title)
        {
            return Err(offline());
        }
        self.inner.create_exam(exam)
    }

    fn update_exam(&self, id: ExamId, patch: ExamPatch) -> Result<Option<Exam>, RepositoryError> {
        if self
            .failing_updates
            .lock()
            .expect("flaky mutex poisoned")
            .contains(&id)
        {
            return Err(offline());
        }
        if self
            .vanished_updates
            .lock()
            .expect("flaky mutex poisoned")
            .contains(&id)
        {
            return Ok(None);
        }
        self.inner.update_exam(id, patch)
    }

    fn create_notification(
        &self,
        notification: NewNotification,
    ) -> Result<Notification, RepositoryError> {
        let blocked = notification.exam_id.is_some_and(|id| {
            self.failing_notifications
                .lock()
                .expect("flaky mutex poisoned")
                .contains(&id)
        });
        if blocked {
            return Err(offline());
        }
        self.inner.create_notification(notification)
    }

    fn list_notifications(&self, limit: usize) -> Result<Vec<Notification>, RepositoryError> {
        self.inner.list_notifications(limit)
    }
}

/// Blocks inside `list_exams` until released, so a pass can be held in flight.
pub(super) struct GatedRepository {
    pub(super) inner: InMemoryExamRepository,
    pub(super) listings: AtomicUsize,
    entered: Mutex<Sender<()>>,
    release: Mutex<Receiver<()>>,
}

pub(super) struct Gate {
    pub(super) entered: Receiver<()>,
    pub(super) release: Sender<()>,
}

impl GatedRepository {
    pub(super) fn new(inner: InMemoryExamRepository) -> (Self, Gate) {
        let (entered_tx, entered_rx) = std::sync::mpsc::channel();
        let (release_tx, release_rx) = std::sync::mpsc::channel();
        let repository = Self {
            inner,
            listings: AtomicUsize::new(0),
            entered: Mutex::new(entered_tx),
            release: Mutex::new(release_rx),
        };
        let gate = Gate {
            entered: entered_rx,
            release: release_tx,
        };
        (repository, gate)
    }
}

impl ExamRepository for GatedRepository {
    fn list_exams(&self, filter: Option<&ExamFilter>) -> Result<Vec<Exam>, RepositoryError> {
        self.listings.fetch_add(1, Ordering::SeqCst);
        let _ = self.entered.lock().expect("gate mutex poisoned").send(());
        let _ = self.release.lock().expect("gate mutex poisoned").recv();
        self.inner.list_exams(filter)
    }

    fn get_exam(&self, id: ExamId) -> Result<Option<Exam>, RepositoryError> {
        self.inner.get_exam(id)
    }

    fn create_exam(&self, exam: NewExam) -> Result<Exam, RepositoryError> {
        self.inner.create_exam(exam)
    }

    fn update_exam(&self, id: ExamId, patch: ExamPatch) -> Result<Option<Exam>, RepositoryError> {
        self.inner.update_exam(id, patch)
    }

    fn create_notification(
        &self,
        notification: NewNotification,
    ) -> Result<Notification, RepositoryError> {
        self.inner.create_notification(notification)
    }

    fn list_notifications(&self, limit: usize) -> Result<Vec<Notification>, RepositoryError> {
        self.inner.list_notifications(limit)
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
