//! Exam records, their derived lifecycle status, and the reconciliation pipeline
//! that keeps both in step with the ingestion source.

pub mod clock;
pub mod detector;
pub mod domain;
pub mod emitter;
pub mod ingestion;
pub mod memory;
pub mod reconciler;
pub mod repository;
pub mod router;
pub mod scheduler;
pub mod service;
pub mod status;

#[cfg(test)]
mod tests;

pub use clock::{Clock, ManualClock, SystemClock};
pub use detector::{detect_changes, Delta};
pub use domain::{
    CandidateExam, Exam, ExamFilter, ExamId, ExamPatch, ExamStatus, NewExam, NewNotification,
    Notification, NotificationId, NotificationKind,
};
pub use emitter::NotificationEmitter;
pub use ingestion::{IngestionError, IngestionSource, StaticCatalogSource};
pub use memory::InMemoryExamRepository;
pub use reconciler::{AdmissionPolicy, DeltaFailure, ReconciliationReport, Reconciler};
pub use repository::{ExamRepository, RepositoryError};
pub use router::exam_router;
pub use scheduler::{ReconciliationScheduler, SchedulerHandle, SchedulerState, TriggerError};
pub use service::{ExamService, ExamServiceError};
pub use status::resolve_status;
