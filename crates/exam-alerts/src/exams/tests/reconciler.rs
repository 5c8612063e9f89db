use std::sync::atomic::Ordering;
use std::sync::Arc;

use chrono::Duration;

use super::common::*;
use crate::exams::{
    AdmissionPolicy, Clock, DeltaFailure, ExamId, ExamRepository, ExamStatus, ManualClock,
    NotificationKind, Reconciler, StaticCatalogSource,
};

#[test]
fn upcoming_exam_opens_when_window_starts() {
    let harness = harness(at(2026, 1, 15));
    let exam = harness
        .repository
        .create_exam(new_exam("IB ACIO Grade II 2026", january_window()))
        .expect("insert");

    let report = harness.scheduler.trigger_now().expect("scheduler idle");

    assert_eq!(report.changes, vec!["IB ACIO Grade II 2026 status updated to Ongoing"]);
    assert!(report.failures.is_empty());
    let stored = harness
        .repository
        .get_exam(exam.id)
        .expect("fetch")
        .expect("exam present");
    assert_eq!(stored.status, ExamStatus::Ongoing);

    let notifications = harness.repository.notifications();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].kind, NotificationKind::Update);
    assert_eq!(notifications[0].exam_id, Some(exam.id));
    assert!(notifications[0].message.contains("Ongoing"));
}

#[test]
fn second_pass_without_changes_is_empty() {
    let harness = harness_with(
        at(2026, 1, 15),
        StaticCatalogSource::banking_2026(),
        AdmissionPolicy::UNLIMITED,
    );
    harness
        .repository
        .create_exam(new_exam("IB ACIO Grade II 2026", january_window()))
        .expect("insert");

    let first = harness.scheduler.trigger_now().expect("scheduler idle");
    assert_eq!(first.changes.len(), 4);

    let second = harness.scheduler.trigger_now().expect("scheduler idle");
    assert!(second.is_noop(), "unexpected changes: {:?}", second.changes);
    assert_eq!(harness.repository.notifications().len(), 4);
}

#[test]
fn ingested_title_is_created_once_across_passes() {
    let harness = harness_with(
        at(2025, 12, 1),
        StaticCatalogSource::new(vec![candidate("RBI Grade B 2026")]),
        AdmissionPolicy::UNLIMITED,
    );

    let first = harness.scheduler.trigger_now().expect("scheduler idle");
    harness.clock.advance(Duration::days(1));
    let second = harness.scheduler.trigger_now().expect("scheduler idle");

    assert_eq!(first.changes, vec!["New exam found: RBI Grade B 2026"]);
    assert!(second.changes.is_empty());

    let exams = harness.repository.list_exams(None).expect("list");
    assert_eq!(exams.len(), 1);
    let new_alerts: Vec<_> = harness
        .repository
        .notifications()
        .into_iter()
        .filter(|note| note.kind == NotificationKind::New)
        .collect();
    assert_eq!(new_alerts.len(), 1);
    assert_eq!(new_alerts[0].exam_id, Some(exams[0].id));
}

#[test]
fn candidate_matching_existing_title_creates_nothing() {
    let harness = harness_with(
        at(2025, 12, 1),
        StaticCatalogSource::new(vec![candidate("IB ACIO Grade II 2026")]),
        AdmissionPolicy::UNLIMITED,
    );
    harness
        .repository
        .create_exam(new_exam("IB ACIO Grade II 2026", january_window()))
        .expect("insert");

    let report = harness.scheduler.trigger_now().expect("scheduler idle");

    assert!(report.changes.is_empty());
    assert_eq!(harness.repository.list_exams(None).expect("list").len(), 1);
    assert!(harness.repository.notifications().is_empty());
}

#[test]
fn novel_candidate_creates_one_exam_and_one_alert() {
    let harness = harness_with(
        at(2025, 12, 1),
        StaticCatalogSource::new(vec![candidate("SEBI Grade A 2026")]),
        AdmissionPolicy::UNLIMITED,
    );

    let report = harness.scheduler.trigger_now().expect("scheduler idle");

    assert_eq!(report.changes, vec!["New exam found: SEBI Grade A 2026"]);
    let exams = harness.repository.list_exams(None).expect("list");
    assert_eq!(exams.len(), 1);
    assert_eq!(exams[0].status, ExamStatus::Upcoming);
    let notifications = harness.repository.notifications();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].kind, NotificationKind::New);
    assert_eq!(notifications[0].title, "New Exam Alert");
}

#[test]
fn status_change_touches_last_updated() {
    let harness = harness(at(2025, 12, 1));
    let exam = harness
        .repository
        .create_exam(new_exam("IB ACIO Grade II 2026", january_window()))
        .expect("insert");

    harness.clock.set(at(2026, 2, 5));
    let report = harness.scheduler.trigger_now().expect("scheduler idle");

    let stored = harness
        .repository
        .get_exam(exam.id)
        .expect("fetch")
        .expect("exam present");
    assert_eq!(stored.status, ExamStatus::Closed);
    assert!(stored.last_updated >= report.started_at);
    assert!(stored.last_updated > exam.last_updated);
}

#[test]
fn admission_cap_defers_remaining_candidates() {
    let harness = harness_with(
        at(2025, 12, 1),
        StaticCatalogSource::banking_2026(),
        AdmissionPolicy::capped(1),
    );

    let first = harness.scheduler.trigger_now().expect("scheduler idle");
    assert_eq!(first.changes, vec!["New exam found: RBI Grade B 2026"]);

    let second = harness.scheduler.trigger_now().expect("scheduler idle");
    assert_eq!(second.changes, vec!["New exam found: SEBI Grade A 2026"]);

    let third = harness.scheduler.trigger_now().expect("scheduler idle");
    assert_eq!(third.changes, vec!["New exam found: NABARD Grade A 2026"]);

    assert!(harness.scheduler.trigger_now().expect("scheduler idle").is_noop());
}

#[test]
fn failed_delta_does_not_abort_the_pass() {
    let clock = Arc::new(ManualClock::new(at(2025, 12, 1)));
    let repository = Arc::new(FlakyRepository::with_clock(clock.clone()));
    let broken = repository
        .create_exam(new_exam("UPSC Civil Services 2026", january_window()))
        .expect("insert");
    let healthy = repository
        .create_exam(new_exam("SSC CGL 2026", january_window()))
        .expect("insert");
    repository
        .failing_updates
        .lock()
        .expect("flaky mutex poisoned")
        .insert(broken.id);
    repository
        .failing_inserts
        .lock()
        .expect("flaky mutex poisoned")
        .insert("SEBI Grade A 2026".to_string());

    clock.set(at(2026, 1, 10));
    let reconciler = Reconciler::new(
        repository.clone(),
        Arc::new(StaticCatalogSource::new(vec![
            candidate("SEBI Grade A 2026"),
            candidate("NABARD Grade A 2026"),
        ])),
        clock.clone(),
        AdmissionPolicy::UNLIMITED,
    );

    let report = reconciler.run_pass();

    assert_eq!(
        report.changes,
        vec![
            "SSC CGL 2026 status updated to Ongoing".to_string(),
            "New exam found: NABARD Grade A 2026".to_string(),
        ]
    );
    assert_eq!(report.failures.len(), 2);
    assert_eq!(
        report.failures[0].change,
        "UPSC Civil Services 2026 status updated to Ongoing"
    );

    let untouched = repository
        .get_exam(broken.id)
        .expect("fetch")
        .expect("exam present");
    assert_eq!(untouched.status, ExamStatus::Upcoming);
    let updated = repository
        .get_exam(healthy.id)
        .expect("fetch")
        .expect("exam present");
    assert_eq!(updated.status, ExamStatus::Ongoing);

    let notified: Vec<Option<ExamId>> = repository
        .inner
        .notifications()
        .into_iter()
        .map(|note| note.exam_id)
        .collect();
    assert_eq!(notified.len(), 2);
    assert!(!notified.contains(&Some(broken.id)));
}

#[test]
fn failed_notification_is_reported_and_skipped() {
    let clock = Arc::new(ManualClock::new(at(2025, 12, 1)));
    let repository = Arc::new(FlakyRepository::with_clock(clock.clone()));
    let exam = repository
        .create_exam(new_exam("TNPSC Group 4 2026", january_window()))
        .expect("insert");
    repository
        .failing_notifications
        .lock()
        .expect("flaky mutex poisoned")
        .insert(exam.id);

    clock.set(at(2026, 1, 10));
    let reconciler = Reconciler::new(
        repository.clone(),
        Arc::new(StaticCatalogSource::default()),
        clock.clone(),
        AdmissionPolicy::UNLIMITED,
    );
    let report = reconciler.run_pass();

    assert!(report.changes.is_empty());
    assert_eq!(report.failures.len(), 1);
    assert!(repository.inner.notifications().is_empty());
}

#[test]
fn exam_deleted_mid_pass_is_recorded_as_failure() {
    let clock = Arc::new(ManualClock::new(at(2025, 12, 1)));
    let repository = Arc::new(FlakyRepository::with_clock(clock.clone()));
    let exam = repository
        .create_exam(new_exam("OSSC CGL 2026", january_window()))
        .expect("insert");
    repository
        .vanished_updates
        .lock()
        .expect("flaky mutex poisoned")
        .insert(exam.id);

    clock.set(at(2026, 1, 10));
    let reconciler = Reconciler::new(
        repository.clone(),
        Arc::new(StaticCatalogSource::default()),
        clock.clone(),
        AdmissionPolicy::UNLIMITED,
    );
    let report = reconciler.run_pass();

    assert!(report.changes.is_empty());
    assert_eq!(
        report.failures,
        vec![DeltaFailure {
            change: "OSSC CGL 2026 status updated to Ongoing".to_string(),
            error: format!("exam {} no longer exists", exam.id),
        }]
    );
    assert!(repository.inner.notifications().is_empty());
}

#[test]
fn unavailable_repository_yields_empty_report() {
    let clock = Arc::new(ManualClock::new(at(2026, 1, 10)));
    let repository = Arc::new(FlakyRepository::with_clock(clock.clone()));
    repository.fail_listing.store(true, Ordering::SeqCst);

    let reconciler = Reconciler::new(
        repository.clone(),
        Arc::new(StaticCatalogSource::banking_2026()),
        clock.clone(),
        AdmissionPolicy::UNLIMITED,
    );
    let report = reconciler.run_pass();

    assert!(report.changes.is_empty());
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].change, "load exams");
    assert!(repository.inner.notifications().is_empty());
}

#[test]
fn ingestion_outage_still_reconciles_status() {
    let harness = harness_with(at(2025, 12, 1), FailingSource, AdmissionPolicy::UNLIMITED);
    harness
        .repository
        .create_exam(new_exam("IB ACIO Grade II 2026", january_window()))
        .expect("insert");

    harness.clock.set(at(2026, 1, 2));
    let report = harness.scheduler.trigger_now().expect("scheduler idle");

    assert_eq!(report.changes, vec!["IB ACIO Grade II 2026 status updated to Ongoing"]);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].change, "fetch candidate exams");
    assert_eq!(report.finished_at, harness.clock.now());
}
