use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::debug;

use super::domain::{CandidateExam, Exam, ExamId, ExamStatus, NewExam};
use super::status::resolve_status;

/// A difference between stored state and freshly resolved or ingested state.
/// Each delta drives exactly one repository mutation and one notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delta {
    StatusChange {
        exam_id: ExamId,
        title: String,
        from: ExamStatus,
        to: ExamStatus,
    },
    NewExam {
        exam: NewExam,
    },
}

impl Delta {
    /// Title of the exam the delta concerns.
    pub fn title(&self) -> &str {
        match self {
            Delta::StatusChange { title, .. } => title,
            Delta::NewExam { exam } => &exam.title,
        }
    }

    /// Human-readable change line reported back to the trigger's caller.
    pub fn describe(&self) -> String {
        match self {
            Delta::StatusChange { title, to, .. } => format!("{title} status updated to {to}"),
            Delta::NewExam { exam } => format!("New exam found: {}", exam.title),
        }
    }
}

/// Compare stored exams and ingestion candidates at `now`.
///
/// Status changes come first, ordered by ascending exam id, followed by new exams
/// in candidate order. A candidate is new when no stored exam (and no earlier
/// candidate in the same batch) carries the exact same title. Candidates missing a
/// required field are skipped.
pub fn detect_changes(
    stored: &[Exam],
    now: DateTime<Utc>,
    candidates: Vec<CandidateExam>,
) -> Vec<Delta> {
    let mut by_id: Vec<&Exam> = stored.iter().collect();
    by_id.sort_by_key(|exam| exam.id);

    let mut deltas: Vec<Delta> = by_id
        .into_iter()
        .filter_map(|exam| {
            let resolved = exam.resolved_status(now);
            (resolved != exam.status).then(|| Delta::StatusChange {
                exam_id: exam.id,
                title: exam.title.clone(),
                from: exam.status,
                to: resolved,
            })
        })
        .collect();

    let known_titles: HashSet<&str> = stored.iter().map(|exam| exam.title.as_str()).collect();
    let mut admitted: HashSet<String> = HashSet::new();

    for candidate in candidates {
        let status = resolve_status(
            now,
            candidate.application_start_date,
            candidate.application_end_date,
            ExamStatus::default(),
        );
        let Some(exam) = candidate.into_new_exam(status) else {
            debug!("skipping ingestion candidate with missing required fields");
            continue;
        };
        if known_titles.contains(exam.title.as_str()) || admitted.contains(&exam.title) {
            continue;
        }
        admitted.insert(exam.title.clone());
        deltas.push(Delta::NewExam { exam });
    }

    deltas
}
