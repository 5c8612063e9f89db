use chrono::{DateTime, Utc};

use super::domain::ExamStatus;

/// Derive the lifecycle status for an application window at `now`.
///
/// Both bounds are inclusive of [`ExamStatus::Ongoing`]. When either bound is
/// missing no inference is possible and `current` is returned unchanged.
pub fn resolve_status(
    now: DateTime<Utc>,
    application_start: Option<DateTime<Utc>>,
    application_end: Option<DateTime<Utc>>,
    current: ExamStatus,
) -> ExamStatus {
    let (Some(start), Some(end)) = (application_start, application_end) else {
        return current;
    };

    if now < start {
        ExamStatus::Upcoming
    } else if now > end {
        ExamStatus::Closed
    } else {
        ExamStatus::Ongoing
    }
}
