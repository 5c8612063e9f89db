use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Repository-assigned identifier for an exam record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExamId(pub u64);

impl fmt::Display for ExamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Repository-assigned identifier for a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationId(pub u64);

/// Lifecycle stage derived from the application window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExamStatus {
    #[default]
    Upcoming,
    Ongoing,
    Closed,
}

impl ExamStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ExamStatus::Upcoming => "Upcoming",
            ExamStatus::Ongoing => "Ongoing",
            ExamStatus::Closed => "Closed",
        }
    }
}

impl fmt::Display for ExamStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A tracked recruitment or examination notice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exam {
    pub id: ExamId,
    pub title: String,
    pub organization: String,
    pub category: String,
    pub description: Option<String>,
    pub status: ExamStatus,
    pub application_start_date: Option<DateTime<Utc>>,
    pub application_end_date: Option<DateTime<Utc>>,
    pub exam_date: Option<DateTime<Utc>>,
    /// Link to the official notice.
    pub notification_url: Option<String>,
    pub apply_url: Option<String>,
    pub last_updated: DateTime<Utc>,
}

impl Exam {
    /// Status this exam should carry at `now`; see [`super::status::resolve_status`].
    pub fn resolved_status(&self, now: DateTime<Utc>) -> ExamStatus {
        super::status::resolve_status(
            now,
            self.application_start_date,
            self.application_end_date,
            self.status,
        )
    }

    pub(crate) fn from_new(id: ExamId, exam: NewExam, last_updated: DateTime<Utc>) -> Self {
        Self {
            id,
            title: exam.title,
            organization: exam.organization,
            category: exam.category,
            description: exam.description,
            status: exam.status,
            application_start_date: exam.application_start_date,
            application_end_date: exam.application_end_date,
            exam_date: exam.exam_date,
            notification_url: exam.notification_url,
            apply_url: exam.apply_url,
            last_updated,
        }
    }

    /// Overwrite every field present in `patch`. Does not touch `last_updated`.
    pub(crate) fn apply(&mut self, patch: ExamPatch) {
        let ExamPatch {
            title,
            organization,
            category,
            description,
            status,
            application_start_date,
            application_end_date,
            exam_date,
            notification_url,
            apply_url,
        } = patch;

        if let Some(title) = title {
            self.title = title;
        }
        if let Some(organization) = organization {
            self.organization = organization;
        }
        if let Some(category) = category {
            self.category = category;
        }
        if let Some(status) = status {
            self.status = status;
        }
        if let Some(description) = description {
            self.description = description;
        }
        if let Some(application_start_date) = application_start_date {
            self.application_start_date = application_start_date;
        }
        if let Some(application_end_date) = application_end_date {
            self.application_end_date = application_end_date;
        }
        if let Some(exam_date) = exam_date {
            self.exam_date = exam_date;
        }
        if let Some(notification_url) = notification_url {
            self.notification_url = notification_url;
        }
        if let Some(apply_url) = apply_url {
            self.apply_url = apply_url;
        }
    }
}

/// Fields supplied when inserting an exam; the repository assigns `id` and `last_updated`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewExam {
    pub title: String,
    pub organization: String,
    pub category: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: ExamStatus,
    #[serde(default)]
    pub application_start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub application_end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub exam_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notification_url: Option<String>,
    #[serde(default)]
    pub apply_url: Option<String>,
}

impl NewExam {
    /// Name of the first required field that is blank, if any.
    pub fn missing_required_field(&self) -> Option<&'static str> {
        [
            ("title", &self.title),
            ("organization", &self.organization),
            ("category", &self.category),
        ]
        .into_iter()
        .find(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| field)
    }
}

/// Partial update; `None` leaves the stored value untouched.
///
/// Nullable columns take `Some(None)` to clear them, which is what an explicit
/// JSON `null` deserializes to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExamPatch {
    pub title: Option<String>,
    pub organization: Option<String>,
    pub category: Option<String>,
    #[serde(deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    pub status: Option<ExamStatus>,
    #[serde(deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub application_start_date: Option<Option<DateTime<Utc>>>,
    #[serde(deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub application_end_date: Option<Option<DateTime<Utc>>>,
    #[serde(deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub exam_date: Option<Option<DateTime<Utc>>>,
    #[serde(deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub notification_url: Option<Option<String>>,
    #[serde(deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub apply_url: Option<Option<String>>,
}

/// Marks a field as supplied, keeping `null` distinct from absent.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl ExamPatch {
    pub fn status(status: ExamStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn blank_required_field(&self) -> Option<&'static str> {
        [
            ("title", &self.title),
            ("organization", &self.organization),
            ("category", &self.category),
        ]
        .into_iter()
        .find(|(_, value)| value.as_deref().is_some_and(|v| v.trim().is_empty()))
        .map(|(field, _)| field)
    }
}

/// Listing filter. Empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ExamFilter {
    /// Case-insensitive substring matched against title or organization.
    pub search: Option<String>,
    pub category: Option<String>,
    pub organization: Option<String>,
    pub status: Option<ExamStatus>,
}

impl ExamFilter {
    pub fn matches(&self, exam: &Exam) -> bool {
        if let Some(search) = self.search.as_deref().filter(|s| !s.is_empty()) {
            let needle = search.to_lowercase();
            if !exam.title.to_lowercase().contains(&needle)
                && !exam.organization.to_lowercase().contains(&needle)
            {
                return false;
            }
        }
        if let Some(category) = self.category.as_deref().filter(|c| !c.is_empty()) {
            if exam.category != category {
                return false;
            }
        }
        if let Some(organization) = self.organization.as_deref().filter(|o| !o.is_empty()) {
            if exam.organization != organization {
                return false;
            }
        }
        self.status.map_or(true, |status| exam.status == status)
    }
}

/// Exam record as delivered by an ingestion source, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CandidateExam {
    pub title: Option<String>,
    pub organization: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub application_start_date: Option<DateTime<Utc>>,
    pub application_end_date: Option<DateTime<Utc>>,
    pub exam_date: Option<DateTime<Utc>>,
    pub notification_url: Option<String>,
    pub apply_url: Option<String>,
}

impl CandidateExam {
    /// Validate the required fields, yielding an insertable exam with `status`.
    /// Returns `None` when title, organization or category is missing or blank.
    pub fn into_new_exam(self, status: ExamStatus) -> Option<NewExam> {
        fn required(value: Option<String>) -> Option<String> {
            value.filter(|v| !v.trim().is_empty())
        }

        Some(NewExam {
            title: required(self.title)?,
            organization: required(self.organization)?,
            category: required(self.category)?,
            description: self.description,
            status,
            application_start_date: self.application_start_date,
            application_end_date: self.application_end_date,
            exam_date: self.exam_date,
            notification_url: self.notification_url,
            apply_url: self.apply_url,
        })
    }
}

/// Kind of alert raised for an exam.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationKind {
    New,
    Update,
    Reminder,
}

/// Append-only alert referencing an exam by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: NotificationId,
    pub exam_id: Option<ExamId>,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub created_at: DateTime<Utc>,
}

/// Notification fields supplied on insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNotification {
    pub exam_id: Option<ExamId>,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
}
