use chrono::{DateTime, NaiveDate, Utc};

use super::domain::CandidateExam;

/// Supplies exam records published by exam boards but not necessarily stored yet.
///
/// A feed or scraper plugs in here; the reconciler only relies on the candidate
/// titles being stable between passes.
pub trait IngestionSource: Send + Sync {
    fn list_candidate_exams(&self) -> Result<Vec<CandidateExam>, IngestionError>;
}

/// Ingestion failures. The reconciler degrades to status-only passes on these.
#[derive(Debug, thiserror::Error)]
pub enum IngestionError {
    #[error("ingestion source unavailable: {0}")]
    Unavailable(String),
}

/// Fixed list of candidates, standing in for a live exam-board feed.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalogSource {
    candidates: Vec<CandidateExam>,
}

impl StaticCatalogSource {
    pub fn new(candidates: Vec<CandidateExam>) -> Self {
        Self { candidates }
    }

    /// Banking-sector notices for the 2026 recruitment cycle.
    pub fn banking_2026() -> Self {
        Self::new(vec![
            catalog_entry(
                "RBI Grade B 2026",
                "RBI",
                "Recruitment of Officers in Grade 'B' (General) - DR, DEPR and DSIM.",
                ((2026, 5, 1), (2026, 6, 1), (2026, 7, 15)),
                "https://rbi.org.in",
            ),
            catalog_entry(
                "SEBI Grade A 2026",
                "SEBI",
                "Securities and Exchange Board of India (SEBI) recruitment for Officer Grade A (Assistant Manager).",
                ((2026, 3, 15), (2026, 4, 15), (2026, 5, 20)),
                "https://sebi.gov.in",
            ),
            catalog_entry(
                "NABARD Grade A 2026",
                "NABARD",
                "Recruitment of Assistant Manager in Grade 'A' in the Rural Development Banking Service (RDBS).",
                ((2026, 7, 1), (2026, 8, 1), (2026, 9, 10)),
                "https://nabard.org",
            ),
        ])
    }
}

impl IngestionSource for StaticCatalogSource {
    fn list_candidate_exams(&self) -> Result<Vec<CandidateExam>, IngestionError> {
        Ok(self.candidates.clone())
    }
}

type Ymd = (i32, u32, u32);

fn catalog_entry(
    title: &str,
    organization: &str,
    description: &str,
    (start, end, exam): (Ymd, Ymd, Ymd),
    url: &str,
) -> CandidateExam {
    CandidateExam {
        title: Some(title.to_string()),
        organization: Some(organization.to_string()),
        category: Some("Banking".to_string()),
        description: Some(description.to_string()),
        application_start_date: midnight(start),
        application_end_date: midnight(end),
        exam_date: midnight(exam),
        notification_url: Some(url.to_string()),
        apply_url: Some(url.to_string()),
    }
}

fn midnight((year, month, day): Ymd) -> Option<DateTime<Utc>> {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
