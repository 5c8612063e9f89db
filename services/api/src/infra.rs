use chrono::{DateTime, NaiveDate, Utc};
use exam_alerts::config::ReconcilerConfig;
use exam_alerts::exams::{
    Clock, ExamService, InMemoryExamRepository, ReconciliationScheduler, Reconciler,
    StaticCatalogSource,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

pub(crate) type ExamScheduler = ReconciliationScheduler<InMemoryExamRepository, StaticCatalogSource>;
pub(crate) type AppExamService = ExamService<InMemoryExamRepository, StaticCatalogSource>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) scheduler: Arc<ExamScheduler>,
}

/// Repository, reconciler and scheduler wired over the bundled banking catalog.
pub(crate) fn build_pipeline(
    config: &ReconcilerConfig,
    clock: Arc<dyn Clock>,
) -> (Arc<InMemoryExamRepository>, Arc<ExamScheduler>) {
    let repository = Arc::new(InMemoryExamRepository::with_clock(clock.clone()));
    let source = Arc::new(StaticCatalogSource::banking_2026());
    let reconciler = Reconciler::new(
        repository.clone(),
        source,
        clock,
        config.admission_policy(),
    );
    (repository, Arc::new(ReconciliationScheduler::new(reconciler)))
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

pub(crate) fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}
