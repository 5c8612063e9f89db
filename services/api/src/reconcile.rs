use crate::infra::{build_pipeline, parse_date, start_of_day};
use chrono::NaiveDate;
use clap::Args;
use exam_alerts::config::AppConfig;
use exam_alerts::error::AppError;
use exam_alerts::exams::{
    Clock, ExamRepository, ExamServiceError, ManualClock, ReconciliationReport, SystemClock,
};
use exam_alerts::telemetry;
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct ReconcileArgs {
    /// Evaluate statuses as of this date (YYYY-MM-DD, defaults to now)
    #[arg(long, value_parser = parse_date)]
    pub(crate) as_of: Option<NaiveDate>,
    /// Admit at most this many newly discovered exams (0 = unlimited)
    #[arg(long)]
    pub(crate) max_new_per_pass: Option<usize>,
    /// Emit the full report as JSON instead of one change per line
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) async fn run_reconcile(args: ReconcileArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;
    if let Some(limit) = args.max_new_per_pass {
        config.reconciler.max_new_exams_per_pass = (limit > 0).then_some(limit);
    }
    telemetry::init(&config.telemetry)?;

    let clock: Arc<dyn Clock> = match args.as_of {
        Some(date) => Arc::new(ManualClock::new(start_of_day(date))),
        None => Arc::new(SystemClock),
    };
    let (repository, scheduler) = build_pipeline(&config.reconciler, clock);

    let report = tokio::task::spawn_blocking(move || scheduler.trigger_now())
        .await
        .map_err(|err| AppError::Io(std::io::Error::other(err)))?
        .map_err(ExamServiceError::from)?;

    let exams = repository.list_exams(None).map_err(ExamServiceError::from)?;
    render_report(&report, exams.len(), args.json)
}

fn render_report(
    report: &ReconciliationReport,
    tracked_exams: usize,
    as_json: bool,
) -> Result<(), AppError> {
    if as_json {
        let rendered = serde_json::to_string_pretty(report)
            .map_err(|err| AppError::Io(std::io::Error::other(err)))?;
        println!("{rendered}");
        return Ok(());
    }

    println!("Exam update check ({})", report.started_at.format("%Y-%m-%d %H:%M UTC"));
    if report.changes.is_empty() {
        println!("  no changes");
    }
    for change in &report.changes {
        println!("  - {change}");
    }
    for failure in &report.failures {
        println!("  ! {} ({})", failure.change, failure.error);
    }
    println!("Tracked exams: {tracked_exams}");
    Ok(())
}
