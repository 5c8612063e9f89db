use crate::cli::ServeArgs;
use crate::infra::{build_pipeline, AppState};
use crate::routes::with_exam_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use exam_alerts::config::AppConfig;
use exam_alerts::error::AppError;
use exam_alerts::exams::{ExamService, SystemClock};
use exam_alerts::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }
    if let Some(interval_secs) = args.interval_secs.take() {
        config.reconciler.interval_secs = interval_secs;
    }
    if let Some(limit) = args.max_new_per_pass.take() {
        config.reconciler.max_new_exams_per_pass = (limit > 0).then_some(limit);
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));

    let (repository, scheduler) = build_pipeline(&config.reconciler, Arc::new(SystemClock));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        scheduler: scheduler.clone(),
    };
    let exam_service = Arc::new(ExamService::new(repository, scheduler.clone()));

    let app = with_exam_routes(exam_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    let schedule = scheduler.start(config.reconciler.interval());
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        interval_secs = config.reconciler.interval_secs,
        max_new_per_pass = ?config.reconciler.max_new_exams_per_pass,
        "exam alert service ready"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    readiness_flag.store(false, Ordering::Release);
    schedule.stop().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "unable to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
