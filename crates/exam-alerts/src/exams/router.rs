use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde_json::json;
use tracing::error;

use crate::error::AppError;

use super::domain::{ExamFilter, ExamId, ExamPatch, NewExam};
use super::ingestion::IngestionSource;
use super::repository::ExamRepository;
use super::service::{ExamService, ExamServiceError};

/// Router builder exposing exam listing, administrative edits, and the manual
/// "check for updates now" trigger.
pub fn exam_router<R, S>(service: Arc<ExamService<R, S>>) -> Router
where
    R: ExamRepository + 'static,
    S: IngestionSource + 'static,
{
    Router::new()
        .route(
            "/api/exams",
            get(list_handler::<R, S>).post(create_handler::<R, S>),
        )
        .route(
            "/api/exams/:exam_id",
            get(get_handler::<R, S>).put(update_handler::<R, S>),
        )
        .route("/api/notifications", get(notifications_handler::<R, S>))
        .route("/api/admin/trigger-update", post(trigger_handler::<R, S>))
        .with_state(service)
}

pub(crate) async fn list_handler<R, S>(
    State(service): State<Arc<ExamService<R, S>>>,
    Query(filter): Query<ExamFilter>,
) -> Response
where
    R: ExamRepository + 'static,
    S: IngestionSource + 'static,
{
    match service.list(&filter) {
        Ok(exams) => (StatusCode::OK, axum::Json(exams)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn get_handler<R, S>(
    State(service): State<Arc<ExamService<R, S>>>,
    Path(exam_id): Path<u64>,
) -> Response
where
    R: ExamRepository + 'static,
    S: IngestionSource + 'static,
{
    match service.get(ExamId(exam_id)) {
        Ok(exam) => (StatusCode::OK, axum::Json(exam)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn create_handler<R, S>(
    State(service): State<Arc<ExamService<R, S>>>,
    axum::Json(exam): axum::Json<NewExam>,
) -> Response
where
    R: ExamRepository + 'static,
    S: IngestionSource + 'static,
{
    match service.create(exam) {
        Ok(exam) => (StatusCode::CREATED, axum::Json(exam)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn update_handler<R, S>(
    State(service): State<Arc<ExamService<R, S>>>,
    Path(exam_id): Path<u64>,
    axum::Json(patch): axum::Json<ExamPatch>,
) -> Response
where
    R: ExamRepository + 'static,
    S: IngestionSource + 'static,
{
    match service.update(ExamId(exam_id), patch) {
        Ok(exam) => (StatusCode::OK, axum::Json(exam)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn notifications_handler<R, S>(
    State(service): State<Arc<ExamService<R, S>>>,
) -> Response
where
    R: ExamRepository + 'static,
    S: IngestionSource + 'static,
{
    match service.notifications() {
        Ok(notifications) => (StatusCode::OK, axum::Json(notifications)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn trigger_handler<R, S>(
    State(service): State<Arc<ExamService<R, S>>>,
) -> Response
where
    R: ExamRepository + 'static,
    S: IngestionSource + 'static,
{
    let outcome = tokio::task::spawn_blocking(move || service.trigger_reconciliation()).await;
    match outcome {
        Ok(Ok(report)) => {
            let payload = json!({
                "message": "Update check completed",
                "changes": report.changes,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Ok(Err(err)) => error_response(err),
        Err(join_error) => {
            error!(error = %join_error, "reconciliation task failed");
            let payload = json!({ "error": "failed to trigger update" });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

fn error_response(err: ExamServiceError) -> Response {
    AppError::from(err).into_response()
}
