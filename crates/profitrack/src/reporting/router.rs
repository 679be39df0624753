use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;

use super::service::{ReportService, ReportServiceError};
use crate::scoring::domain::ReportId;
use crate::scoring::repository::ScoringBackend;

/// Router builder exposing archived reports.
pub fn report_router<S>(service: Arc<ReportService<S>>) -> Router
where
    S: ScoringBackend + 'static,
{
    Router::new()
        .route("/api/v1/reports", get(list_handler::<S>))
        .route("/api/v1/reports/count", get(count_handler::<S>))
        .route(
            "/api/v1/reports/:report_id",
            get(detail_handler::<S>).delete(delete_handler::<S>),
        )
        .with_state(service)
}

fn error_response(error: ReportServiceError) -> Response {
    let status = match error {
        ReportServiceError::NotFound(_) => StatusCode::NOT_FOUND,
        ReportServiceError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let payload = json!({
        "error": error.to_string(),
    });
    (status, Json(payload)).into_response()
}

pub(crate) async fn list_handler<S>(State(service): State<Arc<ReportService<S>>>) -> Response
where
    S: ScoringBackend + 'static,
{
    match service.list_reports() {
        Ok(reports) => (StatusCode::OK, Json(reports)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn count_handler<S>(State(service): State<Arc<ReportService<S>>>) -> Response
where
    S: ScoringBackend + 'static,
{
    match service.count_reports() {
        Ok(total) => (StatusCode::OK, Json(json!({ "total": total }))).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn detail_handler<S>(
    State(service): State<Arc<ReportService<S>>>,
    Path(report_id): Path<u32>,
) -> Response
where
    S: ScoringBackend + 'static,
{
    match service.ranked_report(ReportId(report_id)) {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn delete_handler<S>(
    State(service): State<Arc<ReportService<S>>>,
    Path(report_id): Path<u32>,
) -> Response
where
    S: ScoringBackend + 'static,
{
    match service.delete_report(ReportId(report_id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}
