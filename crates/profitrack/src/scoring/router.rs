use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;

use super::domain::{Algorithm, MethodId, ProductId};
use super::financials::{RawScoreError, RawScoreService};
use super::repository::ScoringBackend;
use super::service::{ScoringError, ScoringPipelineService, StageOutcome};

/// Body accepted by every stage that needs to know the algorithm.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AlgorithmRequest {
    pub algorithm: Algorithm,
}

/// Router exposing the pipeline stages and the raw-score maintenance endpoints.
pub fn scoring_router<S>(
    pipeline: Arc<ScoringPipelineService<S>>,
    raw_scores: Arc<RawScoreService<S>>,
) -> Router
where
    S: ScoringBackend + 'static,
{
    let methods = Router::new()
        .route(
            "/api/v1/methods/:method_id/normalize",
            post(normalize_handler::<S>),
        )
        .route(
            "/api/v1/methods/:method_id/weighting",
            post(weighting_handler::<S>),
        )
        .route(
            "/api/v1/methods/:method_id/aggregate",
            post(aggregate_handler::<S>),
        )
        .route(
            "/api/v1/methods/:method_id/score",
            post(score_handler::<S>),
        )
        .route(
            "/api/v1/methods/:method_id/run",
            post(run_handler::<S>).delete(discard_handler::<S>),
        )
        .route(
            "/api/v1/methods/:method_id/archive",
            post(archive_handler::<S>),
        )
        .route("/api/v1/methods/:method_id/stage", get(stage_handler::<S>))
        .route(
            "/api/v1/methods/:method_id/scores",
            get(scoring_records_handler::<S>),
        )
        .route(
            "/api/v1/methods/:method_id/final-scores",
            get(final_scores_handler::<S>),
        )
        .with_state(pipeline);

    let raw = Router::new()
        .route(
            "/api/v1/raw-scores",
            post(seed_handler::<S>).put(refresh_handler::<S>),
        )
        .route(
            "/api/v1/raw-scores/products/:product_id",
            axum::routing::delete(delete_raw_scores_handler::<S>),
        )
        .with_state(raw_scores);

    methods.merge(raw)
}

fn error_payload(status: StatusCode, message: String) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

pub(crate) fn scoring_error_response(error: ScoringError) -> Response {
    let status = match &error {
        ScoringError::InvalidMethodReference(_) | ScoringError::NoFinalScores(_) => {
            StatusCode::NOT_FOUND
        }
        ScoringError::InvalidStageTransition { .. } | ScoringError::AlgorithmMismatch { .. } => {
            StatusCode::CONFLICT
        }
        ScoringError::DataUnavailable(_) | ScoringError::CriteriaNotFound(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        ScoringError::Persistence { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_payload(status, error.to_string())
}

/// Runs a locking stage on the blocking pool so a request waiting on the
/// method lock never stalls a runtime worker.
async fn stage_response<S, F>(
    service: Arc<ScoringPipelineService<S>>,
    success: StatusCode,
    stage: F,
) -> Response
where
    S: ScoringBackend + 'static,
    F: FnOnce(&ScoringPipelineService<S>) -> Result<StageOutcome, ScoringError> + Send + 'static,
{
    match tokio::task::spawn_blocking(move || stage(&service)).await {
        Ok(Ok(outcome)) => (success, Json(outcome)).into_response(),
        Ok(Err(error)) => scoring_error_response(error),
        Err(join_error) => {
            error!(%join_error, "pipeline stage task did not complete");
            error_payload(
                StatusCode::INTERNAL_SERVER_ERROR,
                "pipeline stage task did not complete".to_string(),
            )
        }
    }
}

pub(crate) async fn normalize_handler<S>(
    State(service): State<Arc<ScoringPipelineService<S>>>,
    Path(method_id): Path<u32>,
    Json(request): Json<AlgorithmRequest>,
) -> Response
where
    S: ScoringBackend + 'static,
{
    let (method, algorithm) = (MethodId(method_id), request.algorithm);
    stage_response(service, StatusCode::CREATED, move |pipeline| {
        pipeline.run_normalization(method, algorithm)
    })
    .await
}

pub(crate) async fn weighting_handler<S>(
    State(service): State<Arc<ScoringPipelineService<S>>>,
    Path(method_id): Path<u32>,
    Json(request): Json<AlgorithmRequest>,
) -> Response
where
    S: ScoringBackend + 'static,
{
    let (method, algorithm) = (MethodId(method_id), request.algorithm);
    stage_response(service, StatusCode::OK, move |pipeline| {
        pipeline.run_weighting(method, algorithm)
    })
    .await
}

pub(crate) async fn aggregate_handler<S>(
    State(service): State<Arc<ScoringPipelineService<S>>>,
    Path(method_id): Path<u32>,
    Json(request): Json<AlgorithmRequest>,
) -> Response
where
    S: ScoringBackend + 'static,
{
    let (method, algorithm) = (MethodId(method_id), request.algorithm);
    stage_response(service, StatusCode::OK, move |pipeline| {
        pipeline.run_aggregation(method, algorithm)
    })
    .await
}

pub(crate) async fn score_handler<S>(
    State(service): State<Arc<ScoringPipelineService<S>>>,
    Path(method_id): Path<u32>,
    Json(request): Json<AlgorithmRequest>,
) -> Response
where
    S: ScoringBackend + 'static,
{
    let (method, algorithm) = (MethodId(method_id), request.algorithm);
    stage_response(service, StatusCode::OK, move |pipeline| {
        pipeline.run_weighting_and_aggregation(method, algorithm)
    })
    .await
}

pub(crate) async fn run_handler<S>(
    State(service): State<Arc<ScoringPipelineService<S>>>,
    Path(method_id): Path<u32>,
    Json(request): Json<AlgorithmRequest>,
) -> Response
where
    S: ScoringBackend + 'static,
{
    let (method, algorithm) = (MethodId(method_id), request.algorithm);
    stage_response(service, StatusCode::OK, move |pipeline| {
        pipeline.run_full(method, algorithm)
    })
    .await
}

pub(crate) async fn archive_handler<S>(
    State(service): State<Arc<ScoringPipelineService<S>>>,
    Path(method_id): Path<u32>,
) -> Response
where
    S: ScoringBackend + 'static,
{
    let method = MethodId(method_id);
    stage_response(service, StatusCode::CREATED, move |pipeline| {
        pipeline.archive_to_report(method)
    })
    .await
}

pub(crate) async fn discard_handler<S>(
    State(service): State<Arc<ScoringPipelineService<S>>>,
    Path(method_id): Path<u32>,
) -> Response
where
    S: ScoringBackend + 'static,
{
    let method = MethodId(method_id);
    stage_response(service, StatusCode::OK, move |pipeline| {
        pipeline.discard_run(method)
    })
    .await
}

pub(crate) async fn stage_handler<S>(
    State(service): State<Arc<ScoringPipelineService<S>>>,
    Path(method_id): Path<u32>,
) -> Response
where
    S: ScoringBackend + 'static,
{
    match service.stage(MethodId(method_id)) {
        Ok(status) => (StatusCode::OK, Json(status)).into_response(),
        Err(error) => scoring_error_response(error),
    }
}

pub(crate) async fn scoring_records_handler<S>(
    State(service): State<Arc<ScoringPipelineService<S>>>,
    Path(method_id): Path<u32>,
) -> Response
where
    S: ScoringBackend + 'static,
{
    match service.scoring_records(MethodId(method_id)) {
        Ok(records) => (StatusCode::OK, Json(records)).into_response(),
        Err(error) => scoring_error_response(error),
    }
}

pub(crate) async fn final_scores_handler<S>(
    State(service): State<Arc<ScoringPipelineService<S>>>,
    Path(method_id): Path<u32>,
) -> Response
where
    S: ScoringBackend + 'static,
{
    match service.final_scores(MethodId(method_id)) {
        Ok(scores) => (StatusCode::OK, Json(scores)).into_response(),
        Err(error) => scoring_error_response(error),
    }
}

fn raw_score_error_response(error: RawScoreError) -> Response {
    let status = match &error {
        RawScoreError::AlreadySeeded => StatusCode::CONFLICT,
        RawScoreError::DataUnavailable(_) | RawScoreError::UnknownMetric(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        RawScoreError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_payload(status, error.to_string())
}

pub(crate) async fn seed_handler<S>(State(service): State<Arc<RawScoreService<S>>>) -> Response
where
    S: ScoringBackend + 'static,
{
    match service.seed() {
        Ok(summary) => (StatusCode::CREATED, Json(summary)).into_response(),
        Err(error) => raw_score_error_response(error),
    }
}

pub(crate) async fn refresh_handler<S>(
    State(service): State<Arc<RawScoreService<S>>>,
) -> Response
where
    S: ScoringBackend + 'static,
{
    match service.refresh() {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(error) => raw_score_error_response(error),
    }
}

pub(crate) async fn delete_raw_scores_handler<S>(
    State(service): State<Arc<RawScoreService<S>>>,
    Path(product_id): Path<u32>,
) -> Response
where
    S: ScoringBackend + 'static,
{
    let product = ProductId(product_id);
    match service.delete_for_product(product) {
        Ok(deleted) => (
            StatusCode::OK,
            Json(json!({ "product_id": product, "deleted": deleted })),
        )
            .into_response(),
        Err(error) => raw_score_error_response(error),
    }
}
