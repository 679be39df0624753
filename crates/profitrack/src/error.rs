use crate::config::ConfigError;
use crate::reporting::ReportServiceError;
use crate::scoring::{DomainError, ImportError, RawScoreError, RepositoryError, ScoringError};
use crate::telemetry::TelemetryError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Scoring(ScoringError),
    RawScores(RawScoreError),
    Reports(ReportServiceError),
    Import(ImportError),
    Domain(DomainError),
    Store(RepositoryError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Scoring(err) => write!(f, "scoring error: {}", err),
            AppError::RawScores(err) => write!(f, "raw score error: {}", err),
            AppError::Reports(err) => write!(f, "report error: {}", err),
            AppError::Import(err) => write!(f, "import error: {}", err),
            AppError::Domain(err) => write!(f, "invalid data: {}", err),
            AppError::Store(err) => write!(f, "store error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Scoring(err) => Some(err),
            AppError::RawScores(err) => Some(err),
            AppError::Reports(err) => Some(err),
            AppError::Import(err) => Some(err),
            AppError::Domain(err) => Some(err),
            AppError::Store(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Import(_) | AppError::Domain(_) => StatusCode::BAD_REQUEST,
            AppError::Scoring(
                ScoringError::InvalidMethodReference(_) | ScoringError::NoFinalScores(_),
            )
            | AppError::Reports(ReportServiceError::NotFound(_)) => StatusCode::NOT_FOUND,
            AppError::Scoring(
                ScoringError::InvalidStageTransition { .. } | ScoringError::AlgorithmMismatch { .. },
            )
            | AppError::RawScores(RawScoreError::AlreadySeeded) => StatusCode::CONFLICT,
            AppError::Scoring(
                ScoringError::DataUnavailable(_) | ScoringError::CriteriaNotFound(_),
            )
            | AppError::RawScores(
                RawScoreError::DataUnavailable(_) | RawScoreError::UnknownMetric(_),
            ) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_)
            | AppError::Store(_)
            | AppError::Scoring(ScoringError::Persistence { .. })
            | AppError::RawScores(RawScoreError::Repository(_))
            | AppError::Reports(ReportServiceError::Repository(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<ScoringError> for AppError {
    fn from(value: ScoringError) -> Self {
        Self::Scoring(value)
    }
}

impl From<RawScoreError> for AppError {
    fn from(value: RawScoreError) -> Self {
        Self::RawScores(value)
    }
}

impl From<ReportServiceError> for AppError {
    fn from(value: ReportServiceError) -> Self {
        Self::Reports(value)
    }
}

impl From<ImportError> for AppError {
    fn from(value: ImportError) -> Self {
        Self::Import(value)
    }
}

impl From<DomainError> for AppError {
    fn from(value: DomainError) -> Self {
        Self::Domain(value)
    }
}

impl From<RepositoryError> for AppError {
    fn from(value: RepositoryError) -> Self {
        Self::Store(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::domain::{MethodId, PipelineStage, PipelineStep};

    #[test]
    fn maps_pipeline_failures_to_http_statuses() {
        let conflict = AppError::from(ScoringError::InvalidStageTransition {
            method: MethodId(1),
            current: PipelineStage::Empty,
            attempted: PipelineStep::Archive,
        });
        assert_eq!(conflict.into_response().status(), StatusCode::CONFLICT);

        let missing = AppError::from(ScoringError::InvalidMethodReference(MethodId(5)));
        assert_eq!(missing.into_response().status(), StatusCode::NOT_FOUND);

        let seeded = AppError::from(RawScoreError::AlreadySeeded);
        assert_eq!(seeded.into_response().status(), StatusCode::CONFLICT);
    }

    #[test]
    fn display_prefixes_the_failing_subsystem() {
        let err = AppError::from(ScoringError::NoFinalScores(MethodId(3)));
        assert_eq!(
            err.to_string(),
            "scoring error: method 3 has no final scores to archive"
        );
    }
}
