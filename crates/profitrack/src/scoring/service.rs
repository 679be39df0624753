use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use super::aggregation::{aggregate, apply_weights, OrphanedCriterion};
use super::archive::{report_details, report_header, ReportCodeGenerator};
use super::domain::{
    Algorithm, FinalScore, MethodId, NewScoringRecord, PipelineStage, PipelineStep, ProductId,
    ReportId, ScoringRecord, StageMarker,
};
use super::locks::MethodLocks;
use super::matrix::{CriteriaMatrix, MatrixError};
use super::normalizer::normalize_matrix;
use super::repository::{RepositoryError, ScoringBackend};
use crate::config::ScoringConfig;

/// Result of one pipeline operation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StageOutcome {
    pub method_id: MethodId,
    pub algorithm: Option<Algorithm>,
    pub stage: PipelineStage,
    /// Rows written or removed by the operation.
    pub affected: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_id: Option<ReportId>,
}

/// Where a method run currently sits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RunStatus {
    pub method_id: MethodId,
    pub stage: PipelineStage,
    pub algorithm: Option<Algorithm>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl RunStatus {
    fn from_marker(method: MethodId, marker: Option<StageMarker>) -> Self {
        match marker {
            Some(marker) => Self {
                method_id: method,
                stage: marker.stage,
                algorithm: Some(marker.algorithm),
                updated_at: Some(marker.updated_at),
            },
            None => Self {
                method_id: method,
                stage: PipelineStage::Empty,
                algorithm: None,
                updated_at: None,
            },
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ScoringError {
    #[error("scoring data unavailable: {0}")]
    DataUnavailable(#[from] MatrixError),
    #[error("criteria not found: {0}")]
    CriteriaNotFound(#[from] OrphanedCriterion),
    #[error("persistence failure while {context}: {source}")]
    Persistence {
        context: String,
        #[source]
        source: RepositoryError,
    },
    #[error("method {0} does not exist")]
    InvalidMethodReference(MethodId),
    #[error("method {method} is at stage {current}; cannot {attempted}")]
    InvalidStageTransition {
        method: MethodId,
        current: PipelineStage,
        attempted: PipelineStep,
    },
    #[error("method {method} was normalized with {expected}, not {requested}")]
    AlgorithmMismatch {
        method: MethodId,
        expected: Algorithm,
        requested: Algorithm,
    },
    #[error("method {0} has no final scores to archive")]
    NoFinalScores(MethodId),
}

trait PersistenceContext<T> {
    fn context(self, context: impl FnOnce() -> String) -> Result<T, ScoringError>;
}

impl<T> PersistenceContext<T> for Result<T, RepositoryError> {
    fn context(self, context: impl FnOnce() -> String) -> Result<T, ScoringError> {
        self.map_err(|source| ScoringError::Persistence {
            context: context(),
            source,
        })
    }
}

/// Drives the normalize → weight → aggregate → archive pipeline per method.
pub struct ScoringPipelineService<S> {
    store: Arc<S>,
    locks: MethodLocks,
    codes: ReportCodeGenerator,
    weight_tolerance: f64,
}

impl<S> ScoringPipelineService<S>
where
    S: ScoringBackend + 'static,
{
    pub fn new(store: Arc<S>, config: ScoringConfig) -> Self {
        Self {
            store,
            locks: MethodLocks::new(),
            codes: ReportCodeGenerator::new(config.report_prefix),
            weight_tolerance: config.weight_tolerance,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Loads the raw matrix and writes one normalized record per (product, criterion).
    pub fn run_normalization(
        &self,
        method: MethodId,
        algorithm: Algorithm,
    ) -> Result<StageOutcome, ScoringError> {
        self.ensure_method(method)?;
        self.locks
            .with_lock(method, || self.normalize_locked(method, algorithm))
    }

    pub fn run_weighting(
        &self,
        method: MethodId,
        algorithm: Algorithm,
    ) -> Result<StageOutcome, ScoringError> {
        self.ensure_method(method)?;
        self.locks
            .with_lock(method, || self.weight_locked(method, algorithm))
    }

    pub fn run_aggregation(
        &self,
        method: MethodId,
        algorithm: Algorithm,
    ) -> Result<StageOutcome, ScoringError> {
        self.ensure_method(method)?;
        self.locks
            .with_lock(method, || self.aggregate_locked(method, algorithm))
    }

    /// Weighting followed by aggregation under a single lock scope.
    pub fn run_weighting_and_aggregation(
        &self,
        method: MethodId,
        algorithm: Algorithm,
    ) -> Result<StageOutcome, ScoringError> {
        self.ensure_method(method)?;
        self.locks.with_lock(method, || {
            self.weight_locked(method, algorithm)?;
            self.aggregate_locked(method, algorithm)
        })
    }

    /// Normalization, weighting and aggregation in one call.
    pub fn run_full(
        &self,
        method: MethodId,
        algorithm: Algorithm,
    ) -> Result<StageOutcome, ScoringError> {
        self.ensure_method(method)?;
        self.locks.with_lock(method, || {
            self.normalize_locked(method, algorithm)?;
            self.weight_locked(method, algorithm)?;
            self.aggregate_locked(method, algorithm)
        })
    }

    /// Copies the final scores into a report, then purges the run's scratch state.
    pub fn archive_to_report(&self, method: MethodId) -> Result<StageOutcome, ScoringError> {
        self.ensure_method(method)?;
        self.locks.with_lock(method, || self.archive_locked(method))
    }

    /// Drops every scoring record, final score and the stage marker of `method`.
    pub fn discard_run(&self, method: MethodId) -> Result<StageOutcome, ScoringError> {
        self.ensure_method(method)?;
        self.locks.with_lock(method, || {
            let marker = self
                .store
                .stage_marker(method)
                .context(|| format!("reading stage of method {method}"))?;
            let records = self
                .store
                .delete_all_scoring_records(method)
                .context(|| format!("deleting scoring records of method {method}"))?;
            let scores = self
                .store
                .delete_final_scores(method)
                .context(|| format!("deleting final scores of method {method}"))?;
            self.store
                .clear_stage_marker(method)
                .context(|| format!("clearing stage of method {method}"))?;

            info!(
                method_id = %method,
                scoring_records = records,
                final_scores = scores,
                "discarded method run"
            );
            Ok(StageOutcome {
                method_id: method,
                algorithm: marker.map(|marker| marker.algorithm),
                stage: PipelineStage::Empty,
                affected: records + scores,
                report_id: None,
            })
        })
    }

    pub fn stage(&self, method: MethodId) -> Result<RunStatus, ScoringError> {
        self.ensure_method(method)?;
        let marker = self
            .store
            .stage_marker(method)
            .context(|| format!("reading stage of method {method}"))?;
        Ok(RunStatus::from_marker(method, marker))
    }

    pub fn scoring_records(&self, method: MethodId) -> Result<Vec<ScoringRecord>, ScoringError> {
        self.ensure_method(method)?;
        self.store
            .list_scoring_records(method)
            .context(|| format!("listing scoring records of method {method}"))
    }

    pub fn final_scores(&self, method: MethodId) -> Result<Vec<FinalScore>, ScoringError> {
        self.ensure_method(method)?;
        self.store
            .list_final_scores(method)
            .context(|| format!("listing final scores of method {method}"))
    }

    fn ensure_method(&self, method: MethodId) -> Result<(), ScoringError> {
        self.store
            .method(method)
            .context(|| format!("looking up method {method}"))?
            .map(|_| ())
            .ok_or(ScoringError::InvalidMethodReference(method))
    }

    /// Verifies `step` is legal from the persisted stage and that the run's
    /// algorithm (once fixed by normalization) matches `requested`.
    fn checkpoint(
        &self,
        method: MethodId,
        step: PipelineStep,
        requested: Option<Algorithm>,
    ) -> Result<Option<StageMarker>, ScoringError> {
        let marker = self
            .store
            .stage_marker(method)
            .context(|| format!("reading stage of method {method}"))?;
        let current = marker.map_or(PipelineStage::Empty, |marker| marker.stage);

        if !current.accepts(step) {
            return Err(ScoringError::InvalidStageTransition {
                method,
                current,
                attempted: step,
            });
        }

        if let (Some(marker), Some(requested)) = (marker, requested) {
            if marker.algorithm != requested {
                return Err(ScoringError::AlgorithmMismatch {
                    method,
                    expected: marker.algorithm,
                    requested,
                });
            }
        }

        Ok(marker)
    }

    fn advance(
        &self,
        method: MethodId,
        algorithm: Algorithm,
        step: PipelineStep,
    ) -> Result<PipelineStage, ScoringError> {
        let stage = step.target();
        self.store
            .save_stage_marker(StageMarker {
                method_id: method,
                stage,
                algorithm,
                updated_at: Utc::now(),
            })
            .context(|| format!("recording stage {stage} for method {method}"))?;
        Ok(stage)
    }

    fn product_context(&self, product: ProductId, action: &str) -> String {
        match self.store.product(product) {
            Ok(Some(found)) => format!("{action} for product {} ({})", found.id, found.name),
            _ => format!("{action} for product {product}"),
        }
    }

    fn load_matrix(&self) -> Result<CriteriaMatrix, ScoringError> {
        let criteria = self
            .store
            .list_criteria()
            .context(|| "listing criteria".to_string())?;
        let raw_scores = self
            .store
            .list_raw_scores()
            .context(|| "listing raw criterion scores".to_string())?;
        let matrix = CriteriaMatrix::build(criteria, &raw_scores)?;

        let total_weight = matrix.total_weight();
        if (total_weight - 1.0).abs() > self.weight_tolerance {
            warn!(
                total_weight,
                tolerance = self.weight_tolerance,
                "criterion weights do not sum to 1.0"
            );
        }

        Ok(matrix)
    }

    fn normalize_locked(
        &self,
        method: MethodId,
        algorithm: Algorithm,
    ) -> Result<StageOutcome, ScoringError> {
        self.checkpoint(method, PipelineStep::Normalize, None)?;
        let matrix = self.load_matrix()?;
        let cells = normalize_matrix(&matrix, algorithm);

        // leftovers of an aborted run are only purged once the loader succeeded
        let stale_records = self
            .store
            .delete_all_scoring_records(method)
            .context(|| format!("purging scoring records of method {method}"))?;
        let stale_scores = self
            .store
            .delete_final_scores(method)
            .context(|| format!("purging final scores of method {method}"))?;
        if stale_records + stale_scores > 0 {
            warn!(
                method_id = %method,
                stale_records,
                stale_scores,
                "purged leftovers of an incomplete run"
            );
        }

        for cell in &cells {
            self.store
                .create_scoring_record(NewScoringRecord {
                    product_id: cell.product_id,
                    criterion_id: cell.criterion_id,
                    method_id: method,
                    normalized_value: cell.normalized_value,
                })
                .context(|| self.product_context(cell.product_id, "writing normalized score"))?;
        }

        let stage = self.advance(method, algorithm, PipelineStep::Normalize)?;
        info!(
            method_id = %method,
            algorithm = algorithm.label(),
            products = matrix.products().len(),
            criteria = matrix.criteria().len(),
            records = cells.len(),
            "normalized raw matrix"
        );

        Ok(StageOutcome {
            method_id: method,
            algorithm: Some(algorithm),
            stage,
            affected: cells.len(),
            report_id: None,
        })
    }

    fn weight_locked(
        &self,
        method: MethodId,
        algorithm: Algorithm,
    ) -> Result<StageOutcome, ScoringError> {
        self.checkpoint(method, PipelineStep::Weight, Some(algorithm))?;
        let records = self
            .store
            .list_scoring_records(method)
            .context(|| format!("listing scoring records of method {method}"))?;
        let criteria = self
            .store
            .list_criteria()
            .context(|| "listing criteria".to_string())?;

        let weighted = apply_weights(&records, &criteria)?;
        for record in &weighted {
            self.store
                .update_scoring_record(method, record)
                .context(|| self.product_context(record.product_id, "writing weighted score"))?;
        }

        let stage = self.advance(method, algorithm, PipelineStep::Weight)?;
        info!(
            method_id = %method,
            algorithm = algorithm.label(),
            records = weighted.len(),
            "applied criterion weights"
        );

        Ok(StageOutcome {
            method_id: method,
            algorithm: Some(algorithm),
            stage,
            affected: weighted.len(),
            report_id: None,
        })
    }

    fn aggregate_locked(
        &self,
        method: MethodId,
        algorithm: Algorithm,
    ) -> Result<StageOutcome, ScoringError> {
        self.checkpoint(method, PipelineStep::Aggregate, Some(algorithm))?;
        let records = self
            .store
            .list_scoring_records(method)
            .context(|| format!("listing scoring records of method {method}"))?;
        let criteria = self
            .store
            .list_criteria()
            .context(|| "listing criteria".to_string())?;

        let scores = aggregate(method, algorithm, &records, &criteria)?;
        for score in &scores {
            self.store
                .upsert_final_score(*score)
                .context(|| self.product_context(score.product_id, "writing final score"))?;
        }

        let stage = self.advance(method, algorithm, PipelineStep::Aggregate)?;
        info!(
            method_id = %method,
            algorithm = algorithm.label(),
            products = scores.len(),
            "aggregated final scores"
        );

        Ok(StageOutcome {
            method_id: method,
            algorithm: Some(algorithm),
            stage,
            affected: scores.len(),
            report_id: None,
        })
    }

    fn archive_locked(&self, method: MethodId) -> Result<StageOutcome, ScoringError> {
        let scores = self
            .store
            .list_final_scores(method)
            .context(|| format!("listing final scores of method {method}"))?;
        if scores.is_empty() {
            return Err(ScoringError::NoFinalScores(method));
        }

        let Some(marker) = self.checkpoint(method, PipelineStep::Archive, None)? else {
            return Err(ScoringError::InvalidStageTransition {
                method,
                current: PipelineStage::Empty,
                attempted: PipelineStep::Archive,
            });
        };

        let now = Utc::now();
        let code = self.codes.next_code(marker.algorithm, now);
        let header =
            report_header(method, code, &scores, now).ok_or(ScoringError::NoFinalScores(method))?;
        let report = self
            .store
            .create_report(header)
            .context(|| format!("creating report for method {method}"))?;

        let details = report_details(&report, &scores);
        for detail in &details {
            self.store
                .create_report_detail(detail.clone())
                .context(|| self.product_context(detail.product_id, "writing report detail"))?;
        }

        self.store
            .delete_all_scoring_records(method)
            .context(|| format!("deleting scoring records of method {method}"))?;
        self.store
            .delete_final_scores(method)
            .context(|| format!("deleting final scores of method {method}"))?;
        self.store
            .clear_stage_marker(method)
            .context(|| format!("clearing stage of method {method}"))?;

        info!(
            method_id = %method,
            report_id = %report.id,
            report_code = %report.report_code,
            total_data = report.total_data,
            "archived final scores into report"
        );

        Ok(StageOutcome {
            method_id: method,
            algorithm: Some(marker.algorithm),
            stage: PipelineStep::Archive.target(),
            affected: details.len(),
            report_id: Some(report.id),
        })
    }
}
