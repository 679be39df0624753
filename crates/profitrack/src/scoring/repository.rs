use super::domain::{
    Criterion, CriterionId, FinalScore, Method, MethodId, NewReport, NewScoringRecord, Product,
    ProductId, RawCriterionScore, Report, ReportDetail, ReportId, ScoringRecord, StageMarker,
};

/// Read-only view of the criteria reference data.
pub trait CriteriaStore: Send + Sync {
    fn list_criteria(&self) -> Result<Vec<Criterion>, RepositoryError>;
    fn criterion(&self, id: CriterionId) -> Result<Option<Criterion>, RepositoryError>;
}

pub trait ProductStore: Send + Sync {
    fn list_products(&self) -> Result<Vec<Product>, RepositoryError>;
    fn product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;
}

pub trait MethodStore: Send + Sync {
    fn list_methods(&self) -> Result<Vec<Method>, RepositoryError>;
    fn method(&self, id: MethodId) -> Result<Option<Method>, RepositoryError>;
}

/// Source values shared by every method run.
pub trait RawScoreStore: Send + Sync {
    fn list_raw_scores(&self) -> Result<Vec<RawCriterionScore>, RepositoryError>;
    /// Inserts or replaces the row keyed by (product, criterion).
    fn upsert_raw_score(&self, score: RawCriterionScore) -> Result<(), RepositoryError>;
    fn delete_raw_scores_for_product(&self, id: ProductId) -> Result<usize, RepositoryError>;
}

/// Per-method scratch rows written by normalization and weighting.
pub trait ScoringStore: Send + Sync {
    fn list_scoring_records(&self, method: MethodId)
        -> Result<Vec<ScoringRecord>, RepositoryError>;
    fn create_scoring_record(
        &self,
        record: NewScoringRecord,
    ) -> Result<ScoringRecord, RepositoryError>;
    fn update_scoring_record(
        &self,
        method: MethodId,
        record: &ScoringRecord,
    ) -> Result<(), RepositoryError>;
    fn delete_all_scoring_records(&self, method: MethodId) -> Result<usize, RepositoryError>;
}

pub trait FinalScoreStore: Send + Sync {
    fn list_final_scores(&self, method: MethodId) -> Result<Vec<FinalScore>, RepositoryError>;
    /// Writes the score keyed by (product, method), replacing an earlier value.
    fn upsert_final_score(&self, score: FinalScore) -> Result<FinalScore, RepositoryError>;
    fn delete_final_scores(&self, method: MethodId) -> Result<usize, RepositoryError>;
}

/// Durable archive of completed runs.
pub trait ReportStore: Send + Sync {
    fn create_report(&self, header: NewReport) -> Result<Report, RepositoryError>;
    fn create_report_detail(&self, detail: ReportDetail) -> Result<(), RepositoryError>;
    fn list_reports(&self) -> Result<Vec<Report>, RepositoryError>;
    fn report(&self, id: ReportId) -> Result<Option<Report>, RepositoryError>;
    fn report_details(&self, id: ReportId) -> Result<Vec<ReportDetail>, RepositoryError>;
    fn count_reports(&self) -> Result<usize, RepositoryError>;
    /// Removes the header together with its details.
    fn delete_report(&self, id: ReportId) -> Result<(), RepositoryError>;
}

/// Persisted pipeline checkpoint per method.
pub trait StageStore: Send + Sync {
    fn stage_marker(&self, method: MethodId) -> Result<Option<StageMarker>, RepositoryError>;
    fn save_stage_marker(&self, marker: StageMarker) -> Result<(), RepositoryError>;
    fn clear_stage_marker(&self, method: MethodId) -> Result<(), RepositoryError>;
}

/// Everything the pipeline and reporting services need from storage.
pub trait ScoringBackend:
    CriteriaStore
    + ProductStore
    + MethodStore
    + RawScoreStore
    + ScoringStore
    + FinalScoreStore
    + ReportStore
    + StageStore
{
}

impl<T> ScoringBackend for T where
    T: CriteriaStore
        + ProductStore
        + MethodStore
        + RawScoreStore
        + ScoringStore
        + FinalScoreStore
        + ReportStore
        + StageStore
{
}

/// Error enumeration for repository failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
