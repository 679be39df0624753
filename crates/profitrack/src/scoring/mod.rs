//! SMART / MOORA scoring pipeline.
//!
//! A method run moves through `Empty → Normalized → Weighted → Finalized` and
//! is archived into a report, which returns it to `Empty`. Each step is its own
//! operation on [`ScoringPipelineService`], persisted between calls through the
//! store traits in [`repository`], and serialized per method by [`MethodLocks`].

pub mod aggregation;
pub mod archive;
pub mod domain;
pub mod financials;
pub mod import;
pub mod locks;
pub mod matrix;
pub mod memory;
pub mod normalizer;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
pub(crate) mod tests;

pub use domain::{
    Algorithm, Criterion, CriterionId, CriterionKind, DomainError, FinalScore, Method, MethodId,
    PipelineStage, PipelineStep, Product, ProductId, RawCriterionScore, Report, ReportDetail,
    ReportId, ScoringRecord,
};
pub use financials::{FinancialMetric, RawScoreError, RawScoreService, RawScoreSummary};
pub use import::{load_criteria_csv, load_products_csv, ImportError};
pub use locks::MethodLocks;
pub use memory::InMemoryStore;
pub use repository::{RepositoryError, ScoringBackend};
pub use router::{scoring_router, AlgorithmRequest};
pub use service::{RunStatus, ScoringError, ScoringPipelineService, StageOutcome};
