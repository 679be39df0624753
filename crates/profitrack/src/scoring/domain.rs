use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

identifier!(
    /// Identifies a scoring method (one SMART or MOORA configuration).
    MethodId
);
identifier!(ProductId);
identifier!(CriterionId);
identifier!(ReportId);
identifier!(ScoringRecordId);

/// Direction of a criterion: whether a higher raw value is better or worse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CriterionKind {
    Benefit,
    Cost,
}

impl CriterionKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Benefit => "benefit",
            Self::Cost => "cost",
        }
    }
}

impl FromStr for CriterionKind {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "benefit" => Ok(Self::Benefit),
            "cost" => Ok(Self::Cost),
            _ => Err(DomainError::UnknownCriterionKind(value.to_string())),
        }
    }
}

/// The two supported multi-criteria ranking algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    #[serde(alias = "SMART")]
    Smart,
    #[serde(alias = "MOORA")]
    Moora,
}

impl Algorithm {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Smart => "SMART",
            Self::Moora => "MOORA",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Algorithm {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "smart" => Ok(Self::Smart),
            "moora" => Ok(Self::Moora),
            _ => Err(DomainError::UnknownAlgorithm(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Method {
    pub id: MethodId,
    pub name: String,
}

/// Weighted ranking criterion. Construct through [`Criterion::new`] so the
/// weight range and name are validated once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Criterion {
    pub id: CriterionId,
    pub name: String,
    pub weight: f64,
    pub kind: CriterionKind,
}

impl Criterion {
    pub fn new(
        id: CriterionId,
        name: impl Into<String>,
        weight: f64,
        kind: CriterionKind,
    ) -> Result<Self, DomainError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::EmptyName);
        }
        if !(0.0..=1.0).contains(&weight) {
            return Err(DomainError::InvalidWeight { weight });
        }

        Ok(Self {
            id,
            name,
            weight,
            kind,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub purchase_cost: i64,
    pub price_sale: i64,
    pub profit: i64,
    pub stock: u32,
    pub sold: u32,
    pub category: String,
}

impl Product {
    /// Builds a product with `profit` derived from the sale price and purchase cost.
    pub fn new(
        id: ProductId,
        name: impl Into<String>,
        purchase_cost: i64,
        price_sale: i64,
        stock: u32,
        sold: u32,
        category: impl Into<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            purchase_cost,
            price_sale,
            profit: price_sale - purchase_cost,
            stock,
            sold,
            category: category.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawCriterionScore {
    pub product_id: ProductId,
    pub criterion_id: CriterionId,
    pub raw_value: f64,
}

/// Working row of a method run: one per (product, criterion).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringRecord {
    pub id: ScoringRecordId,
    pub product_id: ProductId,
    pub criterion_id: CriterionId,
    pub method_id: MethodId,
    pub normalized_value: f64,
    pub weighted_value: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NewScoringRecord {
    pub product_id: ProductId,
    pub criterion_id: CriterionId,
    pub method_id: MethodId,
    pub normalized_value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FinalScore {
    pub product_id: ProductId,
    pub method_id: MethodId,
    pub final_score: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub id: ReportId,
    pub method_id: MethodId,
    pub report_code: String,
    pub period: String,
    pub total_data: usize,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewReport {
    pub method_id: MethodId,
    pub report_code: String,
    pub period: String,
    pub total_data: usize,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportDetail {
    pub report_id: ReportId,
    pub product_id: ProductId,
    pub method_id: MethodId,
    pub final_score: f64,
    pub created_at: DateTime<Utc>,
}

/// Checkpoint a method run has reached. `Archived` is not represented: a
/// successful archive returns the run to `Empty`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Empty,
    Normalized,
    Weighted,
    Finalized,
}

impl PipelineStage {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Empty => "Empty",
            Self::Normalized => "Normalized",
            Self::Weighted => "Weighted",
            Self::Finalized => "Finalized",
        }
    }

    /// Whether `step` may run when the method sits at this stage.
    pub const fn accepts(self, step: PipelineStep) -> bool {
        matches!(
            (self, step),
            (Self::Empty, PipelineStep::Normalize)
                | (Self::Normalized, PipelineStep::Weight)
                | (Self::Weighted, PipelineStep::Aggregate)
                | (Self::Finalized, PipelineStep::Aggregate)
                | (Self::Finalized, PipelineStep::Archive)
        )
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStep {
    Normalize,
    Weight,
    Aggregate,
    Archive,
}

impl PipelineStep {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Normalize => "normalize",
            Self::Weight => "weight",
            Self::Aggregate => "aggregate",
            Self::Archive => "archive",
        }
    }

    /// Stage reached once this step completes.
    pub const fn target(self) -> PipelineStage {
        match self {
            Self::Normalize => PipelineStage::Normalized,
            Self::Weight => PipelineStage::Weighted,
            Self::Aggregate => PipelineStage::Finalized,
            Self::Archive => PipelineStage::Empty,
        }
    }
}

impl fmt::Display for PipelineStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Persisted "current stage" marker for a method run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageMarker {
    pub method_id: MethodId,
    pub stage: PipelineStage,
    pub algorithm: Algorithm,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DomainError {
    #[error("criterion type '{0}' is neither 'benefit' nor 'cost'")]
    UnknownCriterionKind(String),
    #[error("algorithm '{0}' is neither 'smart' nor 'moora'")]
    UnknownAlgorithm(String),
    #[error("criterion weight {weight} must lie between 0 and 1")]
    InvalidWeight { weight: f64 },
    #[error("name must not be empty")]
    EmptyName,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn criterion_kind_parses_case_insensitively() {
        assert_eq!(
            "Benefit".parse::<CriterionKind>(),
            Ok(CriterionKind::Benefit)
        );
        assert_eq!(" COST ".parse::<CriterionKind>(), Ok(CriterionKind::Cost));
        assert_eq!(
            "benefits".parse::<CriterionKind>(),
            Err(DomainError::UnknownCriterionKind("benefits".to_string()))
        );
    }

    #[test]
    fn criterion_rejects_out_of_range_weight() {
        let err = Criterion::new(CriterionId(1), "ROI", 1.2, CriterionKind::Benefit)
            .expect_err("weight above one");
        assert_eq!(err, DomainError::InvalidWeight { weight: 1.2 });

        let err = Criterion::new(CriterionId(1), "  ", 0.2, CriterionKind::Benefit)
            .expect_err("blank name");
        assert_eq!(err, DomainError::EmptyName);
    }

    #[test]
    fn product_derives_profit() {
        let product = Product::new(ProductId(4), "Kopi", 12_000, 15_500, 40, 32, "Drinks");
        assert_eq!(product.profit, 3_500);
    }

    #[test]
    fn algorithm_accepts_uppercase_aliases() {
        let parsed: Algorithm = serde_json::from_str("\"MOORA\"").expect("alias parses");
        assert_eq!(parsed, Algorithm::Moora);
        assert_eq!(
            serde_json::to_string(&Algorithm::Smart).expect("serializes"),
            "\"smart\""
        );
    }

    #[test]
    fn stage_machine_only_allows_forward_steps() {
        assert!(PipelineStage::Empty.accepts(PipelineStep::Normalize));
        assert!(!PipelineStage::Empty.accepts(PipelineStep::Aggregate));
        assert!(!PipelineStage::Normalized.accepts(PipelineStep::Normalize));
        assert!(!PipelineStage::Normalized.accepts(PipelineStep::Aggregate));
        assert!(PipelineStage::Weighted.accepts(PipelineStep::Aggregate));
        assert!(PipelineStage::Finalized.accepts(PipelineStep::Aggregate));
        assert!(PipelineStage::Finalized.accepts(PipelineStep::Archive));
        assert!(!PipelineStage::Weighted.accepts(PipelineStep::Archive));
        assert_eq!(PipelineStep::Archive.target(), PipelineStage::Empty);
    }
}
