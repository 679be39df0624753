//! Column-wise normalization of the raw matrix.
//!
//! SMART rescales each criterion column onto a `[0, 1]` utility with min-max
//! normalization, inverting cost criteria so that higher is always better.
//! MOORA divides each value by the Euclidean norm of its column and leaves the
//! benefit/cost distinction to aggregation. Degenerate columns (all values
//! equal for SMART, all zero for MOORA) normalize to `0.0`.

use serde::Serialize;

use super::domain::{Algorithm, CriterionId, CriterionKind, ProductId};
use super::matrix::CriteriaMatrix;

/// Column statistic a normalization strategy needs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum ColumnStatistics {
    MinMax { min: f64, max: f64 },
    Euclidean { norm: f64 },
}

impl ColumnStatistics {
    pub fn for_column(algorithm: Algorithm, values: &[f64]) -> Self {
        match algorithm {
            Algorithm::Smart => {
                let (min, max) = values
                    .iter()
                    .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), value| {
                        (min.min(*value), max.max(*value))
                    });
                if values.is_empty() {
                    Self::MinMax { min: 0.0, max: 0.0 }
                } else {
                    Self::MinMax { min, max }
                }
            }
            Algorithm::Moora => Self::Euclidean {
                norm: values.iter().map(|value| value * value).sum::<f64>().sqrt(),
            },
        }
    }

    pub fn normalize(self, value: f64, kind: CriterionKind) -> f64 {
        match self {
            Self::MinMax { min, max } => min_max_utility(value, min, max, kind),
            Self::Euclidean { norm } => vector_ratio(value, norm),
        }
    }
}

/// SMART utility of `value` within `[min, max]`.
pub fn min_max_utility(value: f64, min: f64, max: f64, kind: CriterionKind) -> f64 {
    let range = max - min;
    if range == 0.0 {
        return 0.0;
    }

    match kind {
        CriterionKind::Benefit => (value - min) / range,
        CriterionKind::Cost => (max - value) / range,
    }
}

/// MOORA ratio of `value` to its column norm.
pub fn vector_ratio(value: f64, norm: f64) -> f64 {
    if norm == 0.0 {
        0.0
    } else {
        value / norm
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NormalizedCell {
    pub product_id: ProductId,
    pub criterion_id: CriterionId,
    pub normalized_value: f64,
}

/// Normalizes every cell of `matrix`, product-major in ascending id order.
pub fn normalize_matrix(matrix: &CriteriaMatrix, algorithm: Algorithm) -> Vec<NormalizedCell> {
    let statistics: Vec<(CriterionId, CriterionKind, ColumnStatistics)> = matrix
        .criteria()
        .iter()
        .map(|criterion| {
            let column = matrix.column(criterion.id);
            (
                criterion.id,
                criterion.kind,
                ColumnStatistics::for_column(algorithm, &column),
            )
        })
        .collect();

    let mut cells = Vec::with_capacity(matrix.products().len() * statistics.len());
    for product in matrix.products() {
        for (criterion, kind, stats) in &statistics {
            cells.push(NormalizedCell {
                product_id: *product,
                criterion_id: *criterion,
                normalized_value: stats.normalize(matrix.value(*product, *criterion), *kind),
            });
        }
    }
    cells
}
