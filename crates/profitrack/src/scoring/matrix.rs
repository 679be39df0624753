//! Assembles the (product × criterion) raw value matrix shared by every method.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};

use tracing::warn;

use super::domain::{Criterion, CriterionId, CriterionKind, ProductId, RawCriterionScore};

/// Dense raw matrix with rows ordered by product id and columns by criterion id.
#[derive(Debug, Clone, PartialEq)]
pub struct CriteriaMatrix {
    products: Vec<ProductId>,
    criteria: Vec<Criterion>,
    cells: BTreeMap<(ProductId, CriterionId), f64>,
}

/// Raised when the matrix cannot be built.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MatrixError {
    #[error("no criteria are defined")]
    NoCriteria,
    #[error("no raw criterion scores are available")]
    NoRawScores,
}

impl CriteriaMatrix {
    /// Builds the matrix from the criteria set and the raw-score set.
    ///
    /// Rows are the distinct products present in `raw_scores`. A cell missing
    /// for a (product, criterion) pair reads as `0.0`. Raw scores pointing at
    /// criteria outside `criteria` are skipped, and only the first value of a
    /// duplicated pair is kept.
    pub fn build(
        criteria: Vec<Criterion>,
        raw_scores: &[RawCriterionScore],
    ) -> Result<Self, MatrixError> {
        if criteria.is_empty() {
            return Err(MatrixError::NoCriteria);
        }
        if raw_scores.is_empty() {
            return Err(MatrixError::NoRawScores);
        }

        let mut criteria = criteria;
        criteria.sort_by_key(|criterion| criterion.id);
        let known: BTreeSet<CriterionId> = criteria.iter().map(|criterion| criterion.id).collect();

        let mut products = BTreeSet::new();
        let mut cells = BTreeMap::new();
        for score in raw_scores {
            products.insert(score.product_id);
            if !known.contains(&score.criterion_id) {
                warn!(
                    product_id = %score.product_id,
                    criterion_id = %score.criterion_id,
                    "raw score references an unknown criterion; ignoring"
                );
                continue;
            }
            match cells.entry((score.product_id, score.criterion_id)) {
                Entry::Vacant(slot) => {
                    slot.insert(score.raw_value);
                }
                Entry::Occupied(_) => warn!(
                    product_id = %score.product_id,
                    criterion_id = %score.criterion_id,
                    "duplicate raw score; keeping the first value"
                ),
            }
        }

        Ok(Self {
            products: products.into_iter().collect(),
            criteria,
            cells,
        })
    }

    pub fn products(&self) -> &[ProductId] {
        &self.products
    }

    pub fn criteria(&self) -> &[Criterion] {
        &self.criteria
    }

    pub fn kind(&self, criterion: CriterionId) -> Option<CriterionKind> {
        self.criteria
            .iter()
            .find(|candidate| candidate.id == criterion)
            .map(|candidate| candidate.kind)
    }

    pub fn value(&self, product: ProductId, criterion: CriterionId) -> f64 {
        self.cells
            .get(&(product, criterion))
            .copied()
            .unwrap_or(0.0)
    }

    /// Raw values of one criterion across all products, in product order.
    pub fn column(&self, criterion: CriterionId) -> Vec<f64> {
        self.products
            .iter()
            .map(|product| self.value(*product, criterion))
            .collect()
    }

    /// Sum of the criterion weights; expected (not required) to be 1.0.
    pub fn total_weight(&self) -> f64 {
        self.criteria.iter().map(|criterion| criterion.weight).sum()
    }
}
