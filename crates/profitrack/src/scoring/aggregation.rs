use std::collections::{BTreeMap, HashMap};

use super::domain::{
    Algorithm, Criterion, CriterionId, CriterionKind, FinalScore, MethodId, ProductId,
    ScoringRecord,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("criterion {criterion_id} referenced by product {product_id} is not defined")]
pub struct OrphanedCriterion {
    pub criterion_id: CriterionId,
    pub product_id: ProductId,
}

fn criteria_index(criteria: &[Criterion]) -> HashMap<CriterionId, &Criterion> {
    criteria
        .iter()
        .map(|criterion| (criterion.id, criterion))
        .collect()
}

/// Returns copies of `records` with `weighted_value = normalized_value × weight`.
///
/// Every criterion is resolved before anything is produced, so an orphaned
/// reference yields no partial output.
pub fn apply_weights(
    records: &[ScoringRecord],
    criteria: &[Criterion],
) -> Result<Vec<ScoringRecord>, OrphanedCriterion> {
    let index = criteria_index(criteria);

    records
        .iter()
        .map(|record| {
            let criterion = index
                .get(&record.criterion_id)
                .ok_or(OrphanedCriterion {
                    criterion_id: record.criterion_id,
                    product_id: record.product_id,
                })?;
            let mut weighted = record.clone();
            weighted.weighted_value = record.normalized_value * criterion.weight;
            Ok(weighted)
        })
        .collect()
}

/// Per-product running sums split by criterion direction.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct ProductTotals {
    pub benefit: f64,
    pub cost: f64,
}

impl ProductTotals {
    pub fn score(self, algorithm: Algorithm) -> f64 {
        match algorithm {
            // cost criteria were already inverted during normalization
            Algorithm::Smart => self.benefit + self.cost,
            Algorithm::Moora => self.benefit - self.cost,
        }
    }
}

pub fn product_totals(
    records: &[ScoringRecord],
    criteria: &[Criterion],
) -> Result<BTreeMap<ProductId, ProductTotals>, OrphanedCriterion> {
    let index = criteria_index(criteria);
    let mut totals: BTreeMap<ProductId, ProductTotals> = BTreeMap::new();

    for record in records {
        let criterion = index
            .get(&record.criterion_id)
            .ok_or(OrphanedCriterion {
                criterion_id: record.criterion_id,
                product_id: record.product_id,
            })?;
        let entry = totals.entry(record.product_id).or_default();
        match criterion.kind {
            CriterionKind::Benefit => entry.benefit += record.weighted_value,
            CriterionKind::Cost => entry.cost += record.weighted_value,
        }
    }

    Ok(totals)
}

/// Collapses weighted records into one final score per product, ascending by id.
pub fn aggregate(
    method: MethodId,
    algorithm: Algorithm,
    records: &[ScoringRecord],
    criteria: &[Criterion],
) -> Result<Vec<FinalScore>, OrphanedCriterion> {
    Ok(product_totals(records, criteria)?
        .into_iter()
        .map(|(product_id, totals)| FinalScore {
            product_id,
            method_id: method,
            final_score: totals.score(algorithm),
        })
        .collect())
}
