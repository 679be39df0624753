//! Derives raw criterion scores from product financials.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use super::domain::{Criterion, CriterionId, Product, ProductId, RawCriterionScore};
use super::repository::{RepositoryError, ScoringBackend};

/// Financial ratio a criterion name maps onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FinancialMetric {
    ReturnOnInvestment,
    NetProfitMargin,
    EfficiencyRatio,
}

impl FinancialMetric {
    pub const fn label(self) -> &'static str {
        match self {
            Self::ReturnOnInvestment => "Return On Investment",
            Self::NetProfitMargin => "Net Profit Margin",
            Self::EfficiencyRatio => "Efficiency Ratio",
        }
    }

    pub fn ordered() -> [Self; 3] {
        [
            Self::ReturnOnInvestment,
            Self::NetProfitMargin,
            Self::EfficiencyRatio,
        ]
    }

    /// Raw value for `product`; a zero denominator yields `0.0`, as does the
    /// efficiency ratio of a product with zero profit.
    pub fn compute(self, product: &Product) -> f64 {
        let purchase_cost = product.purchase_cost as f64;
        let price_sale = product.price_sale as f64;
        let profit = product.profit as f64;
        let stock = f64::from(product.stock);
        let sold = f64::from(product.sold);

        match self {
            Self::ReturnOnInvestment => ratio(profit * sold, purchase_cost * stock),
            Self::NetProfitMargin => ratio(profit * sold, price_sale * sold),
            // break-even products carry no efficiency signal
            Self::EfficiencyRatio if product.profit == 0 => 0.0,
            Self::EfficiencyRatio => ratio(purchase_cost * sold, sold * price_sale),
        }
    }
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

impl fmt::Display for FinancialMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for FinancialMetric {
    type Err = RawScoreError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.split_whitespace().collect::<Vec<_>>().join(" ");
        match normalized.to_ascii_lowercase().as_str() {
            "return on investment" | "roi" => Ok(Self::ReturnOnInvestment),
            "net profit margin" | "npm" => Ok(Self::NetProfitMargin),
            "efficiency ratio" | "efficiency" | "rasio efisiensi" => Ok(Self::EfficiencyRatio),
            _ => Err(RawScoreError::UnknownMetric(value.to_string())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RawScoreError {
    #[error("no {0} available to derive raw scores from")]
    DataUnavailable(&'static str),
    #[error("raw scores already exist; refresh them instead")]
    AlreadySeeded,
    #[error("criterion '{0}' does not map to a known financial metric")]
    UnknownMetric(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Counts reported by seeding and refreshing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RawScoreSummary {
    pub products: usize,
    pub criteria: usize,
    pub written: usize,
}

/// Seeds and maintains the method-agnostic raw-score set.
pub struct RawScoreService<S> {
    store: Arc<S>,
}

impl<S> RawScoreService<S>
where
    S: ScoringBackend + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Computes one raw score per (product, criterion); refuses when scores exist.
    pub fn seed(&self) -> Result<RawScoreSummary, RawScoreError> {
        if !self.store.list_raw_scores()?.is_empty() {
            return Err(RawScoreError::AlreadySeeded);
        }
        self.write_all("seeded raw criterion scores")
    }

    /// Recomputes every (product, criterion) pair, filling the missing ones.
    pub fn refresh(&self) -> Result<RawScoreSummary, RawScoreError> {
        self.write_all("refreshed raw criterion scores")
    }

    pub fn delete_for_product(&self, product: ProductId) -> Result<usize, RawScoreError> {
        let removed = self.store.delete_raw_scores_for_product(product)?;
        info!(product_id = %product, removed, "deleted raw criterion scores");
        Ok(removed)
    }

    fn write_all(&self, message: &'static str) -> Result<RawScoreSummary, RawScoreError> {
        let products = self.store.list_products()?;
        if products.is_empty() {
            return Err(RawScoreError::DataUnavailable("products"));
        }
        let criteria = self.store.list_criteria()?;
        if criteria.is_empty() {
            return Err(RawScoreError::DataUnavailable("criteria"));
        }

        let metrics = resolve_metrics(&criteria)?;
        let mut written = 0;
        for product in &products {
            for (criterion_id, metric) in &metrics {
                self.store.upsert_raw_score(RawCriterionScore {
                    product_id: product.id,
                    criterion_id: *criterion_id,
                    raw_value: metric.compute(product),
                })?;
                written += 1;
            }
        }

        info!(
            products = products.len(),
            criteria = criteria.len(),
            written,
            "{message}"
        );
        Ok(RawScoreSummary {
            products: products.len(),
            criteria: criteria.len(),
            written,
        })
    }
}

fn resolve_metrics(
    criteria: &[Criterion],
) -> Result<Vec<(CriterionId, FinancialMetric)>, RawScoreError> {
    criteria
        .iter()
        .map(|criterion| Ok((criterion.id, criterion.name.parse::<FinancialMetric>()?)))
        .collect()
}
