use serde::Serialize;

use crate::scoring::domain::{Product, ProductId, Report, ReportDetail};

/// Financial columns shown next to a ranked product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductFinancials {
    pub name: String,
    pub category: String,
    pub purchase_cost: i64,
    pub price_sale: i64,
    pub profit: i64,
    pub stock: u32,
    pub sold: u32,
}

impl From<&Product> for ProductFinancials {
    fn from(product: &Product) -> Self {
        Self {
            name: product.name.clone(),
            category: product.category.clone(),
            purchase_cost: product.purchase_cost,
            price_sale: product.price_sale,
            profit: product.profit,
            stock: product.stock,
            sold: product.sold,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedEntry {
    pub rank: usize,
    pub product_id: ProductId,
    pub final_score: f64,
    /// `None` once the product has been deleted.
    pub product: Option<ProductFinancials>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedReport {
    pub report: Report,
    pub method_name: Option<String>,
    pub entries: Vec<RankedEntry>,
}

impl RankedReport {
    pub fn leader(&self) -> Option<&RankedEntry> {
        self.entries.first()
    }
}

/// Orders details by final score, highest first, breaking ties by product id.
pub fn rank_details(
    mut details: Vec<ReportDetail>,
    lookup: impl Fn(ProductId) -> Option<ProductFinancials>,
) -> Vec<RankedEntry> {
    details.sort_by(|left, right| {
        right
            .final_score
            .total_cmp(&left.final_score)
            .then(left.product_id.cmp(&right.product_id))
    });

    details
        .into_iter()
        .enumerate()
        .map(|(index, detail)| RankedEntry {
            rank: index + 1,
            product_id: detail.product_id,
            final_score: detail.final_score,
            product: lookup(detail.product_id),
        })
        .collect()
}
