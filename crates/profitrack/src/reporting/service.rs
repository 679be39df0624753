use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use tracing::info;

use super::views::{rank_details, ProductFinancials, RankedReport};
use crate::scoring::domain::{ProductId, Report, ReportId};
use crate::scoring::repository::{RepositoryError, ScoringBackend};

/// Read and delete access to archived reports.
pub struct ReportService<S> {
    store: Arc<S>,
}

impl<S> ReportService<S>
where
    S: ScoringBackend + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// All report headers, newest first.
    pub fn list_reports(&self) -> Result<Vec<Report>, ReportServiceError> {
        Ok(self.store.list_reports()?)
    }

    pub fn count_reports(&self) -> Result<usize, ReportServiceError> {
        Ok(self.store.count_reports()?)
    }

    /// Report header with its details ranked by final score.
    pub fn ranked_report(&self, id: ReportId) -> Result<RankedReport, ReportServiceError> {
        let report = self
            .store
            .report(id)?
            .ok_or(ReportServiceError::NotFound(id))?;
        let details = self.store.report_details(id)?;
        let method_name = self.store.method(report.method_id)?.map(|method| method.name);

        let products = details
            .iter()
            .map(|detail| detail.product_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(|id| {
                let found = self.store.product(id)?;
                Ok((id, found.as_ref().map(ProductFinancials::from)))
            })
            .collect::<Result<HashMap<ProductId, Option<ProductFinancials>>, RepositoryError>>()?;

        let entries = rank_details(details, |product| {
            products.get(&product).cloned().flatten()
        });

        Ok(RankedReport {
            report,
            method_name,
            entries,
        })
    }

    pub fn delete_report(&self, id: ReportId) -> Result<(), ReportServiceError> {
        match self.store.delete_report(id) {
            Ok(()) => {
                info!(report_id = %id, "deleted report");
                Ok(())
            }
            Err(RepositoryError::NotFound) => Err(ReportServiceError::NotFound(id)),
            Err(other) => Err(other.into()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReportServiceError {
    #[error("report {0} does not exist")]
    NotFound(ReportId),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
