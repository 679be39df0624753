use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;

use super::domain::{
    Criterion, CriterionId, FinalScore, Method, MethodId, NewReport, NewScoringRecord, Product,
    ProductId, RawCriterionScore, Report, ReportDetail, ReportId, ScoringRecord, ScoringRecordId,
    StageMarker,
};
use super::repository::{
    CriteriaStore, FinalScoreStore, MethodStore, ProductStore, RawScoreStore, ReportStore,
    RepositoryError, ScoringStore, StageStore,
};

#[derive(Debug, Default)]
struct MemoryState {
    methods: BTreeMap<MethodId, Method>,
    criteria: BTreeMap<CriterionId, Criterion>,
    products: BTreeMap<ProductId, Product>,
    raw_scores: BTreeMap<(ProductId, CriterionId), RawCriterionScore>,
    scoring_records: BTreeMap<ScoringRecordId, ScoringRecord>,
    final_scores: BTreeMap<(MethodId, ProductId), FinalScore>,
    reports: BTreeMap<ReportId, Report>,
    report_details: Vec<ReportDetail>,
    stages: BTreeMap<MethodId, StageMarker>,
    next_scoring_record: u32,
    next_report: u32,
}

/// Process-local backend implementing every store trait. Clones share state.
#[derive(Debug, Default, Clone)]
pub struct InMemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryStore {
    fn state(&self) -> Result<MutexGuard<'_, MemoryState>, RepositoryError> {
        self.state
            .lock()
            .map_err(|_| RepositoryError::Unavailable("store mutex poisoned".to_string()))
    }

    pub fn insert_method(&self, method: Method) -> Result<(), RepositoryError> {
        let mut state = self.state()?;
        if state.methods.contains_key(&method.id) {
            return Err(RepositoryError::Conflict);
        }
        state.methods.insert(method.id, method);
        Ok(())
    }

    pub fn insert_criterion(&self, criterion: Criterion) -> Result<(), RepositoryError> {
        let mut state = self.state()?;
        if state.criteria.contains_key(&criterion.id)
            || state
                .criteria
                .values()
                .any(|existing| existing.name.eq_ignore_ascii_case(&criterion.name))
        {
            return Err(RepositoryError::Conflict);
        }
        state.criteria.insert(criterion.id, criterion);
        Ok(())
    }

    /// Drops a criterion definition; existing scoring rows keep referencing it.
    pub fn remove_criterion(&self, id: CriterionId) -> Result<Criterion, RepositoryError> {
        self.state()?
            .criteria
            .remove(&id)
            .ok_or(RepositoryError::NotFound)
    }

    pub fn insert_product(&self, product: Product) -> Result<(), RepositoryError> {
        let mut state = self.state()?;
        if state.products.contains_key(&product.id) {
            return Err(RepositoryError::Conflict);
        }
        state.products.insert(product.id, product);
        Ok(())
    }
}

impl CriteriaStore for InMemoryStore {
    fn list_criteria(&self) -> Result<Vec<Criterion>, RepositoryError> {
        Ok(self.state()?.criteria.values().cloned().collect())
    }

    fn criterion(&self, id: CriterionId) -> Result<Option<Criterion>, RepositoryError> {
        Ok(self.state()?.criteria.get(&id).cloned())
    }
}

impl ProductStore for InMemoryStore {
    fn list_products(&self) -> Result<Vec<Product>, RepositoryError> {
        Ok(self.state()?.products.values().cloned().collect())
    }

    fn product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self.state()?.products.get(&id).cloned())
    }
}

impl MethodStore for InMemoryStore {
    fn list_methods(&self) -> Result<Vec<Method>, RepositoryError> {
        Ok(self.state()?.methods.values().cloned().collect())
    }

    fn method(&self, id: MethodId) -> Result<Option<Method>, RepositoryError> {
        Ok(self.state()?.methods.get(&id).cloned())
    }
}

impl RawScoreStore for InMemoryStore {
    fn list_raw_scores(&self) -> Result<Vec<RawCriterionScore>, RepositoryError> {
        Ok(self.state()?.raw_scores.values().copied().collect())
    }

    fn upsert_raw_score(&self, score: RawCriterionScore) -> Result<(), RepositoryError> {
        self.state()?
            .raw_scores
            .insert((score.product_id, score.criterion_id), score);
        Ok(())
    }

    fn delete_raw_scores_for_product(&self, id: ProductId) -> Result<usize, RepositoryError> {
        let mut state = self.state()?;
        let before = state.raw_scores.len();
        state.raw_scores.retain(|(product, _), _| *product != id);
        Ok(before - state.raw_scores.len())
    }
}

impl ScoringStore for InMemoryStore {
    fn list_scoring_records(
        &self,
        method: MethodId,
    ) -> Result<Vec<ScoringRecord>, RepositoryError> {
        let state = self.state()?;
        let mut records: Vec<ScoringRecord> = state
            .scoring_records
            .values()
            .filter(|record| record.method_id == method)
            .cloned()
            .collect();
        records.sort_by_key(|record| (record.product_id, record.criterion_id));
        Ok(records)
    }

    fn create_scoring_record(
        &self,
        record: NewScoringRecord,
    ) -> Result<ScoringRecord, RepositoryError> {
        let mut state = self.state()?;
        state.next_scoring_record += 1;
        let now = Utc::now();
        let stored = ScoringRecord {
            id: ScoringRecordId(state.next_scoring_record),
            product_id: record.product_id,
            criterion_id: record.criterion_id,
            method_id: record.method_id,
            normalized_value: record.normalized_value,
            weighted_value: 0.0,
            created_at: now,
            updated_at: now,
        };
        state.scoring_records.insert(stored.id, stored.clone());
        Ok(stored)
    }

    fn update_scoring_record(
        &self,
        method: MethodId,
        record: &ScoringRecord,
    ) -> Result<(), RepositoryError> {
        let mut state = self.state()?;
        match state.scoring_records.get_mut(&record.id) {
            Some(existing) if existing.method_id == method => {
                existing.normalized_value = record.normalized_value;
                existing.weighted_value = record.weighted_value;
                existing.updated_at = Utc::now();
                Ok(())
            }
            _ => Err(RepositoryError::NotFound),
        }
    }

    fn delete_all_scoring_records(&self, method: MethodId) -> Result<usize, RepositoryError> {
        let mut state = self.state()?;
        let before = state.scoring_records.len();
        state
            .scoring_records
            .retain(|_, record| record.method_id != method);
        Ok(before - state.scoring_records.len())
    }
}

impl FinalScoreStore for InMemoryStore {
    fn list_final_scores(&self, method: MethodId) -> Result<Vec<FinalScore>, RepositoryError> {
        Ok(self
            .state()?
            .final_scores
            .range((method, ProductId(0))..=(method, ProductId(u32::MAX)))
            .map(|(_, score)| *score)
            .collect())
    }

    fn upsert_final_score(&self, score: FinalScore) -> Result<FinalScore, RepositoryError> {
        self.state()?
            .final_scores
            .insert((score.method_id, score.product_id), score);
        Ok(score)
    }

    fn delete_final_scores(&self, method: MethodId) -> Result<usize, RepositoryError> {
        let mut state = self.state()?;
        let before = state.final_scores.len();
        state
            .final_scores
            .retain(|(owner, _), _| *owner != method);
        Ok(before - state.final_scores.len())
    }
}

impl ReportStore for InMemoryStore {
    fn create_report(&self, header: NewReport) -> Result<Report, RepositoryError> {
        let mut state = self.state()?;
        if state
            .reports
            .values()
            .any(|report| report.report_code == header.report_code)
        {
            return Err(RepositoryError::Conflict);
        }
        state.next_report += 1;
        let report = Report {
            id: ReportId(state.next_report),
            method_id: header.method_id,
            report_code: header.report_code,
            period: header.period,
            total_data: header.total_data,
            created_at: header.created_at,
        };
        state.reports.insert(report.id, report.clone());
        Ok(report)
    }

    fn create_report_detail(&self, detail: ReportDetail) -> Result<(), RepositoryError> {
        let mut state = self.state()?;
        if !state.reports.contains_key(&detail.report_id) {
            return Err(RepositoryError::NotFound);
        }
        state.report_details.push(detail);
        Ok(())
    }

    fn list_reports(&self) -> Result<Vec<Report>, RepositoryError> {
        Ok(self.state()?.reports.values().rev().cloned().collect())
    }

    fn report(&self, id: ReportId) -> Result<Option<Report>, RepositoryError> {
        Ok(self.state()?.reports.get(&id).cloned())
    }

    fn report_details(&self, id: ReportId) -> Result<Vec<ReportDetail>, RepositoryError> {
        Ok(self
            .state()?
            .report_details
            .iter()
            .filter(|detail| detail.report_id == id)
            .cloned()
            .collect())
    }

    fn count_reports(&self) -> Result<usize, RepositoryError> {
        Ok(self.state()?.reports.len())
    }

    fn delete_report(&self, id: ReportId) -> Result<(), RepositoryError> {
        let mut state = self.state()?;
        if state.reports.remove(&id).is_none() {
            return Err(RepositoryError::NotFound);
        }
        state.report_details.retain(|detail| detail.report_id != id);
        Ok(())
    }
}

impl StageStore for InMemoryStore {
    fn stage_marker(&self, method: MethodId) -> Result<Option<StageMarker>, RepositoryError> {
        Ok(self.state()?.stages.get(&method).copied())
    }

    fn save_stage_marker(&self, marker: StageMarker) -> Result<(), RepositoryError> {
        self.state()?.stages.insert(marker.method_id, marker);
        Ok(())
    }

    fn clear_stage_marker(&self, method: MethodId) -> Result<(), RepositoryError> {
        self.state()?.stages.remove(&method);
        Ok(())
    }
}
