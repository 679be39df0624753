use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};

use axum::response::Response;
use axum::Router;
use serde_json::Value;

use crate::config::ScoringConfig;
use crate::scoring::domain::{
    Criterion, CriterionId, CriterionKind, FinalScore, Method, MethodId, NewReport,
    NewScoringRecord, Product, ProductId, RawCriterionScore, Report, ReportDetail, ReportId,
    ScoringRecord, StageMarker,
};
use crate::scoring::financials::RawScoreService;
use crate::scoring::memory::InMemoryStore;
use crate::scoring::repository::{
    CriteriaStore, FinalScoreStore, MethodStore, ProductStore, RawScoreStore, ReportStore,
    RepositoryError, ScoringStore, StageStore,
};
use crate::scoring::service::ScoringPipelineService;
use crate::scoring::{scoring_router, ScoringBackend};

pub(crate) const SMART_METHOD: MethodId = MethodId(1);
pub(crate) const MOORA_METHOD: MethodId = MethodId(2);
pub(crate) const ROI: CriterionId = CriterionId(1);
pub(crate) const EFFICIENCY: CriterionId = CriterionId(2);

pub(crate) fn reference_store() -> InMemoryStore {
    let store = InMemoryStore::default();
    store
        .insert_method(Method {
            id: SMART_METHOD,
            name: "Quarterly SMART".to_string(),
        })
        .expect("method");
    store
        .insert_method(Method {
            id: MOORA_METHOD,
            name: "Quarterly MOORA".to_string(),
        })
        .expect("method");
    store
        .insert_criterion(
            Criterion::new(ROI, "Return On Investment", 0.3, CriterionKind::Benefit)
                .expect("valid criterion"),
        )
        .expect("criterion");
    store
        .insert_criterion(
            Criterion::new(EFFICIENCY, "Efficiency Ratio", 0.7, CriterionKind::Cost)
                .expect("valid criterion"),
        )
        .expect("criterion");
    for (id, name) in [(1, "Kopi Susu"), (2, "Teh Tarik"), (3, "Roti Bakar")] {
        store
            .insert_product(Product::new(
                ProductId(id),
                name,
                10_000,
                12_500,
                50,
                20,
                "Menu",
            ))
            .expect("product");
    }
    store
}

/// ROI raw values [10, 20, 30] and Efficiency [5, 5, 5] for products 1..=3.
pub(crate) fn seed_reference_scores<S: RawScoreStore>(store: &S) {
    for (product, roi) in [(1, 10.0), (2, 20.0), (3, 30.0)] {
        store
            .upsert_raw_score(RawCriterionScore {
                product_id: ProductId(product),
                criterion_id: ROI,
                raw_value: roi,
            })
            .expect("raw score");
        store
            .upsert_raw_score(RawCriterionScore {
                product_id: ProductId(product),
                criterion_id: EFFICIENCY,
                raw_value: 5.0,
            })
            .expect("raw score");
    }
}

pub(crate) fn scenario_store() -> Arc<InMemoryStore> {
    let store = reference_store();
    seed_reference_scores(&store);
    Arc::new(store)
}

pub(crate) fn build_service<S>(store: Arc<S>) -> ScoringPipelineService<S>
where
    S: ScoringBackend + 'static,
{
    ScoringPipelineService::new(store, ScoringConfig::default())
}

pub(crate) fn router_for<S>(store: Arc<S>) -> Router
where
    S: ScoringBackend + 'static,
{
    let pipeline = Arc::new(build_service(Arc::clone(&store)));
    let raw_scores = Arc::new(RawScoreService::new(store));
    scoring_router(pipeline, raw_scores)
}

pub(crate) fn scores_by_product(scores: &[FinalScore]) -> Vec<f64> {
    let mut scores = scores.to_vec();
    scores.sort_by_key(|score| score.product_id);
    scores.iter().map(|score| score.final_score).collect()
}

pub(crate) fn assert_close(actual: &[f64], expected: &[f64], tolerance: f64) {
    assert_eq!(actual.len(), expected.len(), "{actual:?} vs {expected:?}");
    for (a, e) in actual.iter().zip(expected) {
        assert!((a - e).abs() <= tolerance, "{actual:?} vs {expected:?}");
    }
}

pub(crate) async fn read_json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    serde_json::from_slice(&bytes).expect("json body")
}

/// Holds scoring-record inserts until released.
#[derive(Debug, Default)]
pub(crate) struct WriteGate {
    closed: Mutex<bool>,
    opened: Condvar,
    waiting: AtomicUsize,
}

impl WriteGate {
    fn pass(&self) {
        let mut closed = self.closed.lock().expect("gate mutex");
        if !*closed {
            return;
        }
        self.waiting.fetch_add(1, Ordering::SeqCst);
        while *closed {
            closed = self.opened.wait(closed).expect("gate mutex");
        }
        self.waiting.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Delegates to an [`InMemoryStore`] but fails scoring-record inserts once
/// the remaining write budget is spent, can take product lookups offline,
/// and can hold scoring-record inserts behind a gate.
#[derive(Debug, Clone)]
pub(crate) struct FlakyStore {
    inner: InMemoryStore,
    write_budget: Arc<Mutex<Option<usize>>>,
    products_offline: Arc<AtomicBool>,
    gate: Arc<WriteGate>,
}

impl FlakyStore {
    pub(crate) fn reliable(inner: InMemoryStore) -> Self {
        Self {
            inner,
            write_budget: Arc::new(Mutex::new(None)),
            products_offline: Arc::new(AtomicBool::new(false)),
            gate: Arc::new(WriteGate::default()),
        }
    }

    pub(crate) fn failing_after(inner: InMemoryStore, writes: usize) -> Self {
        let store = Self::reliable(inner);
        *store.write_budget.lock().expect("budget mutex") = Some(writes);
        store
    }

    pub(crate) fn heal(&self) {
        *self.write_budget.lock().expect("budget mutex") = None;
    }

    pub(crate) fn take_products_offline(&self) {
        self.products_offline.store(true, Ordering::SeqCst);
    }

    pub(crate) fn hold_writes(&self) {
        *self.gate.closed.lock().expect("gate mutex") = true;
    }

    pub(crate) fn release_writes(&self) {
        *self.gate.closed.lock().expect("gate mutex") = false;
        self.gate.opened.notify_all();
    }

    /// Inserts currently parked at the gate.
    pub(crate) fn held_writers(&self) -> usize {
        self.gate.waiting.load(Ordering::SeqCst)
    }
}

impl CriteriaStore for FlakyStore {
    fn list_criteria(&self) -> Result<Vec<Criterion>, RepositoryError> {
        self.inner.list_criteria()
    }

    fn criterion(&self, id: CriterionId) -> Result<Option<Criterion>, RepositoryError> {
        self.inner.criterion(id)
    }
}

impl ProductStore for FlakyStore {
    fn list_products(&self) -> Result<Vec<Product>, RepositoryError> {
        self.inner.list_products()
    }

    fn product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        if self.products_offline.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable(
                "product index offline".to_string(),
            ));
        }
        self.inner.product(id)
    }
}

impl MethodStore for FlakyStore {
    fn list_methods(&self) -> Result<Vec<Method>, RepositoryError> {
        self.inner.list_methods()
    }

    fn method(&self, id: MethodId) -> Result<Option<Method>, RepositoryError> {
        self.inner.method(id)
    }
}

impl RawScoreStore for FlakyStore {
    fn list_raw_scores(&self) -> Result<Vec<RawCriterionScore>, RepositoryError> {
        self.inner.list_raw_scores()
    }

    fn upsert_raw_score(&self, score: RawCriterionScore) -> Result<(), RepositoryError> {
        self.inner.upsert_raw_score(score)
    }

    fn delete_raw_scores_for_product(&self, id: ProductId) -> Result<usize, RepositoryError> {
        self.inner.delete_raw_scores_for_product(id)
    }
}

impl ScoringStore for FlakyStore {
    fn list_scoring_records(
        &self,
        method: MethodId,
    ) -> Result<Vec<ScoringRecord>, RepositoryError> {
        self.inner.list_scoring_records(method)
    }

    fn create_scoring_record(
        &self,
        record: NewScoringRecord,
    ) -> Result<ScoringRecord, RepositoryError> {
        self.gate.pass();
        {
            let mut budget = self.write_budget.lock().expect("budget mutex");
            match budget.as_mut() {
                Some(0) => {
                    return Err(RepositoryError::Unavailable("disk full".to_string()));
                }
                Some(remaining) => *remaining -= 1,
                None => {}
            }
        }
        self.inner.create_scoring_record(record)
    }

    fn update_scoring_record(
        &self,
        method: MethodId,
        record: &ScoringRecord,
    ) -> Result<(), RepositoryError> {
        self.inner.update_scoring_record(method, record)
    }

    fn delete_all_scoring_records(&self, method: MethodId) -> Result<usize, RepositoryError> {
        self.inner.delete_all_scoring_records(method)
    }
}

impl FinalScoreStore for FlakyStore {
    fn list_final_scores(&self, method: MethodId) -> Result<Vec<FinalScore>, RepositoryError> {
        self.inner.list_final_scores(method)
    }

    fn upsert_final_score(&self, score: FinalScore) -> Result<FinalScore, RepositoryError> {
        self.inner.upsert_final_score(score)
    }

    fn delete_final_scores(&self, method: MethodId) -> Result<usize, RepositoryError> {
        self.inner.delete_final_scores(method)
    }
}

impl ReportStore for FlakyStore {
    fn create_report(&self, header: NewReport) -> Result<Report, RepositoryError> {
        self.inner.create_report(header)
    }

    fn create_report_detail(&self, detail: ReportDetail) -> Result<(), RepositoryError> {
        self.inner.create_report_detail(detail)
    }

    fn list_reports(&self) -> Result<Vec<Report>, RepositoryError> {
        self.inner.list_reports()
    }

    fn report(&self, id: ReportId) -> Result<Option<Report>, RepositoryError> {
        self.inner.report(id)
    }

    fn report_details(&self, id: ReportId) -> Result<Vec<ReportDetail>, RepositoryError> {
        self.inner.report_details(id)
    }

    fn count_reports(&self) -> Result<usize, RepositoryError> {
        self.inner.count_reports()
    }

    fn delete_report(&self, id: ReportId) -> Result<(), RepositoryError> {
        self.inner.delete_report(id)
    }
}

impl StageStore for FlakyStore {
    fn stage_marker(&self, method: MethodId) -> Result<Option<StageMarker>, RepositoryError> {
        self.inner.stage_marker(method)
    }

    fn save_stage_marker(&self, marker: StageMarker) -> Result<(), RepositoryError> {
        self.inner.save_stage_marker(marker)
    }

    fn clear_stage_marker(&self, method: MethodId) -> Result<(), RepositoryError> {
        self.inner.clear_stage_marker(method)
    }
}
