use std::collections::HashMap;
use std::sync::{Arc, Barrier};
use std::thread;

use profitrack::config::ScoringConfig;
use profitrack::reporting::ReportService;
use profitrack::scoring::repository::{
    CriteriaStore, FinalScoreStore, RawScoreStore, ReportStore, ScoringStore,
};
use profitrack::scoring::{
    Algorithm, Criterion, CriterionId, CriterionKind, InMemoryStore, Method, MethodId,
    PipelineStage, Product, ProductId, RawScoreService, ScoringError, ScoringPipelineService,
};

const SMART: MethodId = MethodId(1);
const MOORA: MethodId = MethodId(2);
const TOLERANCE: f64 = 1e-9;

fn catalogue_store() -> Arc<InMemoryStore> {
    let store = InMemoryStore::default();
    store
        .insert_method(Method {
            id: SMART,
            name: "SMART".to_string(),
        })
        .expect("method");
    store
        .insert_method(Method {
            id: MOORA,
            name: "MOORA".to_string(),
        })
        .expect("method");

    for (id, name, weight, kind) in [
        (1, "Return On Investment", 0.4, CriterionKind::Benefit),
        (2, "Net Profit Margin", 0.35, CriterionKind::Benefit),
        (3, "Efficiency Ratio", 0.25, CriterionKind::Cost),
    ] {
        store
            .insert_criterion(
                Criterion::new(CriterionId(id), name, weight, kind).expect("valid criterion"),
            )
            .expect("criterion");
    }

    for (id, name, cost, price, stock, sold, category) in [
        (1, "Kopi Susu", 8_000, 15_000, 40, 35, "Minuman"),
        (2, "Teh Tarik", 5_000, 7_000, 60, 20, "Minuman"),
        (3, "Roti Bakar", 9_000, 12_000, 25, 10, "Makanan"),
        (4, "Nasi Goreng", 14_000, 22_000, 30, 28, "Makanan"),
        (5, "Es Jeruk", 3_000, 6_000, 80, 0, "Minuman"),
    ] {
        store
            .insert_product(Product::new(
                ProductId(id),
                name,
                cost,
                price,
                stock,
                sold,
                category,
            ))
            .expect("product");
    }

    let store = Arc::new(store);
    RawScoreService::new(Arc::clone(&store))
        .seed()
        .expect("raw scores seed");
    store
}

fn pipeline(store: &Arc<InMemoryStore>) -> ScoringPipelineService<InMemoryStore> {
    ScoringPipelineService::new(Arc::clone(store), ScoringConfig::default())
}

fn criteria_by_id(store: &InMemoryStore) -> HashMap<CriterionId, Criterion> {
    store
        .list_criteria()
        .expect("criteria")
        .into_iter()
        .map(|criterion| (criterion.id, criterion))
        .collect()
}

#[test]
fn smart_run_respects_bounds_linearity_and_weighted_sum() {
    let store = catalogue_store();
    let service = pipeline(&store);
    service.run_normalization(SMART, Algorithm::Smart).expect("normalizes");
    service.run_weighting(SMART, Algorithm::Smart).expect("weights");

    let criteria = criteria_by_id(&store);
    let records = store.list_scoring_records(SMART).expect("records");
    assert_eq!(records.len(), 15);

    for record in &records {
        assert!(
            (0.0..=1.0).contains(&record.normalized_value),
            "{record:?} escapes [0, 1]"
        );
        let weight = criteria[&record.criterion_id].weight;
        assert_eq!(record.weighted_value, record.normalized_value * weight);
    }

    service.run_aggregation(SMART, Algorithm::Smart).expect("aggregates");
    let finals = store.list_final_scores(SMART).expect("final scores");
    assert_eq!(finals.len(), 5);
    for score in &finals {
        let expected: f64 = records
            .iter()
            .filter(|record| record.product_id == score.product_id)
            .map(|record| record.weighted_value)
            .sum();
        assert!((score.final_score - expected).abs() < TOLERANCE);
    }
}

#[test]
fn moora_columns_have_unit_length_and_cost_is_subtracted() {
    let store = catalogue_store();
    let service = pipeline(&store);
    service.run_full(MOORA, Algorithm::Moora).expect("pipeline runs");

    let criteria = criteria_by_id(&store);
    let records = store.list_scoring_records(MOORA).expect("records");

    for criterion in criteria.keys() {
        let sum_of_squares: f64 = records
            .iter()
            .filter(|record| record.criterion_id == *criterion)
            .map(|record| record.normalized_value.powi(2))
            .sum();
        assert!(
            (sum_of_squares - 1.0).abs() < 1e-9,
            "criterion {criterion} has squared length {sum_of_squares}"
        );
    }

    for score in store.list_final_scores(MOORA).expect("final scores") {
        let (benefit, cost) = records
            .iter()
            .filter(|record| record.product_id == score.product_id)
            .fold((0.0, 0.0), |(benefit, cost), record| {
                match criteria[&record.criterion_id].kind {
                    CriterionKind::Benefit => (benefit + record.weighted_value, cost),
                    CriterionKind::Cost => (benefit, cost + record.weighted_value),
                }
            });
        assert!((score.final_score - (benefit - cost)).abs() < TOLERANCE);
    }
}

#[test]
fn archive_copies_every_final_score_and_clears_the_run() {
    let store = catalogue_store();
    let service = pipeline(&store);
    service.run_full(SMART, Algorithm::Smart).expect("pipeline runs");
    let prior = store.list_final_scores(SMART).expect("final scores");

    let outcome = service.archive_to_report(SMART).expect("archives");
    assert_eq!(outcome.stage, PipelineStage::Empty);
    let report_id = outcome.report_id.expect("report created");

    let details = store.report_details(report_id).expect("details");
    assert_eq!(details.len(), prior.len());
    for score in &prior {
        let detail = details
            .iter()
            .find(|detail| detail.product_id == score.product_id)
            .expect("detail per product");
        assert_eq!(detail.final_score, score.final_score);
    }
    assert!(store.list_scoring_records(SMART).expect("records").is_empty());
    assert!(store.list_final_scores(SMART).expect("scores").is_empty());

    let ranked = ReportService::new(Arc::clone(&store))
        .ranked_report(report_id)
        .expect("ranked");
    assert_eq!(ranked.report.total_data, 5);
    assert!(ranked
        .entries
        .windows(2)
        .all(|pair| pair[0].final_score >= pair[1].final_score));
}

#[test]
fn archived_method_can_start_a_fresh_run() {
    let store = catalogue_store();
    let service = pipeline(&store);
    service.run_full(SMART, Algorithm::Smart).expect("first run");
    service.archive_to_report(SMART).expect("first archive");

    service
        .run_full(SMART, Algorithm::Moora)
        .expect("second run may switch algorithm");
    service.archive_to_report(SMART).expect("second archive");
    assert_eq!(store.count_reports().expect("count"), 2);
}

#[test]
fn normalization_without_raw_scores_writes_nothing() {
    let store = catalogue_store();
    for product in 1..=5 {
        store
            .delete_raw_scores_for_product(ProductId(product))
            .expect("delete raw scores");
    }
    let service = pipeline(&store);

    let err = service
        .run_normalization(SMART, Algorithm::Smart)
        .expect_err("no data");
    assert!(matches!(err, ScoringError::DataUnavailable(_)));
    assert!(store.list_scoring_records(SMART).expect("records").is_empty());
    assert_eq!(
        service.stage(SMART).expect("stage").stage,
        PipelineStage::Empty
    );
}

#[test]
fn concurrent_normalization_of_one_method_runs_once() {
    let store = catalogue_store();
    let service = Arc::new(pipeline(&store));
    let workers = 6;
    let barrier = Arc::new(Barrier::new(workers));

    let handles: Vec<_> = (0..workers)
        .map(|_| {
            let service = Arc::clone(&service);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                service.run_normalization(SMART, Algorithm::Smart)
            })
        })
        .collect();

    let results: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().expect("worker finishes"))
        .collect();

    let succeeded = results.iter().filter(|result| result.is_ok()).count();
    assert_eq!(succeeded, 1);
    assert!(results.iter().filter(|result| result.is_err()).all(|result| matches!(
        result,
        Err(ScoringError::InvalidStageTransition {
            current: PipelineStage::Normalized,
            ..
        })
    )));
    assert_eq!(store.list_scoring_records(SMART).expect("records").len(), 15);
}

#[test]
fn methods_run_in_parallel_without_interference() {
    let store = catalogue_store();
    let service = Arc::new(pipeline(&store));

    let handles: Vec<_> = [(SMART, Algorithm::Smart), (MOORA, Algorithm::Moora)]
        .into_iter()
        .map(|(method, algorithm)| {
            let service = Arc::clone(&service);
            thread::spawn(move || service.run_full(method, algorithm))
        })
        .collect();
    for handle in handles {
        handle.join().expect("worker finishes").expect("run succeeds");
    }

    assert_eq!(store.list_final_scores(SMART).expect("smart").len(), 5);
    assert_eq!(store.list_final_scores(MOORA).expect("moora").len(), 5);
    assert_eq!(store.list_raw_scores().expect("raw").len(), 15);
}
