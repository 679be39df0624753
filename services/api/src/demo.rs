use crate::ranking::render_ranking;
use clap::Args;
use profitrack::config::ScoringConfig;
use profitrack::error::AppError;
use profitrack::reporting::ReportService;
use profitrack::scoring::repository::{CriteriaStore, ProductStore, RawScoreStore};
use profitrack::scoring::{
    Algorithm, Criterion, CriterionId, CriterionKind, InMemoryStore, Method, MethodId, Product,
    ProductId, RawCriterionScore, ScoringPipelineService,
};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Run only this algorithm instead of both
    #[arg(long)]
    pub(crate) algorithm: Option<Algorithm>,
    /// Skip archiving, leaving the final scores in place
    #[arg(long)]
    pub(crate) skip_archive: bool,
}

const DEMO_METHODS: [(MethodId, Algorithm); 2] = [
    (MethodId(1), Algorithm::Smart),
    (MethodId(2), Algorithm::Moora),
];

/// Three products, a benefit ROI column and a flat cost column.
pub(crate) fn demo_store() -> Result<InMemoryStore, AppError> {
    let store = InMemoryStore::default();
    for (id, algorithm) in DEMO_METHODS {
        store.insert_method(Method {
            id,
            name: format!("Demo {}", algorithm.label()),
        })?;
    }

    store.insert_criterion(Criterion::new(
        CriterionId(1),
        "Return On Investment",
        0.3,
        CriterionKind::Benefit,
    )?)?;
    store.insert_criterion(Criterion::new(
        CriterionId(2),
        "Efficiency Ratio",
        0.7,
        CriterionKind::Cost,
    )?)?;

    let products = [
        (1, "Kopi Susu", 10.0),
        (2, "Teh Tarik", 20.0),
        (3, "Roti Bakar", 30.0),
    ];
    for (id, name, roi) in products {
        store.insert_product(Product::new(
            ProductId(id),
            name,
            10_000,
            12_500,
            50,
            20,
            "Menu",
        ))?;
        store.upsert_raw_score(RawCriterionScore {
            product_id: ProductId(id),
            criterion_id: CriterionId(1),
            raw_value: roi,
        })?;
        store.upsert_raw_score(RawCriterionScore {
            product_id: ProductId(id),
            criterion_id: CriterionId(2),
            raw_value: 5.0,
        })?;
    }

    Ok(store)
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let store = Arc::new(demo_store()?);
    let pipeline = ScoringPipelineService::new(Arc::clone(&store), ScoringConfig::default());
    let reports = ReportService::new(Arc::clone(&store));

    let products: HashMap<ProductId, String> = store
        .list_products()?
        .into_iter()
        .map(|product| (product.id, product.name))
        .collect();
    let criteria: HashMap<CriterionId, Criterion> = store
        .list_criteria()?
        .into_iter()
        .map(|criterion| (criterion.id, criterion))
        .collect();

    println!("Profit ranking demo");
    for (method, algorithm) in DEMO_METHODS {
        if args.algorithm.is_some_and(|only| only != algorithm) {
            continue;
        }

        println!("\n{} pipeline (method {})", algorithm.label(), method);
        pipeline.run_normalization(method, algorithm)?;
        pipeline.run_weighting(method, algorithm)?;

        let mut records = pipeline.scoring_records(method)?;
        records.sort_by_key(|record| (record.product_id, record.criterion_id));
        for record in &records {
            let product = products
                .get(&record.product_id)
                .map(String::as_str)
                .unwrap_or("?");
            let criterion = criteria.get(&record.criterion_id);
            println!(
                "  {:<12} {:<22} {:<8} normalized {:>7.3} weighted {:>7.3}",
                product,
                criterion.map(|c| c.name.as_str()).unwrap_or("?"),
                criterion.map(|c| c.kind.label()).unwrap_or("?"),
                record.normalized_value,
                record.weighted_value
            );
        }

        pipeline.run_aggregation(method, algorithm)?;
        let mut scores = pipeline.final_scores(method)?;
        scores.sort_by_key(|score| score.product_id);
        println!("  Final scores:");
        for score in &scores {
            println!(
                "    - {}: {:.3}",
                products
                    .get(&score.product_id)
                    .map(String::as_str)
                    .unwrap_or("?"),
                score.final_score
            );
        }

        if args.skip_archive {
            continue;
        }

        let archived = pipeline.archive_to_report(method)?;
        if let Some(report_id) = archived.report_id {
            println!();
            render_ranking(&reports.ranked_report(report_id)?);
        }
    }

    Ok(())
}
