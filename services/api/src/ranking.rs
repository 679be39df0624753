use crate::infra::{method_for, provision_store};
use clap::Args;
use profitrack::config::AppConfig;
use profitrack::error::AppError;
use profitrack::reporting::{RankedReport, ReportService};
use profitrack::scoring::{Algorithm, RawScoreService, ScoringError, ScoringPipelineService};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct ScoreArgs {
    /// Criteria CSV (id,name,weight,type); built-in criteria are used otherwise
    #[arg(long)]
    pub(crate) criteria: Option<PathBuf>,
    /// Products CSV (id,name,purchase_cost,price_sale,stock,sold,category)
    #[arg(long)]
    pub(crate) products: PathBuf,
    /// Scoring algorithm: smart or moora
    #[arg(long, default_value = "smart")]
    pub(crate) algorithm: Algorithm,
}

/// Runs the whole pipeline once against CSV input and archives the result.
pub(crate) fn score_products(args: &ScoreArgs) -> Result<RankedReport, AppError> {
    let config = AppConfig::load()?;
    let store = Arc::new(provision_store(
        args.criteria.as_deref(),
        Some(args.products.as_path()),
    )?);

    RawScoreService::new(Arc::clone(&store)).seed()?;

    let method = method_for(args.algorithm);
    let pipeline = ScoringPipelineService::new(Arc::clone(&store), config.scoring);
    pipeline.run_full(method, args.algorithm)?;
    let archived = pipeline.archive_to_report(method)?;

    let reports = ReportService::new(store);
    match archived.report_id {
        Some(report_id) => Ok(reports.ranked_report(report_id)?),
        None => Err(ScoringError::NoFinalScores(method).into()),
    }
}

pub(crate) fn run_score(args: ScoreArgs) -> Result<(), AppError> {
    let ranked = score_products(&args)?;
    render_ranking(&ranked);
    Ok(())
}

pub(crate) fn render_ranking(ranked: &RankedReport) {
    println!(
        "Report {} ({}) | method {} | {} products",
        ranked.report.report_code,
        ranked.report.period,
        ranked.method_name.as_deref().unwrap_or("unknown"),
        ranked.report.total_data
    );
    println!("{:>4}  {:<28} {:>12} {:>12}", "rank", "product", "profit", "score");
    for entry in &ranked.entries {
        let (name, profit) = match &entry.product {
            Some(product) => (product.name.as_str(), product.profit.to_string()),
            None => ("(deleted product)", "-".to_string()),
        };
        println!(
            "{:>4}  {:<28} {:>12} {:>12.4}",
            entry.rank, name, profit, entry.final_score
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_products(dir: &std::path::Path) -> PathBuf {
        let path = dir.join("products.csv");
        fs::write(
            &path,
            "id,name,purchase_cost,price_sale,stock,sold,category\n\
             1,Kopi Susu,8000,15000,40,35,Minuman\n\
             2,Teh Tarik,5000,7000,60,20,Minuman\n\
             3,Roti Bakar,9000,12000,25,10,Makanan\n",
        )
        .expect("write products");
        path
    }

    #[test]
    fn score_command_archives_a_ranked_report() {
        let dir = std::env::temp_dir().join(format!("profitrack-score-{}", std::process::id()));
        fs::create_dir_all(&dir).expect("temp dir");
        let products = write_products(&dir);

        let ranked = score_products(&ScoreArgs {
            criteria: None,
            products,
            algorithm: Algorithm::Smart,
        })
        .expect("pipeline runs");

        assert_eq!(ranked.report.total_data, 3);
        assert_eq!(ranked.entries.len(), 3);
        assert!(ranked.report.report_code.contains("-SMART-"));
        let leader = ranked.leader().expect("leader");
        assert_eq!(
            leader.product.as_ref().map(|product| product.name.as_str()),
            Some("Kopi Susu")
        );

        fs::remove_dir_all(&dir).ok();
    }
}
