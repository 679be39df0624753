use crate::cli::ServeArgs;
use crate::infra::{provision_store, AppState};
use crate::routes::with_scoring_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use profitrack::config::AppConfig;
use profitrack::error::AppError;
use profitrack::reporting::ReportService;
use profitrack::scoring::{RawScoreService, ScoringPipelineService};
use profitrack::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = Arc::new(provision_store(
        args.criteria.as_deref(),
        args.products.as_deref(),
    )?);
    let pipeline = Arc::new(ScoringPipelineService::new(
        Arc::clone(&store),
        config.scoring.clone(),
    ));
    let raw_scores = Arc::new(RawScoreService::new(Arc::clone(&store)));
    let reports = Arc::new(ReportService::new(store));

    let app = with_scoring_routes(pipeline, raw_scores, reports)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        report_prefix = %config.scoring.report_prefix,
        "profit ranking service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
