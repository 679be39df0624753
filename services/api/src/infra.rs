use metrics_exporter_prometheus::PrometheusHandle;
use profitrack::error::AppError;
use profitrack::scoring::{
    load_criteria_csv, load_products_csv, Algorithm, Criterion, CriterionId, CriterionKind,
    InMemoryStore, Method, MethodId,
};
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Method ids provisioned on startup, one per algorithm.
pub(crate) const SMART_METHOD: MethodId = MethodId(1);
pub(crate) const MOORA_METHOD: MethodId = MethodId(2);

pub(crate) const fn method_for(algorithm: Algorithm) -> MethodId {
    match algorithm {
        Algorithm::Smart => SMART_METHOD,
        Algorithm::Moora => MOORA_METHOD,
    }
}

pub(crate) fn default_methods() -> Vec<Method> {
    [Algorithm::Smart, Algorithm::Moora]
        .into_iter()
        .map(|algorithm| Method {
            id: method_for(algorithm),
            name: algorithm.label().to_string(),
        })
        .collect()
}

/// Criteria used when no criteria CSV is supplied.
pub(crate) fn default_criteria() -> Result<Vec<Criterion>, AppError> {
    let criteria = [
        (1, "Return On Investment", 0.4, CriterionKind::Benefit),
        (2, "Net Profit Margin", 0.35, CriterionKind::Benefit),
        (3, "Efficiency Ratio", 0.25, CriterionKind::Cost),
    ];

    criteria
        .into_iter()
        .map(|(id, name, weight, kind)| {
            Criterion::new(CriterionId(id), name, weight, kind).map_err(AppError::from)
        })
        .collect()
}

/// Builds the process-local store with methods, criteria, and optional products.
pub(crate) fn provision_store(
    criteria_csv: Option<&Path>,
    products_csv: Option<&Path>,
) -> Result<InMemoryStore, AppError> {
    let store = InMemoryStore::default();
    for method in default_methods() {
        store.insert_method(method)?;
    }

    let criteria = match criteria_csv {
        Some(path) => load_criteria_csv(path, &store)?,
        None => {
            let defaults = default_criteria()?;
            let count = defaults.len();
            for criterion in defaults {
                store.insert_criterion(criterion)?;
            }
            count
        }
    };

    let products = match products_csv {
        Some(path) => load_products_csv(path, &store)?,
        None => 0,
    };

    info!(criteria, products, "provisioned in-memory store");
    Ok(store)
}
