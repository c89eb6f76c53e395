use metrics_exporter_prometheus::PrometheusHandle;
use soup_directory::config::DirectoryConfig;
use soup_directory::directory::{
    DirectoryServices, ImportSummary, MemoryDirectoryStore, SeedImporter,
};
use soup_directory::error::AppError;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Builds the in-memory directory, importing `seed_csv` first when one is given.
pub(crate) fn seeded_services(
    config: &DirectoryConfig,
    seed_csv: Option<&Path>,
) -> Result<Arc<DirectoryServices<MemoryDirectoryStore>>, AppError> {
    let store = Arc::new(MemoryDirectoryStore::new());
    if let Some(path) = seed_csv {
        let ImportSummary {
            restaurants,
            soups,
            skipped,
        } = SeedImporter::from_path(path, store.as_ref())?;
        info!(
            path = %path.display(),
            restaurants,
            soups,
            skipped,
            "seeded directory from csv"
        );
    }
    Ok(Arc::new(DirectoryServices::new(store, config)))
}
