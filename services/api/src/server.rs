use crate::cli::ServeArgs;
use crate::infra::{seeded_services, AppState};
use crate::routes::with_directory_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use soup_directory::config::AppConfig;
use soup_directory::error::AppError;
use soup_directory::telemetry;
use std::sync::atomic::{AtomicBool, Ordering};
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
    if let Some(seed_csv) = args.seed_csv.take() {
        config.directory.seed_csv = Some(seed_csv);
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let services = seeded_services(&config.directory, config.directory.seed_csv.as_deref())?;

    let app = with_directory_routes(services)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        launch_cities = config.directory.launch_cities.len(),
        "soup directory ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
