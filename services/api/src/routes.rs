use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use serde_json::json;
use soup_directory::directory::{directory_router, DirectoryReader, DirectoryServices, ListingStore};
use std::sync::Arc;

pub(crate) fn with_directory_routes<S>(services: Arc<DirectoryServices<S>>) -> axum::Router
where
    S: ListingStore + DirectoryReader + 'static,
{
    directory_router(services)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::seeded_services;
    use axum::body::Body;
    use axum::http::Request;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use soup_directory::config::DirectoryConfig;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tower::ServiceExt;

    fn app(ready: bool) -> axum::Router {
        let services = seeded_services(&DirectoryConfig::default(), None).expect("services build");
        let state = AppState {
            readiness: Arc::new(AtomicBool::new(false)),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
        };
        state.readiness.store(ready, Ordering::Release);
        with_directory_routes(services).layer(Extension(state))
    }

    async fn get(router: axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = router
            .oneshot(
                Request::builder()
                    .uri(uri)
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("route executes");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body readable");
        let payload = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, payload)
    }

    #[tokio::test]
    async fn healthcheck_reports_ok() {
        let Json(body) = healthcheck().await;
        assert_eq!(body, json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn readiness_tracks_startup_flag() {
        let (status, payload) = get(app(false), "/ready").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(payload, json!({ "status": "initializing" }));

        let (status, payload) = get(app(true), "/ready").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload, json!({ "status": "ready" }));
    }

    #[tokio::test]
    async fn directory_routes_are_mounted_alongside_probes() {
        let (status, payload) = get(app(true), "/cities/counts").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload["cities"][0]["city"], json!("Minneapolis"));
        assert_eq!(payload["cities"][0]["count"], json!(0));

        let (status, payload) = get(app(true), "/restaurants").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload["totalCount"], json!(0));
    }
}
