use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Json, Router};
use serde_json::json;
use shelter_rescue::workflows::rescue::{rescue_router, DispatchCoordinator};
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// Dispatch API plus the operational endpoints.
pub(crate) fn with_rescue_routes(coordinator: Arc<DispatchCoordinator>) -> Router {
    rescue_router(coordinator)
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "service": "rescue-dispatch" }))
}

/// 503 until the listener is bound.
pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let (status, label) = if state.readiness.load(Ordering::Acquire) {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "initializing")
    };
    (status, Json(json!({ "status": label })))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let exposition = state.metrics.render();
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        exposition,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::{in_memory_stores, load_dataset};
    use axum::body::Body;
    use axum::http::Request;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use shelter_rescue::config::DispatchConfig;
    use std::sync::atomic::AtomicBool;
    use tower::ServiceExt;

    fn app_state(ready: bool) -> AppState {
        let recorder = PrometheusBuilder::new().build_recorder();
        AppState {
            readiness: Arc::new(AtomicBool::new(ready)),
            metrics: Arc::new(recorder.handle()),
        }
    }

    fn demo_router(state: AppState) -> Router {
        let dataset = load_dataset(None, None).expect("bundled dataset");
        let (stores, _notifier) = in_memory_stores(dataset);
        let coordinator = Arc::new(DispatchCoordinator::new(stores, &DispatchConfig::default()));
        with_rescue_routes(coordinator).layer(Extension(state))
    }

    #[tokio::test]
    async fn readiness_reflects_flag() {
        let state = app_state(false);
        let response = readiness_endpoint(Extension(state.clone()))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        state.readiness.store(true, Ordering::Release);
        let response = readiness_endpoint(Extension(state)).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn health_and_metrics_routes_respond() {
        let app = demo_router(app_state(true));

        let response = app
            .clone()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/plain; version=0.0.4"
        );
    }

    #[tokio::test]
    async fn rescue_routes_are_mounted() {
        let app = demo_router(app_state(true));

        let response = app
            .oneshot(
                Request::get("/api/v1/volunteers/vol-avery/rescues")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("route executes");

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), 256 * 1024)
            .await
            .expect("read body");
        let payload: serde_json::Value = serde_json::from_slice(&body).expect("json payload");
        assert_eq!(payload.as_array().map(Vec::len), Some(5));
        assert_eq!(payload[0]["report"]["id"], "rpt-1003");
    }
}
