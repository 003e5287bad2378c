use crate::cli::ServeArgs;
use crate::infra::{in_memory_stores, load_dataset, AppState};
use crate::routes::with_rescue_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use shelter_rescue::config::{AppConfig, ServerConfig};
use shelter_rescue::error::AppError;
use shelter_rescue::telemetry;
use shelter_rescue::workflows::rescue::DispatchCoordinator;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

impl ServeArgs {
    fn apply_to(&self, server: &mut ServerConfig) {
        if let Some(host) = &self.host {
            server.host = host.clone();
        }
        if let Some(port) = self.port {
            server.port = port;
        }
    }
}

pub(crate) async fn run(args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;
    args.apply_to(&mut config.server);
    telemetry::init(&config.telemetry)?;

    let dataset = load_dataset(
        args.data.reports_csv.as_deref(),
        args.data.volunteers_csv.as_deref(),
    )?;
    info!(
        reports = dataset.reports.len(),
        volunteers = dataset.volunteers.len(),
        "dispatch stores seeded"
    );
    let (stores, _notifier) = in_memory_stores(dataset);
    let coordinator = Arc::new(DispatchCoordinator::new(stores, &config.dispatch));

    let (metrics_layer, metrics_handle) = PrometheusMetricLayer::pair();
    let ready = Arc::new(AtomicBool::new(false));
    let state = AppState {
        readiness: Arc::clone(&ready),
        metrics: Arc::new(metrics_handle),
    };
    let app = with_rescue_routes(coordinator)
        .layer(Extension(state))
        .layer(metrics_layer);

    let addr = config.server.socket_addr()?;
    let listener = TcpListener::bind(addr).await?;
    ready.store(true, Ordering::Release);
    info!(
        environment = ?config.environment,
        %addr,
        qualification_ttl_secs = config.dispatch.qualification_ttl.as_secs(),
        "rescue dispatch service listening"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
