use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryAllocationRepository, InMemoryNoticePublisher};
use crate::routes::with_allocation_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use station_alloc::allocation::AllocationService;
use station_alloc::config::AppConfig;
use station_alloc::error::AppError;
use station_alloc::telemetry;
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

    let repository = Arc::new(InMemoryAllocationRepository::default());
    let notices = Arc::new(InMemoryNoticePublisher::default());
    let allocation_service = Arc::new(AllocationService::new(
        repository,
        notices,
        config.allocation,
    ));

    let app = with_allocation_routes(allocation_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        parallel_threshold = config.allocation.parallel_threshold,
        "station allocator ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
