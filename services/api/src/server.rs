use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryApplicationRepository, InMemoryNotificationPublisher};
use crate::routes::with_clearance_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use no_dues::config::AppConfig;
use no_dues::error::AppError;
use no_dues::telemetry;
use no_dues::workflows::clearance::ClearanceService;
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

    let repository = Arc::new(InMemoryApplicationRepository::default());
    let notifications = Arc::new(InMemoryNotificationPublisher::default());
    let clearance_service = Arc::new(ClearanceService::new(
        repository,
        notifications,
        config.clearance,
    ));

    let app = with_clearance_routes(clearance_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        notify_upstream_on_rejection = config.clearance.notify_upstream_on_rejection,
        "no-dues clearance service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
