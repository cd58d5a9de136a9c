use crate::cli::ServeArgs;
use crate::infra::AppState;
use crate::routes::app_router;
use admitdesk::config::AppConfig;
use admitdesk::error::AppError;
use admitdesk::telemetry;
use axum_prometheus::PrometheusMetricLayer;
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
    let state = AppState::new(&config.session, Arc::new(prometheus_handle));
    let readiness_flag = state.readiness.clone();

    let app = app_router(state).layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "admissions CRM ready");

    axum::serve(listener, app).await?;
    Ok(())
}
