use crate::cli::ServeArgs;
use crate::error::AppError;
use crate::infra::{AppState, InMemoryDispatcher, InMemoryRecordStore};
use crate::routes::{decision_router, ApiContext};
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use renolead::config::{AppConfig, DecisionConfig};
use renolead::service::DecisionService;
use renolead::store::SystemClock;
use renolead::telemetry;
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

    let store = Arc::new(InMemoryRecordStore::seeded());
    let dispatcher = Arc::new(InMemoryDispatcher::default());
    let service = DecisionService::new(
        Arc::clone(&store),
        dispatcher,
        Arc::new(SystemClock),
        DecisionConfig::default(),
    )?;
    let ctx = Arc::new(ApiContext { service, store });

    let app = decision_router(ctx)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "lead decision engine ready");

    axum::serve(listener, app).await?;
    Ok(())
}
