use crate::cli::ServeArgs;
use crate::infra::{load_fixture, AppState, InMemoryDomainCatalog, InMemoryOrderStore};
use crate::routes::with_assignment_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use linkdesk::config::AppConfig;
use linkdesk::error::AppError;
use linkdesk::telemetry;
use linkdesk::workflows::assignment::AssignmentService;
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

    let fixture = match args.fixture.take() {
        Some(path) => load_fixture(&path)?,
        None => Default::default(),
    };
    info!(
        line_items = fixture.line_items.len(),
        domains = fixture.domains.len(),
        "seeding in-memory collaborators"
    );

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let orders = Arc::new(InMemoryOrderStore::from_line_items(fixture.line_items));
    let domains = Arc::new(InMemoryDomainCatalog::new(fixture.domains));
    let assignment_service = Arc::new(AssignmentService::new(
        orders.clone(),
        domains,
        orders,
        config.assignment.clone(),
    ));

    let app = with_assignment_routes(assignment_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        best_available_threshold = config.assignment.best_available_threshold,
        "assignment service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
