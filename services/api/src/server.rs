use crate::cli::ServeArgs;
use crate::infra::{AppState, Workflows};
use crate::routes::app;
use axum_prometheus::PrometheusMetricLayer;
use inspectiq::config::AppConfig;
use inspectiq::error::AppError;
use inspectiq::telemetry;
use inspectiq::workflows::inspections::InspectionReviewService;
use inspectiq::workflows::SystemClock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const RECONCILE_EVERY: Duration = Duration::from_secs(300);

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
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let workflows = Workflows::from_config(&config, Arc::new(SystemClock));
    spawn_reconciliation(workflows.review.clone());

    let app = app(&workflows, app_state).layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        public_base_url = %config.approvals.public_base_url,
        "inspection review service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}

/// Periodically re-run work-item closures that a failed tier-2 saga left behind.
fn spawn_reconciliation<R, W, T, N>(review: Arc<InspectionReviewService<R, W, T, N>>)
where
    R: inspectiq::workflows::inspections::InspectionRepository + 'static,
    W: inspectiq::workflows::assignments::WorkItemRepository + 'static,
    T: inspectiq::workflows::approvals::TicketStatusSource,
    N: inspectiq::workflows::NotificationDispatcher + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(RECONCILE_EVERY);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if let Err(error) = review.reconcile() {
                warn!(%error, "scheduled reconciliation failed");
            }
        }
    });
}
