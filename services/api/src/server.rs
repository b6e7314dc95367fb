use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryIdentityProvider, InMemorySubmissionStore};
use crate::routes::with_intake_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use risk_intake::assessment::{HttpPredictionClient, IntakeService};
use risk_intake::config::{AppConfig, PredictionConfig};
use risk_intake::error::AppError;
use risk_intake::telemetry;
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
    if let Some(url) = args.prediction_url.take() {
        config.prediction = PredictionConfig::from_base_url(&url)?;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = Arc::new(InMemorySubmissionStore::default());
    let predictor = Arc::new(HttpPredictionClient::new(&config.prediction));
    let identity = Arc::new(InMemoryIdentityProvider::new(args.auto_verify));
    let service = Arc::new(IntakeService::new(store, predictor));

    let app = with_intake_routes(service, identity)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        prediction = %config.prediction.predict_url(),
        "risk intake service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
