//! Meeting Monitor API Server
//!
//! WebSocket frame ingest and REST endpoints for live meeting engagement.

use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use tower_governor::GovernorLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

pub mod config;
mod error;
pub mod rate_limit;
mod routes;

pub use crate::config::{AppConfig, LoggingConfig};
pub use error::ApiError;
pub use rate_limit::{create_governor_config, DefaultGovernorConfig, RateLimitConfig};

use engagement::{
    EmotionOracle, FramePipeline, GazeOracle, MockEmotionOracle, MockGazeOracle, ReportEngine,
    SessionStore,
};
use storage::{ArtifactWriter, Repository};

/// Application state shared across handlers
pub struct AppState {
    /// Live sessions
    pub store: Arc<SessionStore>,
    /// Frame analysis
    pub pipeline: Arc<FramePipeline>,
    /// Scoring and report artifacts
    pub reports: ReportEngine,
    /// Prometheus render handle, absent when no recorder is installed
    pub metrics: Option<PrometheusHandle>,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: std::time::Instant,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    /// Build state with the mock oracles from configuration
    pub fn new(config: &AppConfig, metrics: Option<PrometheusHandle>) -> Result<Self, ApiError> {
        let gaze = Arc::new(MockGazeOracle::new(config.oracles.gaze.clone()));
        let emotion = Arc::new(MockEmotionOracle::new(config.oracles.emotion.clone()));
        Self::with_oracles(config, gaze, emotion, metrics)
    }

    pub fn with_oracles(
        config: &AppConfig,
        gaze: Arc<dyn GazeOracle>,
        emotion: Arc<dyn EmotionOracle>,
        metrics: Option<PrometheusHandle>,
    ) -> Result<Self, ApiError> {
        let weights = config.engagement.weights()?;
        let store = Arc::new(SessionStore::new());
        let pipeline = Arc::new(FramePipeline::new(
            Arc::clone(&store),
            gaze,
            emotion,
            &config.engagement,
        ));
        let reports = ReportEngine::new(
            Arc::clone(&store),
            weights,
            ArtifactWriter::new(config.reports.dir.clone()),
            Arc::new(Repository::with_retention(config.reports.retention)),
            config.reports.format,
        );

        Ok(Self {
            store,
            pipeline,
            reports,
            metrics,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: std::time::Instant::now(),
        })
    }
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: u64,
    pub version: String,
    pub uptime_seconds: u64,
    pub live_sessions: usize,
    pub reports_generated: usize,
}

/// Create the application router. Report generation is rate limited when a
/// governor config is given.
pub fn create_router(state: SharedState, governor: Option<Arc<DefaultGovernorConfig>>) -> Router {
    let mut report_routes = Router::new().route(
        "/generate-report/:connection_id",
        get(routes::reports::generate_report),
    );
    if let Some(config) = governor {
        report_routes = report_routes.layer(GovernorLayer { config });
    }

    Router::new()
        .route("/ws", get(routes::ws::ws_handler))
        .route("/api/v1/health", get(health_handler))
        .route(
            "/api/v1/rooms/:room_id/participants",
            get(routes::sessions::get_participants),
        )
        .route(
            "/api/v1/sessions/:connection_id/score",
            get(routes::sessions::get_score),
        )
        .route("/api/v1/reports", get(routes::reports::get_reports))
        .route("/metrics", get(routes::metrics::render))
        .merge(report_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check handler
async fn health_handler(State(state): State<SharedState>) -> impl IntoResponse {
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp,
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        live_sessions: state.store.len(),
        reports_generated: state.reports.repository().report_count(),
    })
}

/// Initialize logging
pub fn init_logging(config: &LoggingConfig) -> Result<(), ApiError> {
    let level = Level::from_str(&config.level)
        .map_err(|e| ApiError::Logging(format!("level '{}': {}", config.level, e)))?;

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true);

    let result = if config.json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };
    result.map_err(|e| ApiError::Logging(e.to_string()))
}

/// Run the server
pub async fn run_server(
    config: AppConfig,
    metrics: Option<PrometheusHandle>,
) -> Result<(), ApiError> {
    let state = Arc::new(AppState::new(&config, metrics)?);
    let governor = create_governor_config(&config.rate_limit)?;
    let app = create_router(state, Some(governor));

    info!("Starting meeting monitor on {}", config.server.addr);
    info!("Reports will be written to {}", config.reports.dir.display());

    let listener = tokio::net::TcpListener::bind(config.server.addr.as_str()).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
