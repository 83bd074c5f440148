//! Prometheus exposition

use axum::extract::State;

use crate::{ApiError, AppState, SharedState};

/// Render all recorded metrics in Prometheus text format
pub async fn render(State(state): State<SharedState>) -> Result<String, ApiError> {
    let handle = state.metrics.as_ref().ok_or(ApiError::MetricsUnavailable)?;
    record_pipeline_stats(&state);
    Ok(handle.render())
}

/// Publish the pipeline counters and live session count
fn record_pipeline_stats(state: &AppState) {
    let stats = state.pipeline.stats();
    metrics::counter!("frames_ingested_total").absolute(stats.frames_recorded());
    metrics::counter!("frames_dropped_total").absolute(stats.frames_dropped());
    metrics::counter!("oracle_failures_total").absolute(stats.oracle_failures());
    metrics::gauge!("live_sessions").set(state.store.len() as f64);
}
