//! Meeting Monitor - Main Entry Point
//!
//! Usage: `meeting-monitor [config-path]`

use api::{init_logging, run_server, AppConfig};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args().nth(1);
    let config = AppConfig::load(config_path.as_deref())?;
    init_logging(&config.logging)?;

    info!("=== Meeting Monitor v{} ===", env!("CARGO_PKG_VERSION"));

    let metrics = PrometheusBuilder::new().install_recorder()?;
    info!("Prometheus metrics available at /metrics");

    run_server(config, Some(metrics)).await?;

    Ok(())
}
