//! Server configuration
//!
//! Layered: built-in defaults, then an optional config file, then
//! `MEETING_MONITOR__SECTION__KEY` environment variables.

use config::{Config, Environment, File};
use engagement::oracle::{MockEmotionConfig, MockGazeConfig};
use engagement::{EngagementConfig, ReportFormat};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::rate_limit::RateLimitConfig;
use crate::ApiError;

/// Default config file, extension resolved by the `config` crate
pub const DEFAULT_CONFIG_PATH: &str = "config/meeting-monitor";

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub engagement: EngagementConfig,
    pub reports: ReportsConfig,
    pub rate_limit: RateLimitConfig,
    pub oracles: OracleConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address
    pub addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// trace, debug, info, warn or error
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportsConfig {
    /// Artifact output directory
    pub dir: PathBuf,
    pub format: ReportFormat,
    /// Report records kept in the index
    pub retention: usize,
}

impl Default for ReportsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("reports"),
            format: ReportFormat::Text,
            retention: 10_000,
        }
    }
}

/// Readings returned by the mock oracles
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    pub gaze: MockGazeConfig,
    pub emotion: MockEmotionConfig,
}

impl AppConfig {
    /// Load configuration; a missing file is not an error
    pub fn load(path: Option<&str>) -> Result<Self, ApiError> {
        let path = path.unwrap_or(DEFAULT_CONFIG_PATH);
        let config: AppConfig = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(Environment::with_prefix("MEETING_MONITOR").separator("__"))
            .build()?
            .try_deserialize()?;

        config.engagement.validate()?;
        Ok(config)
    }
}
