//! Gaze and emotion oracles
//!
//! The engine consumes these capabilities but never implements inference
//! itself. The mock oracles return configured readings so a server can run
//! without any model wired in.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::frame::VideoFrame;

/// Oracle error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OracleError {
    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Malformed output: {0}")]
    Malformed(String),
}

/// Gaze oracle output for one frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GazeReading {
    pub pupils_located: bool,
    pub is_blinking: bool,
    pub is_left: bool,
    pub is_right: bool,
    pub is_center: bool,
}

impl GazeReading {
    /// Pupils located, looking at the screen
    pub fn centered() -> Self {
        Self {
            pupils_located: true,
            is_center: true,
            ..Default::default()
        }
    }
}

/// One detected face: emotion name -> confidence, in oracle order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FaceDetection {
    pub emotions: Vec<(String, f32)>,
}

impl FaceDetection {
    pub fn new<S: Into<String>>(emotions: impl IntoIterator<Item = (S, f32)>) -> Self {
        Self {
            emotions: emotions.into_iter().map(|(n, c)| (n.into(), c)).collect(),
        }
    }

    /// Reject detections carrying NaN or infinite confidences
    pub fn validate(&self) -> Result<(), OracleError> {
        match self.emotions.iter().find(|(_, c)| !c.is_finite()) {
            Some((name, c)) => Err(OracleError::Malformed(format!(
                "confidence {} for emotion '{}'",
                c, name
            ))),
            None => Ok(()),
        }
    }

    /// Highest confidence in this detection
    pub fn peak_confidence(&self) -> f32 {
        self.emotions
            .iter()
            .map(|(_, c)| *c)
            .fold(f32::NEG_INFINITY, f32::max)
    }
}

/// Gaze-estimation capability
pub trait GazeOracle: Send + Sync {
    fn analyze(&self, frame: &VideoFrame) -> Result<GazeReading, OracleError>;
}

/// Emotion-classification capability
pub trait EmotionOracle: Send + Sync {
    fn detect(&self, frame: &VideoFrame) -> Result<Vec<FaceDetection>, OracleError>;
}

/// Mock gaze oracle settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MockGazeConfig {
    /// Reading returned for every usable frame
    pub reading: GazeReading,
    /// Frames darker than this mean luminance report no pupils (covered camera)
    pub min_luminance: f32,
}

impl Default for MockGazeConfig {
    fn default() -> Self {
        Self {
            reading: GazeReading::centered(),
            min_luminance: 8.0,
        }
    }
}

/// Gaze oracle returning a fixed reading
pub struct MockGazeOracle {
    config: MockGazeConfig,
}

impl MockGazeOracle {
    pub fn new(config: MockGazeConfig) -> Self {
        warn!("No gaze model configured. Using mock implementation.");
        Self { config }
    }
}

impl GazeOracle for MockGazeOracle {
    fn analyze(&self, frame: &VideoFrame) -> Result<GazeReading, OracleError> {
        if frame.mean_luminance() < self.config.min_luminance {
            return Ok(GazeReading::default());
        }
        Ok(self.config.reading)
    }
}

/// Mock emotion oracle settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MockEmotionConfig {
    /// Emotion confidences of the single reported face
    pub emotions: Vec<(String, f32)>,
}

impl Default for MockEmotionConfig {
    fn default() -> Self {
        Self {
            emotions: vec![("neutral".to_string(), 0.9), ("happy".to_string(), 0.1)],
        }
    }
}

/// Emotion oracle reporting one face with fixed confidences
pub struct MockEmotionOracle {
    detection: FaceDetection,
}

impl MockEmotionOracle {
    pub fn new(config: MockEmotionConfig) -> Self {
        warn!("No emotion model configured. Using mock implementation.");
        Self {
            detection: FaceDetection {
                emotions: config.emotions,
            },
        }
    }
}

impl EmotionOracle for MockEmotionOracle {
    fn detect(&self, _frame: &VideoFrame) -> Result<Vec<FaceDetection>, OracleError> {
        if self.detection.emotions.is_empty() {
            return Ok(Vec::new());
        }
        Ok(vec![self.detection.clone()])
    }
}
