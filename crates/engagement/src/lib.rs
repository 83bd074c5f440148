//! Meeting Engagement Engine
//!
//! Per-participant attention and engagement tracking for live meetings:
//! - Attention estimation from gaze predicates
//! - Behavior classification from emotion confidences
//! - Session store keyed by connection, tied to join/leave
//! - Frame ingest pipeline
//! - Scoring and end-of-meeting reports

pub mod attention;
pub mod behavior;
pub mod config;
pub mod frame;
pub mod oracle;
pub mod pipeline;
pub mod report;
pub mod scoring;
pub mod session;

pub use attention::{estimate_attention, AttentionLevels};
pub use behavior::{classify_behavior, BehaviorLabel, Emotion, MultiFacePolicy};
pub use config::EngagementConfig;
pub use frame::VideoFrame;
pub use oracle::{
    EmotionOracle, FaceDetection, GazeOracle, GazeReading, MockEmotionOracle, MockGazeOracle,
    OracleError,
};
pub use pipeline::{FrameAnalysisResult, FramePipeline};
pub use report::{GeneratedReport, Report, ReportEngine, ReportFormat};
pub use scoring::{score, BehaviorWeights};
pub use session::{ConnectionId, Participant, SessionSnapshot, SessionStore};

use thiserror::Error;

/// Engagement engine error types
#[derive(Error, Debug)]
pub enum EngagementError {
    #[error("Session {0} is already live")]
    DuplicateSession(ConnectionId),

    #[error("Session {0} not found")]
    UnknownSession(ConnectionId),

    #[error("Insufficient data: session history is empty")]
    InsufficientData,

    #[error("Oracle failure: {0}")]
    OracleFailure(#[from] OracleError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),
}
