//! Frame ingest pipeline
//!
//! Runs both oracles on a frame, classifies the outputs and appends the
//! result to the owning session. Oracles run without any store lock held.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::attention::AttentionLevels;
use crate::behavior::{classify_behavior, BehaviorLabel, MultiFacePolicy};
use crate::config::EngagementConfig;
use crate::frame::VideoFrame;
use crate::oracle::{EmotionOracle, GazeOracle, OracleError};
use crate::session::{ConnectionId, SessionStore};
use crate::EngagementError;

/// Instantaneous result for one frame, delivered to its sender only
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameAnalysisResult {
    pub attention_level: f32,
    pub behavior: BehaviorLabel,
}

impl FrameAnalysisResult {
    /// Result recorded when an oracle fails
    pub fn no_signal() -> Self {
        Self {
            attention_level: 0.0,
            behavior: BehaviorLabel::NoFaceDetected,
        }
    }
}

/// Pipeline counters
#[derive(Debug, Default)]
pub struct PipelineStats {
    frames_recorded: AtomicU64,
    frames_dropped: AtomicU64,
    oracle_failures: AtomicU64,
}

impl PipelineStats {
    pub fn frames_recorded(&self) -> u64 {
        self.frames_recorded.load(Ordering::Relaxed)
    }

    /// Frames that arrived for a session already torn down
    pub fn frames_dropped(&self) -> u64 {
        self.frames_dropped.load(Ordering::Relaxed)
    }

    pub fn oracle_failures(&self) -> u64 {
        self.oracle_failures.load(Ordering::Relaxed)
    }
}

/// Per-frame analysis and recording
pub struct FramePipeline {
    store: Arc<SessionStore>,
    gaze: Arc<dyn GazeOracle>,
    emotion: Arc<dyn EmotionOracle>,
    levels: AttentionLevels,
    face_policy: MultiFacePolicy,
    stats: PipelineStats,
}

impl FramePipeline {
    pub fn new(
        store: Arc<SessionStore>,
        gaze: Arc<dyn GazeOracle>,
        emotion: Arc<dyn EmotionOracle>,
        config: &EngagementConfig,
    ) -> Self {
        Self {
            store,
            gaze,
            emotion,
            levels: config.attention,
            face_policy: config.face_policy,
            stats: PipelineStats::default(),
        }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn stats(&self) -> &PipelineStats {
        &self.stats
    }

    /// Run both oracles. An oracle error yields the no-signal result so the
    /// frame is still recorded and both histories stay the same length.
    pub fn analyze(&self, frame: &VideoFrame) -> FrameAnalysisResult {
        match self.try_analyze(frame) {
            Ok(result) => result,
            Err(e) => {
                warn!(sequence = frame.sequence, "Oracle failure, recording no signal: {}", e);
                self.stats.oracle_failures.fetch_add(1, Ordering::Relaxed);
                FrameAnalysisResult::no_signal()
            }
        }
    }

    fn try_analyze(&self, frame: &VideoFrame) -> Result<FrameAnalysisResult, OracleError> {
        let gaze = self.gaze.analyze(frame)?;
        let attention_level = self.levels.estimate(&gaze);

        let detections = self.emotion.detect(frame)?;
        for detection in &detections {
            detection.validate()?;
        }
        let behavior = classify_behavior(&detections, self.face_policy);

        Ok(FrameAnalysisResult {
            attention_level,
            behavior,
        })
    }

    /// Analyze a frame and record it for `conn`. Returns `None` when the
    /// session is gone; the result is then discarded.
    pub fn handle_frame(
        &self,
        conn: ConnectionId,
        frame: &VideoFrame,
    ) -> Option<FrameAnalysisResult> {
        let result = self.analyze(frame);
        self.record(conn, result)
    }

    /// [`FramePipeline::handle_frame`] with the oracle work moved to the
    /// blocking thread pool
    pub async fn process(
        self: &Arc<Self>,
        conn: ConnectionId,
        frame: VideoFrame,
    ) -> Option<FrameAnalysisResult> {
        let pipeline = Arc::clone(self);
        let result = match tokio::task::spawn_blocking(move || pipeline.analyze(&frame)).await {
            Ok(result) => result,
            Err(e) => {
                warn!(%conn, "Frame analysis task failed: {}", e);
                self.stats.oracle_failures.fetch_add(1, Ordering::Relaxed);
                FrameAnalysisResult::no_signal()
            }
        };
        self.record(conn, result)
    }

    fn record(
        &self,
        conn: ConnectionId,
        result: FrameAnalysisResult,
    ) -> Option<FrameAnalysisResult> {
        match self
            .store
            .append(conn, result.attention_level, result.behavior)
        {
            Ok(()) => {
                self.stats.frames_recorded.fetch_add(1, Ordering::Relaxed);
                Some(result)
            }
            Err(EngagementError::UnknownSession(_)) => {
                debug!(%conn, "Session gone, dropping frame result");
                self.stats.frames_dropped.fetch_add(1, Ordering::Relaxed);
                None
            }
            Err(e) => {
                warn!(%conn, "Failed to record frame: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::{FaceDetection, GazeReading};

    struct FixedGaze(Result<GazeReading, OracleError>);

    impl GazeOracle for FixedGaze {
        fn analyze(&self, _frame: &VideoFrame) -> Result<GazeReading, OracleError> {
            self.0.clone()
        }
    }

    struct FixedEmotion(Result<Vec<FaceDetection>, OracleError>);

    impl EmotionOracle for FixedEmotion {
        fn detect(&self, _frame: &VideoFrame) -> Result<Vec<FaceDetection>, OracleError> {
            self.0.clone()
        }
    }

    fn frame() -> VideoFrame {
        VideoFrame::new(vec![100; 2 * 2 * 3], 2, 2, 0, 0).unwrap()
    }

    fn pipeline(
        gaze: Result<GazeReading, OracleError>,
        emotion: Result<Vec<FaceDetection>, OracleError>,
    ) -> Arc<FramePipeline> {
        Arc::new(FramePipeline::new(
            Arc::new(SessionStore::new()),
            Arc::new(FixedGaze(gaze)),
            Arc::new(FixedEmotion(emotion)),
            &EngagementConfig::default(),
        ))
    }

    fn happy() -> Vec<FaceDetection> {
        vec![FaceDetection::new([("happy", 0.9), ("sad", 0.1)])]
    }

    #[test]
    fn test_handle_frame_records_result() {
        let p = pipeline(Ok(GazeReading::centered()), Ok(happy()));
        let conn = ConnectionId::new();
        p.store().on_join(conn, "r1", "Alice").unwrap();

        let result = p.handle_frame(conn, &frame()).unwrap();
        assert_eq!(result.attention_level, 0.8);
        assert_eq!(result.behavior, BehaviorLabel::Engaged);

        let snap = p.store().snapshot(conn).unwrap();
        assert_eq!(snap.attention_history, vec![0.8]);
        assert_eq!(snap.behavior_history, vec![BehaviorLabel::Engaged]);
        assert_eq!(p.stats().frames_recorded(), 1);
    }

    #[test]
    fn test_gaze_failure_records_no_signal() {
        let p = pipeline(Err(OracleError::Inference("model crashed".into())), Ok(happy()));
        let conn = ConnectionId::new();
        p.store().on_join(conn, "r1", "Alice").unwrap();

        let result = p.handle_frame(conn, &frame()).unwrap();
        assert_eq!(result, FrameAnalysisResult::no_signal());
        assert_eq!(p.store().snapshot(conn).unwrap().behavior_history.len(), 1);
        assert_eq!(p.stats().oracle_failures(), 1);
    }

    #[test]
    fn test_malformed_emotion_output_is_oracle_failure() {
        let bad = vec![FaceDetection::new([("happy", f32::NAN)])];
        let p = pipeline(Ok(GazeReading::centered()), Ok(bad));
        let conn = ConnectionId::new();
        p.store().on_join(conn, "r1", "Alice").unwrap();

        let result = p.handle_frame(conn, &frame()).unwrap();
        assert_eq!(result.behavior, BehaviorLabel::NoFaceDetected);
        assert_eq!(result.attention_level, 0.0);
    }

    #[test]
    fn test_frame_after_leave_is_dropped() {
        let p = pipeline(Ok(GazeReading::centered()), Ok(happy()));
        let conn = ConnectionId::new();
        p.store().on_join(conn, "r1", "Alice").unwrap();
        p.store().on_leave(conn).unwrap();

        assert!(p.handle_frame(conn, &frame()).is_none());
        assert!(!p.store().contains(conn));
        assert_eq!(p.stats().frames_dropped(), 1);
    }

    #[tokio::test]
    async fn test_process_preserves_arrival_order() {
        let p = pipeline(Ok(GazeReading::centered()), Ok(happy()));
        let conn = ConnectionId::new();
        p.store().on_join(conn, "r1", "Alice").unwrap();

        for _ in 0..5 {
            assert!(p.process(conn, frame()).await.is_some());
        }
        assert_eq!(p.store().snapshot(conn).unwrap().attention_history.len(), 5);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_sessions_are_isolated() {
        let p = pipeline(Ok(GazeReading::centered()), Ok(happy()));
        let conns: Vec<ConnectionId> = (0..4).map(|_| ConnectionId::new()).collect();
        for (i, conn) in conns.iter().enumerate() {
            p.store().on_join(*conn, "r1", &format!("user{}", i)).unwrap();
        }

        let tasks: Vec<_> = conns
            .iter()
            .enumerate()
            .map(|(i, conn)| {
                let p = Arc::clone(&p);
                let conn = *conn;
                tokio::spawn(async move {
                    for _ in 0..(i + 1) * 10 {
                        p.process(conn, frame()).await;
                    }
                })
            })
            .collect();
        for t in tasks {
            t.await.unwrap();
        }

        for (i, conn) in conns.iter().enumerate() {
            let snap = p.store().snapshot(*conn).unwrap();
            assert_eq!(snap.attention_history.len(), (i + 1) * 10);
            assert_eq!(snap.behavior_history.len(), (i + 1) * 10);
        }
    }
}
