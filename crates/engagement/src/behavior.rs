//! Behavior classification from emotion confidences

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::oracle::FaceDetection;

/// Emotion names reported by the emotion oracle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Emotion {
    Angry,
    Disgust,
    Fear,
    Happy,
    Sad,
    Surprise,
    Neutral,
    /// Any name outside the canonical set
    Unknown,
}

impl Emotion {
    /// Canonical order, used to break confidence ties
    pub const CANONICAL: [Emotion; 7] = [
        Emotion::Angry,
        Emotion::Disgust,
        Emotion::Fear,
        Emotion::Happy,
        Emotion::Sad,
        Emotion::Surprise,
        Emotion::Neutral,
    ];

    /// Exact, case-sensitive lookup; anything else is `Unknown`
    pub fn from_name(name: &str) -> Self {
        match name {
            "angry" => Emotion::Angry,
            "disgust" => Emotion::Disgust,
            "fear" => Emotion::Fear,
            "happy" => Emotion::Happy,
            "sad" => Emotion::Sad,
            "surprise" => Emotion::Surprise,
            "neutral" => Emotion::Neutral,
            _ => Emotion::Unknown,
        }
    }

    /// Position in the canonical order; unknown names rank last
    fn rank(&self) -> usize {
        Self::CANONICAL
            .iter()
            .position(|e| e == self)
            .unwrap_or(Self::CANONICAL.len())
    }

    pub fn behavior(&self) -> BehaviorLabel {
        match self {
            Emotion::Angry => BehaviorLabel::Agitated,
            Emotion::Disgust => BehaviorLabel::Disgusted,
            Emotion::Fear => BehaviorLabel::Fearful,
            Emotion::Happy => BehaviorLabel::Engaged,
            Emotion::Sad => BehaviorLabel::Distracted,
            Emotion::Surprise => BehaviorLabel::Alert,
            Emotion::Neutral => BehaviorLabel::Calm,
            Emotion::Unknown => BehaviorLabel::Neutral,
        }
    }
}

/// Coarse behavior category for one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BehaviorLabel {
    Agitated,
    Disgusted,
    Fearful,
    Engaged,
    Distracted,
    Alert,
    Calm,
    /// Fallback for emotions outside the mapping table
    Neutral,
    NoFaceDetected,
}

impl BehaviorLabel {
    pub const ALL: [BehaviorLabel; 9] = [
        BehaviorLabel::Agitated,
        BehaviorLabel::Disgusted,
        BehaviorLabel::Fearful,
        BehaviorLabel::Engaged,
        BehaviorLabel::Distracted,
        BehaviorLabel::Alert,
        BehaviorLabel::Calm,
        BehaviorLabel::Neutral,
        BehaviorLabel::NoFaceDetected,
    ];

    /// Human readable label, as shown in reports
    pub fn as_str(&self) -> &'static str {
        match self {
            BehaviorLabel::Agitated => "Agitated",
            BehaviorLabel::Disgusted => "Disgusted",
            BehaviorLabel::Fearful => "Fearful",
            BehaviorLabel::Engaged => "Engaged",
            BehaviorLabel::Distracted => "Distracted",
            BehaviorLabel::Alert => "Alert",
            BehaviorLabel::Calm => "Calm",
            BehaviorLabel::Neutral => "Neutral",
            BehaviorLabel::NoFaceDetected => "No face detected",
        }
    }

    /// Parse a snake_case key, as used in configuration files
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|label| label.key() == key)
    }

    pub fn key(&self) -> &'static str {
        match self {
            BehaviorLabel::Agitated => "agitated",
            BehaviorLabel::Disgusted => "disgusted",
            BehaviorLabel::Fearful => "fearful",
            BehaviorLabel::Engaged => "engaged",
            BehaviorLabel::Distracted => "distracted",
            BehaviorLabel::Alert => "alert",
            BehaviorLabel::Calm => "calm",
            BehaviorLabel::Neutral => "neutral",
            BehaviorLabel::NoFaceDetected => "no_face_detected",
        }
    }
}

impl fmt::Display for BehaviorLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which face drives classification when the oracle reports several
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MultiFacePolicy {
    /// First detection in oracle order; other faces are ignored
    #[default]
    First,
    /// Detection whose strongest emotion has the highest confidence
    MostConfident,
    /// Per-emotion mean confidence across all detections
    Average,
}

/// Classify behavior from the emotion oracle output
pub fn classify_behavior(detections: &[FaceDetection], policy: MultiFacePolicy) -> BehaviorLabel {
    let averaged;
    let face = match policy {
        _ if detections.is_empty() => return BehaviorLabel::NoFaceDetected,
        MultiFacePolicy::First => &detections[0],
        MultiFacePolicy::MostConfident => detections
            .iter()
            .reduce(|best, d| {
                if d.peak_confidence() > best.peak_confidence() {
                    d
                } else {
                    best
                }
            })
            .unwrap_or(&detections[0]),
        MultiFacePolicy::Average => {
            averaged = average_detections(detections);
            &averaged
        }
    };

    dominant_emotion(face)
        .map(|(_, emotion)| emotion.behavior())
        .unwrap_or(BehaviorLabel::Neutral)
}

/// Max-confidence emotion of one face, ties broken by canonical order then name
fn dominant_emotion(face: &FaceDetection) -> Option<(&str, Emotion)> {
    face.emotions
        .iter()
        .map(|(name, confidence)| (name.as_str(), Emotion::from_name(name), *confidence))
        .max_by(|a, b| {
            a.2.total_cmp(&b.2)
                .then_with(|| b.1.rank().cmp(&a.1.rank()))
                .then_with(|| b.0.cmp(a.0))
        })
        .map(|(name, emotion, _)| (name, emotion))
}

fn average_detections(detections: &[FaceDetection]) -> FaceDetection {
    let mut sums: Vec<(String, f32)> = Vec::new();
    for (name, confidence) in detections.iter().flat_map(|d| d.emotions.iter()) {
        match sums.iter_mut().find(|(n, _)| n == name) {
            Some((_, sum)) => *sum += confidence,
            None => sums.push((name.clone(), *confidence)),
        }
    }

    let faces = detections.len() as f32;
    FaceDetection {
        emotions: sums.into_iter().map(|(n, s)| (n, s / faces)).collect(),
    }
}
