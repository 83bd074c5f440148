//! Engagement scoring

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::behavior::BehaviorLabel;
use crate::EngagementError;

/// Weight for a label missing from the weight table
pub const UNMAPPED_BEHAVIOR_WEIGHT: f64 = 0.5;

/// Per-behavior weights in [0, 1]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorWeights(BTreeMap<BehaviorLabel, f64>);

impl Default for BehaviorWeights {
    fn default() -> Self {
        Self(BTreeMap::from([
            (BehaviorLabel::Engaged, 1.0),
            (BehaviorLabel::Alert, 0.8),
            (BehaviorLabel::Calm, 0.7),
            (BehaviorLabel::Neutral, 0.6),
            (BehaviorLabel::Distracted, 0.4),
            (BehaviorLabel::Agitated, 0.3),
            (BehaviorLabel::Disgusted, 0.2),
            (BehaviorLabel::Fearful, 0.1),
            (BehaviorLabel::NoFaceDetected, 0.0),
        ]))
    }
}

impl BehaviorWeights {
    /// Build from snake_case label keys. Labels left out fall back to
    /// [`UNMAPPED_BEHAVIOR_WEIGHT`].
    pub fn from_keys(table: &BTreeMap<String, f64>) -> Result<Self, String> {
        let mut weights = BTreeMap::new();
        for (key, weight) in table {
            let label = BehaviorLabel::from_key(key)
                .ok_or_else(|| format!("unknown behavior label '{}'", key))?;
            if !(0.0..=1.0).contains(weight) {
                return Err(format!("weight for '{}' = {} is outside [0, 1]", key, weight));
            }
            weights.insert(label, *weight);
        }
        Ok(Self(weights))
    }

    /// snake_case key table, the inverse of [`BehaviorWeights::from_keys`]
    pub fn to_keys(&self) -> BTreeMap<String, f64> {
        self.0
            .iter()
            .map(|(label, w)| (label.key().to_string(), *w))
            .collect()
    }

    pub fn weight(&self, label: BehaviorLabel) -> f64 {
        self.0
            .get(&label)
            .copied()
            .unwrap_or(UNMAPPED_BEHAVIOR_WEIGHT)
    }

    /// Overall score in [0, 100] from parallel attention and behavior histories
    pub fn score(
        &self,
        attention: &[f32],
        behavior: &[BehaviorLabel],
    ) -> Result<f64, EngagementError> {
        if attention.is_empty() || behavior.is_empty() {
            return Err(EngagementError::InsufficientData);
        }

        let avg_attention = mean(attention.iter().map(|a| *a as f64));
        let avg_behavior = mean(behavior.iter().map(|b| self.weight(*b)));
        Ok((avg_attention + avg_behavior) / 2.0 * 100.0)
    }
}

/// Score with the default weight table
pub fn score(attention: &[f32], behavior: &[BehaviorLabel]) -> Result<f64, EngagementError> {
    BehaviorWeights::default().score(attention, behavior)
}

/// Arithmetic mean; callers guarantee a non-empty input
pub(crate) fn mean(values: impl ExactSizeIterator<Item = f64>) -> f64 {
    let n = values.len() as f64;
    values.sum::<f64>() / n
}
