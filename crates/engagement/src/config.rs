//! Engagement engine configuration

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::attention::AttentionLevels;
use crate::behavior::MultiFacePolicy;
use crate::scoring::BehaviorWeights;
use crate::EngagementError;

/// Engagement engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngagementConfig {
    /// Attention level per gaze state
    pub attention: AttentionLevels,

    /// Score weight per behavior label (snake_case keys)
    pub behavior_weights: BTreeMap<String, f64>,

    /// Face selection when several faces are detected
    pub face_policy: MultiFacePolicy,
}

impl Default for EngagementConfig {
    fn default() -> Self {
        Self {
            attention: AttentionLevels::default(),
            behavior_weights: BehaviorWeights::default().to_keys(),
            face_policy: MultiFacePolicy::default(),
        }
    }
}

impl EngagementConfig {
    /// Check ranges and label names
    pub fn validate(&self) -> Result<(), EngagementError> {
        self.attention
            .validate()
            .map_err(EngagementError::InvalidConfig)?;
        self.weights()?;
        Ok(())
    }

    /// Parsed behavior weight table
    pub fn weights(&self) -> Result<BehaviorWeights, EngagementError> {
        BehaviorWeights::from_keys(&self.behavior_weights).map_err(EngagementError::InvalidConfig)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = EngagementConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.weights().unwrap(), BehaviorWeights::default());
        assert_eq!(config.face_policy, MultiFacePolicy::First);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: EngagementConfig =
            serde_json::from_str(r#"{"face_policy": "most_confident", "attention": {"center": 0.9}}"#)
                .unwrap();
        assert_eq!(config.face_policy, MultiFacePolicy::MostConfident);
        assert_eq!(config.attention.center, 0.9);
        assert_eq!(config.attention.blinking, 0.2);
        assert_eq!(config.behavior_weights.len(), 9);
    }

    #[test]
    fn test_invalid_weight_label() {
        let mut config = EngagementConfig::default();
        config.behavior_weights.insert("sleepy".to_string(), 0.1);
        assert!(matches!(
            config.validate(),
            Err(EngagementError::InvalidConfig(_))
        ));
    }
}
