//! Attention estimation from gaze predicates

use serde::{Deserialize, Serialize};

use crate::oracle::GazeReading;

/// Attention level assigned to each gaze state
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttentionLevels {
    /// Pupils not located
    pub no_pupils: f32,
    pub blinking: f32,
    /// Looking left or right
    pub lateral: f32,
    pub center: f32,
    /// Pupils located but no direction predicate set
    pub ambiguous: f32,
}

impl Default for AttentionLevels {
    fn default() -> Self {
        Self {
            no_pupils: 0.0,
            blinking: 0.2,
            lateral: 0.4,
            center: 0.8,
            ambiguous: 0.5,
        }
    }
}

impl AttentionLevels {
    /// Map a gaze reading to an attention level. First matching rule wins.
    pub fn estimate(&self, gaze: &GazeReading) -> f32 {
        if !gaze.pupils_located {
            self.no_pupils
        } else if gaze.is_blinking {
            self.blinking
        } else if gaze.is_left || gaze.is_right {
            self.lateral
        } else if gaze.is_center {
            self.center
        } else {
            self.ambiguous
        }
    }

    /// Every level must be in [0, 1]
    pub fn validate(&self) -> Result<(), String> {
        let levels = [
            ("no_pupils", self.no_pupils),
            ("blinking", self.blinking),
            ("lateral", self.lateral),
            ("center", self.center),
            ("ambiguous", self.ambiguous),
        ];
        for (name, value) in levels {
            if !(0.0..=1.0).contains(&value) {
                return Err(format!("attention level {} = {} is outside [0, 1]", name, value));
            }
        }
        Ok(())
    }
}

/// Attention level using the default table
pub fn estimate_attention(gaze: &GazeReading) -> f32 {
    AttentionLevels::default().estimate(gaze)
}
