//! Communication noise applied after a strategy has decided

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{check_probability, ConfigError};
use crate::strategy::Move;

/// Which intended moves noise may corrupt
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoiseKind {
    /// Either move can be flipped into the other
    #[default]
    Flip,
    /// Only a Cooperate can be garbled into a Defect
    Miscommunication,
}

/// Noise settings for a match
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Noise {
    pub probability: f64,
    pub kind: NoiseKind,
}

impl Noise {
    /// No noise at all
    pub const NONE: Self = Self {
        probability: 0.0,
        kind: NoiseKind::Flip,
    };

    /// Symmetric flip noise
    pub fn flip(probability: f64) -> Self {
        Self {
            probability,
            kind: NoiseKind::Flip,
        }
    }

    /// Cooperate-to-defect noise only
    pub fn miscommunication(probability: f64) -> Self {
        Self {
            probability,
            kind: NoiseKind::Miscommunication,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_probability("noise_probability", self.probability)
    }

    /// Turn an intended move into the move actually played
    ///
    /// Returns the actual move and whether noise changed it. A zero
    /// probability never consumes randomness.
    pub fn apply<R: Rng + ?Sized>(&self, intended: Move, rng: &mut R) -> (Move, bool) {
        if self.probability <= 0.0 {
            return (intended, false);
        }
        if self.kind == NoiseKind::Miscommunication && intended == Move::Defect {
            return (intended, false);
        }

        if rng.random_bool(self.probability) {
            (intended.flipped(), true)
        } else {
            (intended, false)
        }
    }
}
