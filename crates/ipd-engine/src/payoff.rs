//! Payoff matrix for the Prisoner's Dilemma

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::strategy::Move;

/// Per-round payoffs, named after the four classic outcomes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoffMatrix {
    /// Defecting against a cooperator (T)
    pub temptation: i32,
    /// Mutual cooperation (R)
    pub reward: i32,
    /// Mutual defection (P)
    pub punishment: i32,
    /// Cooperating against a defector (S)
    pub sucker: i32,
}

impl PayoffMatrix {
    /// Axelrod's values: T=5, R=3, P=1, S=0
    pub const STANDARD: Self = Self {
        temptation: 5,
        reward: 3,
        punishment: 1,
        sucker: 0,
    };

    /// Returns (own_score, opponent_score) for one round
    pub fn score(&self, own: Move, opponent: Move) -> (i32, i32) {
        match (own, opponent) {
            (Move::Cooperate, Move::Cooperate) => (self.reward, self.reward),
            (Move::Cooperate, Move::Defect) => (self.sucker, self.temptation),
            (Move::Defect, Move::Cooperate) => (self.temptation, self.sucker),
            (Move::Defect, Move::Defect) => (self.punishment, self.punishment),
        }
    }

    /// Check T > R > P > S and 2R > T + S
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.temptation <= self.reward {
            return Err(ConfigError::InvalidPayoff("temptation > reward"));
        }
        if self.reward <= self.punishment {
            return Err(ConfigError::InvalidPayoff("reward > punishment"));
        }
        if self.punishment <= self.sucker {
            return Err(ConfigError::InvalidPayoff("punishment > sucker"));
        }
        // i64 so extreme custom matrices cannot overflow the check itself
        if 2 * self.reward as i64 <= self.temptation as i64 + self.sucker as i64 {
            return Err(ConfigError::InvalidPayoff("2 * reward > temptation + sucker"));
        }
        Ok(())
    }
}

impl Default for PayoffMatrix {
    fn default() -> Self {
        Self::STANDARD
    }
}
