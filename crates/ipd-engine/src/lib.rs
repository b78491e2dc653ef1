//! Iterated Prisoner's Dilemma engine
//!
//! Matches, round-robin tournaments and evolutionary population runs over a
//! fixed catalogue of strategies. All randomness comes from an injected
//! generator, so any run is reproducible from its seed.
//! This crate is compiled to:
//! - Native (for the arena runner and batch experiments)
//! - WASM (for the browser visualizer)

mod batch;
mod config;
mod error;
mod evolution;
mod game;
mod noise;
mod payoff;
mod random;
mod selection;
mod strategy;
mod tournament;

#[cfg(feature = "wasm")]
mod wasm;

pub use batch::{summarize, BatchRunner, BatchSummary, StrategyOutcome};
pub use config::{
    BatchConfig, EvolutionConfig, MatchConfig, SelectionMode, TournamentConfig, DEFAULT_ROUNDS,
};
pub use error::{ConfigError, EngineError, Result};
pub use evolution::{Agent, Evolution, GenerationSnapshot};
pub use game::{run_match, MatchResult, RoundResult};
pub use noise::{Noise, NoiseKind};
pub use payoff::PayoffMatrix;
pub use random::SeededRng;
pub use selection::{next_generation, Replacement, ReplacementRules};
pub use strategy::{describe_strategy, Move, Player, Strategy, StrategyBase, StrategyParams};
pub use tournament::{run_round_robin, Leaderboard, MatchRecord, Standing};

/// Standard payoff matrix for the Prisoner's Dilemma
/// Returns (score_a, score_b)
pub fn payoff(a: Move, b: Move) -> (i32, i32) {
    PayoffMatrix::STANDARD.score(a, b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payoff_matrix() {
        assert_eq!(payoff(Move::Cooperate, Move::Cooperate), (3, 3));
        assert_eq!(payoff(Move::Cooperate, Move::Defect), (0, 5));
        assert_eq!(payoff(Move::Defect, Move::Cooperate), (5, 0));
        assert_eq!(payoff(Move::Defect, Move::Defect), (1, 1));
    }
}
