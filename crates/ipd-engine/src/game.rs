//! Match execution engine

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::config::MatchConfig;
use crate::error::Result;
use crate::strategy::{Move, Player, Strategy};

/// Result of a single round
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoundResult {
    pub round: u32,
    /// Moves as actually played, after noise
    pub move_a: Move,
    pub move_b: Move,
    /// Whether noise overrode the intended move
    pub noise_a: bool,
    pub noise_b: bool,
    pub score_a: i32,
    pub score_b: i32,
    pub cumulative_a: i64,
    pub cumulative_b: i64,
}

/// Result of a complete match
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub rounds: Vec<RoundResult>,
    pub history_a: Vec<Move>,
    pub history_b: Vec<Move>,
    pub total_score_a: i64,
    pub total_score_b: i64,
    pub round_count: u32,
}

impl MatchResult {
    /// Rounds in which noise changed at least one move
    pub fn noisy_rounds(&self) -> usize {
        self.rounds.iter().filter(|r| r.noise_a || r.noise_b).count()
    }
}

/// Run a complete match between two strategies
///
/// Each side gets a fresh [`Player`], so no state carries over from earlier
/// matches. Noise is applied to each intended move independently; only the
/// actual moves reach the histories and the payoff lookup.
///
/// # Arguments
/// * `strategy_a` - First player's strategy
/// * `strategy_b` - Second player's strategy
/// * `config` - Round count, noise and payoff matrix
/// * `rng` - Source for noise and stochastic strategies
///
/// # Returns
/// Complete match result with round-by-round details
pub fn run_match<R: Rng + ?Sized>(
    strategy_a: &Strategy,
    strategy_b: &Strategy,
    config: &MatchConfig,
    rng: &mut R,
) -> Result<MatchResult> {
    config.validate()?;
    strategy_a.validate()?;
    strategy_b.validate()?;

    Ok(play(strategy_a, strategy_b, config, rng))
}

/// Match loop without validation, for callers that validated up front
pub(crate) fn play<R: Rng + ?Sized>(
    strategy_a: &Strategy,
    strategy_b: &Strategy,
    config: &MatchConfig,
    rng: &mut R,
) -> MatchResult {
    let round_count = config.round_count;
    let capacity = round_count as usize;

    let mut player_a = Player::new(*strategy_a);
    let mut player_b = Player::new(*strategy_b);

    let mut history_a: Vec<Move> = Vec::with_capacity(capacity);
    let mut history_b: Vec<Move> = Vec::with_capacity(capacity);
    let mut rounds: Vec<RoundResult> = Vec::with_capacity(capacity);
    let mut total_a = 0i64;
    let mut total_b = 0i64;

    for round in 0..round_count {
        // Both decide on the same history snapshot
        let intended_a = player_a.decide(&history_a, &history_b, rng);
        let intended_b = player_b.decide(&history_b, &history_a, rng);

        let (move_a, noise_a) = config.noise.apply(intended_a, rng);
        let (move_b, noise_b) = config.noise.apply(intended_b, rng);

        let (score_a, score_b) = config.payoff.score(move_a, move_b);
        total_a += score_a as i64;
        total_b += score_b as i64;

        rounds.push(RoundResult {
            round,
            move_a,
            move_b,
            noise_a,
            noise_b,
            score_a,
            score_b,
            cumulative_a: total_a,
            cumulative_b: total_b,
        });

        history_a.push(move_a);
        history_b.push(move_b);
    }

    trace!(
        a = ?strategy_a.base,
        b = ?strategy_b.base,
        total_a,
        total_b,
        "match finished"
    );

    MatchResult {
        rounds,
        history_a,
        history_b,
        total_score_a: total_a,
        total_score_b: total_b,
        round_count,
    }
}
