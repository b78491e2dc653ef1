//! Strategy definitions and execution

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{check_probability, ConfigError};

/// A move in the Prisoner's Dilemma
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Move {
    Cooperate,
    Defect,
}

impl Move {
    /// The opposite move
    pub fn flipped(self) -> Self {
        match self {
            Move::Cooperate => Move::Defect,
            Move::Defect => Move::Cooperate,
        }
    }
}

/// Base strategy type
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StrategyBase {
    /// Always cooperate, never defect.
    AlwaysCooperate,
    /// Always defect, never cooperate.
    AlwaysDefect,
    /// Copy opponent's last move. Start with cooperate.
    TitForTat,
    /// Cooperate until opponent defects once, then always defect.
    Grudger,
    /// Win-stay, lose-switch. Repeat move if good outcome.
    Pavlov,
    /// Tit-for-Tat that sometimes forgives a defection.
    GenerousTitForTat,
    /// Defect only if opponent defected twice in a row.
    TitForTwoTats,
    /// Tit-for-Tat but start with defect.
    SuspiciousTitForTat,
    /// Open with C, D, C, C then exploit pushovers or mirror retaliators.
    Detective,
    /// Retaliate with increasing defection streaks, then forgive.
    Gradual,
    /// Cooperate while the opponent cooperated at least half the time.
    SoftMajority,
    /// Random choice each round.
    Random,
}

impl StrategyBase {
    /// Every shipped strategy, in catalogue order
    pub const ALL: [StrategyBase; 12] = [
        StrategyBase::AlwaysCooperate,
        StrategyBase::AlwaysDefect,
        StrategyBase::TitForTat,
        StrategyBase::Grudger,
        StrategyBase::Pavlov,
        StrategyBase::GenerousTitForTat,
        StrategyBase::TitForTwoTats,
        StrategyBase::SuspiciousTitForTat,
        StrategyBase::Detective,
        StrategyBase::Gradual,
        StrategyBase::SoftMajority,
        StrategyBase::Random,
    ];

    /// The ten conditional archetypes, without the two unconditional baselines
    pub const ARCHETYPES: [StrategyBase; 10] = [
        StrategyBase::TitForTat,
        StrategyBase::Grudger,
        StrategyBase::Pavlov,
        StrategyBase::GenerousTitForTat,
        StrategyBase::TitForTwoTats,
        StrategyBase::SuspiciousTitForTat,
        StrategyBase::Detective,
        StrategyBase::Gradual,
        StrategyBase::SoftMajority,
        StrategyBase::Random,
    ];

    /// Display name
    pub fn name(self) -> &'static str {
        match self {
            StrategyBase::AlwaysCooperate => "Always Cooperate",
            StrategyBase::AlwaysDefect => "Always Defect",
            StrategyBase::TitForTat => "Tit for Tat",
            StrategyBase::Grudger => "Grudger",
            StrategyBase::Pavlov => "Pavlov",
            StrategyBase::GenerousTitForTat => "Generous Tit for Tat",
            StrategyBase::TitForTwoTats => "Tit for Two Tats",
            StrategyBase::SuspiciousTitForTat => "Suspicious Tit for Tat",
            StrategyBase::Detective => "Detective",
            StrategyBase::Gradual => "Gradual",
            StrategyBase::SoftMajority => "Soft Majority",
            StrategyBase::Random => "Random",
        }
    }

    /// One-line behaviour summary
    pub fn description(self) -> &'static str {
        match self {
            StrategyBase::AlwaysCooperate => "Never defects. Always cooperates.",
            StrategyBase::AlwaysDefect => "Never cooperates. Always defects.",
            StrategyBase::TitForTat => "Copies opponent's last move. Starts by cooperating.",
            StrategyBase::Grudger => "Cooperates until betrayed, then always defects.",
            StrategyBase::Pavlov => "Repeats move if outcome was good, switches if bad.",
            StrategyBase::GenerousTitForTat => "Like Tit for Tat, but sometimes forgives a defection.",
            StrategyBase::TitForTwoTats => "Only retaliates after two consecutive defections.",
            StrategyBase::SuspiciousTitForTat => "Like Tit for Tat, but starts with defect.",
            StrategyBase::Detective => "Opens with C, D, C, C. Exploits pushovers, mirrors everyone else.",
            StrategyBase::Gradual => "Retaliates with increasing severity, then forgives.",
            StrategyBase::SoftMajority => "Cooperates while the opponent cooperated at least half the time.",
            StrategyBase::Random => "Randomly cooperates or defects each round.",
        }
    }
}

/// Strategy parameters for fine-tuning behavior
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyParams {
    /// Chance that Generous Tit-for-Tat cooperates where it would retaliate
    pub forgiveness: f64,
    /// Chance that Random cooperates
    pub cooperate_bias: f64,
}

impl Default for StrategyParams {
    fn default() -> Self {
        Self {
            forgiveness: 0.10,
            cooperate_bias: 0.5,
        }
    }
}

/// Complete strategy with base type and parameters
///
/// This is an immutable blueprint. Per-match state lives in [`Player`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Strategy {
    pub base: StrategyBase,
    #[serde(default)]
    pub params: StrategyParams,
}

impl Strategy {
    /// Create a new strategy with default parameters
    pub fn new(base: StrategyBase) -> Self {
        Self {
            base,
            params: StrategyParams::default(),
        }
    }

    /// Create with custom parameters
    pub fn with_params(base: StrategyBase, params: StrategyParams) -> Self {
        Self { base, params }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_probability("forgiveness", self.params.forgiveness)?;
        check_probability("cooperate_bias", self.params.cooperate_bias)
    }
}

impl Default for Strategy {
    fn default() -> Self {
        Self::new(StrategyBase::TitForTat)
    }
}

impl From<StrategyBase> for Strategy {
    fn from(base: StrategyBase) -> Self {
        Self::new(base)
    }
}

/// Detective's fixed opening
const OPENING_GAMBIT: [Move; 4] = [Move::Cooperate, Move::Defect, Move::Cooperate, Move::Cooperate];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Verdict {
    Retaliator,
    Pushover,
}

/// A strategy's rule together with its per-match memory.
///
/// Stateful variants carry their own counters, so a rule can only ever see
/// the memory it owns.
#[derive(Clone, Debug, PartialEq)]
enum Behavior {
    AlwaysCooperate,
    AlwaysDefect,
    TitForTat,
    Grudger {
        betrayed: bool,
    },
    Pavlov,
    GenerousTitForTat {
        forgiveness: f64,
    },
    TitForTwoTats,
    SuspiciousTitForTat,
    Detective {
        verdict: Option<Verdict>,
    },
    Gradual {
        punishment_left: usize,
        defections_seen: usize,
    },
    SoftMajority,
    Random {
        cooperate_bias: f64,
    },
}

impl Behavior {
    fn fresh(strategy: &Strategy) -> Self {
        match strategy.base {
            StrategyBase::AlwaysCooperate => Behavior::AlwaysCooperate,
            StrategyBase::AlwaysDefect => Behavior::AlwaysDefect,
            StrategyBase::TitForTat => Behavior::TitForTat,
            StrategyBase::Grudger => Behavior::Grudger { betrayed: false },
            StrategyBase::Pavlov => Behavior::Pavlov,
            StrategyBase::GenerousTitForTat => Behavior::GenerousTitForTat {
                forgiveness: strategy.params.forgiveness,
            },
            StrategyBase::TitForTwoTats => Behavior::TitForTwoTats,
            StrategyBase::SuspiciousTitForTat => Behavior::SuspiciousTitForTat,
            StrategyBase::Detective => Behavior::Detective { verdict: None },
            StrategyBase::Gradual => Behavior::Gradual {
                punishment_left: 0,
                defections_seen: 0,
            },
            StrategyBase::SoftMajority => Behavior::SoftMajority,
            StrategyBase::Random => Behavior::Random {
                cooperate_bias: strategy.params.cooperate_bias,
            },
        }
    }
}

/// One side of a single match: a strategy plus its private match memory.
///
/// Build a new player for every match; memory never outlives it.
#[derive(Clone, Debug)]
pub struct Player {
    strategy: Strategy,
    behavior: Behavior,
}

impl Player {
    pub fn new(strategy: Strategy) -> Self {
        Self {
            behavior: Behavior::fresh(&strategy),
            strategy,
        }
    }

    pub fn strategy(&self) -> &Strategy {
        &self.strategy
    }

    /// Choose the next move from the histories played so far
    ///
    /// # Arguments
    /// * `my_history` - Our past moves, as actually played
    /// * `opponent_history` - Opponent's past moves, as actually played
    /// * `rng` - Random source for the stochastic strategies
    pub fn decide<R: Rng + ?Sized>(
        &mut self,
        my_history: &[Move],
        opponent_history: &[Move],
        rng: &mut R,
    ) -> Move {
        match &mut self.behavior {
            Behavior::AlwaysCooperate => Move::Cooperate,
            Behavior::AlwaysDefect => Move::Defect,
            Behavior::TitForTat => mirror(opponent_history, Move::Cooperate),
            Behavior::Grudger { betrayed } => execute_grudger(betrayed, opponent_history),
            Behavior::Pavlov => execute_pavlov(my_history, opponent_history),
            Behavior::GenerousTitForTat { forgiveness } => {
                execute_generous_tit_for_tat(opponent_history, *forgiveness, rng)
            }
            Behavior::TitForTwoTats => execute_tit_for_two_tats(opponent_history),
            Behavior::SuspiciousTitForTat => mirror(opponent_history, Move::Defect),
            Behavior::Detective { verdict } => {
                execute_detective(verdict, my_history, opponent_history)
            }
            Behavior::Gradual {
                punishment_left,
                defections_seen,
            } => execute_gradual(punishment_left, defections_seen, opponent_history),
            Behavior::SoftMajority => execute_soft_majority(opponent_history),
            Behavior::Random { cooperate_bias } => {
                if rng.random_bool(*cooperate_bias) {
                    Move::Cooperate
                } else {
                    Move::Defect
                }
            }
        }
    }
}

/// Copy opponent's last move, `opening` on round 0
fn mirror(opponent_history: &[Move], opening: Move) -> Move {
    opponent_history.last().copied().unwrap_or(opening)
}

fn execute_grudger(betrayed: &mut bool, opponent_history: &[Move]) -> Move {
    if !*betrayed && opponent_history.contains(&Move::Defect) {
        *betrayed = true;
    }

    if *betrayed {
        Move::Defect
    } else {
        Move::Cooperate
    }
}

/// Pavlov: Win-stay, lose-switch
/// - Opponent cooperated last round (we got R or T): repeat our move
/// - Opponent defected (we got S or P): switch
fn execute_pavlov(my_history: &[Move], opponent_history: &[Move]) -> Move {
    match (my_history.last(), opponent_history.last()) {
        (Some(mine), Some(Move::Cooperate)) => *mine,
        (Some(mine), Some(Move::Defect)) => mine.flipped(),
        _ => Move::Cooperate,
    }
}

fn execute_generous_tit_for_tat<R: Rng + ?Sized>(
    opponent_history: &[Move],
    forgiveness: f64,
    rng: &mut R,
) -> Move {
    match opponent_history.last() {
        Some(Move::Defect) => {
            // Independent draw every time the rule calls for retaliation
            if rng.random_bool(forgiveness) {
                Move::Cooperate
            } else {
                Move::Defect
            }
        }
        _ => Move::Cooperate,
    }
}

/// Tit-for-Two-Tats: Only defect if opponent defected twice in a row
fn execute_tit_for_two_tats(opponent_history: &[Move]) -> Move {
    match opponent_history {
        [.., Move::Defect, Move::Defect] => Move::Defect,
        _ => Move::Cooperate,
    }
}

fn execute_detective(
    verdict: &mut Option<Verdict>,
    my_history: &[Move],
    opponent_history: &[Move],
) -> Move {
    let round = my_history.len();
    if round < OPENING_GAMBIT.len() {
        return OPENING_GAMBIT[round];
    }

    let verdict = *verdict.get_or_insert_with(|| {
        if opponent_history.iter().take(OPENING_GAMBIT.len()).any(|m| *m == Move::Defect) {
            Verdict::Retaliator
        } else {
            Verdict::Pushover
        }
    });

    match verdict {
        Verdict::Pushover => Move::Defect,
        Verdict::Retaliator => mirror(opponent_history, Move::Cooperate),
    }
}

/// Gradual: Escalating retaliation
/// Each newly seen opponent defection schedules as many defections as the
/// opponent has committed in total. Once the debt is paid it cooperates, so
/// the two conciliatory rounds are whatever follows unless the opponent
/// defects again first.
fn execute_gradual(
    punishment_left: &mut usize,
    defections_seen: &mut usize,
    opponent_history: &[Move],
) -> Move {
    let total = opponent_history
        .iter()
        .filter(|m| **m == Move::Defect)
        .count();

    if total > *defections_seen {
        *punishment_left += total;
        *defections_seen = total;
    }

    if *punishment_left > 0 {
        *punishment_left -= 1;
        Move::Defect
    } else {
        Move::Cooperate
    }
}

/// Soft Majority: ties go to cooperation
fn execute_soft_majority(opponent_history: &[Move]) -> Move {
    let cooperations = opponent_history
        .iter()
        .filter(|m| **m == Move::Cooperate)
        .count();

    if 2 * cooperations >= opponent_history.len() {
        Move::Cooperate
    } else {
        Move::Defect
    }
}

/// Get a human-readable description of a strategy
pub fn describe_strategy(strategy: &Strategy) -> String {
    let mut desc = strategy.base.description().to_string();

    match strategy.base {
        StrategyBase::GenerousTitForTat => {
            desc.push_str(&format!(
                " {:.0}% chance to forgive.",
                strategy.params.forgiveness * 100.0
            ));
        }
        StrategyBase::Random => {
            desc.push_str(&format!(
                " Cooperates {:.0}% of the time.",
                strategy.params.cooperate_bias * 100.0
            ));
        }
        _ => {}
    }

    desc
}
