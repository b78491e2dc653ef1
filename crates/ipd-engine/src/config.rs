//! Run configuration
//!
//! Every config is plain serde data with defaults matching the classic
//! experiment setup, plus a `validate()` that rejects bad values before any
//! round is played.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{check_probability, ConfigError, Result};
use crate::noise::Noise;
use crate::payoff::PayoffMatrix;
use crate::strategy::{Strategy, StrategyBase, StrategyParams};

/// Rounds per match in the classic setup
pub const DEFAULT_ROUNDS: u32 = 200;

/// Settings for a single match
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    pub round_count: u32,
    pub noise: Noise,
    pub payoff: PayoffMatrix,
}

impl MatchConfig {
    pub fn new(round_count: u32, noise: Noise) -> Self {
        Self {
            round_count,
            noise,
            payoff: PayoffMatrix::STANDARD,
        }
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.round_count == 0 {
            return Err(ConfigError::ZeroRounds);
        }
        self.noise.validate()?;
        self.payoff.validate()
    }
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self::new(DEFAULT_ROUNDS, Noise::NONE)
    }
}

/// Settings for a round-robin tournament
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TournamentConfig {
    #[serde(rename = "match")]
    pub match_config: MatchConfig,
    /// Whether every entry also plays a fresh copy of itself
    pub self_play: bool,
}

impl TournamentConfig {
    pub fn new(match_config: MatchConfig) -> Self {
        Self {
            match_config,
            self_play: true,
        }
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        self.match_config.validate()
    }
}

impl Default for TournamentConfig {
    fn default() -> Self {
        Self::new(MatchConfig::default())
    }
}

/// How the next generation is drawn from the current one
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SelectionMode {
    /// Cull the weakest `fraction` and refill with clones of the strongest
    Truncation {
        #[serde(default = "default_fraction")]
        fraction: f64,
    },
    /// Resample the whole population with probability proportional to fitness
    FitnessProportional,
}

fn default_fraction() -> f64 {
    0.10
}

impl SelectionMode {
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        match *self {
            SelectionMode::Truncation { fraction } if !(0.0..=0.5).contains(&fraction) => {
                Err(ConfigError::FractionOutOfRange(fraction))
            }
            _ => Ok(()),
        }
    }
}

impl Default for SelectionMode {
    fn default() -> Self {
        SelectionMode::Truncation {
            fraction: default_fraction(),
        }
    }
}

/// Settings for a multi-generation evolutionary run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvolutionConfig {
    #[serde(rename = "match")]
    pub match_config: MatchConfig,
    pub population_size: usize,
    /// Agents of each strategy in generation 0; must sum to `population_size`
    pub initial_distribution: BTreeMap<StrategyBase, usize>,
    /// Parameters shared by every agent's strategy
    pub strategy_params: StrategyParams,
    pub selection: SelectionMode,
    pub generation_count: u32,
    /// Chance that an offspring takes a random strategy from `mutation_pool`
    pub mutation_rate: f64,
    pub mutation_pool: Vec<StrategyBase>,
    pub self_play: bool,
    /// `None` seeds from entropy; the run is then not reproducible
    pub random_seed: Option<u64>,
}

impl EvolutionConfig {
    /// Population with `count` agents of each listed strategy
    pub fn uniform(strategies: &[StrategyBase], count: usize) -> Self {
        let initial_distribution: BTreeMap<_, _> =
            strategies.iter().map(|base| (*base, count)).collect();
        Self {
            population_size: initial_distribution.values().sum(),
            initial_distribution,
            ..Self::default()
        }
    }

    /// Parse and validate a JSON configuration
    ///
    /// Counts are unsigned, so a negative `round_count` or `generation_count`
    /// is a parse failure (`EngineError::Json`); a zero count parses and is
    /// then rejected as `InvalidConfiguration`.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        self.match_config.validate()?;

        if self.population_size < 2 {
            return Err(ConfigError::PopulationTooSmall(self.population_size));
        }
        let seeded: usize = self.initial_distribution.values().sum();
        if seeded != self.population_size {
            return Err(ConfigError::DistributionMismatch {
                expected: self.population_size,
                actual: seeded,
            });
        }
        if self.generation_count == 0 {
            return Err(ConfigError::ZeroGenerations);
        }

        self.selection.validate()?;
        check_probability("mutation_rate", self.mutation_rate)?;
        if self.mutation_rate > 0.0 && self.mutation_pool.is_empty() {
            return Err(ConfigError::EmptyMutationPool(self.mutation_rate));
        }

        Strategy::with_params(StrategyBase::TitForTat, self.strategy_params).validate()
    }

    pub(crate) fn strategy(&self, base: StrategyBase) -> Strategy {
        Strategy::with_params(base, self.strategy_params)
    }

    pub(crate) fn tournament(&self) -> TournamentConfig {
        TournamentConfig {
            match_config: self.match_config,
            self_play: self.self_play,
        }
    }
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        let initial_distribution: BTreeMap<_, _> = StrategyBase::ARCHETYPES
            .iter()
            .map(|base| (*base, 5))
            .collect();

        Self {
            match_config: MatchConfig::default(),
            population_size: initial_distribution.values().sum(),
            initial_distribution,
            strategy_params: StrategyParams::default(),
            selection: SelectionMode::default(),
            generation_count: 50,
            mutation_rate: 0.0,
            mutation_pool: StrategyBase::ALL.to_vec(),
            self_play: true,
            random_seed: None,
        }
    }
}

/// Settings for many independent evolutionary runs
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub runs: usize,
    /// Template for every run; its `random_seed` is the batch base seed
    pub evolution: EvolutionConfig,
}

impl BatchConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.runs == 0 {
            return Err(ConfigError::ZeroRuns);
        }
        self.evolution.validate()
    }
}

impl Default for BatchConfig {
    /// The headless experiment: 1000 runs of 50 generations with 5 %
    /// miscommunication and 2 % mutation among the ten archetypes
    fn default() -> Self {
        let mut evolution = EvolutionConfig::uniform(&StrategyBase::ARCHETYPES, 5);
        evolution.match_config.noise = Noise::miscommunication(0.05);
        evolution.mutation_rate = 0.02;
        evolution.mutation_pool = StrategyBase::ARCHETYPES.to_vec();

        Self {
            runs: 1000,
            evolution,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use crate::noise::NoiseKind;

    #[test]
    fn test_defaults_are_valid() {
        assert_eq!(MatchConfig::default().validate(), Ok(()));
        assert_eq!(TournamentConfig::default().validate(), Ok(()));
        assert_eq!(EvolutionConfig::default().validate(), Ok(()));
        assert_eq!(BatchConfig::default().validate(), Ok(()));
        assert_eq!(EvolutionConfig::default().population_size, 50);
    }

    #[test]
    fn test_match_config_rejects_zero_rounds() {
        let config = MatchConfig::new(0, Noise::NONE);
        assert_eq!(config.validate(), Err(ConfigError::ZeroRounds));
    }

    #[test]
    fn test_population_too_small() {
        let config = EvolutionConfig::uniform(&[StrategyBase::TitForTat], 1);
        assert_eq!(config.validate(), Err(ConfigError::PopulationTooSmall(1)));
    }

    #[test]
    fn test_distribution_must_sum_to_size() {
        let mut config = EvolutionConfig::uniform(&[StrategyBase::TitForTat, StrategyBase::AlwaysDefect], 3);
        config.population_size = 7;
        assert_eq!(
            config.validate(),
            Err(ConfigError::DistributionMismatch { expected: 7, actual: 6 })
        );
    }

    #[test]
    fn test_zero_generations() {
        let config = EvolutionConfig {
            generation_count: 0,
            ..EvolutionConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroGenerations));
    }

    #[test]
    fn test_fraction_bounds() {
        let config = EvolutionConfig {
            selection: SelectionMode::Truncation { fraction: 0.6 },
            ..EvolutionConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::FractionOutOfRange(0.6)));
    }

    #[test]
    fn test_mutation_needs_pool() {
        let config = EvolutionConfig {
            mutation_rate: 0.1,
            mutation_pool: Vec::new(),
            ..EvolutionConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::EmptyMutationPool(0.1)));
    }

    #[test]
    fn test_evolution_from_json() {
        let json = r#"{
            "match": { "round_count": 100, "noise": { "probability": 0.05 } },
            "population_size": 20,
            "initial_distribution": { "AlwaysCooperate": 10, "AlwaysDefect": 10 },
            "selection": { "mode": "fitness_proportional" },
            "generation_count": 30,
            "random_seed": 42
        }"#;
        let config = EvolutionConfig::from_json(json).unwrap();
        assert_eq!(config.match_config.round_count, 100);
        assert_eq!(config.match_config.noise.kind, NoiseKind::Flip);
        assert_eq!(config.initial_distribution[&StrategyBase::AlwaysDefect], 10);
        assert_eq!(config.selection, SelectionMode::FitnessProportional);
        assert_eq!(config.random_seed, Some(42));
        assert!(config.self_play);
    }

    #[test]
    fn test_negative_counts_fail_to_parse() {
        let err = EvolutionConfig::from_json(r#"{ "generation_count": -1 }"#).unwrap_err();
        assert!(matches!(err, EngineError::Json(_)));

        let err = EvolutionConfig::from_json(r#"{ "match": { "round_count": -5 } }"#).unwrap_err();
        assert!(matches!(err, EngineError::Json(_)));

        let err = EvolutionConfig::from_json(r#"{ "match": { "round_count": 0 } }"#).unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfiguration(ConfigError::ZeroRounds)));
    }

    #[test]
    fn test_truncation_fraction_defaults() {
        let mode: SelectionMode = serde_json::from_str(r#"{"mode": "truncation"}"#).unwrap();
        assert_eq!(mode, SelectionMode::Truncation { fraction: 0.10 });
    }

    #[test]
    fn test_from_json_validates() {
        let json = r#"{ "population_size": 3, "initial_distribution": { "Pavlov": 2 } }"#;
        let err = EvolutionConfig::from_json(json).unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidConfiguration(ConfigError::DistributionMismatch { expected: 3, actual: 2 })
        ));

        let err = EvolutionConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, EngineError::Json(_)));
    }

    #[test]
    fn test_batch_defaults() {
        let config = BatchConfig::default();
        assert_eq!(config.runs, 1000);
        assert_eq!(config.evolution.population_size, 50);
        assert_eq!(config.evolution.match_config.noise, Noise::miscommunication(0.05));
        assert!(!config.evolution.mutation_pool.contains(&StrategyBase::AlwaysDefect));
    }
}
