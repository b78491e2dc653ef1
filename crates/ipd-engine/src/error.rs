//! Engine error types

use thiserror::Error;

/// A configuration value the engine refuses to run with.
///
/// Raised once, before any round is played.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ConfigError {
    #[error("round count must be at least 1")]
    ZeroRounds,

    #[error("generation count must be at least 1")]
    ZeroGenerations,

    #[error("population size must be at least 2, got {0}")]
    PopulationTooSmall(usize),

    #[error("initial distribution sums to {actual}, expected population size {expected}")]
    DistributionMismatch { expected: usize, actual: usize },

    #[error("{name} must be within [0, 1], got {value}")]
    ProbabilityOutOfRange { name: &'static str, value: f64 },

    #[error("replacement fraction must be within [0, 0.5], got {0}")]
    FractionOutOfRange(f64),

    #[error("payoff matrix violates {0}")]
    InvalidPayoff(&'static str),

    #[error("mutation pool is empty while mutation rate is {0}")]
    EmptyMutationPool(f64),

    #[error("batch must contain at least one run")]
    ZeroRuns,
}

/// Top-level error for every fallible engine entry point.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(#[from] ConfigError),

    #[error("malformed configuration: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("run cancelled before completion")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, EngineError>;

/// Check that `value` is a probability, naming the offending option otherwise.
pub(crate) fn check_probability(name: &'static str, value: f64) -> std::result::Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::ProbabilityOutOfRange { name, value })
    }
}
