//! Run descriptions accepted by the runner and their execution

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use ipd_engine::{
    run_match, run_round_robin, BatchConfig, BatchRunner, Evolution, EvolutionConfig, MatchConfig,
    SeededRng, Strategy, TournamentConfig,
};

/// One run, selected by its `mode` field
#[derive(Debug, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RunRequest {
    Match {
        strategy_a: Strategy,
        strategy_b: Strategy,
        #[serde(default)]
        config: MatchConfig,
        seed: Option<u64>,
    },
    Tournament {
        roster: Vec<Strategy>,
        #[serde(default)]
        config: TournamentConfig,
        seed: Option<u64>,
    },
    Evolution {
        #[serde(default)]
        config: EvolutionConfig,
    },
    Batch {
        #[serde(default)]
        config: BatchConfig,
        threads: Option<usize>,
    },
}

impl RunRequest {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("malformed run description")
    }

    pub fn mode(&self) -> &'static str {
        match self {
            RunRequest::Match { .. } => "match",
            RunRequest::Tournament { .. } => "tournament",
            RunRequest::Evolution { .. } => "evolution",
            RunRequest::Batch { .. } => "batch",
        }
    }

    /// Execute and return the engine's result as JSON
    pub fn execute(self) -> Result<Value> {
        info!(mode = self.mode(), "executing run");

        let output = match self {
            RunRequest::Match {
                strategy_a,
                strategy_b,
                config,
                seed,
            } => {
                let result = run_match(&strategy_a, &strategy_b, &config, &mut rng(seed))
                    .context("match failed")?;
                serde_json::to_value(result)?
            }
            RunRequest::Tournament {
                roster,
                config,
                seed,
            } => {
                let leaderboard =
                    run_round_robin(&roster, &config, &mut rng(seed)).context("tournament failed")?;
                serde_json::to_value(leaderboard)?
            }
            RunRequest::Evolution { config } => {
                let mut evolution = Evolution::new(config).context("invalid evolution")?;
                serde_json::to_value(evolution.run())?
            }
            RunRequest::Batch { config, threads } => {
                let mut runner = BatchRunner::new(config);
                if let Some(n) = threads {
                    runner = runner.num_threads(n);
                }
                serde_json::to_value(runner.run().context("batch failed")?)?
            }
        };

        Ok(output)
    }
}

fn rng(seed: Option<u64>) -> SeededRng {
    match seed {
        Some(seed) => SeededRng::new(seed),
        None => SeededRng::from_entropy(),
    }
}
