//! Many independent evolutionary runs in parallel
//!
//! Run `i` draws from `SeededRng::with_stream(base_seed, i)`, so results do not
//! depend on scheduling or thread count. Aggregation happens once every run
//! has finished.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::BatchConfig;
use crate::error::{EngineError, Result};
use crate::evolution::Evolution;
use crate::random::SeededRng;
use crate::strategy::StrategyBase;

/// Final population statistics of one strategy across all runs
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StrategyOutcome {
    pub strategy: StrategyBase,
    pub mean: f64,
    pub min: usize,
    pub max: usize,
}

/// Aggregate of a finished batch, strongest mean first
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub runs: usize,
    /// Seed the per-run streams were derived from
    pub base_seed: u64,
    pub strategies: Vec<StrategyOutcome>,
}

type ProgressFn = dyn Fn(usize, usize) + Send + Sync;

/// Builder for a parallel batch
///
/// ```no_run
/// use ipd_engine::{BatchConfig, BatchRunner};
///
/// let summary = BatchRunner::new(BatchConfig::default())
///     .num_threads(8)
///     .run()?;
/// for outcome in &summary.strategies {
///     println!("{:?}: {:.2}", outcome.strategy, outcome.mean);
/// }
/// # Ok::<(), ipd_engine::EngineError>(())
/// ```
pub struct BatchRunner {
    config: BatchConfig,
    num_threads: Option<usize>,
    cancel: Option<Arc<AtomicBool>>,
    progress: Option<Arc<ProgressFn>>,
}

impl BatchRunner {
    pub fn new(config: BatchConfig) -> Self {
        Self {
            config,
            num_threads: None,
            cancel: None,
            progress: None,
        }
    }

    /// Use a dedicated pool of `n` workers instead of rayon's global pool
    pub fn num_threads(mut self, n: usize) -> Self {
        self.num_threads = Some(n);
        self
    }

    /// Abort when `flag` becomes true; partial results are discarded
    pub fn cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Called with `(completed, total)` after every finished run
    pub fn progress<P>(mut self, callback: P) -> Self
    where
        P: Fn(usize, usize) + Send + Sync + 'static,
    {
        self.progress = Some(Arc::new(callback));
        self
    }

    /// Execute every run and aggregate final population counts
    pub fn run(self) -> Result<BatchSummary> {
        self.config.validate()?;

        let runs = self.config.runs;
        let base_seed = self.config.evolution.random_seed.unwrap_or_else(rand::random);
        info!(runs, base_seed, "starting batch");

        let pool = self
            .num_threads
            .map(|n| rayon::ThreadPoolBuilder::new().num_threads(n).build())
            .transpose()?;

        let completed = AtomicUsize::new(0);
        let execute = || -> Result<Vec<BTreeMap<StrategyBase, usize>>> {
            (0..runs)
                .into_par_iter()
                .map(|run| {
                    if self.is_cancelled() {
                        return Err(EngineError::Cancelled);
                    }

                    let rng = SeededRng::with_stream(base_seed, run as u64);
                    let mut evolution = Evolution::with_rng(self.config.evolution.clone(), rng)?;
                    evolution.run();

                    let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                    debug!(run, done, "run finished");
                    if let Some(callback) = &self.progress {
                        callback(done, runs);
                    }
                    Ok(evolution.final_counts())
                })
                .collect()
        };

        let finals = match pool {
            Some(pool) => pool.install(execute),
            None => execute(),
        }?;

        if self.is_cancelled() {
            return Err(EngineError::Cancelled);
        }

        let candidates = self.candidates();
        let summary = summarize(&finals, &candidates, base_seed);
        info!(
            runs,
            leader = ?summary.strategies.first().map(|s| s.strategy),
            "batch finished"
        );
        Ok(summary)
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    /// Strategies that could appear in a final population
    fn candidates(&self) -> BTreeSet<StrategyBase> {
        let evolution = &self.config.evolution;
        let mut candidates: BTreeSet<StrategyBase> =
            evolution.initial_distribution.keys().copied().collect();
        if evolution.mutation_rate > 0.0 {
            candidates.extend(evolution.mutation_pool.iter().copied());
        }
        candidates
    }
}

/// Reduce per-run final counts into per-strategy mean, min and max
///
/// A strategy absent from a run's final population counts as zero there.
/// Sorted by descending mean, ties in catalogue order.
pub fn summarize(
    finals: &[BTreeMap<StrategyBase, usize>],
    candidates: &BTreeSet<StrategyBase>,
    base_seed: u64,
) -> BatchSummary {
    let mut seen = candidates.clone();
    for counts in finals {
        seen.extend(counts.keys().copied());
    }

    let mut strategies: Vec<StrategyOutcome> = seen
        .into_iter()
        .map(|strategy| {
            let counts: Vec<usize> = finals
                .iter()
                .map(|run| run.get(&strategy).copied().unwrap_or(0))
                .collect();
            let mean = if counts.is_empty() {
                0.0
            } else {
                counts.iter().sum::<usize>() as f64 / counts.len() as f64
            };
            StrategyOutcome {
                strategy,
                mean,
                min: counts.iter().copied().min().unwrap_or(0),
                max: counts.iter().copied().max().unwrap_or(0),
            }
        })
        .collect();

    strategies.sort_by(|a, b| b.mean.total_cmp(&a.mean));

    BatchSummary {
        runs: finals.len(),
        base_seed,
        strategies,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EvolutionConfig, MatchConfig};
    use crate::noise::Noise;
    use approx::assert_relative_eq;

    fn small_batch() -> BatchConfig {
        let mut evolution = EvolutionConfig::uniform(&StrategyBase::ARCHETYPES, 1);
        evolution.match_config = MatchConfig::new(20, Noise::miscommunication(0.05));
        evolution.generation_count = 5;
        evolution.mutation_rate = 0.05;
        evolution.mutation_pool = StrategyBase::ARCHETYPES.to_vec();
        evolution.random_seed = Some(2024);
        BatchConfig { runs: 8, evolution }
    }

    #[test]
    fn test_summarize_counts_absent_as_zero() {
        use StrategyBase::*;
        let finals = vec![
            BTreeMap::from([(AlwaysDefect, 3), (TitForTat, 1)]),
            BTreeMap::from([(TitForTat, 4)]),
        ];
        let candidates = BTreeSet::from([AlwaysDefect, TitForTat, Pavlov]);
        let summary = summarize(&finals, &candidates, 7);

        assert_eq!(summary.runs, 2);
        assert_eq!(summary.base_seed, 7);
        let order: Vec<StrategyBase> = summary.strategies.iter().map(|s| s.strategy).collect();
        assert_eq!(order, vec![TitForTat, AlwaysDefect, Pavlov]);

        let tft = &summary.strategies[0];
        assert_relative_eq!(tft.mean, 2.5);
        assert_eq!((tft.min, tft.max), (1, 4));

        let alld = &summary.strategies[1];
        assert_relative_eq!(alld.mean, 1.5);
        assert_eq!((alld.min, alld.max), (0, 3));

        let pavlov = &summary.strategies[2];
        assert_eq!((pavlov.mean, pavlov.min, pavlov.max), (0.0, 0, 0));
    }

    #[test]
    fn test_batch_rejects_zero_runs() {
        let config = BatchConfig { runs: 0, ..small_batch() };
        assert!(matches!(
            BatchRunner::new(config).run(),
            Err(EngineError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_means_sum_to_population() {
        let summary = BatchRunner::new(small_batch()).run().unwrap();
        assert_eq!(summary.runs, 8);
        let total: f64 = summary.strategies.iter().map(|s| s.mean).sum();
        assert_relative_eq!(total, 10.0, epsilon = 1e-9);
        for pair in summary.strategies.windows(2) {
            assert!(pair[0].mean >= pair[1].mean);
        }
    }

    #[test]
    fn test_thread_count_does_not_change_results() {
        let single = BatchRunner::new(small_batch()).num_threads(1).run().unwrap();
        let many = BatchRunner::new(small_batch()).num_threads(4).run().unwrap();
        assert_eq!(single, many);
    }

    #[test]
    fn test_cancelled_batch_returns_nothing() {
        let flag = Arc::new(AtomicBool::new(true));
        let result = BatchRunner::new(small_batch()).cancel_flag(flag).run();
        assert!(matches!(result, Err(EngineError::Cancelled)));
    }

    #[test]
    fn test_progress_reports_every_run() {
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        BatchRunner::new(small_batch())
            .num_threads(2)
            .progress(move |_, total| {
                assert_eq!(total, 8);
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .run()
            .unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 8);
    }
}
