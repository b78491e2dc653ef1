//! Evolutionary population engine
//!
//! Each generation every agent plays a round robin against the whole
//! population, fitness is its average score per match, and the replacement
//! rule in [`crate::selection`] builds the next generation. The population is
//! only ever changed between generations.

use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::EvolutionConfig;
use crate::error::Result;
use crate::random::SeededRng;
use crate::selection::{next_generation, ReplacementRules};
use crate::strategy::{Strategy, StrategyBase};
use crate::tournament::play_round_robin;

/// One member of the population
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: u64,
    pub strategy: Strategy,
    pub born_generation: u32,
    /// Sum of match scores over every generation the agent took part in
    pub lifetime_score: i64,
}

impl Agent {
    pub fn new(id: u64, strategy: Strategy, born_generation: u32) -> Self {
        Self {
            id,
            strategy,
            born_generation,
            lifetime_score: 0,
        }
    }
}

/// Demographics of one generation, taken after its round robin and before
/// replacement. Maps only contain strategies present in that generation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenerationSnapshot {
    pub generation: u32,
    pub counts: BTreeMap<StrategyBase, usize>,
    /// Mean fitness of each strategy's agents
    pub average_scores: BTreeMap<StrategyBase, f64>,
    pub mean_fitness: f64,
    pub best_fitness: f64,
    /// Strategies wiped out by the replacement that followed
    pub extinct: Vec<StrategyBase>,
    /// Selection fell back to uniform resampling
    pub degenerate_selection: bool,
}

impl GenerationSnapshot {
    pub fn count(&self, base: StrategyBase) -> usize {
        self.counts.get(&base).copied().unwrap_or(0)
    }

    pub fn share(&self, base: StrategyBase) -> f64 {
        let total: usize = self.counts.values().sum();
        if total == 0 {
            0.0
        } else {
            self.count(base) as f64 / total as f64
        }
    }
}

/// A multi-generation run
///
/// Stepping past the configured generation count does nothing and keeps
/// returning the last snapshot.
pub struct Evolution<R = SeededRng> {
    config: EvolutionConfig,
    rng: R,
    population: Vec<Agent>,
    generation: u32,
    next_id: u64,
    snapshots: Vec<GenerationSnapshot>,
}

impl Evolution<SeededRng> {
    /// Validate `config` and seed generation 0
    ///
    /// Without a `random_seed` the generator is seeded from entropy.
    pub fn new(config: EvolutionConfig) -> Result<Self> {
        let rng = match config.random_seed {
            Some(seed) => SeededRng::new(seed),
            None => SeededRng::from_entropy(),
        };
        Self::with_rng(config, rng)
    }
}

impl<R: Rng> Evolution<R> {
    /// Same as [`Evolution::new`] with a caller-supplied generator
    pub fn with_rng(config: EvolutionConfig, rng: R) -> Result<Self> {
        config.validate()?;

        let population: Vec<Agent> = config
            .initial_distribution
            .iter()
            .flat_map(|(base, count)| std::iter::repeat(*base).take(*count))
            .enumerate()
            .map(|(id, base)| Agent::new(id as u64, config.strategy(base), 0))
            .collect();
        let next_id = population.len() as u64;

        Ok(Self {
            config,
            rng,
            population,
            generation: 0,
            next_id,
            snapshots: Vec::new(),
        })
    }

    pub fn config(&self) -> &EvolutionConfig {
        &self.config
    }

    pub fn population(&self) -> &[Agent] {
        &self.population
    }

    /// Generations completed so far
    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn snapshots(&self) -> &[GenerationSnapshot] {
        &self.snapshots
    }

    pub fn is_finished(&self) -> bool {
        self.generation >= self.config.generation_count
    }

    /// Strategy counts of the current population
    pub fn final_counts(&self) -> BTreeMap<StrategyBase, usize> {
        count_strategies(&self.population)
    }

    /// Play one generation and replace
    pub fn step(&mut self) -> &GenerationSnapshot {
        if !self.is_finished() {
            let snapshot = self.advance();
            self.snapshots.push(snapshot);
        }
        // generation_count >= 1, so a finished run has at least one snapshot
        &self.snapshots[self.snapshots.len() - 1]
    }

    /// Step until the configured generation count is reached
    pub fn run(&mut self) -> &[GenerationSnapshot] {
        while !self.is_finished() {
            self.step();
        }
        &self.snapshots
    }

    fn advance(&mut self) -> GenerationSnapshot {
        let roster: Vec<Strategy> = self.population.iter().map(|a| a.strategy).collect();
        let (tallies, _) = play_round_robin(&roster, &self.config.tournament(), &mut self.rng);

        let fitness: Vec<f64> = tallies.iter().map(|t| t.average()).collect();
        for (agent, tally) in self.population.iter_mut().zip(&tallies) {
            agent.lifetime_score += tally.total;
        }

        let counts = count_strategies(&self.population);
        let average_scores = average_by_strategy(&self.population, &fitness);
        let mean_fitness = fitness.iter().sum::<f64>() / fitness.len() as f64;
        let best_fitness = fitness.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        let rules = ReplacementRules::from(&self.config);
        let replacement = next_generation(
            &self.population,
            &fitness,
            &rules,
            self.next_id,
            self.generation + 1,
            &mut self.rng,
        );

        let survivors = count_strategies(&replacement.population);
        let extinct: Vec<StrategyBase> = counts
            .keys()
            .filter(|base| !survivors.contains_key(*base))
            .copied()
            .collect();

        info!(
            generation = self.generation,
            strategies = counts.len(),
            "generation {}: best={:.3}, mean={:.3}",
            self.generation,
            best_fitness,
            mean_fitness
        );
        for base in &extinct {
            info!(generation = self.generation, strategy = base.name(), "strategy went extinct");
        }

        let snapshot = GenerationSnapshot {
            generation: self.generation,
            counts,
            average_scores,
            mean_fitness,
            best_fitness,
            extinct,
            degenerate_selection: replacement.degenerate,
        };

        self.population = replacement.population;
        self.next_id = replacement.next_id;
        self.generation += 1;

        snapshot
    }
}

fn count_strategies(population: &[Agent]) -> BTreeMap<StrategyBase, usize> {
    let mut counts = BTreeMap::new();
    for agent in population {
        *counts.entry(agent.strategy.base).or_insert(0) += 1;
    }
    counts
}

fn average_by_strategy(population: &[Agent], fitness: &[f64]) -> BTreeMap<StrategyBase, f64> {
    let mut sums: BTreeMap<StrategyBase, (f64, usize)> = BTreeMap::new();
    for (agent, f) in population.iter().zip(fitness) {
        let entry = sums.entry(agent.strategy.base).or_insert((0.0, 0));
        entry.0 += f;
        entry.1 += 1;
    }
    sums.into_iter()
        .map(|(base, (sum, n))| (base, sum / n as f64))
        .collect()
}
