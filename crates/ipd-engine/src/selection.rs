//! Replacement rules between generations
//!
//! [`next_generation`] is a pure function of the current population, its
//! fitness and the random stream: it never touches the population it is given.

use rand::distr::weighted::WeightedIndex;
use rand::distr::Distribution;
use rand::seq::IndexedRandom;
use rand::Rng;
use tracing::{debug, warn};

use crate::config::{EvolutionConfig, SelectionMode};
use crate::evolution::Agent;
use crate::strategy::{Strategy, StrategyBase, StrategyParams};

/// Everything the replacement step needs from the run configuration
#[derive(Clone, Copy, Debug)]
pub struct ReplacementRules<'a> {
    pub selection: SelectionMode,
    pub mutation_rate: f64,
    pub mutation_pool: &'a [StrategyBase],
    pub strategy_params: StrategyParams,
}

impl<'a> From<&'a EvolutionConfig> for ReplacementRules<'a> {
    fn from(config: &'a EvolutionConfig) -> Self {
        Self {
            selection: config.selection,
            mutation_rate: config.mutation_rate,
            mutation_pool: &config.mutation_pool,
            strategy_params: config.strategy_params,
        }
    }
}

/// The population that follows a replacement step
#[derive(Clone, Debug, PartialEq)]
pub struct Replacement {
    pub population: Vec<Agent>,
    /// Fitness-proportional selection found no positive weight and resampled uniformly
    pub degenerate: bool,
    /// First id not handed out yet
    pub next_id: u64,
}

/// Hands out ids and birth generations to offspring
struct Nursery<'r, 'a> {
    rules: &'r ReplacementRules<'a>,
    next_id: u64,
    generation: u32,
    mutants: usize,
}

impl Nursery<'_, '_> {
    fn offspring<R: Rng + ?Sized>(&mut self, parent: &Strategy, rng: &mut R) -> Agent {
        let strategy = self.mutate(parent, rng);
        let agent = Agent::new(self.next_id, strategy, self.generation);
        self.next_id += 1;
        agent
    }

    fn mutate<R: Rng + ?Sized>(&mut self, parent: &Strategy, rng: &mut R) -> Strategy {
        let rate = self.rules.mutation_rate;
        if rate <= 0.0 || !rng.random_bool(rate) {
            return *parent;
        }
        match self.rules.mutation_pool.choose(rng) {
            Some(base) => {
                self.mutants += 1;
                Strategy::with_params(*base, self.rules.strategy_params)
            }
            None => *parent,
        }
    }
}

/// Build the next generation from the current one
///
/// # Arguments
/// * `population` - Current agents, in population order
/// * `fitness` - Fitness of each agent, same order
/// * `rules` - Selection mode and mutation settings
/// * `next_id` - First id available for offspring
/// * `born_generation` - Generation index recorded on offspring
/// * `rng` - Source for resampling and mutation
///
/// # Panics
/// If `population` and `fitness` differ in length
pub fn next_generation<R: Rng + ?Sized>(
    population: &[Agent],
    fitness: &[f64],
    rules: &ReplacementRules<'_>,
    next_id: u64,
    born_generation: u32,
    rng: &mut R,
) -> Replacement {
    assert_eq!(
        population.len(),
        fitness.len(),
        "one fitness value per agent required"
    );

    let mut nursery = Nursery {
        rules,
        next_id,
        generation: born_generation,
        mutants: 0,
    };

    let (population, degenerate) = match rules.selection {
        SelectionMode::Truncation { fraction } => {
            (truncate(population, fitness, fraction, &mut nursery, rng), false)
        }
        SelectionMode::FitnessProportional => resample(population, fitness, &mut nursery, rng),
    };

    debug!(
        offspring = nursery.next_id - next_id,
        mutants = nursery.mutants,
        degenerate,
        "replacement done"
    );

    Replacement {
        population,
        degenerate,
        next_id: nursery.next_id,
    }
}

/// Replace the `floor(N * fraction)` weakest in place, i-th weakest by an
/// offspring of the i-th strongest. Equal fitness keeps population order,
/// so earlier agents rank as weaker.
fn truncate<R: Rng + ?Sized>(
    population: &[Agent],
    fitness: &[f64],
    fraction: f64,
    nursery: &mut Nursery<'_, '_>,
    rng: &mut R,
) -> Vec<Agent> {
    let n = population.len();
    let cull = ((n as f64 * fraction).floor() as usize).min(n / 2);

    let mut ascending: Vec<usize> = (0..n).collect();
    ascending.sort_by(|&a, &b| fitness[a].total_cmp(&fitness[b]));

    let mut next = population.to_vec();
    for i in 0..cull {
        let weakest = ascending[i];
        let strongest = ascending[n - 1 - i];
        next[weakest] = nursery.offspring(&population[strongest].strategy, rng);
    }
    next
}

/// Draw N parents with replacement, weighted by fitness clamped at zero
fn resample<R: Rng + ?Sized>(
    population: &[Agent],
    fitness: &[f64],
    nursery: &mut Nursery<'_, '_>,
    rng: &mut R,
) -> (Vec<Agent>, bool) {
    let n = population.len();
    if n == 0 {
        return (Vec::new(), false);
    }

    let weights: Vec<f64> = fitness.iter().map(|f| f.max(0.0)).collect();

    match WeightedIndex::new(&weights) {
        Ok(dist) => {
            let next = (0..n)
                .map(|_| {
                    let parent = dist.sample(rng);
                    nursery.offspring(&population[parent].strategy, rng)
                })
                .collect();
            (next, false)
        }
        Err(err) => {
            warn!(error = %err, "no positive fitness, resampling uniformly");
            let next = (0..n)
                .map(|_| {
                    let parent = rng.random_range(0..n);
                    nursery.offspring(&population[parent].strategy, rng)
                })
                .collect();
            (next, true)
        }
    }
}
