//! Genetic refinement of a finished timetable.
//!
//! The population starts from the input schedule plus variants made by
//! random relocations. Each generation keeps an elite unchanged and fills
//! the rest with tournament-selected parents, crossover and relocation.
//! Operators only ever move slots, so every individual places exactly the
//! periods of the input and satisfies the same hard constraints.
//!
//! The best individual seen in any generation is returned.
//!
//! # Submodules
//!
//! - [`fitness`]: weighted soft-constraint score
//! - [`operators`]: move validation, relocation, crossover, tournament

mod chromosome;
pub mod fitness;
pub mod operators;

pub use chromosome::Individual;
pub use fitness::{FitnessBreakdown, evaluate};

use crate::context::{ProblemIndex, SchedulingContext};
use crate::rules::RefinementOptions;
use log::{debug, info};
use operators::{crossover, relocate, tournament};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone)]
pub struct RefinementOutcome {
    pub best: SchedulingContext,
    pub best_fitness: f64,
    pub breakdown: FitnessBreakdown,
    pub initial_fitness: f64,
    /// Best fitness seen so far, one entry for the seed population and one per generation.
    pub history: Vec<f64>,
    pub cancelled: bool,
}

fn evaluate_all(problem: &ProblemIndex, population: &mut [Individual], options: &RefinementOptions) {
    population
        .par_iter_mut()
        .filter(|individual| !individual.is_evaluated())
        .for_each(|individual| individual.evaluate(problem, &options.weights));
}

fn rank(population: &mut [Individual]) {
    population.sort_by(|a, b| b.fitness.total_cmp(&a.fitness));
}

fn seed_population<R: Rng>(
    problem: &ProblemIndex,
    schedule: &SchedulingContext,
    options: &RefinementOptions,
    rng: &mut R,
) -> Vec<Individual> {
    let size = options.population_size.max(1);
    let mut population = Vec::with_capacity(size);
    population.push(Individual::new(schedule.clone()));
    while population.len() < size {
        let mut variant = schedule.clone();
        for _ in 0..options.seed_relocations {
            relocate(problem, &mut variant, rng);
        }
        population.push(Individual::new(variant));
    }
    population
}

fn next_generation<R: Rng>(
    problem: &ProblemIndex,
    ranked: &[Individual],
    options: &RefinementOptions,
    rng: &mut R,
) -> Vec<Individual> {
    let size = ranked.len();
    let elites = ((size as f64 * options.elite_ratio).round() as usize).clamp(1, size);
    let mut next: Vec<Individual> = ranked[..elites].to_vec();

    while next.len() < size {
        let Some(first) = tournament(ranked, options.tournament_size, rng) else {
            break;
        };
        let mut child = if rng.random::<f64>() < options.crossover_rate {
            match tournament(ranked, options.tournament_size, rng) {
                Some(second) => crossover(problem, first, second, rng),
                None => Individual::new(first.schedule.clone()),
            }
        } else {
            Individual::new(first.schedule.clone())
        };
        if rng.random::<f64>() < options.mutation_rate {
            relocate(problem, &mut child.schedule, rng);
        }
        next.push(child);
    }
    next
}

pub fn refine(
    problem: &ProblemIndex,
    schedule: SchedulingContext,
    options: &RefinementOptions,
    seed: u64,
    cancel: Option<&AtomicBool>,
) -> RefinementOutcome {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut start = Individual::new(schedule);
    start.evaluate(problem, &options.weights);
    let initial_fitness = start.fitness;

    let mut population = seed_population(problem, &start.schedule, options, &mut rng);
    population[0] = start;
    evaluate_all(problem, &mut population, options);
    rank(&mut population);

    let mut best = population[0].clone();
    let mut history = vec![best.fitness];
    let mut cancelled = false;

    for generation in 0..options.generations {
        if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
            info!("Refinement cancelled before generation {}", generation);
            cancelled = true;
            break;
        }

        population = next_generation(problem, &population, options, &mut rng);
        evaluate_all(problem, &mut population, options);
        rank(&mut population);

        if population[0].fitness > best.fitness {
            best = population[0].clone();
        }
        history.push(best.fitness);
        debug!(
            "Generation {}: best {:.4}, generation best {:.4}",
            generation, best.fitness, population[0].fitness
        );
    }

    info!(
        "Refinement fitness {:.4} -> {:.4} over {} generation(s)",
        initial_fitness,
        best.fitness,
        history.len() - 1
    );
    let breakdown = best.breakdown.unwrap_or_else(|| evaluate(problem, &best.schedule));
    RefinementOutcome {
        best: best.schedule,
        best_fitness: best.fitness,
        breakdown,
        initial_fitness,
        history,
        cancelled,
    }
}
