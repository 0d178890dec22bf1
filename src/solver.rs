use std::collections::HashMap;

use anyhow::{anyhow, Context, Result};
use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::math::{self, implied_probabilities, rms_error, OutcomeProbs};
use crate::matrix::ScoreMatrix;
use crate::standings::calc_league_table;
use crate::types::{parse_event_name, Event, Ratings};

pub const RATING_MIN: f64 = 0.0;
pub const RATING_MAX: f64 = 6.0;
pub const HOME_ADVANTAGE_MIN: f64 = 0.0;
pub const HOME_ADVANTAGE_MAX: f64 = 1.5;

/// Per-gene box constraint; `None` leaves the gene unbounded and its random
/// initialization falls back to a Gaussian around the starting point.
pub type GeneBounds = Option<(f64, f64)>;

/// Hyperparameters of the generational optimizer.
#[derive(Debug, Clone)]
pub struct SolverOptions {
    pub generations: usize,
    pub population_size: usize,
    pub mutation_factor: f64,
    pub elite_ratio: f64,
    pub init_std: f64,
    pub log_interval: usize,
    pub decay_exponent: f64,
    pub mutation_probability: f64,
    pub debug: bool,
    /// Fixed home advantage; `None` fits it jointly with the ratings.
    pub home_advantage: Option<f64>,
    pub use_league_table_init: bool,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            generations: 1000,
            population_size: 8,
            mutation_factor: 0.1,
            elite_ratio: 0.1,
            init_std: 0.2,
            log_interval: 10,
            decay_exponent: 0.5,
            mutation_probability: 0.1,
            debug: false,
            home_advantage: None,
            use_league_table_init: true,
        }
    }
}

/// Fitted ratings with the accompanying home advantage and residual error.
#[derive(Debug, Clone)]
pub struct SolverOutcome {
    pub ratings: Ratings,
    pub home_advantage: f64,
    pub error: f64,
}

/// A training event flattened onto genome indices, with its market target
/// and recency weight precomputed so the hot loop touches no strings.
struct TrainingEvent {
    home: usize,
    away: usize,
    market: OutcomeProbs,
    weight: f64,
}

fn prepare_training(
    events: &[Event],
    team_index: &HashMap<&str, usize>,
    time_power: f64,
) -> Result<Vec<TrainingEvent>> {
    let total = events.len();
    events
        .iter()
        .enumerate()
        .map(|(i, event)| {
            let (home, away) = parse_event_name(&event.name)
                .ok_or_else(|| anyhow!("unparseable event name: {}", event.name))?;
            let home = *team_index
                .get(home)
                .ok_or_else(|| anyhow!("events contain unknown team: {home}"))?;
            let away = *team_index
                .get(away)
                .ok_or_else(|| anyhow!("events contain unknown team: {away}"))?;
            let odds = event
                .match_odds
                .as_ref()
                .ok_or_else(|| anyhow!("event {} carries no match odds", event.name))?;
            let market = implied_probabilities(odds)
                .with_context(|| format!("event {}", event.name))?;
            Ok(TrainingEvent {
                home,
                away,
                market,
                weight: math::time_power_weight(i, total, time_power),
            })
        })
        .collect()
}

/// Power-weighted time average of per-event RMS distances between model and
/// market 1X2.
fn weighted_error(training: &[TrainingEvent], genes: &[f64], home_advantage: f64) -> f64 {
    let mut total_weighted = 0.0;
    let mut total_weight = 0.0;
    for event in training {
        let matrix = ScoreMatrix::new(genes[event.home] + home_advantage, genes[event.away]);
        let error = rms_error(&matrix.match_odds(), &event.market);
        total_weighted += error * event.weight;
        total_weight += event.weight;
    }
    if total_weight == 0.0 {
        return 0.0;
    }
    total_weighted / total_weight
}

/// Time-weighted 1X2 fit error of a candidate (ratings, home advantage) pair
/// against an oldest-first training set.
pub fn calc_error(
    events: &[Event],
    ratings: &Ratings,
    home_advantage: f64,
    time_power: f64,
) -> Result<f64> {
    let team_names = sorted_team_names(ratings);
    let team_index = index_by_name(&team_names);
    let training = prepare_training(events, &team_index, time_power)?;
    let genes: Vec<f64> = team_names
        .iter()
        .map(|name| ratings.get(name.as_str()).copied().unwrap_or_default())
        .collect();
    Ok(weighted_error(&training, &genes, home_advantage))
}

#[derive(Debug, Clone)]
struct Individual {
    genes: Vec<f64>,
    fitness: f64,
}

/// Elitist generational optimizer with decaying Gaussian mutation and no
/// crossover. The full generation budget is always spent; there is no
/// early-stop threshold.
pub struct GeneticAlgorithm {
    options: SolverOptions,
}

impl GeneticAlgorithm {
    pub fn new(options: SolverOptions) -> Self {
        Self { options }
    }

    pub fn optimize(
        &self,
        objective: impl Fn(&[f64]) -> f64 + Sync,
        x0: &[f64],
        bounds: &[GeneBounds],
        rng: &mut StdRng,
    ) -> (Vec<f64>, f64) {
        let opts = &self.options;
        let n_params = x0.len();
        let n_elite = ((opts.population_size as f64 * opts.elite_ratio) as usize)
            .max(1)
            .min(opts.population_size);

        info!(
            generations = opts.generations,
            population = opts.population_size,
            "starting genetic optimization"
        );

        let mut population: Vec<Individual> = Vec::with_capacity(opts.population_size);
        population.push(Individual {
            genes: x0.to_vec(),
            fitness: f64::INFINITY,
        });
        for _ in 1..opts.population_size {
            let genes = (0..n_params)
                .map(|j| match bounds[j] {
                    Some((lo, hi)) => rng.gen_range(lo..=hi),
                    None => {
                        let spread = Normal::new(0.0, opts.init_std).expect("positive init std");
                        x0[j] + spread.sample(rng)
                    }
                })
                .collect();
            population.push(Individual {
                genes,
                fitness: f64::INFINITY,
            });
        }

        let mut best_fitness = f64::INFINITY;
        let mut best_genes = x0.to_vec();

        for generation in 0..opts.generations {
            // Fitness fans out read-only over the frozen training data.
            population
                .par_iter_mut()
                .for_each(|ind| ind.fitness = objective(&ind.genes));
            population.sort_by(|a, b| a.fitness.total_cmp(&b.fitness));

            if population[0].fitness < best_fitness {
                best_fitness = population[0].fitness;
                best_genes.copy_from_slice(&population[0].genes);
            }

            let time_remaining =
                (opts.generations - generation) as f64 / opts.generations as f64;
            let mutation_scale = opts.mutation_factor * time_remaining.powf(opts.decay_exponent);

            if opts.debug
                && (generation % opts.log_interval == 0 || generation == opts.generations - 1)
            {
                let avg: f64 = population.iter().map(|ind| ind.fitness).sum::<f64>()
                    / population.len() as f64;
                debug!(
                    generation = generation + 1,
                    best = best_fitness,
                    avg,
                    mutation = mutation_scale,
                    "generation complete"
                );
            }

            let mut next: Vec<Individual> = population[..n_elite].to_vec();
            let mutation = Normal::new(0.0, mutation_scale.max(f64::MIN_POSITIVE))
                .expect("positive mutation scale");
            for _ in n_elite..opts.population_size {
                let parent = &population[rng.gen_range(0..n_elite)];
                let mut offspring = Individual {
                    genes: parent.genes.clone(),
                    fitness: f64::INFINITY,
                };
                for (j, gene) in offspring.genes.iter_mut().enumerate() {
                    if rng.gen::<f64>() < opts.mutation_probability {
                        *gene += mutation.sample(rng);
                        if let Some((lo, hi)) = bounds[j] {
                            *gene = gene.clamp(lo, hi);
                        }
                    }
                }
                next.push(offspring);
            }
            population = next;
        }

        info!(error = best_fitness, "optimization complete");
        (best_genes, best_fitness)
    }
}

/// Seeds ratings from the current league table: top of the table maps to
/// `RATING_MAX`, bottom to `RATING_MIN`, linear in between. Falls back to
/// uniform random inside the box when no completed result exists.
pub fn initialize_ratings_from_league_table(
    team_names: &[String],
    results: &[Event],
    rng: &mut StdRng,
) -> Ratings {
    let table = calc_league_table(team_names, results, &HashMap::new());
    let has_results = table.iter().any(|team| team.played > 0);
    if !has_results {
        warn!("no completed results available, falling back to random rating initialization");
        return team_names
            .iter()
            .map(|name| (name.clone(), rng.gen_range(RATING_MIN..=RATING_MAX)))
            .collect();
    }

    let span = RATING_MAX - RATING_MIN;
    let mut ratings = Ratings::new();
    for (i, team) in table.iter().enumerate() {
        let position_ratio = if table.len() > 1 {
            i as f64 / (table.len() - 1) as f64
        } else {
            0.0
        };
        ratings.insert(team.name.clone(), RATING_MAX - position_ratio * span);
    }
    info!(
        top = %table[0].name,
        rating = ratings[&table[0].name],
        "initialized ratings from league table"
    );
    ratings
}

/// Fits team ratings (and, unless fixed, the home advantage) against the
/// training set, returning the best genome found after the full budget.
pub fn solve(
    training: &[Event],
    results: &[Event],
    ratings: &Ratings,
    time_power: f64,
    options: &SolverOptions,
    rng: &mut StdRng,
) -> Result<SolverOutcome> {
    let team_names = sorted_team_names(ratings);
    let team_index = index_by_name(&team_names);
    let prepared = prepare_training(training, &team_index, time_power)?;

    let mut initial = ratings.clone();
    if options.use_league_table_init && results.iter().any(|r| r.score.is_some()) {
        initial = initialize_ratings_from_league_table(&team_names, results, rng);
    }

    let x0: Vec<f64> = team_names
        .iter()
        .map(|name| initial.get(name.as_str()).copied().unwrap_or(1.0))
        .collect();
    let rating_bounds = vec![Some((RATING_MIN, RATING_MAX)); team_names.len()];
    let ga = GeneticAlgorithm::new(options.clone());

    let (solution, home_advantage) = match options.home_advantage {
        Some(home_advantage) => {
            info!(
                teams = team_names.len(),
                home_advantage, "fitting ratings with fixed home advantage"
            );
            let objective = |genes: &[f64]| weighted_error(&prepared, genes, home_advantage);
            let (solution, _) = ga.optimize(objective, &x0, &rating_bounds, rng);
            (solution, home_advantage)
        }
        None => {
            info!(
                teams = team_names.len(),
                "fitting ratings and home advantage jointly"
            );
            let mut joint_x0 = x0.clone();
            joint_x0.push((HOME_ADVANTAGE_MIN + HOME_ADVANTAGE_MAX) / 2.0);
            let mut joint_bounds = rating_bounds.clone();
            joint_bounds.push(Some((HOME_ADVANTAGE_MIN, HOME_ADVANTAGE_MAX)));

            let split = team_names.len();
            let objective =
                |genes: &[f64]| weighted_error(&prepared, &genes[..split], genes[split]);
            let (mut solution, _) = ga.optimize(objective, &joint_x0, &joint_bounds, rng);
            let home_advantage = solution.pop().unwrap_or_default();
            (solution, home_advantage)
        }
    };

    let fitted: Ratings = team_names
        .iter()
        .cloned()
        .zip(solution.iter().copied())
        .collect();
    let error = weighted_error(&prepared, &solution, home_advantage);
    info!(error, home_advantage, "solver complete");

    Ok(SolverOutcome {
        ratings: fitted,
        home_advantage,
        error,
    })
}

fn sorted_team_names(ratings: &Ratings) -> Vec<String> {
    let mut names: Vec<String> = ratings.keys().cloned().collect();
    names.sort();
    names
}

fn index_by_name(team_names: &[String]) -> HashMap<&str, usize> {
    team_names
        .iter()
        .enumerate()
        .map(|(i, name)| (name.as_str(), i))
        .collect()
}
