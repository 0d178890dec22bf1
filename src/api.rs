use std::collections::{BTreeSet, HashMap};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;

use crate::marks::{calc_outright_marks, calc_position_probabilities, DEFAULT_GROUP};
use crate::markets::init_markets;
use crate::math::{self, implied_probabilities};
use crate::metrics::{calc_ppg_ratings, calc_training_errors};
use crate::simulator::SimPoints;
use crate::solver::{self, SolverOptions};
use crate::standings::{calc_league_table, calc_remaining_fixtures};
use crate::types::{
    parse_event_name, Event, Market, Ratings, SimulationRequest, SimulationResult,
};

/// Optional overrides for one simulation run; anything left unset keeps the
/// documented request default.
#[derive(Debug, Clone, Default)]
pub struct SimOptions {
    pub generations: Option<usize>,
    pub n_paths: Option<usize>,
    pub rounds: Option<usize>,
    pub time_power_weighting: Option<f64>,
    pub population_size: Option<usize>,
    pub mutation_factor: Option<f64>,
    pub elite_ratio: Option<f64>,
    pub init_std: Option<f64>,
    pub log_interval: Option<usize>,
    pub decay_exponent: Option<f64>,
    pub mutation_probability: Option<f64>,
    pub home_advantage: Option<f64>,
    pub seed: Option<u64>,
    pub debug: bool,
}

/// Prices the outright markets of a league: fits ratings to the priced
/// events, replays the remaining season by Monte Carlo, and marks every
/// market.
pub fn simulate_season(
    results: Vec<Event>,
    events: Vec<Event>,
    markets: Vec<Market>,
    handicaps: HashMap<String, i32>,
    options: SimOptions,
) -> Result<SimulationResult> {
    let defaults = SimulationRequest::default();
    let request = SimulationRequest {
        ratings: HashMap::new(),
        results,
        events,
        handicaps,
        markets,
        rounds: options.rounds.unwrap_or(defaults.rounds),
        n_paths: options.n_paths.unwrap_or(defaults.n_paths),
        generations: options.generations.unwrap_or(defaults.generations),
        population_size: options
            .population_size
            .unwrap_or(defaults.population_size),
        mutation_factor: options
            .mutation_factor
            .unwrap_or(defaults.mutation_factor),
        elite_ratio: options.elite_ratio.unwrap_or(defaults.elite_ratio),
        init_std: options.init_std.unwrap_or(defaults.init_std),
        decay_exponent: options.decay_exponent.unwrap_or(defaults.decay_exponent),
        mutation_probability: options
            .mutation_probability
            .unwrap_or(defaults.mutation_probability),
        log_interval: options.log_interval.unwrap_or(defaults.log_interval),
        time_power_weighting: options
            .time_power_weighting
            .unwrap_or(defaults.time_power_weighting),
        home_advantage: options.home_advantage,
        seed: options.seed,
        debug: options.debug,
    };
    process_simulation(request)
}

/// Runs the full pipeline for an already-assembled request.
///
/// Every configuration and input-shape mistake is surfaced here, before any
/// expensive computation starts.
pub fn process_simulation(mut request: SimulationRequest) -> Result<SimulationResult> {
    let team_names = validate_request(&request)?;

    // Oldest first; this order defines the time weights.
    request
        .events
        .sort_by(|a, b| a.date.cmp(&b.date).then(a.name.cmp(&b.name)));

    let ratings: Ratings = team_names
        .iter()
        .map(|name| {
            (
                name.clone(),
                request.ratings.get(name).copied().unwrap_or(1.0),
            )
        })
        .collect();

    init_markets(&team_names, &mut request.markets)?;

    let league_table = calc_league_table(&team_names, &request.results, &request.handicaps);
    let remaining_fixtures =
        calc_remaining_fixtures(&team_names, &request.results, request.rounds);
    info!(
        teams = team_names.len(),
        training_events = request.events.len(),
        remaining = remaining_fixtures.len(),
        "request validated"
    );

    let mut rng = match request.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let solver_options = SolverOptions {
        generations: request.generations,
        population_size: request.population_size,
        mutation_factor: request.mutation_factor,
        elite_ratio: request.elite_ratio,
        init_std: request.init_std,
        log_interval: request.log_interval,
        decay_exponent: request.decay_exponent,
        mutation_probability: request.mutation_probability,
        debug: request.debug,
        home_advantage: request.home_advantage,
        use_league_table_init: true,
    };
    let outcome = solver::solve(
        &request.events,
        &request.results,
        &ratings,
        request.time_power_weighting,
        &solver_options,
        &mut rng,
    )?;

    let mut sim_points = SimPoints::new(&league_table, request.n_paths);
    for fixture in &remaining_fixtures {
        sim_points.simulate_fixture(fixture, &outcome.ratings, outcome.home_advantage, &mut rng);
    }

    let ppg_ratings = calc_ppg_ratings(&team_names, &outcome.ratings, outcome.home_advantage);
    let expected_points = sim_points.expected_points();
    let training_errors = calc_training_errors(
        &team_names,
        &request.events,
        &outcome.ratings,
        outcome.home_advantage,
    );

    let mut teams = league_table;
    for team in &mut teams {
        if let Some(ppg) = ppg_ratings.get(&team.name) {
            team.points_per_game_rating = *ppg;
        }
        if let Some(expected) = expected_points.get(&team.name) {
            team.expected_season_points = *expected;
        }
        if let Some(rating) = outcome.ratings.get(&team.name) {
            team.poisson_rating = *rating;
        }
        if let Some(errors) = training_errors.get(&team.name) {
            team.training_events = errors.len();
            team.mean_training_error = math::mean(errors);
            team.std_training_error = math::std_deviation(errors);
        }
    }
    teams.sort_by(|a, b| {
        b.expected_season_points
            .total_cmp(&a.expected_season_points)
            .then_with(|| a.name.cmp(&b.name))
    });

    let position_probabilities = calc_position_probabilities(&sim_points, &request.markets);
    if let Some(default_probs) = position_probabilities.get(DEFAULT_GROUP) {
        for team in &mut teams {
            if let Some(probs) = default_probs.get(&team.name) {
                team.position_probabilities = probs.clone();
            }
        }
    }
    let outright_marks = calc_outright_marks(&position_probabilities, &request.markets);

    Ok(SimulationResult {
        teams,
        outright_marks,
        home_advantage: outcome.home_advantage,
        solver_error: outcome.error,
    })
}

/// Checks every documented configuration and input-shape invariant and
/// returns the alphabetically ordered league membership.
fn validate_request(request: &SimulationRequest) -> Result<Vec<String>> {
    if request.events.is_empty() {
        bail!("events cannot be empty");
    }
    if request.results.is_empty() {
        bail!("results cannot be empty");
    }
    if request.n_paths == 0 {
        bail!("n_paths must be at least 1");
    }
    if request.population_size == 0 {
        bail!("population_size must be at least 1");
    }

    let mut team_set = BTreeSet::new();
    for result in &request.results {
        let (home, away) = parse_event_name(&result.name)
            .with_context(|| format!("unparseable result name: {}", result.name))?;
        validate_date(&result.date)
            .with_context(|| format!("result {}", result.name))?;
        let Some(score) = result.score.as_ref() else {
            bail!("result {} carries no score", result.name);
        };
        if score.len() != 2 {
            bail!(
                "result {} score must have exactly 2 entries, got {}",
                result.name,
                score.len()
            );
        }
        if score[0] < 0 || score[1] < 0 {
            bail!("result {} score cannot be negative", result.name);
        }
        team_set.insert(home.to_string());
        team_set.insert(away.to_string());
    }
    if team_set.is_empty() {
        bail!("no valid team names found in results");
    }

    for event in &request.events {
        let (home, away) = parse_event_name(&event.name)
            .with_context(|| format!("unparseable event name: {}", event.name))?;
        validate_date(&event.date).with_context(|| format!("event {}", event.name))?;
        for team in [home, away] {
            if !team_set.contains(team) {
                bail!("events contain unknown team: {team}");
            }
        }
        let Some(odds) = event.match_odds.as_ref() else {
            bail!("event {} carries no match odds", event.name);
        };
        implied_probabilities(odds).with_context(|| format!("event {}", event.name))?;
    }

    for team in request.handicaps.keys() {
        if !team_set.contains(team) {
            bail!("handicaps contains unknown team: {team}");
        }
    }

    Ok(team_set.into_iter().collect())
}

fn validate_date(raw: &str) -> Result<()> {
    if DateTime::parse_from_rfc3339(raw).is_ok()
        || NaiveDate::parse_from_str(raw, "%Y-%m-%d").is_ok()
    {
        return Ok(());
    }
    bail!("date {raw} is not ISO-8601");
}
