use anyhow::{bail, Context, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::matrix::{AsianHandicapLine, ScoreMatrix, TotalGoalsLine};
use crate::solver::{self, SolverOptions};
use crate::types::{parse_event_name, Event, MatchOdds, Ratings};

/// One fixture tagged with decimal 1X2 prices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMatch {
    pub fixture: String,
    pub match_odds: [f64; 3],
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolveEventsRequest {
    pub matches: Vec<EventMatch>,
    pub home_advantage: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

/// Per-fixture lambdas and the derived prices they imply.
#[derive(Debug, Clone, Serialize)]
pub struct EventSolution {
    pub fixture: String,
    pub lambdas: [f64; 2],
    pub probabilities: [f64; 3],
    pub asian_handicaps: Vec<AsianHandicapLine>,
    pub total_goals: Vec<TotalGoalsLine>,
    pub solver_error: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SolveEventsResult {
    pub solutions: Vec<EventSolution>,
    pub home_advantage: f64,
}

/// Stability-tuned hyperparameters for single-fixture fits: a larger
/// population and wider exploration buy reproducible lambdas at a short
/// generation budget.
fn single_match_options(home_advantage: f64) -> SolverOptions {
    SolverOptions {
        generations: 100,
        population_size: 20,
        elite_ratio: 0.2,
        init_std: 1.0,
        mutation_probability: 0.2,
        home_advantage: Some(home_advantage),
        use_league_table_init: false,
        ..SolverOptions::default()
    }
}

/// Solves every fixture independently for (lambda_home, lambda_away) under a
/// fixed home advantage, returning the full derived price surface per
/// fixture.
pub fn solve_events(request: SolveEventsRequest) -> Result<SolveEventsResult> {
    if request.matches.is_empty() {
        bail!("no matches provided");
    }

    let mut rng = match request.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let mut solutions = Vec::with_capacity(request.matches.len());
    for event_match in &request.matches {
        let solution = solve_single_match(event_match, request.home_advantage, &mut rng)
            .with_context(|| format!("error solving match {}", event_match.fixture))?;
        solutions.push(solution);
    }

    Ok(SolveEventsResult {
        solutions,
        home_advantage: request.home_advantage,
    })
}

fn solve_single_match(
    event_match: &EventMatch,
    home_advantage: f64,
    rng: &mut StdRng,
) -> Result<EventSolution> {
    let Some((home, away)) = parse_event_name(&event_match.fixture) else {
        bail!("unparseable fixture name: {}", event_match.fixture);
    };
    if home == away {
        bail!("fixture pits {home} against itself");
    }

    let ratings: Ratings = [(home.to_string(), 1.0), (away.to_string(), 1.0)]
        .into_iter()
        .collect();
    let event = Event {
        name: event_match.fixture.clone(),
        date: String::new(),
        score: None,
        match_odds: Some(MatchOdds {
            prices: event_match.match_odds.to_vec(),
        }),
    };

    let options = single_match_options(home_advantage);
    let outcome = solver::solve(
        std::slice::from_ref(&event),
        &[],
        &ratings,
        1.0,
        &options,
        rng,
    )?;

    let home_lambda = outcome.ratings[home] + home_advantage;
    let away_lambda = outcome.ratings[away];
    let matrix = ScoreMatrix::new(home_lambda, away_lambda);
    let odds = matrix.match_odds();
    info!(
        fixture = %event_match.fixture,
        home_lambda,
        away_lambda,
        error = outcome.error,
        "fixture solved"
    );

    Ok(EventSolution {
        fixture: event_match.fixture.clone(),
        lambdas: [home_lambda, away_lambda],
        probabilities: odds.as_array(),
        asian_handicaps: matrix.asian_handicaps(),
        total_goals: matrix.total_goals(),
        solver_error: outcome.error,
    })
}
