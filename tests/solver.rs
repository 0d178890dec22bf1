use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::SeedableRng;

use outrights::matrix::ScoreMatrix;
use outrights::solver::{self, SolverOptions};
use outrights::types::{Event, MatchOdds, Ratings};

/// Prices a full double round robin from a known (ratings, home advantage)
/// pair, with no overround.
fn synthetic_training_set(truth: &Ratings, home_advantage: f64) -> Vec<Event> {
    let mut names: Vec<&String> = truth.keys().collect();
    names.sort();

    let mut events = Vec::new();
    let mut day = 1;
    for home in &names {
        for away in &names {
            if home == away {
                continue;
            }
            let odds =
                ScoreMatrix::from_fixture(&format!("{home} vs {away}"), truth, home_advantage)
                    .match_odds();
            events.push(Event {
                name: format!("{home} vs {away}"),
                date: format!("2026-01-{day:02}"),
                score: None,
                match_odds: Some(MatchOdds {
                    prices: vec![1.0 / odds.home, 1.0 / odds.draw, 1.0 / odds.away],
                }),
            });
            day += 1;
        }
    }
    events
}

#[test]
fn joint_fit_recovers_known_parameters() {
    let truth: Ratings = HashMap::from([
        ("Aston".to_string(), 2.0),
        ("Brent".to_string(), 1.4),
        ("Crewe".to_string(), 1.0),
        ("Derby".to_string(), 0.6),
    ]);
    let home_advantage = 0.35;
    let events = synthetic_training_set(&truth, home_advantage);

    let initial: Ratings = truth.keys().map(|name| (name.clone(), 1.0)).collect();
    let options = SolverOptions {
        generations: 1000,
        population_size: 20,
        use_league_table_init: false,
        ..SolverOptions::default()
    };
    let mut rng = StdRng::seed_from_u64(2026);
    let outcome =
        solver::solve(&events, &[], &initial, 1.0, &options, &mut rng).expect("solvable");

    for (name, target) in &truth {
        let fitted = outcome.ratings[name];
        assert!(
            (fitted - target).abs() <= 0.15,
            "{name} fitted at {fitted}, target {target}"
        );
    }
    assert!(
        (outcome.home_advantage - home_advantage).abs() <= 0.15,
        "home advantage fitted at {}",
        outcome.home_advantage
    );
    assert!(outcome.error < 0.02, "residual error {}", outcome.error);
}

#[test]
fn fixed_home_advantage_mode_leaves_it_untouched() {
    let truth: Ratings = HashMap::from([
        ("Aston".to_string(), 1.8),
        ("Brent".to_string(), 0.9),
    ]);
    let events = synthetic_training_set(&truth, 0.4);

    let initial: Ratings = truth.keys().map(|name| (name.clone(), 1.0)).collect();
    let options = SolverOptions {
        generations: 300,
        population_size: 20,
        home_advantage: Some(0.4),
        use_league_table_init: false,
        ..SolverOptions::default()
    };
    let mut rng = StdRng::seed_from_u64(5);
    let outcome =
        solver::solve(&events, &[], &initial, 1.0, &options, &mut rng).expect("solvable");

    assert_eq!(outcome.home_advantage.to_bits(), 0.4_f64.to_bits());
    for (name, target) in &truth {
        assert!(
            (outcome.ratings[name] - target).abs() <= 0.15,
            "{name} fitted at {}",
            outcome.ratings[name]
        );
    }
}
