use std::collections::HashMap;

use crate::math::implied_probabilities;
use crate::matrix::ScoreMatrix;
use crate::types::{parse_event_name, Event, Ratings, EVENT_NAME_SEPARATOR};

/// Expected points per game under the fitted model: every team meets every
/// other team home and away, normalized by the 2(T-1) games played.
pub fn calc_ppg_ratings(
    team_names: &[String],
    ratings: &Ratings,
    home_advantage: f64,
) -> HashMap<String, f64> {
    let mut ppg: HashMap<String, f64> =
        team_names.iter().map(|name| (name.clone(), 0.0)).collect();

    for home in team_names {
        for away in team_names {
            if home == away {
                continue;
            }
            let fixture = format!("{home}{EVENT_NAME_SEPARATOR}{away}");
            let matrix = ScoreMatrix::from_fixture(&fixture, ratings, home_advantage);
            *ppg.get_mut(home).expect("home listed") += matrix.expected_home_points();
            *ppg.get_mut(away).expect("away listed") += matrix.expected_away_points();
        }
    }

    let total_games = (2 * (team_names.len().saturating_sub(1))) as f64;
    if total_games > 0.0 {
        for value in ppg.values_mut() {
            *value /= total_games;
        }
    }
    ppg
}

/// Per-team absolute gaps between model and market expected points over the
/// training events each team appears in.
pub fn calc_training_errors(
    team_names: &[String],
    events: &[Event],
    ratings: &Ratings,
    home_advantage: f64,
) -> HashMap<String, Vec<f64>> {
    let mut errors: HashMap<String, Vec<f64>> = team_names
        .iter()
        .map(|name| (name.clone(), Vec::new()))
        .collect();

    for event in events {
        let Some((home, away)) = parse_event_name(&event.name) else {
            continue;
        };
        let Some(odds) = event.match_odds.as_ref() else {
            continue;
        };
        let Ok(market) = implied_probabilities(odds) else {
            continue;
        };

        let matrix = ScoreMatrix::from_fixture(&event.name, ratings, home_advantage);
        let market_home_points = 3.0 * market.home + market.draw;
        let market_away_points = 3.0 * market.away + market.draw;

        if let Some(list) = errors.get_mut(home) {
            list.push((matrix.expected_home_points() - market_home_points).abs());
        }
        if let Some(list) = errors.get_mut(away) {
            list.push((matrix.expected_away_points() - market_away_points).abs());
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MatchOdds;

    fn names(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn ppg_ratings_rank_with_the_underlying_ratings() {
        let team_names = names(&["A", "B", "C"]);
        let ratings: Ratings = [
            ("A".to_string(), 2.2),
            ("B".to_string(), 1.4),
            ("C".to_string(), 0.7),
        ]
        .into_iter()
        .collect();
        let ppg = calc_ppg_ratings(&team_names, &ratings, 0.3);

        assert!(ppg["A"] > ppg["B"] && ppg["B"] > ppg["C"]);
        for value in ppg.values() {
            assert!(*value > 0.0 && *value < 3.0);
        }
    }

    #[test]
    fn equal_ratings_give_equal_ppg() {
        let team_names = names(&["A", "B"]);
        let ratings: Ratings = [("A".to_string(), 1.3), ("B".to_string(), 1.3)]
            .into_iter()
            .collect();
        let ppg = calc_ppg_ratings(&team_names, &ratings, 0.4);
        assert!((ppg["A"] - ppg["B"]).abs() < 1e-12);
    }

    #[test]
    fn training_errors_vanish_when_the_market_matches_the_model() {
        let team_names = names(&["A", "B"]);
        let ratings: Ratings = [("A".to_string(), 1.6), ("B".to_string(), 1.0)]
            .into_iter()
            .collect();
        let model = ScoreMatrix::from_fixture("A vs B", &ratings, 0.2).match_odds();
        let event = Event {
            name: "A vs B".to_string(),
            date: "2026-02-01".to_string(),
            score: None,
            match_odds: Some(MatchOdds {
                prices: vec![1.0 / model.home, 1.0 / model.draw, 1.0 / model.away],
            }),
        };

        let errors = calc_training_errors(&team_names, &[event], &ratings, 0.2);
        assert_eq!(errors["A"].len(), 1);
        assert_eq!(errors["B"].len(), 1);
        assert!(errors["A"][0] < 1e-9);
        assert!(errors["B"][0] < 1e-9);
    }
}
