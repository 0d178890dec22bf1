use std::collections::HashMap;

use crate::math::sum_product;
use crate::simulator::SimPoints;
use crate::types::{Market, OutrightMark};

/// Team -> positional probability vector inside one aggregation group.
pub type PositionProbabilities = HashMap<String, Vec<f64>>;

/// The aggregation group holding every team's league-wide position vector.
pub const DEFAULT_GROUP: &str = "default";

/// Computes the positional probability group for every market plus the
/// league-wide default group.
///
/// Markets sharing the same participating set (in any order) are served from
/// one cached aggregation, keyed by the canonical sorted subset.
pub fn calc_position_probabilities(
    sim_points: &SimPoints,
    markets: &[Market],
) -> HashMap<String, PositionProbabilities> {
    let mut cache: HashMap<String, PositionProbabilities> = HashMap::new();
    let mut groups = HashMap::new();

    let default_key = canonical_key(sim_points.team_names());
    let default_probs = cache
        .entry(default_key)
        .or_insert_with(|| sim_points.position_probabilities(None))
        .clone();
    groups.insert(DEFAULT_GROUP.to_string(), default_probs);

    for market in markets {
        if market.teams.is_empty() {
            continue;
        }
        let key = canonical_key(&market.teams);
        let probs = cache
            .entry(key)
            .or_insert_with(|| sim_points.position_probabilities(Some(&market.teams)))
            .clone();
        groups.insert(market.name.clone(), probs);
    }

    groups
}

/// Fair marks: each included team's position vector dotted with the market's
/// payoff vector. Teams absent from the aggregation group yield no mark.
pub fn calc_outright_marks(
    position_probabilities: &HashMap<String, PositionProbabilities>,
    markets: &[Market],
) -> Vec<OutrightMark> {
    let mut marks = Vec::new();
    for market in markets {
        let group_key = if position_probabilities.contains_key(&market.name) {
            market.name.as_str()
        } else {
            DEFAULT_GROUP
        };
        let Some(group) = position_probabilities.get(group_key) else {
            continue;
        };

        let payoff: Vec<f64> = market.parsed_payoff.iter().map(|&v| v as f64).collect();
        for team in &market.teams {
            let Some(probs) = group.get(team) else {
                continue;
            };
            marks.push(OutrightMark {
                market: market.name.clone(),
                team: team.clone(),
                mark: sum_product(probs, &payoff),
            });
        }
    }
    marks
}

fn canonical_key(team_names: &[String]) -> String {
    let mut sorted: Vec<&str> = team_names.iter().map(String::as_str).collect();
    sorted.sort_unstable();
    sorted.join(",")
}
