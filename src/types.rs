use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Team name -> attack-strength lambda offset.
pub type Ratings = HashMap<String, f64>;

/// The team separator inside event names.
pub const EVENT_NAME_SEPARATOR: &str = " vs ";

/// Splits `"<Home> vs <Away>"` into the two team names.
///
/// Returns `None` when the separator is missing or ambiguous; team names
/// containing `" vs "` are unsupported by the wire format.
pub fn parse_event_name(name: &str) -> Option<(&str, &str)> {
    let mut parts = name.split(EVENT_NAME_SEPARATOR);
    let home = parts.next()?;
    let away = parts.next()?;
    if parts.next().is_some() || home.is_empty() || away.is_empty() {
        return None;
    }
    Some((home, away))
}

/// Decimal 1X2 prices in [home, draw, away] order.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MatchOdds {
    pub prices: Vec<f64>,
}

/// A fixture, either completed (score set) or priced (match odds set).
///
/// The name is the literal string `"<Home> vs <Away>"`; team names must not
/// contain the `" vs "` separator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub name: String,
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<Vec<i32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_odds: Option<MatchOdds>,
}

/// An outright market over a subset of the league.
///
/// `teams` and `parsed_payoff` are derived during market initialization and
/// never travel over the wire. Invariant: `parsed_payoff.len() == teams.len()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Market {
    pub name: String,
    pub payoff: String,
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(skip)]
    pub teams: Vec<String>,
    #[serde(skip)]
    pub parsed_payoff: Vec<i32>,
}

/// One row of the response league table.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Team {
    pub name: String,
    pub points: i32,
    pub goal_difference: i32,
    pub played: i32,
    pub points_per_game_rating: f64,
    pub poisson_rating: f64,
    pub expected_season_points: f64,
    pub position_probabilities: Vec<f64>,
    pub training_events: usize,
    pub mean_training_error: f64,
    pub std_training_error: f64,
}

/// Fair value of a unit stake on one team in one outright market.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutrightMark {
    pub market: String,
    pub team: String,
    pub mark: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationResult {
    pub teams: Vec<Team>,
    pub outright_marks: Vec<OutrightMark>,
    pub home_advantage: f64,
    pub solver_error: f64,
}

/// Full request surface with the documented solver defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationRequest {
    #[serde(default)]
    pub ratings: HashMap<String, f64>,
    #[serde(default)]
    pub results: Vec<Event>,
    #[serde(default)]
    pub events: Vec<Event>,
    #[serde(default)]
    pub handicaps: HashMap<String, i32>,
    #[serde(default)]
    pub markets: Vec<Market>,
    #[serde(default = "default_rounds")]
    pub rounds: usize,
    #[serde(default = "default_n_paths")]
    pub n_paths: usize,
    #[serde(default = "default_generations")]
    pub generations: usize,
    #[serde(default = "default_population_size")]
    pub population_size: usize,
    #[serde(default = "default_mutation_factor")]
    pub mutation_factor: f64,
    #[serde(default = "default_elite_ratio")]
    pub elite_ratio: f64,
    #[serde(default = "default_init_std")]
    pub init_std: f64,
    #[serde(default = "default_decay_exponent")]
    pub decay_exponent: f64,
    #[serde(default = "default_mutation_probability")]
    pub mutation_probability: f64,
    #[serde(default = "default_log_interval")]
    pub log_interval: usize,
    #[serde(default = "default_time_power_weighting")]
    pub time_power_weighting: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home_advantage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    #[serde(default)]
    pub debug: bool,
}

impl Default for SimulationRequest {
    fn default() -> Self {
        Self {
            ratings: HashMap::new(),
            results: Vec::new(),
            events: Vec::new(),
            handicaps: HashMap::new(),
            markets: Vec::new(),
            rounds: default_rounds(),
            n_paths: default_n_paths(),
            generations: default_generations(),
            population_size: default_population_size(),
            mutation_factor: default_mutation_factor(),
            elite_ratio: default_elite_ratio(),
            init_std: default_init_std(),
            decay_exponent: default_decay_exponent(),
            mutation_probability: default_mutation_probability(),
            log_interval: default_log_interval(),
            time_power_weighting: default_time_power_weighting(),
            home_advantage: None,
            seed: None,
            debug: false,
        }
    }
}

fn default_rounds() -> usize {
    1
}

fn default_n_paths() -> usize {
    5000
}

fn default_generations() -> usize {
    1000
}

fn default_population_size() -> usize {
    8
}

fn default_mutation_factor() -> f64 {
    0.1
}

fn default_elite_ratio() -> f64 {
    0.1
}

fn default_init_std() -> f64 {
    0.2
}

fn default_decay_exponent() -> f64 {
    0.5
}

fn default_mutation_probability() -> f64 {
    0.1
}

fn default_log_interval() -> usize {
    10
}

fn default_time_power_weighting() -> f64 {
    1.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_names_split_on_vs() {
        assert_eq!(
            parse_event_name("Arsenal vs Chelsea"),
            Some(("Arsenal", "Chelsea"))
        );
        assert_eq!(parse_event_name("Arsenal - Chelsea"), None);
        assert_eq!(parse_event_name("A vs B vs C"), None);
        assert_eq!(parse_event_name(" vs B"), None);
    }

    #[test]
    fn request_defaults_from_empty_json() {
        let req: SimulationRequest = serde_json::from_str("{}").expect("empty request parses");
        assert_eq!(req.rounds, 1);
        assert_eq!(req.n_paths, 5000);
        assert_eq!(req.generations, 1000);
        assert_eq!(req.population_size, 8);
        assert!((req.elite_ratio - 0.1).abs() < f64::EPSILON);
        assert!((req.time_power_weighting - 1.0).abs() < f64::EPSILON);
        assert!(req.home_advantage.is_none());
        assert!(!req.debug);
    }

    #[test]
    fn event_score_round_trips() {
        let raw = r#"{"name":"A vs B","date":"2026-03-01","score":[2,1]}"#;
        let event: Event = serde_json::from_str(raw).expect("event parses");
        assert_eq!(event.score, Some(vec![2, 1]));
        assert!(event.match_odds.is_none());
        let back = serde_json::to_string(&event).expect("event serializes");
        assert!(back.contains("\"score\":[2,1]"));
        assert!(!back.contains("match_odds"));
    }

    #[test]
    fn market_derived_fields_stay_off_the_wire() {
        let raw = r#"{"name":"Winner","payoff":"1|3x0","include":["A","B","C","D"]}"#;
        let market: Market = serde_json::from_str(raw).expect("market parses");
        assert!(market.teams.is_empty());
        assert!(market.parsed_payoff.is_empty());
        let back = serde_json::to_string(&market).expect("market serializes");
        assert!(!back.contains("teams"));
        assert!(!back.contains("parsed_payoff"));
    }
}
