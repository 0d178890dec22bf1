use std::collections::HashMap;

use rand::rngs::StdRng;

use crate::matrix::ScoreMatrix;
use crate::types::{parse_event_name, Ratings, Team};

/// Per-team points and goal-difference accumulators across all Monte Carlo
/// paths, seeded from the current league standings.
///
/// Teams keep their league-table order; within one path, ordering ties on
/// both points and goal difference resolve by that order, so two teams never
/// share a position.
#[derive(Debug)]
pub struct SimPoints {
    n_paths: usize,
    team_names: Vec<String>,
    index: HashMap<String, usize>,
    points: Vec<Vec<i32>>,
    goal_difference: Vec<Vec<i32>>,
}

impl SimPoints {
    pub fn new(league_table: &[Team], n_paths: usize) -> Self {
        let team_names: Vec<String> = league_table.iter().map(|t| t.name.clone()).collect();
        let index = team_names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();
        let points = league_table
            .iter()
            .map(|t| vec![t.points; n_paths])
            .collect();
        let goal_difference = league_table
            .iter()
            .map(|t| vec![t.goal_difference; n_paths])
            .collect();
        Self {
            n_paths,
            team_names,
            index,
            points,
            goal_difference,
        }
    }

    pub fn n_paths(&self) -> usize {
        self.n_paths
    }

    pub fn team_names(&self) -> &[String] {
        &self.team_names
    }

    /// Samples one score pair per path for the fixture and folds the
    /// {3, 1, 0} points and the signed goal difference into both sides.
    pub fn simulate_fixture(
        &mut self,
        event_name: &str,
        ratings: &Ratings,
        home_advantage: f64,
        rng: &mut StdRng,
    ) {
        let Some((home, away)) = parse_event_name(event_name) else {
            return;
        };
        let matrix = ScoreMatrix::from_fixture(event_name, ratings, home_advantage);
        let scores = matrix.sample_scores(self.n_paths, rng);

        if let Some(&team) = self.index.get(home) {
            for (path, (home_goals, away_goals)) in scores.iter().enumerate() {
                self.points[team][path] += match home_goals.cmp(away_goals) {
                    std::cmp::Ordering::Greater => 3,
                    std::cmp::Ordering::Equal => 1,
                    std::cmp::Ordering::Less => 0,
                };
                self.goal_difference[team][path] += home_goals - away_goals;
            }
        }
        if let Some(&team) = self.index.get(away) {
            for (path, (home_goals, away_goals)) in scores.iter().enumerate() {
                self.points[team][path] += match away_goals.cmp(home_goals) {
                    std::cmp::Ordering::Greater => 3,
                    std::cmp::Ordering::Equal => 1,
                    std::cmp::Ordering::Less => 0,
                };
                self.goal_difference[team][path] += away_goals - home_goals;
            }
        }
    }

    /// Positional probability vectors over the selected subset (all teams
    /// when `None`), as relative frequencies across paths.
    ///
    /// For a subset of k teams the ordering runs inside the subset only and
    /// each vector has length k; position 0 is the subset winner.
    pub fn position_probabilities(&self, subset: Option<&[String]>) -> HashMap<String, Vec<f64>> {
        let selected: Vec<usize> = match subset {
            None => (0..self.team_names.len()).collect(),
            Some(names) => names
                .iter()
                .filter_map(|name| self.index.get(name))
                .copied()
                .collect(),
        };
        if selected.is_empty() {
            return HashMap::new();
        }

        let k = selected.len();
        let mut counts: Vec<Vec<u32>> = vec![vec![0; k]; k];
        let mut order: Vec<usize> = Vec::with_capacity(k);
        for path in 0..self.n_paths {
            order.clear();
            order.extend(0..k);
            // Stable sort: full ties keep the standings order of `selected`.
            order.sort_by(|&a, &b| {
                let (ta, tb) = (selected[a], selected[b]);
                self.points[tb][path]
                    .cmp(&self.points[ta][path])
                    .then(self.goal_difference[tb][path].cmp(&self.goal_difference[ta][path]))
            });
            for (position, &sel) in order.iter().enumerate() {
                counts[sel][position] += 1;
            }
        }

        selected
            .iter()
            .enumerate()
            .map(|(sel, &team)| {
                let probs = counts[sel]
                    .iter()
                    .map(|&c| c as f64 / self.n_paths as f64)
                    .collect();
                (self.team_names[team].clone(), probs)
            })
            .collect()
    }

    /// Mean simulated final points per team.
    pub fn expected_points(&self) -> HashMap<String, f64> {
        self.team_names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let total: i64 = self.points[i].iter().map(|&p| p as i64).sum();
                (name.clone(), total as f64 / self.n_paths as f64)
            })
            .collect()
    }
}
