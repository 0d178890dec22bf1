use rand::Rng;
use serde::Serialize;

use crate::math::OutcomeProbs;
use crate::types::{parse_event_name, Ratings};

/// Scorelines 0..=10 per side.
pub const MAX_GOALS: usize = 11;

/// Dixon-Coles low-score correlation, held fixed.
pub const DEFAULT_RHO: f64 = 0.1;

/// Joint score-probability table for one fixture.
///
/// Cell `(i, j)` holds `P_Poisson(home_lambda, i) * P_Poisson(away_lambda, j)
/// * tau(i, j, rho)`. Derived quantities are masked sums over the cells,
/// re-normalized on demand.
#[derive(Debug, Clone)]
pub struct ScoreMatrix {
    pub home_lambda: f64,
    pub away_lambda: f64,
    pub rho: f64,
    cells: [[f64; MAX_GOALS]; MAX_GOALS],
}

/// One Asian-handicap line: three entries on integer lines (the push is a
/// live outcome), two on half lines.
#[derive(Debug, Clone, Serialize)]
pub struct AsianHandicapLine {
    pub line: f64,
    pub probabilities: Vec<f64>,
}

/// One total-goals line with normalized under/over split.
#[derive(Debug, Clone, Serialize)]
pub struct TotalGoalsLine {
    pub line: f64,
    pub under: f64,
    pub over: f64,
}

impl ScoreMatrix {
    pub fn new(home_lambda: f64, away_lambda: f64) -> Self {
        let pmf_home = poisson_pmf(home_lambda);
        let pmf_away = poisson_pmf(away_lambda);
        let mut cells = [[0.0; MAX_GOALS]; MAX_GOALS];
        for (i, row) in cells.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().enumerate() {
                *cell = pmf_home[i] * pmf_away[j] * dixon_coles_tau(i, j, DEFAULT_RHO);
            }
        }
        Self {
            home_lambda,
            away_lambda,
            rho: DEFAULT_RHO,
            cells,
        }
    }

    /// Builds the matrix for a named fixture from the ratings map.
    ///
    /// The home side's lambda carries the home advantage. Unknown names fall
    /// back to a zero rating; ingest validation rules them out upstream.
    pub fn from_fixture(event_name: &str, ratings: &Ratings, home_advantage: f64) -> Self {
        let (home, away) = parse_event_name(event_name).unwrap_or(("", ""));
        let home_lambda = ratings.get(home).copied().unwrap_or_default() + home_advantage;
        let away_lambda = ratings.get(away).copied().unwrap_or_default();
        Self::new(home_lambda, away_lambda)
    }

    /// Unnormalized mass of the cells selected by `mask(home_goals, away_goals)`.
    fn probability(&self, mask: impl Fn(usize, usize) -> bool) -> f64 {
        let mut total = 0.0;
        for (i, row) in self.cells.iter().enumerate() {
            for (j, cell) in row.iter().enumerate() {
                if mask(i, j) {
                    total += cell;
                }
            }
        }
        total
    }

    /// Normalized 1X2 probabilities.
    pub fn match_odds(&self) -> OutcomeProbs {
        let home_win = self.probability(|i, j| i > j);
        let draw = self.probability(|i, j| i == j);
        let away_win = self.probability(|i, j| i < j);
        let total = home_win + draw + away_win;
        OutcomeProbs {
            home: home_win / total,
            draw: draw / total,
            away: away_win / total,
        }
    }

    pub fn expected_home_points(&self) -> f64 {
        let odds = self.match_odds();
        3.0 * odds.home + odds.draw
    }

    pub fn expected_away_points(&self) -> f64 {
        let odds = self.match_odds();
        3.0 * odds.away + odds.draw
    }

    /// Draws `n_paths` independent score pairs by inverse CDF over the
    /// flattened, renormalized table.
    pub fn sample_scores<R: Rng>(&self, n_paths: usize, rng: &mut R) -> Vec<(i32, i32)> {
        let total = self.probability(|_, _| true);
        let mut cumulative = Vec::with_capacity(MAX_GOALS * MAX_GOALS);
        let mut running = 0.0;
        for row in &self.cells {
            for cell in row {
                running += cell / total;
                cumulative.push(running);
            }
        }

        let mut scores = Vec::with_capacity(n_paths);
        for _ in 0..n_paths {
            let r: f64 = rng.gen();
            let flat = cumulative
                .iter()
                .position(|cum| r <= *cum)
                .unwrap_or(cumulative.len() - 1);
            scores.push(((flat / MAX_GOALS) as i32, (flat % MAX_GOALS) as i32));
        }
        scores
    }

    /// Asian-handicap prices at half-point steps across the table's range.
    pub fn asian_handicaps(&self) -> Vec<AsianHandicapLine> {
        let max_half_steps = 2 * (MAX_GOALS as i64 - 1) - 1;
        let mut lines = Vec::new();
        for half_steps in -max_half_steps..=max_half_steps {
            let line = half_steps as f64 / 2.0;
            // Compare 2i + 2*line against 2j to keep the push test exact.
            let home_win = self.probability(|i, j| 2 * i as i64 + half_steps > 2 * j as i64);
            let away_win = self.probability(|i, j| 2 * i as i64 + half_steps < 2 * j as i64);
            let probabilities = if half_steps % 2 == 0 {
                let push = self.probability(|i, j| 2 * i as i64 + half_steps == 2 * j as i64);
                let total = home_win + push + away_win;
                vec![home_win / total, push / total, away_win / total]
            } else {
                let total = home_win + away_win;
                vec![home_win / total, away_win / total]
            };
            lines.push(AsianHandicapLine {
                line,
                probabilities,
            });
        }
        lines
    }

    /// Under/over splits for every half-goal total the table can resolve.
    pub fn total_goals(&self) -> Vec<TotalGoalsLine> {
        let max_total = 2 * (MAX_GOALS as i64 - 1);
        let mut lines = Vec::new();
        let mut half_steps = 1;
        while half_steps < 2 * max_total {
            let line = half_steps as f64 / 2.0;
            let under = self.probability(|i, j| (2 * (i + j) as i64) < half_steps);
            let over = self.probability(|i, j| 2 * (i + j) as i64 > half_steps);
            let total = under + over;
            lines.push(TotalGoalsLine {
                line,
                under: under / total,
                over: over / total,
            });
            half_steps += 2;
        }
        lines
    }
}

/// Truncated Poisson PMF over 0..MAX_GOALS by the multiplicative recurrence.
fn poisson_pmf(lambda: f64) -> [f64; MAX_GOALS] {
    let lambda = lambda.max(0.0);
    let mut out = [0.0; MAX_GOALS];
    out[0] = (-lambda).exp();
    for k in 1..MAX_GOALS {
        out[k] = out[k - 1] * lambda / k as f64;
    }
    out
}

/// Dixon-Coles correction for the four lowest scorelines.
///
/// The (0,0) factor uses the `1 - i*j*rho` product form, which collapses to 1
/// there, so only the three neighbouring cells are corrected.
fn dixon_coles_tau(i: usize, j: usize, rho: f64) -> f64 {
    match (i, j) {
        (0, 0) => 1.0,
        (0, 1) | (1, 0) => 1.0 + rho / 2.0,
        (1, 1) => 1.0 - rho,
        _ => 1.0,
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn match_odds_sum_to_one() {
        let matrix = ScoreMatrix::new(1.8, 0.9);
        let odds = matrix.match_odds();
        assert!((odds.home + odds.draw + odds.away - 1.0).abs() < 1e-12);
        assert!(odds.home > 0.0 && odds.draw > 0.0 && odds.away > 0.0);
    }

    #[test]
    fn low_score_cells_carry_documented_corrections() {
        let matrix = ScoreMatrix::new(1.0, 1.0);
        let pmf = poisson_pmf(1.0);
        let raw = |i: usize, j: usize| pmf[i] * pmf[j];
        let cell = |i: usize, j: usize| {
            matrix.probability(|a, b| a == i && b == j)
        };

        assert!((cell(0, 0) / raw(0, 0) - 1.0).abs() < 1e-12);
        assert!((cell(0, 1) / raw(0, 1) - (1.0 + DEFAULT_RHO / 2.0)).abs() < 1e-12);
        assert!((cell(1, 0) / raw(1, 0) - (1.0 + DEFAULT_RHO / 2.0)).abs() < 1e-12);
        assert!((cell(1, 1) / raw(1, 1) - (1.0 - DEFAULT_RHO)).abs() < 1e-12);
        assert!((cell(2, 2) / raw(2, 2) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn raising_home_rating_shifts_the_win_split() {
        let mut ratings = Ratings::new();
        ratings.insert("Home".to_string(), 1.2);
        ratings.insert("Away".to_string(), 1.2);
        let base = ScoreMatrix::from_fixture("Home vs Away", &ratings, 0.0).match_odds();

        ratings.insert("Home".to_string(), 1.7);
        let boosted = ScoreMatrix::from_fixture("Home vs Away", &ratings, 0.0).match_odds();
        assert!(boosted.home > base.home);
        assert!(boosted.away < base.away);

        ratings.insert("Home".to_string(), 1.2);
        ratings.insert("Away".to_string(), 1.7);
        let away_boosted = ScoreMatrix::from_fixture("Home vs Away", &ratings, 0.0).match_odds();
        assert!(away_boosted.away > base.away);
        assert!(away_boosted.home < base.home);
    }

    #[test]
    fn home_advantage_raises_expected_home_points() {
        let mut ratings = Ratings::new();
        ratings.insert("Home".to_string(), 1.1);
        ratings.insert("Away".to_string(), 1.1);
        let flat = ScoreMatrix::from_fixture("Home vs Away", &ratings, 0.0);
        let tilted = ScoreMatrix::from_fixture("Home vs Away", &ratings, 0.6);
        assert!(tilted.expected_home_points() > flat.expected_home_points());
        assert!(tilted.expected_away_points() < flat.expected_away_points());
    }

    #[test]
    fn sampled_scores_stay_in_range_and_follow_the_seed() {
        let matrix = ScoreMatrix::new(1.6, 1.1);
        let mut rng = StdRng::seed_from_u64(17);
        let scores = matrix.sample_scores(500, &mut rng);
        assert_eq!(scores.len(), 500);
        for (h, a) in &scores {
            assert!((0..MAX_GOALS as i32).contains(h));
            assert!((0..MAX_GOALS as i32).contains(a));
        }

        let mut rng_again = StdRng::seed_from_u64(17);
        assert_eq!(scores, matrix.sample_scores(500, &mut rng_again));
    }

    #[test]
    fn handicap_lines_normalize_per_line() {
        let matrix = ScoreMatrix::new(1.5, 1.0);
        let lines = matrix.asian_handicaps();
        assert_eq!(lines.len(), 39);
        for line in &lines {
            let is_integer = line.line.fract() == 0.0;
            assert_eq!(line.probabilities.len(), if is_integer { 3 } else { 2 });
            let sum: f64 = line.probabilities.iter().sum();
            assert!((sum - 1.0).abs() < 1e-12, "line {} sums to {}", line.line, sum);
        }
        // A deep home handicap should make the away side the strong favourite.
        let deep = lines.first().expect("lines not empty");
        assert!(deep.probabilities.last().copied().unwrap_or_default() > 0.95);
    }

    #[test]
    fn total_goals_lines_normalize_and_step_monotonically() {
        let matrix = ScoreMatrix::new(1.5, 1.0);
        let lines = matrix.total_goals();
        assert_eq!(lines.len(), 20);
        assert!((lines[0].line - 0.5).abs() < 1e-12);
        assert!((lines[19].line - 19.5).abs() < 1e-12);
        let mut previous_under = 0.0;
        for line in &lines {
            assert!((line.under + line.over - 1.0).abs() < 1e-12);
            assert!(line.under >= previous_under);
            previous_under = line.under;
        }
    }
}
