use anyhow::{bail, Result};

use crate::types::MatchOdds;

/// Normalized three-way outcome probabilities [home, draw, away].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutcomeProbs {
    pub home: f64,
    pub draw: f64,
    pub away: f64,
}

impl OutcomeProbs {
    pub fn uniform() -> Self {
        Self {
            home: 1.0 / 3.0,
            draw: 1.0 / 3.0,
            away: 1.0 / 3.0,
        }
    }

    pub fn as_array(&self) -> [f64; 3] {
        [self.home, self.draw, self.away]
    }
}

/// Overround-normalized probabilities implied by decimal 1X2 prices.
pub fn implied_probabilities(odds: &MatchOdds) -> Result<OutcomeProbs> {
    if odds.prices.len() != 3 {
        bail!("match odds must carry exactly 3 prices, got {}", odds.prices.len());
    }
    for price in &odds.prices {
        if !(*price > 0.0) {
            bail!("match odds prices must be strictly positive, got {price}");
        }
    }
    let inv: Vec<f64> = odds.prices.iter().map(|p| 1.0 / p).collect();
    let overround: f64 = inv.iter().sum();
    Ok(OutcomeProbs {
        home: inv[0] / overround,
        draw: inv[1] / overround,
        away: inv[2] / overround,
    })
}

/// RMS distance between two outcome triples.
///
/// All three outcomes enter even though the third is linearly dependent:
/// home/away outcomes carry double weight relative to draws, keeping team
/// strength the primary fit target.
pub fn rms_error(x: &OutcomeProbs, y: &OutcomeProbs) -> f64 {
    let dh = x.home - y.home;
    let dd = x.draw - y.draw;
    let da = x.away - y.away;
    ((dh * dh + dd * dd + da * da) / 3.0).sqrt()
}

/// Recency weight for the event at `index` of `total` time-ordered events.
///
/// The newest event weighs 1.0 and the oldest 0.0; `power` steepens the
/// decay toward recent events (1.0 = linear).
pub fn time_power_weight(index: usize, total: usize, power: f64) -> f64 {
    if total <= 1 {
        return 1.0;
    }
    let ratio = index as f64 / (total - 1) as f64;
    ratio.powf(power)
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n − 1 denominator).
pub fn std_deviation(values: &[f64]) -> f64 {
    if values.len() <= 1 {
        return 0.0;
    }
    let m = mean(values);
    let sum: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
    (sum / (values.len() - 1) as f64).sqrt()
}

pub fn sum_product(x: &[f64], y: &[f64]) -> f64 {
    if x.len() != y.len() {
        return 0.0;
    }
    x.iter().zip(y).map(|(a, b)| a * b).sum()
}
