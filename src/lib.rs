//! Outright-market pricing for a football league.
//!
//! The pipeline fits latent attack-strength ratings (plus a home-advantage
//! parameter) to market-implied 1X2 probabilities with a generational
//! evolutionary optimizer, replays the remaining season by Monte Carlo over
//! a Poisson/Dixon-Coles score kernel, and prices outright markets as the
//! dot product of positional distributions with payoff vectors.

pub mod api;
pub mod events;
pub mod marks;
pub mod markets;
pub mod math;
pub mod matrix;
pub mod metrics;
pub mod simulator;
pub mod solver;
pub mod standings;
pub mod types;

pub use api::{process_simulation, simulate_season, SimOptions};
pub use types::{Event, Market, OutrightMark, SimulationRequest, SimulationResult, Team};
