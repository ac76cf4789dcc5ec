pub mod elo;
pub mod kelly;
pub mod monte_carlo;
pub mod odds;
pub mod poisson;
pub mod risk;
pub mod stats;
pub mod valuation;

pub use kelly::{full_kelly, kelly, KellyResult};
pub use monte_carlo::{simulate_betting, simulate_portfolio, SimulationResult};
pub use poisson::{predict_match, MatchInputs, MatchPrediction};
