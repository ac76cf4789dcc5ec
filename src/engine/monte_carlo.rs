//! Monte Carlo simulation of portfolio growth and betting bankrolls.
//!
//! Every call owns its random source. A non-zero seed makes the run
//! reproducible; seed 0 draws from OS entropy. Callers that need a different
//! generator can use the `*_with_rng` variants.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::engine::stats::{mean, percentile, sample_std_dev, sorted_copy, stride_sample};

/// Points kept in `sampled_distribution`.
pub const MAX_SAMPLED_POINTS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSimulationConfig {
    pub simulation_count: usize,
    pub initial_value: f64,
    /// Annual drift (%).
    pub expected_return: f64,
    /// Annual volatility (%).
    pub volatility: f64,
    pub horizon_years: f64,
    #[serde(default)]
    pub seed: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BettingSimulationConfig {
    pub simulation_count: usize,
    pub initial_bankroll: f64,
    pub num_bets: usize,
    /// Win probability per bet (%).
    pub win_probability: f64,
    /// Decimal odds paid on every win.
    pub average_odds: f64,
    /// Flat share of the current bankroll staked on each bet (%).
    pub stake_percent: f64,
    #[serde(default)]
    pub seed: u64,
}

/// Distribution summary of simulated final values.
/// `probability_of_loss` / `probability_of_gain` are percentages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub simulation_count: usize,
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    pub percentile_5: f64,
    pub percentile_25: f64,
    pub percentile_75: f64,
    pub percentile_95: f64,
    pub min: f64,
    pub max: f64,
    pub probability_of_loss: f64,
    pub probability_of_gain: f64,
    /// Fixed-stride subsample of the sorted outcomes (at most 100 points).
    pub sampled_distribution: Vec<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BettingSimulationResult {
    #[serde(flatten)]
    pub summary: SimulationResult,
    pub avg_final_bankroll: f64,
    /// Mean of per-trial max drawdowns (%).
    pub avg_max_drawdown: f64,
    /// Share of trials that hit a bankroll of 0 (%).
    pub ruin_probability: f64,
    /// Share of trials that finished at 2x the initial bankroll or more (%).
    pub double_probability: f64,
}

fn rng_from_seed(seed: u64) -> StdRng {
    if seed == 0 {
        StdRng::from_entropy()
    } else {
        StdRng::seed_from_u64(seed)
    }
}

/// Standard normal draw via the Box-Muller transform.
fn standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    // 1 - U keeps u1 in (0, 1] so ln() stays finite.
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

fn non_negative(x: f64) -> f64 {
    if x.is_finite() {
        x.max(0.0)
    } else {
        0.0
    }
}

/// Summarise final values against the starting value.
pub fn summarize(outcomes: &[f64], initial_value: f64) -> SimulationResult {
    if outcomes.is_empty() {
        return SimulationResult::default();
    }
    let sorted = sorted_copy(outcomes);
    let n = sorted.len() as f64;
    let losses = sorted.iter().filter(|&&v| v < initial_value).count() as f64;
    let gains = sorted.iter().filter(|&&v| v > initial_value).count() as f64;

    SimulationResult {
        simulation_count: sorted.len(),
        mean: mean(&sorted),
        median: percentile(&sorted, 50.0),
        std_dev: sample_std_dev(&sorted),
        percentile_5: percentile(&sorted, 5.0),
        percentile_25: percentile(&sorted, 25.0),
        percentile_75: percentile(&sorted, 75.0),
        percentile_95: percentile(&sorted, 95.0),
        min: sorted[0],
        max: sorted[sorted.len() - 1],
        probability_of_loss: losses / n * 100.0,
        probability_of_gain: gains / n * 100.0,
        sampled_distribution: stride_sample(&sorted, MAX_SAMPLED_POINTS),
    }
}

/// Single-step GBM per trial: `S = S0 * exp((mu - sigma^2/2) t + sigma sqrt(t) Z)`.
pub fn simulate_portfolio(cfg: &PortfolioSimulationConfig) -> SimulationResult {
    let mut rng = rng_from_seed(cfg.seed);
    simulate_portfolio_with_rng(cfg, &mut rng)
}

pub fn simulate_portfolio_with_rng<R: Rng + ?Sized>(
    cfg: &PortfolioSimulationConfig,
    rng: &mut R,
) -> SimulationResult {
    let mu = if cfg.expected_return.is_finite() {
        cfg.expected_return / 100.0
    } else {
        0.0
    };
    let sigma = non_negative(cfg.volatility) / 100.0;
    let t = non_negative(cfg.horizon_years);
    let drift = (mu - 0.5 * sigma * sigma) * t;
    let diffusion = sigma * t.sqrt();

    tracing::debug!(
        simulations = cfg.simulation_count,
        seed = cfg.seed,
        mu,
        sigma,
        t,
        "portfolio simulation started"
    );

    let outcomes: Vec<f64> = (0..cfg.simulation_count)
        .map(|_| {
            let z = standard_normal(rng);
            cfg.initial_value * (drift + diffusion * z).exp()
        })
        .collect();

    let result = summarize(&outcomes, cfg.initial_value);
    tracing::debug!(
        mean = result.mean,
        probability_of_loss = result.probability_of_loss,
        "portfolio simulation finished"
    );
    result
}

/// Sequential Bernoulli bets with a flat percentage stake.
///
/// The stake is `bankroll * stake_percent` recomputed before every bet, not a
/// Kelly stake. A trial stops early once the bankroll reaches 0 (ruin).
pub fn simulate_betting(cfg: &BettingSimulationConfig) -> BettingSimulationResult {
    let mut rng = rng_from_seed(cfg.seed);
    simulate_betting_with_rng(cfg, &mut rng)
}

pub fn simulate_betting_with_rng<R: Rng + ?Sized>(
    cfg: &BettingSimulationConfig,
    rng: &mut R,
) -> BettingSimulationResult {
    let p = non_negative(cfg.win_probability / 100.0).min(1.0);
    let stake_fraction = non_negative(cfg.stake_percent / 100.0).min(1.0);
    let net_odds = if cfg.average_odds.is_finite() {
        cfg.average_odds - 1.0
    } else {
        0.0
    };
    let initial = non_negative(cfg.initial_bankroll);

    tracing::debug!(
        simulations = cfg.simulation_count,
        bets = cfg.num_bets,
        seed = cfg.seed,
        "betting simulation started"
    );

    let mut finals = Vec::with_capacity(cfg.simulation_count);
    let mut drawdowns = Vec::with_capacity(cfg.simulation_count);
    let mut ruined = 0usize;
    let mut doubled = 0usize;

    for _ in 0..cfg.simulation_count {
        let mut bankroll = initial;
        let mut peak = initial;
        let mut max_drawdown: f64 = 0.0;

        for _ in 0..cfg.num_bets {
            if bankroll <= 0.0 {
                break;
            }
            let stake = bankroll * stake_fraction;
            if rng.gen::<f64>() < p {
                bankroll += stake * net_odds;
            } else {
                bankroll -= stake;
            }
            bankroll = bankroll.max(0.0);
            peak = peak.max(bankroll);
            if peak > 0.0 {
                max_drawdown = max_drawdown.max((peak - bankroll) / peak * 100.0);
            }
        }

        if bankroll <= 0.0 {
            ruined += 1;
        }
        if initial > 0.0 && bankroll >= 2.0 * initial {
            doubled += 1;
        }
        finals.push(bankroll);
        drawdowns.push(max_drawdown);
    }

    if cfg.simulation_count == 0 {
        return BettingSimulationResult::default();
    }

    let n = cfg.simulation_count as f64;
    let result = BettingSimulationResult {
        summary: summarize(&finals, initial),
        avg_final_bankroll: mean(&finals),
        avg_max_drawdown: mean(&drawdowns),
        ruin_probability: ruined as f64 / n * 100.0,
        double_probability: doubled as f64 / n * 100.0,
    };
    tracing::debug!(
        avg_final_bankroll = result.avg_final_bankroll,
        ruin_probability = result.ruin_probability,
        "betting simulation finished"
    );
    result
}
