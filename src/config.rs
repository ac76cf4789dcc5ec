use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::engine::elo::{MatchResult, RatingTable};
use crate::engine::odds::OddsFormat;
use crate::engine::poisson::{MatchInputs, DEFAULT_LEAGUE_AVG_GOALS};

/// Engine defaults plus optional scenarios for the report binary.
///
/// Every defaults section may be omitted from the TOML; scenario sections are
/// only evaluated when present.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub poisson: PoissonConfig,
    #[serde(default)]
    pub elo: EloConfig,
    #[serde(default)]
    pub kelly: KellyConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub valuation: ValuationConfig,
    #[serde(default)]
    pub risk: RiskConfig,

    #[serde(rename = "match")]
    pub match_scenario: Option<MatchScenario>,
    pub season: Option<SeasonScenario>,
    pub stock: Option<StockScenario>,
    pub portfolio: Option<PortfolioScenario>,
    pub betting: Option<BettingScenario>,
    pub returns: Option<ReturnsScenario>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PoissonConfig {
    pub league_avg_goals: f64,
}

impl Default for PoissonConfig {
    fn default() -> Self {
        Self {
            league_avg_goals: DEFAULT_LEAGUE_AVG_GOALS,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct EloConfig {
    pub k_factor: f64,
    pub home_advantage: f64,
    pub base_rating: f64,
}

impl Default for EloConfig {
    fn default() -> Self {
        Self {
            k_factor: 32.0,
            home_advantage: 100.0,
            base_rating: 1500.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct KellyConfig {
    /// Multiplier on full Kelly (0.5 = half Kelly).
    pub fraction: f64,
    /// Minimum value, in percentage points, for a bet to count as value.
    pub value_threshold: f64,
}

impl Default for KellyConfig {
    fn default() -> Self {
        Self {
            fraction: 0.5,
            value_threshold: 5.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct SimulationConfig {
    pub simulation_count: usize,
    /// 0 draws a fresh seed from the OS for every run.
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            simulation_count: 10_000,
            seed: 0,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct ValuationConfig {
    /// AAA corporate bond yield (%), used by the modified Graham formula.
    pub aaa_yield: f64,
    pub discount_rate: f64,
    pub terminal_growth_rate: f64,
    pub projection_years: u32,
}

impl Default for ValuationConfig {
    fn default() -> Self {
        Self {
            aaa_yield: 4.4,
            discount_rate: 10.0,
            terminal_growth_rate: 3.0,
            projection_years: 5,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct RiskConfig {
    /// Per-period risk-free return (%), same units as the return series.
    pub risk_free_rate: f64,
    /// VaR confidence level (%).
    pub confidence: f64,
    pub periods_per_year: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            risk_free_rate: 0.0,
            confidence: 95.0,
            periods_per_year: 252.0,
        }
    }
}

/// One bookmaker's 1X2 prices, written in `format` (decimal by default).
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct BookmakerPrices {
    pub name: String,
    #[serde(default)]
    pub format: OddsFormat,
    pub home: f64,
    #[serde(default)]
    pub draw: Option<f64>,
    pub away: f64,
}

impl BookmakerPrices {
    pub fn decimal_home(&self) -> f64 {
        self.format.to_decimal(self.home)
    }

    pub fn decimal_draw(&self) -> Option<f64> {
        self.draw.map(|d| self.format.to_decimal(d))
    }

    pub fn decimal_away(&self) -> f64 {
        self.format.to_decimal(self.away)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct MatchScenario {
    #[serde(flatten)]
    pub inputs: MatchInputs,
    #[serde(default)]
    pub bankroll: Option<f64>,
    #[serde(default)]
    pub over_2_5_odds: Option<f64>,
    #[serde(default)]
    pub under_2_5_odds: Option<f64>,
    #[serde(default)]
    pub bookmakers: Vec<BookmakerPrices>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SeasonScenario {
    #[serde(default)]
    pub ratings: std::collections::HashMap<String, f64>,
    pub matches: Vec<MatchResult>,
}

impl SeasonScenario {
    pub fn rating_table(&self) -> RatingTable {
        crate::engine::elo::rating_table(self.ratings.iter().map(|(t, v)| (t.clone(), *v)))
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct StockScenario {
    pub price: f64,
    pub eps: f64,
    pub book_value: f64,
    /// Expected EPS / FCF growth (%).
    pub growth_rate: f64,
    #[serde(default)]
    pub free_cash_flow: Option<f64>,
    #[serde(default)]
    pub shares_outstanding: Option<f64>,
    #[serde(default)]
    pub fair_pe: Option<f64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PortfolioScenario {
    pub initial_value: f64,
    pub expected_return: f64,
    pub volatility: f64,
    pub horizon_years: f64,
    #[serde(default)]
    pub simulation_count: Option<usize>,
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BettingScenario {
    pub initial_bankroll: f64,
    pub num_bets: usize,
    pub win_probability: f64,
    pub average_odds: f64,
    pub stake_percent: f64,
    #[serde(default)]
    pub simulation_count: Option<usize>,
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReturnsScenario {
    pub returns: Vec<f64>,
    #[serde(default)]
    pub benchmark: Option<Vec<f64>>,
    #[serde(default = "default_initial_value")]
    pub initial_value: f64,
}

fn default_initial_value() -> f64 {
    100.0
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(content).with_context(|| "Failed to parse config TOML")?;
        Ok(config)
    }
}
