//! Odds-format conversion and bookmaker margin removal.
//!
//! Decimal odds are the canonical format inside the engine. American and
//! fractional prices are converted at the boundary.

use serde::{Deserialize, Serialize};

/// A validated decimal price (strictly greater than 1).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OddsQuote {
    pub decimal_odds: f64,
}

impl OddsQuote {
    /// Returns `None` for prices that cannot pay out (<= 1, NaN, infinite).
    pub fn new(decimal_odds: f64) -> Option<Self> {
        if decimal_odds.is_finite() && decimal_odds > 1.0 {
            Some(Self { decimal_odds })
        } else {
            None
        }
    }

    /// Implied probability as a fraction in (0, 1).
    pub fn implied_probability(&self) -> f64 {
        1.0 / self.decimal_odds
    }

    /// Net return per unit staked on a win.
    pub fn net_odds(&self) -> f64 {
        self.decimal_odds - 1.0
    }
}

/// How a quoted price is written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OddsFormat {
    #[default]
    Decimal,
    American,
}

impl OddsFormat {
    pub fn to_decimal(self, price: f64) -> f64 {
        match self {
            OddsFormat::Decimal => price,
            OddsFormat::American => american_to_decimal(price),
        }
    }
}

/// Implied probability (fraction) of a decimal price; 0 for invalid prices.
pub fn implied_probability(decimal_odds: f64) -> f64 {
    OddsQuote::new(decimal_odds).map_or(0.0, |q| q.implied_probability())
}

/// Convert American odds to decimal.
/// Positive odds (e.g., +150): 1 + odds/100
/// Negative odds (e.g., -150): 1 + 100/|odds|
/// Returns 0 for a zero price, which is not a valid American quote.
pub fn american_to_decimal(american: f64) -> f64 {
    if american > 0.0 {
        1.0 + american / 100.0
    } else if american < 0.0 {
        1.0 + 100.0 / american.abs()
    } else {
        0.0
    }
}

/// Convert decimal odds to American. Evens and longer map to positive prices.
pub fn decimal_to_american(decimal_odds: f64) -> f64 {
    match OddsQuote::new(decimal_odds) {
        Some(q) if q.decimal_odds >= 2.0 => (q.decimal_odds - 1.0) * 100.0,
        Some(q) => -100.0 / (q.decimal_odds - 1.0),
        None => 0.0,
    }
}

/// Convert a fractional price (e.g., 5/2) to decimal. 0 for a zero denominator.
pub fn fractional_to_decimal(numerator: f64, denominator: f64) -> f64 {
    if denominator <= 0.0 || numerator < 0.0 {
        return 0.0;
    }
    1.0 + numerator / denominator
}

/// Bookmaker overround: sum of implied probabilities minus 1.
/// Invalid prices are ignored.
pub fn overround(decimal_odds: &[f64]) -> f64 {
    let total: f64 = decimal_odds.iter().map(|&o| implied_probability(o)).sum();
    if total == 0.0 {
        return 0.0;
    }
    total - 1.0
}

/// Remove the bookmaker margin by proportional normalisation.
///
/// Returns fair probabilities (fractions) in input order, summing to 1.
/// Invalid prices get probability 0; with no valid prices the book is split
/// evenly.
pub fn remove_vig(decimal_odds: &[f64]) -> Vec<f64> {
    let implied: Vec<f64> = decimal_odds.iter().map(|&o| implied_probability(o)).collect();
    let total: f64 = implied.iter().sum();
    if total == 0.0 {
        if decimal_odds.is_empty() {
            return Vec::new();
        }
        let even = 1.0 / decimal_odds.len() as f64;
        return vec![even; decimal_odds.len()];
    }
    implied.iter().map(|p| p / total).collect()
}
