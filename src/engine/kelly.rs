//! Kelly criterion stake sizing, value-bet detection and arbitrage.
//!
//! `full_kelly` works on a probability fraction (0-1). Every other public
//! function takes probabilities as percentages (0-100), matching the way the
//! prediction models report them.

use serde::{Deserialize, Serialize};

use crate::engine::odds::OddsQuote;
use crate::engine::poisson::MatchPrediction;

/// Value (percentage points) above which a value bet is flagged as strong.
const STRONG_VALUE_THRESHOLD: f64 = 10.0;

/// Total stake split across arbitrage legs.
const ARBITRAGE_STAKE_UNITS: f64 = 100.0;

const KELLY_PRECISION: f64 = 1e12;

/// Default value threshold (percentage points) for `detect_value_bet`.
pub const DEFAULT_VALUE_THRESHOLD: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KellyResult {
    /// Full-Kelly bankroll fraction, clamped at 0.
    pub kelly_fraction: f64,
    #[serde(rename = "kelly_stake")]
    pub stake: f64,
    pub half_stake: f64,
    pub quarter_stake: f64,
    /// `(p * odds - 1) * 100`.
    pub edge: f64,
    /// Expected return per unit staked, in percent. Same quantity as `edge`.
    pub expected_value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    StrongBet,
    Bet,
    Skip,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueBet {
    /// Model probability (%).
    pub true_probability: f64,
    /// Bookmaker implied probability (%).
    pub implied_probability: f64,
    pub bookmaker_odds: f64,
    /// `true - implied`, in percentage points.
    pub value: f64,
    pub is_value_bet: bool,
    pub recommendation: Recommendation,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArbitrageStakes {
    pub home: f64,
    pub draw: Option<f64>,
    pub away: f64,
    /// Payout of every leg (identical by construction).
    pub guaranteed_return: f64,
    pub profit: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArbitrageResult {
    pub best_home_odds: f64,
    pub best_draw_odds: Option<f64>,
    pub best_away_odds: f64,
    /// Sum of implied probabilities of the best prices (fraction).
    pub total_implied_probability: f64,
    pub is_arbitrage: bool,
    /// `(1 - total) * 100`.
    pub margin: f64,
    pub stakes: Option<ArbitrageStakes>,
}

/// One settled bet for `simulate_kelly_growth`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BetOutcome {
    /// Model probability (%).
    pub probability: f64,
    pub odds: f64,
    pub won: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KellyGrowth {
    pub initial_bankroll: f64,
    pub final_bankroll: f64,
    pub peak_bankroll: f64,
    /// Largest peak-to-trough decline (%).
    pub max_drawdown: f64,
    /// `(final - initial) / initial * 100`.
    pub total_return: f64,
    pub bets_placed: usize,
    /// Bankroll after each bet, starting with the initial bankroll.
    pub history: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Market {
    HomeWin,
    Draw,
    AwayWin,
    Over25,
    Under25,
}

/// Bookmaker decimal prices for the markets a Poisson prediction covers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketOdds {
    pub home: Option<f64>,
    pub draw: Option<f64>,
    pub away: Option<f64>,
    pub over_2_5: Option<f64>,
    pub under_2_5: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketValueBet {
    pub market: Market,
    #[serde(flatten)]
    pub bet: ValueBet,
}

/// Full-Kelly fraction `max(0, (b*p - q) / b)` with `b = odds - 1`.
///
/// - `p`: win probability as a fraction
/// - `odds`: decimal odds
///
/// Returns 0 for p <= 0, p >= 1, or odds <= 1.
pub fn full_kelly(p: f64, odds: f64) -> f64 {
    if p.is_nan() || p <= 0.0 || p >= 1.0 || !odds.is_finite() || odds <= 1.0 {
        return 0.0;
    }
    let b = odds - 1.0;
    let q = 1.0 - p;
    let f_star = (b * p - q) / b;
    if f_star <= 0.0 {
        return 0.0;
    }
    // Strip sub-1e-12 float noise: 0.6 @ 2.0 is exactly 0.2.
    (f_star * KELLY_PRECISION).round() / KELLY_PRECISION
}

/// Kelly stake for a bankroll.
///
/// - `probability`: win probability (%)
/// - `odds`: decimal odds
/// - `bankroll`: available balance
/// - `fractional_multiplier`: scaling factor (e.g. 0.25 for quarter-Kelly)
///
/// Half and quarter stakes are derived from the clamped stake, so they are
/// never negative either.
pub fn kelly(probability: f64, odds: f64, bankroll: f64, fractional_multiplier: f64) -> KellyResult {
    let p = probability / 100.0;
    let kelly_fraction = full_kelly(p, odds);

    let bankroll = if bankroll.is_finite() { bankroll.max(0.0) } else { 0.0 };
    let multiplier = if fractional_multiplier.is_finite() {
        fractional_multiplier.max(0.0)
    } else {
        0.0
    };
    let stake = kelly_fraction * bankroll * multiplier;

    let edge = if p.is_finite() && odds.is_finite() {
        (p * odds - 1.0) * 100.0
    } else {
        0.0
    };

    KellyResult {
        kelly_fraction,
        stake,
        half_stake: stake / 2.0,
        quarter_stake: stake / 4.0,
        edge,
        expected_value: edge,
    }
}

/// Compare a model probability with a bookmaker price.
///
/// - `true_probability`: model probability (%)
/// - `bookmaker_odds`: decimal odds
/// - `threshold`: minimum value in percentage points (strict)
///
/// Above 10 points of value the recommendation is a strong bet regardless of
/// `threshold`; otherwise it is a bet when the value clears the threshold.
/// `is_value_bet` always reflects the threshold alone.
pub fn detect_value_bet(true_probability: f64, bookmaker_odds: f64, threshold: f64) -> ValueBet {
    let implied_probability = OddsQuote::new(bookmaker_odds)
        .map_or(100.0, |q| q.implied_probability() * 100.0);
    let value = if true_probability.is_finite() {
        true_probability - implied_probability
    } else {
        0.0
    };
    let is_value_bet = value > threshold;

    let recommendation = if value > STRONG_VALUE_THRESHOLD {
        Recommendation::StrongBet
    } else if is_value_bet {
        Recommendation::Bet
    } else {
        Recommendation::Skip
    };

    ValueBet {
        true_probability,
        implied_probability,
        bookmaker_odds,
        value,
        is_value_bet,
        recommendation,
    }
}

/// Best valid price across bookmakers, if any.
fn best_odds(odds: &[f64]) -> Option<f64> {
    odds.iter()
        .filter_map(|&o| OddsQuote::new(o))
        .map(|q| q.decimal_odds)
        .max_by(|a, b| a.total_cmp(b))
}

/// Look for a sure-bet across bookmakers.
///
/// Takes the best price per outcome and checks whether the implied
/// probabilities sum below 1. An empty `draw_odds` slice means a two-way
/// market. When an arbitrage exists, 100 units are split so that every leg
/// pays out the same amount.
pub fn find_arbitrage(home_odds: &[f64], draw_odds: &[f64], away_odds: &[f64]) -> ArbitrageResult {
    let best_home = best_odds(home_odds);
    let best_draw = best_odds(draw_odds);
    let best_away = best_odds(away_odds);

    let (home, away) = match (best_home, best_away) {
        (Some(h), Some(a)) if draw_odds.is_empty() || best_draw.is_some() => (h, a),
        _ => {
            return ArbitrageResult {
                best_home_odds: best_home.unwrap_or(0.0),
                best_draw_odds: best_draw,
                best_away_odds: best_away.unwrap_or(0.0),
                total_implied_probability: 0.0,
                is_arbitrage: false,
                margin: 0.0,
                stakes: None,
            };
        }
    };

    let total = 1.0 / home + best_draw.map_or(0.0, |d| 1.0 / d) + 1.0 / away;
    let is_arbitrage = total < 1.0;
    let margin = (1.0 - total) * 100.0;

    let stakes = is_arbitrage.then(|| {
        let leg = |odds: f64| ARBITRAGE_STAKE_UNITS * (1.0 / odds) / total;
        let guaranteed_return = ARBITRAGE_STAKE_UNITS / total;
        ArbitrageStakes {
            home: leg(home),
            draw: best_draw.map(leg),
            away: leg(away),
            guaranteed_return,
            profit: guaranteed_return - ARBITRAGE_STAKE_UNITS,
        }
    });

    if is_arbitrage {
        tracing::debug!(home, ?best_draw, away, margin, "arbitrage found");
    }

    ArbitrageResult {
        best_home_odds: home,
        best_draw_odds: best_draw,
        best_away_odds: away,
        total_implied_probability: total,
        is_arbitrage,
        margin,
        stakes,
    }
}

/// Replay a sequence of settled bets with Kelly staking.
///
/// Each bet is sized from its own probability/odds against the bankroll at
/// that point, scaled by `fraction` (0.5 = half Kelly).
pub fn simulate_kelly_growth(initial_bankroll: f64, outcomes: &[BetOutcome], fraction: f64) -> KellyGrowth {
    let initial = if initial_bankroll.is_finite() {
        initial_bankroll.max(0.0)
    } else {
        0.0
    };
    let mut bankroll = initial;
    let mut peak = initial;
    let mut max_drawdown: f64 = 0.0;
    let mut bets_placed = 0;
    let mut history = Vec::with_capacity(outcomes.len() + 1);
    history.push(bankroll);

    for bet in outcomes {
        let sizing = kelly(bet.probability, bet.odds, bankroll, fraction);
        if sizing.stake > 0.0 {
            bets_placed += 1;
            if bet.won {
                bankroll += sizing.stake * (bet.odds - 1.0);
            } else {
                bankroll -= sizing.stake;
            }
        }
        peak = peak.max(bankroll);
        if peak > 0.0 {
            max_drawdown = max_drawdown.max((peak - bankroll) / peak * 100.0);
        }
        history.push(bankroll);
    }

    let total_return = if initial > 0.0 {
        (bankroll - initial) / initial * 100.0
    } else {
        0.0
    };

    KellyGrowth {
        initial_bankroll: initial,
        final_bankroll: bankroll,
        peak_bankroll: peak,
        max_drawdown,
        total_return,
        bets_placed,
        history,
    }
}

/// Run `detect_value_bet` over every priced market of a Poisson prediction and
/// keep the ones that clear `threshold`.
pub fn scan_value_bets(prediction: &MatchPrediction, odds: &MarketOdds, threshold: f64) -> Vec<MarketValueBet> {
    let candidates = [
        (Market::HomeWin, prediction.home_win, odds.home),
        (Market::Draw, prediction.draw, odds.draw),
        (Market::AwayWin, prediction.away_win, odds.away),
        (Market::Over25, prediction.over_2_5, odds.over_2_5),
        (Market::Under25, prediction.under_2_5, odds.under_2_5),
    ];

    candidates
        .into_iter()
        .filter_map(|(market, prob, price)| {
            let bet = detect_value_bet(prob, price?, threshold);
            bet.is_value_bet.then_some(MarketValueBet { market, bet })
        })
        .collect()
}
