//! Equity valuation: discounted cash flow, Graham formulas and P/E.
//!
//! Rates are percentages throughout (`10.0` means 10 %).

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// AAA corporate yield Graham used when he published the revised formula.
pub const GRAHAM_BASE_YIELD: f64 = 4.4;

const REVERSE_DCF_MAX_ITERATIONS: u32 = 100;
const REVERSE_DCF_GROWTH_BOUNDS: (f64, f64) = (0.0, 50.0);
/// Bisection stops once the per-share value is within this share of the target.
const REVERSE_DCF_TOLERANCE: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DcfInputs {
    pub free_cash_flow: f64,
    pub growth_rate: f64,
    pub terminal_growth_rate: f64,
    pub discount_rate: f64,
    pub years: u32,
    pub shares_outstanding: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectedCashFlow {
    pub year: u32,
    pub cash_flow: f64,
    pub present_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DcfResult {
    pub projected_cash_flows: Vec<ProjectedCashFlow>,
    pub terminal_value: f64,
    pub pv_terminal_value: f64,
    pub intrinsic_value: f64,
    pub per_share_value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReverseDcfResult {
    /// Growth rate (%) the market price implies.
    pub implied_growth_rate: f64,
    pub iterations: u32,
    pub converged: bool,
}

/// Generic buy/sell banding on upside (%), used by DCF and P/E valuations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvestmentRating {
    StrongBuy,
    Buy,
    Hold,
    Sell,
    StrongSell,
}

impl InvestmentRating {
    /// >= 30 strong buy, >= 15 buy, >= -5 hold, >= -15 sell, else strong sell.
    pub fn from_upside(upside_percent: f64) -> Self {
        if upside_percent >= 30.0 {
            InvestmentRating::StrongBuy
        } else if upside_percent >= 15.0 {
            InvestmentRating::Buy
        } else if upside_percent >= -5.0 {
            InvestmentRating::Hold
        } else if upside_percent >= -15.0 {
            InvestmentRating::Sell
        } else {
            InvestmentRating::StrongSell
        }
    }
}

/// Graham margin-of-safety banding. Deliberately separate from
/// [`InvestmentRating`]: the thresholds and labels differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrahamRating {
    Undervalued,
    FairValue,
    Overvalued,
}

impl GrahamRating {
    /// >= 30 undervalued, >= -10 fair value, else overvalued.
    pub fn from_margin_of_safety(margin: f64) -> Self {
        if margin >= 30.0 {
            GrahamRating::Undervalued
        } else if margin >= -10.0 {
            GrahamRating::FairValue
        } else {
            GrahamRating::Overvalued
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValuationMethod {
    Dcf,
    PriceEarnings,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValuationResult {
    pub method: ValuationMethod,
    pub fair_value: f64,
    pub current_price: f64,
    pub upside_percent: f64,
    pub rating: InvestmentRating,
}

impl ValuationResult {
    pub fn new(method: ValuationMethod, fair_value: f64, current_price: f64) -> Self {
        let upside_percent = upside_percent(fair_value, current_price);
        Self {
            method,
            fair_value,
            current_price,
            upside_percent,
            rating: InvestmentRating::from_upside(upside_percent),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GrahamAnalysis {
    pub graham_number: f64,
    pub modified_graham_value: f64,
    pub intrinsic_value: f64,
    pub current_price: f64,
    /// 0 when EPS is not positive.
    pub pe_ratio: f64,
    /// 0 when book value is not positive.
    pub pb_ratio: f64,
    pub is_defensive: bool,
    pub is_enterprising: bool,
    pub margin_of_safety: f64,
    pub rating: GrahamRating,
}

/// `(fair - price) / price * 100`; 0 for a non-positive price.
fn upside_percent(fair_value: f64, price: f64) -> f64 {
    if price <= 0.0 || !price.is_finite() || !fair_value.is_finite() {
        return 0.0;
    }
    (fair_value - price) / price * 100.0
}

fn validate_rates(inputs: &DcfInputs) -> Result<()> {
    let rates = [
        inputs.free_cash_flow,
        inputs.growth_rate,
        inputs.terminal_growth_rate,
        inputs.discount_rate,
        inputs.shares_outstanding,
    ];
    if rates.iter().any(|r| !r.is_finite()) {
        return Err(EngineError::invalid_inputs("DCF inputs must be finite numbers"));
    }
    if inputs.discount_rate <= inputs.terminal_growth_rate {
        tracing::warn!(
            discount_rate = inputs.discount_rate,
            terminal_growth_rate = inputs.terminal_growth_rate,
            "rejecting DCF: discount rate must exceed terminal growth"
        );
        return Err(EngineError::invalid_inputs(format!(
            "discount rate ({}%) must be greater than terminal growth rate ({}%)",
            inputs.discount_rate, inputs.terminal_growth_rate
        )));
    }
    if inputs.discount_rate <= -100.0 {
        return Err(EngineError::invalid_inputs(
            "discount rate must be greater than -100%",
        ));
    }
    Ok(())
}

/// Discounted cash flow with a Gordon-growth terminal value.
///
/// Cash flow compounds at `growth_rate` for `years` periods and each year is
/// discounted at `discount_rate`. The terminal value grows the final projected
/// cash flow one more period at `terminal_growth_rate` and capitalises it at
/// `discount_rate - terminal_growth_rate`.
///
/// Fails with [`EngineError::InvalidInputs`] when the discount rate does not
/// exceed the terminal growth rate, since the terminal value is meaningless
/// there.
pub fn dcf(inputs: &DcfInputs) -> Result<DcfResult> {
    validate_rates(inputs)?;
    Ok(dcf_unchecked(inputs))
}

fn dcf_unchecked(inputs: &DcfInputs) -> DcfResult {
    let g = inputs.growth_rate / 100.0;
    let tg = inputs.terminal_growth_rate / 100.0;
    let r = inputs.discount_rate / 100.0;

    let mut projected_cash_flows = Vec::with_capacity(inputs.years as usize);
    let mut cash_flow = inputs.free_cash_flow;
    for year in 1..=inputs.years {
        cash_flow *= 1.0 + g;
        let present_value = cash_flow / (1.0 + r).powi(year as i32);
        projected_cash_flows.push(ProjectedCashFlow {
            year,
            cash_flow,
            present_value,
        });
    }

    let terminal_value = cash_flow * (1.0 + tg) / (r - tg);
    let pv_terminal_value = terminal_value / (1.0 + r).powi(inputs.years as i32);
    let intrinsic_value =
        projected_cash_flows.iter().map(|c| c.present_value).sum::<f64>() + pv_terminal_value;
    let per_share_value = if inputs.shares_outstanding > 0.0 {
        intrinsic_value / inputs.shares_outstanding
    } else {
        0.0
    };

    DcfResult {
        projected_cash_flows,
        terminal_value,
        pv_terminal_value,
        intrinsic_value,
        per_share_value,
    }
}

/// Solve for the growth rate that makes the DCF per-share value match a
/// target (usually the market price).
///
/// Bisects over 0-50 % for at most 100 iterations and stops once the computed
/// value is within 1 % of the target. `inputs.growth_rate` is ignored.
pub fn reverse_dcf(target_per_share: f64, inputs: &DcfInputs) -> Result<ReverseDcfResult> {
    validate_rates(inputs)?;

    let (mut low, mut high) = REVERSE_DCF_GROWTH_BOUNDS;
    let mut mid = (low + high) / 2.0;
    let mut iterations = 0;
    let mut converged = false;

    while iterations < REVERSE_DCF_MAX_ITERATIONS {
        iterations += 1;
        mid = (low + high) / 2.0;
        let trial = DcfInputs {
            growth_rate: mid,
            ..*inputs
        };
        let computed = dcf_unchecked(&trial).per_share_value;
        if (computed - target_per_share).abs() < REVERSE_DCF_TOLERANCE * target_per_share {
            converged = true;
            break;
        }
        if computed < target_per_share {
            low = mid;
        } else {
            high = mid;
        }
    }

    tracing::debug!(
        target = target_per_share,
        implied_growth = mid,
        iterations,
        converged,
        "reverse DCF finished"
    );

    Ok(ReverseDcfResult {
        implied_growth_rate: mid,
        iterations,
        converged,
    })
}

/// DCF per-share value compared against the market price.
pub fn dcf_valuation(inputs: &DcfInputs, current_price: f64) -> Result<ValuationResult> {
    let result = dcf(inputs)?;
    Ok(ValuationResult::new(
        ValuationMethod::Dcf,
        result.per_share_value,
        current_price,
    ))
}

/// Fair value as `eps * fair_pe`, floored at 0.
pub fn pe_valuation(eps: f64, fair_pe: f64, current_price: f64) -> ValuationResult {
    let fair_value = if eps.is_finite() && fair_pe.is_finite() {
        (eps * fair_pe).max(0.0)
    } else {
        0.0
    };
    ValuationResult::new(ValuationMethod::PriceEarnings, fair_value, current_price)
}

/// `sqrt(22.5 * eps * book_value)`; 0 if either input is not positive.
pub fn graham_number(eps: f64, book_value: f64) -> f64 {
    if eps <= 0.0 || book_value <= 0.0 || !eps.is_finite() || !book_value.is_finite() {
        return 0.0;
    }
    (22.5 * eps * book_value).sqrt()
}

/// Revised Graham formula: `eps * (8.5 + 2g) * 4.4 / Y`, floored at 0.
///
/// A non-positive `aaa_yield` falls back to 4.4.
pub fn modified_graham_value(eps: f64, growth_rate: f64, aaa_yield: f64) -> f64 {
    let aaa_yield = if aaa_yield > 0.0 && aaa_yield.is_finite() {
        aaa_yield
    } else {
        GRAHAM_BASE_YIELD
    };
    let value = eps * (8.5 + 2.0 * growth_rate) * GRAHAM_BASE_YIELD / aaa_yield;
    if value.is_finite() {
        value.max(0.0)
    } else {
        0.0
    }
}

/// `(intrinsic - price) / intrinsic * 100`.
///
/// A non-positive intrinsic value cannot cover any price, so it reports -100.
pub fn margin_of_safety(intrinsic_value: f64, current_price: f64) -> f64 {
    if intrinsic_value <= 0.0 || !intrinsic_value.is_finite() {
        return -100.0;
    }
    (intrinsic_value - current_price) / intrinsic_value * 100.0
}

/// Graham's defensive/enterprising screens plus margin of safety.
pub fn graham_analysis(
    eps: f64,
    book_value: f64,
    growth_rate: f64,
    current_price: f64,
    aaa_yield: f64,
) -> GrahamAnalysis {
    let number = graham_number(eps, book_value);
    let modified = modified_graham_value(eps, growth_rate, aaa_yield);
    let intrinsic_value = number.max(modified);

    let pe_ratio = if eps > 0.0 { current_price / eps } else { 0.0 };
    let pb_ratio = if book_value > 0.0 {
        current_price / book_value
    } else {
        0.0
    };
    let ratios_valid = eps > 0.0 && book_value > 0.0 && current_price > 0.0;

    let is_defensive =
        ratios_valid && pe_ratio <= 15.0 && pb_ratio <= 1.5 && pe_ratio * pb_ratio <= 22.5;
    let is_enterprising = ratios_valid && pe_ratio <= 20.0 && pb_ratio <= 2.0;

    let margin = margin_of_safety(intrinsic_value, current_price);

    GrahamAnalysis {
        graham_number: number,
        modified_graham_value: modified,
        intrinsic_value,
        current_price,
        pe_ratio,
        pb_ratio,
        is_defensive,
        is_enterprising,
        margin_of_safety: margin,
        rating: GrahamRating::from_margin_of_safety(margin),
    }
}
