//! Risk and performance statistics over return and value series.
//!
//! Return series are per-period percentages (1.5 = +1.5%). Value series are
//! absolute levels (prices, equity). Malformed input yields a neutral value
//! instead of an error: beta falls back to 1, everything else to 0.

use serde::{Deserialize, Serialize};

use crate::config::RiskConfig;
use crate::engine::stats::{mean, percentile, sample_covariance, sample_std_dev, sample_variance, sorted_copy};

/// One peak-to-recovery episode in a value series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawdownPeriod {
    /// Index of the peak the decline started from.
    pub start_index: usize,
    /// Index where the peak was regained, or the last index if it never was.
    pub end_index: usize,
    pub duration: usize,
    /// Deepest decline from the peak (%).
    pub depth: f64,
    pub recovered: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkComparison {
    pub beta: f64,
    pub alpha: f64,
    pub treynor_ratio: f64,
    pub information_ratio: f64,
    pub correlation: f64,
}

/// Every metric for one return series, optionally against a benchmark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskReport {
    pub periods: usize,
    pub mean_return: f64,
    pub volatility: f64,
    pub annualized_return: f64,
    pub annualized_volatility: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub calmar_ratio: f64,
    pub max_drawdown: f64,
    pub value_at_risk: f64,
    pub conditional_var: f64,
    pub drawdowns: Vec<DrawdownPeriod>,
    pub benchmark: Option<BenchmarkComparison>,
}

fn paired(a: &[f64], b: &[f64]) -> bool {
    !a.is_empty() && a.len() == b.len()
}

/// `(mean - risk_free) / sample std dev`.
pub fn sharpe_ratio(returns: &[f64], risk_free_rate: f64) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let sd = sample_std_dev(returns);
    if sd == 0.0 || !sd.is_finite() {
        return 0.0;
    }
    (mean(returns) - risk_free_rate) / sd
}

/// Like Sharpe, but the denominator is the deviation of the points below
/// `target_return` only.
pub fn sortino_ratio(returns: &[f64], target_return: f64) -> f64 {
    let below: Vec<f64> = returns
        .iter()
        .filter(|&&r| r < target_return)
        .map(|&r| (r - target_return).powi(2))
        .collect();
    if below.is_empty() {
        return 0.0;
    }
    let downside = (below.iter().sum::<f64>() / below.len() as f64).sqrt();
    if downside == 0.0 {
        return 0.0;
    }
    (mean(returns) - target_return) / downside
}

pub fn calmar_ratio(annual_return: f64, max_drawdown: f64) -> f64 {
    if max_drawdown <= 0.0 || !max_drawdown.is_finite() {
        return 0.0;
    }
    annual_return / max_drawdown
}

/// Largest percentage decline from a running peak to any later point.
pub fn max_drawdown(values: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut worst: f64 = 0.0;
    for &v in values {
        if v > peak {
            peak = v;
        }
        if peak > 0.0 {
            worst = worst.max((peak - v) / peak * 100.0);
        }
    }
    worst
}

/// Historical VaR: the `100 - confidence` percentile of the returns.
pub fn value_at_risk(returns: &[f64], confidence: f64) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }
    percentile(&sorted_copy(returns), 100.0 - confidence)
}

/// Expected shortfall: mean of the returns at or below the VaR threshold.
pub fn conditional_var(returns: &[f64], confidence: f64) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }
    let var = value_at_risk(returns, confidence);
    let tail: Vec<f64> = returns.iter().copied().filter(|&r| r <= var).collect();
    if tail.is_empty() {
        return var;
    }
    mean(&tail)
}

pub fn beta(asset: &[f64], market: &[f64]) -> f64 {
    if !paired(asset, market) || asset.len() < 2 {
        return 1.0;
    }
    let var = sample_variance(market);
    if var == 0.0 || !var.is_finite() {
        return 1.0;
    }
    sample_covariance(asset, market) / var
}

/// Jensen's alpha per period.
pub fn alpha(asset: &[f64], market: &[f64], risk_free_rate: f64) -> f64 {
    if !paired(asset, market) {
        return 0.0;
    }
    let b = beta(asset, market);
    mean(asset) - (risk_free_rate + b * (mean(market) - risk_free_rate))
}

pub fn treynor_ratio(asset: &[f64], market: &[f64], risk_free_rate: f64) -> f64 {
    if !paired(asset, market) {
        return 0.0;
    }
    let b = beta(asset, market);
    if b == 0.0 {
        return 0.0;
    }
    (mean(asset) - risk_free_rate) / b
}

/// Mean active return over tracking error.
pub fn information_ratio(asset: &[f64], benchmark: &[f64]) -> f64 {
    if !paired(asset, benchmark) {
        return 0.0;
    }
    let active: Vec<f64> = asset.iter().zip(benchmark).map(|(a, b)| a - b).collect();
    let tracking_error = sample_std_dev(&active);
    if tracking_error == 0.0 {
        return 0.0;
    }
    mean(&active) / tracking_error
}

/// Pearson correlation.
pub fn correlation(a: &[f64], b: &[f64]) -> f64 {
    if !paired(a, b) || a.len() < 2 {
        return 0.0;
    }
    let denom = sample_std_dev(a) * sample_std_dev(b);
    if denom == 0.0 || !denom.is_finite() {
        return 0.0;
    }
    sample_covariance(a, b) / denom
}

/// Split a value series into peak-to-recovery episodes.
///
/// An episode opens on the first value below the running peak and closes on
/// the first value that regains it. A trailing episode that never recovers is
/// reported with `recovered: false` and ends at the last index.
pub fn drawdown_durations(values: &[f64]) -> Vec<DrawdownPeriod> {
    let mut periods = Vec::new();
    let Some(&first) = values.first() else {
        return periods;
    };

    let mut peak = first;
    let mut peak_index = 0;
    let mut open: Option<DrawdownPeriod> = None;

    for (i, &v) in values.iter().enumerate().skip(1) {
        if v >= peak {
            if let Some(mut period) = open.take() {
                period.end_index = i;
                period.duration = i - period.start_index;
                period.recovered = true;
                periods.push(period);
            }
            peak = v;
            peak_index = i;
            continue;
        }

        let depth = if peak > 0.0 { (peak - v) / peak * 100.0 } else { 0.0 };
        let period = open.get_or_insert(DrawdownPeriod {
            start_index: peak_index,
            end_index: i,
            duration: 0,
            depth: 0.0,
            recovered: false,
        });
        period.depth = period.depth.max(depth);
    }

    if let Some(mut period) = open {
        let last = values.len() - 1;
        period.end_index = last;
        period.duration = last - period.start_index;
        periods.push(period);
    }
    periods
}

/// Compound a starting value through a return series. The first point is
/// `initial_value` itself.
pub fn equity_curve(initial_value: f64, returns: &[f64]) -> Vec<f64> {
    let mut curve = Vec::with_capacity(returns.len() + 1);
    let mut value = initial_value;
    curve.push(value);
    for r in returns {
        value *= 1.0 + r / 100.0;
        curve.push(value);
    }
    curve
}

/// Geometric annualised return (%).
pub fn annualized_return(returns: &[f64], periods_per_year: f64) -> f64 {
    if returns.is_empty() || periods_per_year <= 0.0 {
        return 0.0;
    }
    let growth: f64 = returns.iter().map(|r| 1.0 + r / 100.0).product();
    if growth <= 0.0 {
        return -100.0;
    }
    (growth.powf(periods_per_year / returns.len() as f64) - 1.0) * 100.0
}

pub fn annualized_volatility(returns: &[f64], periods_per_year: f64) -> f64 {
    if periods_per_year <= 0.0 {
        return 0.0;
    }
    sample_std_dev(returns) * periods_per_year.sqrt()
}

impl RiskReport {
    pub fn from_returns(
        returns: &[f64],
        benchmark: Option<&[f64]>,
        config: &RiskConfig,
        initial_value: f64,
    ) -> Self {
        let curve = equity_curve(initial_value, returns);
        let drawdown = max_drawdown(&curve);
        let annual = annualized_return(returns, config.periods_per_year);

        let benchmark = benchmark.map(|b| {
            if !paired(returns, b) {
                tracing::warn!(
                    returns = returns.len(),
                    benchmark = b.len(),
                    "benchmark length mismatch, using neutral comparison"
                );
            }
            BenchmarkComparison {
                beta: beta(returns, b),
                alpha: alpha(returns, b, config.risk_free_rate),
                treynor_ratio: treynor_ratio(returns, b, config.risk_free_rate),
                information_ratio: information_ratio(returns, b),
                correlation: correlation(returns, b),
            }
        });

        Self {
            periods: returns.len(),
            mean_return: mean(returns),
            volatility: sample_std_dev(returns),
            annualized_return: annual,
            annualized_volatility: annualized_volatility(returns, config.periods_per_year),
            sharpe_ratio: sharpe_ratio(returns, config.risk_free_rate),
            sortino_ratio: sortino_ratio(returns, config.risk_free_rate),
            calmar_ratio: calmar_ratio(annual, drawdown),
            max_drawdown: drawdown,
            value_at_risk: value_at_risk(returns, config.confidence),
            conditional_var: conditional_var(returns, config.confidence),
            drawdowns: drawdown_durations(&curve),
            benchmark,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_drawdown_reference_series() {
        let dd = max_drawdown(&[100.0, 110.0, 90.0, 95.0, 105.0]);
        assert!((dd - 18.1818).abs() < 0.01, "got {dd}");
    }

    #[test]
    fn test_max_drawdown_monotonic_is_zero() {
        assert_eq!(max_drawdown(&[1.0, 2.0, 3.0]), 0.0);
        assert_eq!(max_drawdown(&[]), 0.0);
    }

    #[test]
    fn test_sharpe_basic() {
        let r = [1.0, 2.0, 3.0];
        // mean 2, sd 1
        assert!((sharpe_ratio(&r, 0.0) - 2.0).abs() < 1e-12);
        assert!((sharpe_ratio(&r, 1.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_sharpe_degenerate_inputs() {
        assert_eq!(sharpe_ratio(&[1.0], 0.0), 0.0);
        assert_eq!(sharpe_ratio(&[2.0, 2.0, 2.0], 0.0), 0.0);
    }

    #[test]
    fn test_sortino_uses_only_downside_points() {
        let r = [2.0, -1.0, 3.0, -3.0];
        // below 0: 1 and 9, mean 5, dd sqrt(5); mean return 0.25
        let expected = 0.25 / 5.0_f64.sqrt();
        assert!((sortino_ratio(&r, 0.0) - expected).abs() < 1e-12);
        assert_eq!(sortino_ratio(&[1.0, 2.0], 0.0), 0.0);
    }

    #[test]
    fn test_var_and_cvar() {
        let r: Vec<f64> = (1..=100).map(|i| i as f64 - 50.0).collect();
        let var = value_at_risk(&r, 95.0);
        assert!((var - (-44.05)).abs() < 1e-9, "var={var}");
        let cvar = conditional_var(&r, 95.0);
        // -49..=-45
        assert!((cvar - (-47.0)).abs() < 1e-9, "cvar={cvar}");
        assert!(cvar <= var);
    }

    #[test]
    fn test_beta_of_series_against_itself_is_one() {
        let m = [1.0, -2.0, 3.0, 0.5];
        assert!((beta(&m, &m) - 1.0).abs() < 1e-12);
        assert!((correlation(&m, &m) - 1.0).abs() < 1e-12);
        assert!(alpha(&m, &m, 0.0).abs() < 1e-12);
    }

    #[test]
    fn test_scaled_series_has_scaled_beta() {
        let m = [1.0, -2.0, 3.0, 0.5];
        let a: Vec<f64> = m.iter().map(|x| 2.0 * x).collect();
        assert!((beta(&a, &m) - 2.0).abs() < 1e-12);
        assert!((treynor_ratio(&a, &m, 0.0) - mean(&a) / 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_mismatched_series_return_neutral_defaults() {
        let a = [1.0, 2.0, 3.0];
        let b = [1.0, 2.0];
        assert_eq!(beta(&a, &b), 1.0);
        assert_eq!(alpha(&a, &b, 0.0), 0.0);
        assert_eq!(treynor_ratio(&a, &b, 0.0), 0.0);
        assert_eq!(information_ratio(&a, &b), 0.0);
        assert_eq!(correlation(&a, &b), 0.0);
        assert_eq!(beta(&[], &[]), 1.0);
        assert_eq!(correlation(&[], &[]), 0.0);
    }

    #[test]
    fn test_information_ratio() {
        let a = [2.0, 3.0, 4.0];
        let b = [1.0, 1.0, 1.0];
        // active 1,2,3: mean 2, sd 1
        assert!((information_ratio(&a, &b) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_drawdown_durations_episodes() {
        let v = [100.0, 110.0, 90.0, 95.0, 105.0, 120.0, 100.0];
        let periods = drawdown_durations(&v);
        assert_eq!(periods.len(), 2);

        assert_eq!(periods[0].start_index, 1);
        assert_eq!(periods[0].end_index, 5);
        assert_eq!(periods[0].duration, 4);
        assert!(periods[0].recovered);
        assert!((periods[0].depth - 18.1818).abs() < 0.01);

        assert_eq!(periods[1].start_index, 5);
        assert_eq!(periods[1].end_index, 6);
        assert!(!periods[1].recovered);
        assert!((periods[1].depth - 16.6667).abs() < 0.01);
    }

    #[test]
    fn test_drawdown_durations_without_decline() {
        assert!(drawdown_durations(&[1.0, 1.0, 2.0]).is_empty());
        assert!(drawdown_durations(&[]).is_empty());
    }

    #[test]
    fn test_equity_curve_compounds() {
        let curve = equity_curve(100.0, &[10.0, -10.0]);
        assert_eq!(curve.len(), 3);
        assert!((curve[2] - 99.0).abs() < 1e-9);
    }

    #[test]
    fn test_annualized_return_geometric() {
        // 1% per month for 12 months
        let r = [1.0; 12];
        let annual = annualized_return(&r, 12.0);
        assert!((annual - (1.01_f64.powi(12) - 1.0) * 100.0).abs() < 1e-9);
        assert_eq!(annualized_return(&[-100.0], 12.0), -100.0);
        assert_eq!(annualized_return(&[], 12.0), 0.0);
    }

    #[test]
    fn test_calmar_guards_zero_drawdown() {
        assert_eq!(calmar_ratio(12.0, 0.0), 0.0);
        assert!((calmar_ratio(12.0, 6.0) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_risk_report_bundles_metrics() {
        let returns = [1.0, -2.0, 1.5, 0.5, -0.5, 2.0];
        let bench = [0.5, -1.0, 1.0, 0.2, -0.4, 1.0];
        let cfg = RiskConfig::default();
        let report = RiskReport::from_returns(&returns, Some(&bench), &cfg, 100.0);
        assert_eq!(report.periods, 6);
        assert!(report.max_drawdown > 0.0);
        assert!(report.conditional_var <= report.value_at_risk);
        let cmp = report.benchmark.expect("benchmark comparison");
        assert!(cmp.beta > 1.0);
        assert!(cmp.correlation > 0.9);

        let solo = RiskReport::from_returns(&returns, None, &cfg, 100.0);
        assert!(solo.benchmark.is_none());
        assert_eq!(solo.sharpe_ratio, report.sharpe_ratio);
    }
}
