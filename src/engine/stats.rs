//! Descriptive statistics shared by the simulation and risk modules.

/// Arithmetic mean. Returns 0 for an empty slice.
pub fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    xs.iter().sum::<f64>() / xs.len() as f64
}

/// Sample variance (n - 1 denominator). Returns 0 for fewer than 2 points.
pub fn sample_variance(xs: &[f64]) -> f64 {
    if xs.len() < 2 {
        return 0.0;
    }
    let m = mean(xs);
    xs.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (xs.len() - 1) as f64
}

/// Sample standard deviation (n - 1 denominator).
pub fn sample_std_dev(xs: &[f64]) -> f64 {
    sample_variance(xs).sqrt()
}

/// Sample covariance of two equal-length series. Returns 0 on length
/// mismatch or fewer than 2 points.
pub fn sample_covariance(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() || a.len() < 2 {
        return 0.0;
    }
    let ma = mean(a);
    let mb = mean(b);
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - ma) * (y - mb))
        .sum::<f64>()
        / (a.len() - 1) as f64
}

/// Copy and sort ascending. NaNs sort last.
pub fn sorted_copy(xs: &[f64]) -> Vec<f64> {
    let mut out = xs.to_vec();
    out.sort_by(|a, b| a.total_cmp(b));
    out
}

/// Linearly interpolated percentile of an ascending slice.
///
/// `pct` is clamped to 0..=100. Returns 0 for an empty slice.
pub fn percentile(sorted: &[f64], pct: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let pct = if pct.is_finite() { pct.clamp(0.0, 100.0) } else { 0.0 };
            let rank = pct / 100.0 * (n - 1) as f64;
            let lo = rank.floor() as usize;
            let hi = rank.ceil() as usize;
            if lo == hi {
                sorted[lo]
            } else {
                let w = rank - lo as f64;
                sorted[lo] * (1.0 - w) + sorted[hi] * w
            }
        }
    }
}

/// Fixed-stride subsample of an ascending slice for charting.
///
/// Takes every `ceil(n / max_points)`-th element starting at index 0, so the
/// output is structural (not random) and never longer than `max_points`.
pub fn stride_sample(sorted: &[f64], max_points: usize) -> Vec<f64> {
    if sorted.is_empty() || max_points == 0 {
        return Vec::new();
    }
    let stride = sorted.len().div_ceil(max_points).max(1);
    sorted.iter().step_by(stride).copied().collect()
}
