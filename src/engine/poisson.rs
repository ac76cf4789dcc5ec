//! Poisson match-outcome model.
//!
//! Each side's goal count is modeled as an independent Poisson variable whose
//! rate comes from attack/defense strengths relative to the league average:
//!   - `attack  = goals_scored_avg   / (league_avg / 2)`
//!   - `defense = goals_conceded_avg / (league_avg / 2)`
//!   - `lambda_home = home_attack * away_defense * league_avg / 2`
//!
//! The joint score grid is then summed into the usual pre-match markets.

use serde::{Deserialize, Serialize};

/// League-wide goals per match used when the caller supplies none.
pub const DEFAULT_LEAGUE_AVG_GOALS: f64 = 2.75;

/// Highest goal count enumerated per side (grid is 0..=MAX_GOALS squared).
pub const MAX_GOALS: usize = 10;

/// Scorelines considered for the correct-score list (per side).
const TOP_SCORE_MAX_GOALS: usize = 5;
const TOP_SCORE_COUNT: usize = 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchInputs {
    pub home_goals_avg: f64,
    pub home_conceded_avg: f64,
    pub away_goals_avg: f64,
    pub away_conceded_avg: f64,
    /// Zero or unset falls back to [`DEFAULT_LEAGUE_AVG_GOALS`].
    #[serde(default)]
    pub league_avg_goals: f64,
}

impl MatchInputs {
    /// League average actually used for the strength ratios (always > 0).
    pub fn effective_league_avg(&self) -> f64 {
        if self.league_avg_goals.is_finite() && self.league_avg_goals > 0.0 {
            self.league_avg_goals
        } else {
            DEFAULT_LEAGUE_AVG_GOALS
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreProbability {
    pub home_goals: u32,
    pub away_goals: u32,
    /// Percentage (0-100).
    pub probability: f64,
}

/// Full pre-match market set. All probabilities are percentages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchPrediction {
    pub expected_home_goals: f64,
    pub expected_away_goals: f64,
    pub home_attack: f64,
    pub home_defense: f64,
    pub away_attack: f64,
    pub away_defense: f64,
    pub home_win: f64,
    pub draw: f64,
    pub away_win: f64,
    pub over_1_5: f64,
    pub under_1_5: f64,
    pub over_2_5: f64,
    pub under_2_5: f64,
    pub over_3_5: f64,
    pub under_3_5: f64,
    pub btts_yes: f64,
    pub btts_no: f64,
    pub most_likely_score: Option<ScoreProbability>,
    pub top_scores: Vec<ScoreProbability>,
}

/// P(X = k) for X ~ Poisson(lambda).
///
/// Degenerate rates never produce NaN: negative `k` or `lambda` give 0, and a
/// zero rate puts all mass on `k == 0`.
pub fn poisson_probability(lambda: f64, k: i32) -> f64 {
    if k < 0 || lambda < 0.0 || !lambda.is_finite() {
        return 0.0;
    }
    if lambda == 0.0 {
        return if k == 0 { 1.0 } else { 0.0 };
    }
    // Log space keeps lambda^k and k! from overflowing for large k.
    let ln_factorial: f64 = (2..=k).map(|i| (i as f64).ln()).sum();
    (k as f64 * lambda.ln() - lambda - ln_factorial).exp()
}

/// Joint score-probability grid; `cells[h][a]` is a fraction.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreMatrix {
    cells: Vec<Vec<f64>>,
}

impl ScoreMatrix {
    /// Independent-Poisson grid over 0..=max_goals for each side.
    pub fn from_rates(lambda_home: f64, lambda_away: f64, max_goals: usize) -> Self {
        let pmf = |lambda: f64| -> Vec<f64> {
            (0..=max_goals)
                .map(|k| poisson_probability(lambda, k as i32))
                .collect()
        };
        let home = pmf(lambda_home);
        let away = pmf(lambda_away);
        let cells = home
            .iter()
            .map(|ph| away.iter().map(|pa| ph * pa).collect::<Vec<f64>>())
            .collect();
        Self { cells }
    }

    pub fn max_goals(&self) -> usize {
        self.cells.len().saturating_sub(1)
    }

    /// Probability of the exact scoreline; 0 outside the grid.
    pub fn cell(&self, home_goals: usize, away_goals: usize) -> f64 {
        self.cells
            .get(home_goals)
            .and_then(|row| row.get(away_goals))
            .copied()
            .unwrap_or(0.0)
    }

    fn iter_cells(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .flat_map(|(h, row)| row.iter().enumerate().map(move |(a, &p)| (h, a, p)))
    }

    fn sum_where(&self, pred: impl Fn(usize, usize) -> bool) -> f64 {
        self.iter_cells()
            .filter(|&(h, a, _)| pred(h, a))
            .map(|(_, _, p)| p)
            .sum()
    }

    /// Probability mass captured by the grid (slightly below 1 due to truncation).
    pub fn total_mass(&self) -> f64 {
        self.sum_where(|_, _| true)
    }

    /// (home win, draw, away win) as fractions.
    pub fn outcome_split(&self) -> (f64, f64, f64) {
        let mut split = (0.0, 0.0, 0.0);
        for (h, a, p) in self.iter_cells() {
            if h > a {
                split.0 += p;
            } else if h == a {
                split.1 += p;
            } else {
                split.2 += p;
            }
        }
        split
    }

    /// Total goals strictly above `line`.
    pub fn over(&self, line: f64) -> f64 {
        self.sum_where(|h, a| (h + a) as f64 > line)
    }

    /// Total goals strictly below `line`.
    pub fn under(&self, line: f64) -> f64 {
        self.sum_where(|h, a| ((h + a) as f64) < line)
    }

    /// Both teams to score.
    pub fn btts(&self) -> f64 {
        self.sum_where(|h, a| h > 0 && a > 0)
    }

    /// The `n` most likely scorelines with at most `max_goals` per side,
    /// highest probability first. Ties keep grid order (home goals, then away).
    pub fn top_scores(&self, n: usize, max_goals: usize) -> Vec<ScoreProbability> {
        let mut scores: Vec<ScoreProbability> = self
            .iter_cells()
            .filter(|&(h, a, _)| h <= max_goals && a <= max_goals)
            .map(|(h, a, p)| ScoreProbability {
                home_goals: h as u32,
                away_goals: a as u32,
                probability: p * 100.0,
            })
            .collect();
        // sort_by is stable
        scores.sort_by(|x, y| y.probability.total_cmp(&x.probability));
        scores.truncate(n);
        scores
    }

    pub fn most_likely_score(&self) -> Option<ScoreProbability> {
        self.top_scores(1, self.max_goals()).into_iter().next()
    }
}

/// Strength ratio relative to half the league average; non-finite or
/// negative rates count as 0.
fn strength(rate: f64, half_league_avg: f64) -> f64 {
    if rate.is_finite() && rate > 0.0 {
        rate / half_league_avg
    } else {
        0.0
    }
}

/// Predict pre-match markets from team scoring/conceding averages.
pub fn predict_match(inputs: &MatchInputs) -> MatchPrediction {
    let half = inputs.effective_league_avg() / 2.0;

    let home_attack = strength(inputs.home_goals_avg, half);
    let home_defense = strength(inputs.home_conceded_avg, half);
    let away_attack = strength(inputs.away_goals_avg, half);
    let away_defense = strength(inputs.away_conceded_avg, half);

    let expected_home_goals = home_attack * away_defense * half;
    let expected_away_goals = away_attack * home_defense * half;

    let matrix = ScoreMatrix::from_rates(expected_home_goals, expected_away_goals, MAX_GOALS);
    let (home_win, draw, away_win) = matrix.outcome_split();
    let mass = matrix.total_mass();
    let btts_yes = matrix.btts();

    let pct = |p: f64| p * 100.0;

    MatchPrediction {
        expected_home_goals,
        expected_away_goals,
        home_attack,
        home_defense,
        away_attack,
        away_defense,
        home_win: pct(home_win),
        draw: pct(draw),
        away_win: pct(away_win),
        over_1_5: pct(matrix.over(1.5)),
        under_1_5: pct(matrix.under(1.5)),
        over_2_5: pct(matrix.over(2.5)),
        under_2_5: pct(matrix.under(2.5)),
        over_3_5: pct(matrix.over(3.5)),
        under_3_5: pct(matrix.under(3.5)),
        btts_yes: pct(btts_yes),
        btts_no: pct(mass - btts_yes),
        most_likely_score: matrix.most_likely_score(),
        top_scores: matrix.top_scores(TOP_SCORE_COUNT, TOP_SCORE_MAX_GOALS),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typical() -> MatchInputs {
        MatchInputs {
            home_goals_avg: 1.8,
            home_conceded_avg: 1.0,
            away_goals_avg: 1.2,
            away_conceded_avg: 1.5,
            league_avg_goals: 2.75,
        }
    }

    #[test]
    fn test_poisson_mass_sums_to_one() {
        for lambda in [0.3, 1.0, 2.5, 6.0] {
            let total: f64 = (0..=50).map(|k| poisson_probability(lambda, k)).sum();
            assert!((total - 1.0).abs() < 1e-9, "lambda={lambda} total={total}");
        }
    }

    #[test]
    fn test_poisson_edge_cases() {
        assert_eq!(poisson_probability(1.5, -1), 0.0);
        assert_eq!(poisson_probability(-1.0, 2), 0.0);
        assert_eq!(poisson_probability(0.0, 0), 1.0);
        assert_eq!(poisson_probability(0.0, 3), 0.0);
        assert_eq!(poisson_probability(f64::NAN, 1), 0.0);
        // P(X=2 | 2) = 4 e^-2 / 2
        let expected = 2.0 * (-2.0_f64).exp();
        assert!((poisson_probability(2.0, 2) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_outcomes_sum_to_100() {
        let p = predict_match(&typical());
        let sum = p.home_win + p.draw + p.away_win;
        assert!((sum - 100.0).abs() < 1.0, "sum={sum}");
        let ou = p.over_2_5 + p.under_2_5;
        assert!((ou - 100.0).abs() < 1.0, "ou={ou}");
        let btts = p.btts_yes + p.btts_no;
        assert!((btts - 100.0).abs() < 1.0, "btts={btts}");
    }

    #[test]
    fn test_expected_goals_from_strengths() {
        let p = predict_match(&typical());
        // half = 1.375; home_attack = 1.8/1.375, away_defense = 1.5/1.375
        let expected_home = 1.8 * 1.5 / 1.375;
        let expected_away = 1.2 * 1.0 / 1.375;
        assert!((p.expected_home_goals - expected_home).abs() < 1e-12);
        assert!((p.expected_away_goals - expected_away).abs() < 1e-12);
        assert!(p.home_win > p.away_win);
    }

    #[test]
    fn test_league_avg_defaults_when_zero() {
        let mut inputs = typical();
        inputs.league_avg_goals = 0.0;
        let defaulted = predict_match(&inputs);
        let explicit = predict_match(&typical());
        assert_eq!(defaulted, explicit);
    }

    #[test]
    fn test_top_scores_sorted_and_bounded() {
        let p = predict_match(&typical());
        assert_eq!(p.top_scores.len(), 10);
        for pair in p.top_scores.windows(2) {
            assert!(pair[0].probability >= pair[1].probability);
        }
        assert!(p.top_scores.iter().all(|s| s.home_goals <= 5 && s.away_goals <= 5));
        assert_eq!(p.most_likely_score, p.top_scores.first().copied());
    }

    #[test]
    fn test_degenerate_strengths_never_nan() {
        let inputs = MatchInputs {
            home_goals_avg: 0.0,
            home_conceded_avg: -1.0,
            away_goals_avg: -2.0,
            away_conceded_avg: f64::NAN,
            league_avg_goals: -3.0,
        };
        let p = predict_match(&inputs);
        for v in [p.home_win, p.draw, p.away_win, p.over_2_5, p.under_2_5, p.btts_yes] {
            assert!(v.is_finite(), "got {v}");
        }
        // Neither side can score: everything collapses onto 0-0.
        assert_eq!(p.home_win, 0.0);
        assert_eq!(p.away_win, 0.0);
        assert_eq!(p.over_2_5, 0.0);
        assert_eq!(p.btts_yes, 0.0);
    }

    #[test]
    fn test_matrix_lines_are_complementary() {
        let m = ScoreMatrix::from_rates(1.4, 1.1, MAX_GOALS);
        for line in [0.5, 1.5, 2.5, 3.5, 4.5] {
            let sum = m.over(line) + m.under(line);
            assert!((sum - m.total_mass()).abs() < 1e-12);
        }
        assert_eq!(m.cell(MAX_GOALS + 1, 0), 0.0);
    }
}
