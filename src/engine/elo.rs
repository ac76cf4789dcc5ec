//! ELO rating engine.
//!
//! Ratings are owned by the caller. Every function here takes a snapshot and
//! returns new values; nothing is mutated in place, so the same table can be
//! replayed or diffed freely.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::config::EloConfig;

/// Rating assigned to a team the engine has not seen before.
pub const BASE_RATING: f64 = 1500.0;

/// Share of probability mass reserved for draws before renormalisation.
const DRAW_FACTOR: f64 = 0.26;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EloRating {
    pub value: f64,
    #[serde(default)]
    pub last_change: f64,
}

impl Default for EloRating {
    fn default() -> Self {
        Self::new(BASE_RATING)
    }
}

impl EloRating {
    pub fn new(value: f64) -> Self {
        Self {
            value,
            last_change: 0.0,
        }
    }
}

/// Team id -> rating snapshot.
pub type RatingTable = HashMap<String, EloRating>;

/// Build a rating table from plain `(team, rating)` pairs.
pub fn rating_table<I, S>(ratings: I) -> RatingTable
where
    I: IntoIterator<Item = (S, f64)>,
    S: Into<String>,
{
    ratings
        .into_iter()
        .map(|(team, value)| (team.into(), EloRating::new(value)))
        .collect()
}

/// A finished match, as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    pub home_team: String,
    pub away_team: String,
    pub home_score: u32,
    pub away_score: u32,
}

/// Outcome of rating one match.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EloUpdate {
    pub home_rating: f64,
    pub away_rating: f64,
    pub home_change: f64,
    pub away_change: f64,
    pub home_expected: f64,
    pub away_expected: f64,
    /// K after the goal-margin multiplier.
    pub k_used: f64,
}

/// Win/draw/loss probabilities as percentages summing to 100.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutcomeProbabilities {
    pub home_win: f64,
    pub draw: f64,
    pub away_win: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatingTier {
    WorldClass,
    Elite,
    Strong,
    Average,
    BelowAverage,
    Weak,
}

impl RatingTier {
    pub fn label(&self) -> &'static str {
        match self {
            RatingTier::WorldClass => "World Class",
            RatingTier::Elite => "Elite",
            RatingTier::Strong => "Strong",
            RatingTier::Average => "Average",
            RatingTier::BelowAverage => "Below Average",
            RatingTier::Weak => "Weak",
        }
    }
}

/// Expected score of A against B: `1 / (1 + 10^((rB - rA) / 400))`.
pub fn expected_score(rating_a: f64, rating_b: f64) -> f64 {
    1.0 / (1.0 + 10.0_f64.powf((rating_b - rating_a) / 400.0))
}

/// `rating + k * (actual - expected)`.
pub fn new_rating(rating: f64, expected: f64, actual: f64, k: f64) -> f64 {
    rating + k * (actual - expected)
}

/// K multiplier for the winning margin.
/// 0-1 goals -> 1.0, 2 goals -> 1.5, N > 2 goals -> (11 + N) / 8.
pub fn goal_margin_multiplier(goal_diff: u32) -> f64 {
    match goal_diff {
        0 | 1 => 1.0,
        2 => 1.5,
        n => (11.0 + n as f64) / 8.0,
    }
}

/// Rate a single match.
///
/// Home advantage only shifts the expectation; it is never added to the
/// stored rating. New ratings are rounded to whole points and the reported
/// change is `round(new) - round(old)`.
pub fn update_ratings(
    home_rating: f64,
    away_rating: f64,
    home_score: u32,
    away_score: u32,
    cfg: &EloConfig,
) -> EloUpdate {
    let home_expected = expected_score(home_rating + cfg.home_advantage, away_rating);
    // Same value as expected_score(away, home + adv) without the rounding drift.
    let away_expected = 1.0 - home_expected;

    let home_actual = match home_score.cmp(&away_score) {
        std::cmp::Ordering::Greater => 1.0,
        std::cmp::Ordering::Equal => 0.5,
        std::cmp::Ordering::Less => 0.0,
    };
    let away_actual = 1.0 - home_actual;

    let k_used = cfg.k_factor * goal_margin_multiplier(home_score.abs_diff(away_score));

    let new_home = new_rating(home_rating, home_expected, home_actual, k_used).round();
    let new_away = new_rating(away_rating, away_expected, away_actual, k_used).round();

    EloUpdate {
        home_rating: new_home,
        away_rating: new_away,
        home_change: new_home - home_rating.round(),
        away_change: new_away - away_rating.round(),
        home_expected,
        away_expected,
        k_used,
    }
}

/// One entry of a season replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonUpdate {
    pub home_team: String,
    pub away_team: String,
    pub update: EloUpdate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonSimulation {
    pub ratings: RatingTable,
    pub history: Vec<SeasonUpdate>,
}

/// Write one match's new ratings into a snapshot the caller owns.
pub fn apply_update(ratings: &mut RatingTable, home_team: &str, away_team: &str, update: &EloUpdate) {
    ratings.insert(
        home_team.to_string(),
        EloRating {
            value: update.home_rating,
            last_change: update.home_change,
        },
    );
    ratings.insert(
        away_team.to_string(),
        EloRating {
            value: update.away_rating,
            last_change: update.away_change,
        },
    );
}

/// Replay `matches` in order on a copy of `initial`.
///
/// Order matters: each match is rated with the ratings produced by the ones
/// before it. Teams missing from `initial` start at `cfg.base_rating`.
pub fn simulate_season(
    initial: &RatingTable,
    matches: &[MatchResult],
    cfg: &EloConfig,
) -> SeasonSimulation {
    let mut ratings = initial.clone();
    let mut history = Vec::with_capacity(matches.len());

    for m in matches {
        let home = ratings
            .get(&m.home_team)
            .map_or(cfg.base_rating, |r| r.value);
        let away = ratings
            .get(&m.away_team)
            .map_or(cfg.base_rating, |r| r.value);

        let update = update_ratings(home, away, m.home_score, m.away_score, cfg);
        apply_update(&mut ratings, &m.home_team, &m.away_team, &update);
        history.push(SeasonUpdate {
            home_team: m.home_team.clone(),
            away_team: m.away_team.clone(),
            update,
        });
    }

    tracing::debug!(
        matches = matches.len(),
        teams = ratings.len(),
        "season replay complete"
    );

    SeasonSimulation { ratings, history }
}

/// Win/draw/loss split from two ratings.
///
/// The win components are scaled by `1 - DRAW_FACTOR`; the draw share shrinks
/// as the expected scores diverge. All three are renormalised to 100.
pub fn match_probabilities(
    home_rating: f64,
    away_rating: f64,
    home_advantage: f64,
) -> OutcomeProbabilities {
    let home_expected = expected_score(home_rating + home_advantage, away_rating);
    let away_expected = 1.0 - home_expected;

    let home_raw = home_expected * (1.0 - DRAW_FACTOR);
    let away_raw = away_expected * (1.0 - DRAW_FACTOR);
    let draw_raw = DRAW_FACTOR * (1.0 - (home_expected - away_expected).abs());

    let total = home_raw + draw_raw + away_raw;
    if total <= 0.0 || !total.is_finite() {
        return OutcomeProbabilities {
            home_win: 100.0 / 3.0,
            draw: 100.0 / 3.0,
            away_win: 100.0 / 3.0,
        };
    }
    OutcomeProbabilities {
        home_win: home_raw / total * 100.0,
        draw: draw_raw / total * 100.0,
        away_win: away_raw / total * 100.0,
    }
}

pub fn rating_to_tier(rating: f64) -> RatingTier {
    if rating >= 2000.0 {
        RatingTier::WorldClass
    } else if rating >= 1800.0 {
        RatingTier::Elite
    } else if rating >= 1600.0 {
        RatingTier::Strong
    } else if rating >= 1400.0 {
        RatingTier::Average
    } else if rating >= 1200.0 {
        RatingTier::BelowAverage
    } else {
        RatingTier::Weak
    }
}

/// Teams sorted by rating, highest first. Ties are ordered by team id.
pub fn standings(ratings: &RatingTable) -> Vec<(String, f64)> {
    let mut table: Vec<(String, f64)> = ratings
        .iter()
        .map(|(team, r)| (team.clone(), r.value))
        .collect();
    table.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_home_adv() -> EloConfig {
        EloConfig {
            home_advantage: 0.0,
            ..EloConfig::default()
        }
    }

    #[test]
    fn test_expected_score_symmetry() {
        assert_eq!(expected_score(1500.0, 1500.0), 0.5);
        for (a, b) in [(1500.0, 1700.0), (1234.0, 1890.0), (2100.0, 1300.0)] {
            let sum = expected_score(a, b) + expected_score(b, a);
            assert!((sum - 1.0).abs() < 1e-12, "a={a} b={b} sum={sum}");
        }
        // 400-point gap -> 10:1 odds
        assert!((expected_score(1900.0, 1500.0) - 10.0 / 11.0).abs() < 1e-12);
    }

    #[test]
    fn test_new_rating() {
        assert_eq!(new_rating(1500.0, 0.5, 1.0, 32.0), 1516.0);
        assert_eq!(new_rating(1500.0, 0.5, 0.0, 32.0), 1484.0);
    }

    #[test]
    fn test_goal_margin_multiplier() {
        assert_eq!(goal_margin_multiplier(0), 1.0);
        assert_eq!(goal_margin_multiplier(1), 1.0);
        assert_eq!(goal_margin_multiplier(2), 1.5);
        assert_eq!(goal_margin_multiplier(3), 14.0 / 8.0);
        assert_eq!(goal_margin_multiplier(5), 2.0);
    }

    #[test]
    fn test_update_equal_teams_home_win() {
        let u = update_ratings(1500.0, 1500.0, 1, 0, &no_home_adv());
        assert_eq!(u.home_rating, 1516.0);
        assert_eq!(u.away_rating, 1484.0);
        assert_eq!(u.home_change, 16.0);
        assert_eq!(u.away_change, -16.0);
    }

    #[test]
    fn test_home_advantage_shifts_expectation_only() {
        let u = update_ratings(1500.0, 1500.0, 1, 1, &EloConfig::default());
        assert!(u.home_expected > 0.5);
        // Home was favoured and only drew -> loses points.
        assert!(u.home_change < 0.0);
        assert_eq!(u.home_change, -u.away_change);
    }

    #[test]
    fn test_big_margin_scales_k() {
        let narrow = update_ratings(1500.0, 1500.0, 1, 0, &no_home_adv());
        let thrashing = update_ratings(1500.0, 1500.0, 4, 0, &no_home_adv());
        assert_eq!(thrashing.k_used, 32.0 * 15.0 / 8.0);
        assert!(thrashing.home_change > narrow.home_change);
    }

    #[test]
    fn test_change_uses_rounded_old_rating() {
        let u = update_ratings(1500.4, 1499.6, 0, 0, &no_home_adv());
        assert_eq!(u.home_change, u.home_rating - 1500.0);
        assert_eq!(u.away_change, u.away_rating - 1500.0);
    }

    #[test]
    fn test_apply_update_records_last_change() {
        let mut table = rating_table([("A", 1500.0), ("B", 1500.0)]);
        let update = update_ratings(1500.0, 1500.0, 1, 0, &no_home_adv());
        apply_update(&mut table, "A", "B", &update);
        assert_eq!(table["A"].value, 1516.0);
        assert_eq!(table["A"].last_change, 16.0);
        assert_eq!(table["B"].value, 1484.0);
        assert_eq!(table["B"].last_change, -16.0);
    }

    #[test]
    fn test_season_defaults_missing_teams_and_keeps_input() {
        let initial = rating_table([("ARS", 1600.0)]);
        let matches = vec![MatchResult {
            home_team: "ARS".to_string(),
            away_team: "NEW".to_string(),
            home_score: 2,
            away_score: 2,
        }];
        let season = simulate_season(&initial, &matches, &EloConfig::default());
        assert_eq!(initial["ARS"].value, 1600.0);
        assert_eq!(season.history.len(), 1);
        // Favourite drew -> down; newcomer started at 1500 -> up.
        assert!(season.ratings["ARS"].value < 1600.0);
        assert!(season.ratings["NEW"].value > 1500.0);
        assert_eq!(season.ratings["NEW"].last_change, season.ratings["NEW"].value - 1500.0);
    }

    #[test]
    fn test_match_probabilities_sum_to_100() {
        for (h, a) in [(1500.0, 1500.0), (1800.0, 1400.0), (1300.0, 1900.0)] {
            let p = match_probabilities(h, a, 100.0);
            let sum = p.home_win + p.draw + p.away_win;
            assert!((sum - 100.0).abs() < 1e-9, "sum={sum}");
        }
        let even = match_probabilities(1500.0, 1500.0, 0.0);
        assert!((even.home_win - even.away_win).abs() < 1e-12);
        assert!((even.draw - 26.0).abs() < 1e-9, "draw={}", even.draw);
    }

    #[test]
    fn test_rating_tiers() {
        assert_eq!(rating_to_tier(2050.0), RatingTier::WorldClass);
        assert_eq!(rating_to_tier(1800.0), RatingTier::Elite);
        assert_eq!(rating_to_tier(1650.0), RatingTier::Strong);
        assert_eq!(rating_to_tier(1500.0), RatingTier::Average);
        assert_eq!(rating_to_tier(1200.0), RatingTier::BelowAverage);
        assert_eq!(rating_to_tier(1100.0), RatingTier::Weak);
        assert_eq!(RatingTier::BelowAverage.label(), "Below Average");
    }

    #[test]
    fn test_standings_order() {
        let ratings = rating_table([("B", 1500.0), ("A", 1500.0), ("C", 1700.0)]);
        let table = standings(&ratings);
        let order: Vec<&str> = table.iter().map(|(t, _)| t.as_str()).collect();
        assert_eq!(order, vec!["C", "A", "B"]);
    }
}
