//! Runs every scenario present in a [`Config`] and collects the results into
//! one serializable report.

use serde::Serialize;

use crate::config::{BookmakerPrices, Config, MatchScenario, SeasonScenario, StockScenario};
use crate::engine::elo::{self, RatingTier, SeasonUpdate};
use crate::engine::kelly::{self, ArbitrageResult, KellyResult, Market, MarketOdds, MarketValueBet};
use crate::engine::monte_carlo::{
    self, BettingSimulationConfig, BettingSimulationResult, PortfolioSimulationConfig,
    SimulationResult,
};
use crate::engine::odds::{self, OddsQuote};
use crate::engine::poisson::{self, MatchPrediction};
use crate::engine::risk::RiskReport;
use crate::engine::valuation::{
    self, DcfInputs, DcfResult, GrahamAnalysis, ReverseDcfResult, ValuationResult,
};
use crate::error::Result;

#[derive(Debug, Clone, Default, Serialize)]
pub struct Report {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_analysis: Option<MatchReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub season: Option<SeasonReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock: Option<StockReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub portfolio: Option<SimulationResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub betting: Option<BettingSimulationResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub returns: Option<RiskReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BookmakerMargin {
    pub name: String,
    /// Overround as a percentage (5.0 = 105% book).
    pub margin: f64,
    /// Margin-free probabilities (%) in home, draw, away order (no draw entry
    /// for a two-way book).
    pub fair_probabilities: Vec<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StakeSuggestion {
    pub market: Market,
    pub odds: f64,
    pub kelly: KellyResult,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchReport {
    pub prediction: MatchPrediction,
    pub best_odds: MarketOdds,
    pub bookmaker_margins: Vec<BookmakerMargin>,
    pub value_bets: Vec<MarketValueBet>,
    pub stakes: Vec<StakeSuggestion>,
    pub arbitrage: Option<ArbitrageResult>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StandingRow {
    pub team: String,
    pub rating: f64,
    pub tier: RatingTier,
}

#[derive(Debug, Clone, Serialize)]
pub struct SeasonReport {
    pub standings: Vec<StandingRow>,
    pub history: Vec<SeasonUpdate>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DcfReport {
    pub dcf: DcfResult,
    pub valuation: ValuationResult,
    /// Growth the market price implies.
    pub reverse: ReverseDcfResult,
}

#[derive(Debug, Clone, Serialize)]
pub struct StockReport {
    pub graham: GrahamAnalysis,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_earnings: Option<ValuationResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dcf: Option<DcfReport>,
}

/// Evaluate every scenario section of `config`.
///
/// Sections that are absent stay `None`. The only failure is a DCF scenario
/// whose discount rate does not exceed the terminal growth rate.
pub fn build(config: &Config) -> Result<Report> {
    let mut report = Report::default();

    if let Some(scenario) = &config.match_scenario {
        report.match_analysis = Some(match_report(config, scenario));
    }
    if let Some(scenario) = &config.season {
        report.season = Some(season_report(config, scenario));
    }
    if let Some(scenario) = &config.stock {
        report.stock = Some(stock_report(config, scenario)?);
    }
    if let Some(p) = &config.portfolio {
        let sim = PortfolioSimulationConfig {
            simulation_count: p.simulation_count.unwrap_or(config.simulation.simulation_count),
            initial_value: p.initial_value,
            expected_return: p.expected_return,
            volatility: p.volatility,
            horizon_years: p.horizon_years,
            seed: p.seed.unwrap_or(config.simulation.seed),
        };
        report.portfolio = Some(monte_carlo::simulate_portfolio(&sim));
    }
    if let Some(b) = &config.betting {
        let sim = BettingSimulationConfig {
            simulation_count: b.simulation_count.unwrap_or(config.simulation.simulation_count),
            initial_bankroll: b.initial_bankroll,
            num_bets: b.num_bets,
            win_probability: b.win_probability,
            average_odds: b.average_odds,
            stake_percent: b.stake_percent,
            seed: b.seed.unwrap_or(config.simulation.seed),
        };
        report.betting = Some(monte_carlo::simulate_betting(&sim));
    }
    if let Some(r) = &config.returns {
        report.returns = Some(RiskReport::from_returns(
            &r.returns,
            r.benchmark.as_deref(),
            &config.risk,
            r.initial_value,
        ));
    }

    Ok(report)
}

fn best_price<F>(bookmakers: &[BookmakerPrices], price: F) -> Option<f64>
where
    F: Fn(&BookmakerPrices) -> Option<f64>,
{
    bookmakers
        .iter()
        .filter_map(|b| price(b).and_then(OddsQuote::new))
        .map(|q| q.decimal_odds)
        .max_by(|a, b| a.total_cmp(b))
}

fn match_report(config: &Config, scenario: &MatchScenario) -> MatchReport {
    let mut inputs = scenario.inputs;
    if inputs.league_avg_goals <= 0.0 {
        inputs.league_avg_goals = config.poisson.league_avg_goals;
    }
    let prediction = poisson::predict_match(&inputs);

    let books = &scenario.bookmakers;
    let best_odds = MarketOdds {
        home: best_price(books, |b| Some(b.decimal_home())),
        draw: best_price(books, |b| b.decimal_draw()),
        away: best_price(books, |b| Some(b.decimal_away())),
        over_2_5: scenario.over_2_5_odds,
        under_2_5: scenario.under_2_5_odds,
    };

    let bookmaker_margins = books
        .iter()
        .map(|b| {
            let mut prices = vec![b.decimal_home()];
            prices.extend(b.decimal_draw());
            prices.push(b.decimal_away());
            BookmakerMargin {
                name: b.name.clone(),
                margin: odds::overround(&prices) * 100.0,
                fair_probabilities: odds::remove_vig(&prices)
                    .into_iter()
                    .map(|p| p * 100.0)
                    .collect(),
            }
        })
        .collect();

    let value_bets = kelly::scan_value_bets(&prediction, &best_odds, config.kelly.value_threshold);

    let stakes = match scenario.bankroll {
        Some(bankroll) => value_bets
            .iter()
            .map(|vb| StakeSuggestion {
                market: vb.market,
                odds: vb.bet.bookmaker_odds,
                kelly: kelly::kelly(
                    vb.bet.true_probability,
                    vb.bet.bookmaker_odds,
                    bankroll,
                    config.kelly.fraction,
                ),
            })
            .collect(),
        None => Vec::new(),
    };

    let arbitrage = if books.is_empty() {
        None
    } else {
        let home: Vec<f64> = books.iter().map(|b| b.decimal_home()).collect();
        let draw: Vec<f64> = books.iter().filter_map(|b| b.decimal_draw()).collect();
        let away: Vec<f64> = books.iter().map(|b| b.decimal_away()).collect();
        Some(kelly::find_arbitrage(&home, &draw, &away))
    };

    tracing::info!(
        home_win = prediction.home_win,
        draw = prediction.draw,
        away_win = prediction.away_win,
        value_bets = value_bets.len(),
        "match analysed"
    );

    MatchReport {
        prediction,
        best_odds,
        bookmaker_margins,
        value_bets,
        stakes,
        arbitrage,
    }
}

fn season_report(config: &Config, scenario: &SeasonScenario) -> SeasonReport {
    let initial = scenario.rating_table();
    let season = elo::simulate_season(&initial, &scenario.matches, &config.elo);
    let standings = elo::standings(&season.ratings)
        .into_iter()
        .map(|(team, rating)| StandingRow {
            tier: elo::rating_to_tier(rating),
            team,
            rating,
        })
        .collect();

    tracing::info!(
        teams = season.ratings.len(),
        matches = season.history.len(),
        "season replayed"
    );

    SeasonReport {
        standings,
        history: season.history,
    }
}

fn stock_report(config: &Config, scenario: &StockScenario) -> Result<StockReport> {
    let graham = valuation::graham_analysis(
        scenario.eps,
        scenario.book_value,
        scenario.growth_rate,
        scenario.price,
        config.valuation.aaa_yield,
    );

    let price_earnings = scenario
        .fair_pe
        .map(|pe| valuation::pe_valuation(scenario.eps, pe, scenario.price));

    let dcf = match (scenario.free_cash_flow, scenario.shares_outstanding) {
        (Some(free_cash_flow), Some(shares_outstanding)) => {
            let inputs = DcfInputs {
                free_cash_flow,
                growth_rate: scenario.growth_rate,
                terminal_growth_rate: config.valuation.terminal_growth_rate,
                discount_rate: config.valuation.discount_rate,
                years: config.valuation.projection_years,
                shares_outstanding,
            };
            let dcf = valuation::dcf(&inputs)?;
            let fair_value = valuation::dcf_valuation(&inputs, scenario.price)?;
            let reverse = valuation::reverse_dcf(scenario.price, &inputs)?;
            Some(DcfReport {
                dcf,
                valuation: fair_value,
                reverse,
            })
        }
        _ => None,
    };

    tracing::info!(
        intrinsic_value = graham.intrinsic_value,
        margin_of_safety = graham.margin_of_safety,
        "stock valued"
    );

    Ok(StockReport {
        graham,
        price_earnings,
        dcf,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_produces_empty_report() {
        let report = build(&Config::default()).unwrap();
        assert!(report.match_analysis.is_none());
        assert!(report.season.is_none());
        assert!(report.stock.is_none());
        let json = serde_json::to_string(&report).unwrap();
        assert_eq!(json, "{}");
    }

    #[test]
    fn test_match_report_uses_best_prices() {
        let config = Config::from_toml_str(
            r#"
            [match]
            home_goals_avg = 2.0
            home_conceded_avg = 0.8
            away_goals_avg = 0.9
            away_conceded_avg = 1.7
            bankroll = 1000.0

            [[match.bookmakers]]
            name = "A"
            home = 2.2
            draw = 3.4
            away = 3.5

            [[match.bookmakers]]
            name = "B"
            home = 2.4
            draw = 3.3
            away = 3.1
            "#,
        )
        .unwrap();
        let report = build(&config).unwrap();
        let m = report.match_analysis.unwrap();
        assert_eq!(m.best_odds.home, Some(2.4));
        assert_eq!(m.best_odds.draw, Some(3.4));
        assert_eq!(m.best_odds.away, Some(3.5));
        assert_eq!(m.bookmaker_margins.len(), 2);
        let fair = &m.bookmaker_margins[0].fair_probabilities;
        assert_eq!(fair.len(), 3);
        assert!((fair.iter().sum::<f64>() - 100.0).abs() < 1e-9);
        // Book A: home 2.2, draw 3.4, away 3.5 -> shortest price first,
        // then draw above away.
        assert!(fair[0] > fair[1]);
        assert!(fair[1] > fair[2]);
        assert!(m.arbitrage.is_some());
        assert_eq!(m.stakes.len(), m.value_bets.len());
        for s in &m.stakes {
            assert!(s.kelly.stake >= 0.0);
            assert!(s.kelly.stake <= 1000.0);
        }
    }

    #[test]
    fn test_invalid_dcf_scenario_is_an_error() {
        let config = Config::from_toml_str(
            r#"
            [valuation]
            discount_rate = 3.0
            terminal_growth_rate = 3.0

            [stock]
            price = 50.0
            eps = 3.0
            book_value = 20.0
            growth_rate = 8.0
            free_cash_flow = 1e9
            shares_outstanding = 1e8
            "#,
        )
        .unwrap();
        assert!(build(&config).is_err());
    }

    #[test]
    fn test_season_standings_are_sorted() {
        let config = Config::from_toml_str(
            r#"
            [season.ratings]
            Reds = 1600.0
            Blues = 1500.0

            [[season.matches]]
            home_team = "Blues"
            away_team = "Reds"
            home_score = 3
            away_score = 0
            "#,
        )
        .unwrap();
        let season = build(&config).unwrap().season.unwrap();
        assert_eq!(season.history.len(), 1);
        assert!(season.standings[0].rating >= season.standings[1].rating);
    }
}
