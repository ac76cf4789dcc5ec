// Integration tests for the simulation, valuation and risk engines

#[cfg(test)]
mod tests {
    use edge_analytics::config::{Config, RiskConfig};
    use edge_analytics::engine::monte_carlo::{
        simulate_betting, simulate_portfolio, BettingSimulationConfig, PortfolioSimulationConfig,
    };
    use edge_analytics::engine::risk::{self, RiskReport};
    use edge_analytics::engine::valuation::{self, DcfInputs, InvestmentRating};
    use edge_analytics::{report, EngineError};

    fn reference_dcf() -> DcfInputs {
        DcfInputs {
            free_cash_flow: 1e8,
            growth_rate: 10.0,
            terminal_growth_rate: 3.0,
            discount_rate: 10.0,
            years: 5,
            shares_outstanding: 1e7,
        }
    }

    #[test]
    fn test_portfolio_simulation_seeded_runs_match() {
        let cfg = PortfolioSimulationConfig {
            simulation_count: 5_000,
            initial_value: 50_000.0,
            expected_return: 6.0,
            volatility: 15.0,
            horizon_years: 3.0,
            seed: 2024,
        };
        let first = simulate_portfolio(&cfg);
        let second = simulate_portfolio(&cfg);
        assert_eq!(first.mean, second.mean);
        assert_eq!(first.sampled_distribution, second.sampled_distribution);

        let other = simulate_portfolio(&PortfolioSimulationConfig { seed: 2025, ..cfg });
        assert_ne!(first.mean, other.mean);
    }

    #[test]
    fn test_betting_simulation_negative_edge_loses_on_average() {
        let cfg = BettingSimulationConfig {
            simulation_count: 2_000,
            initial_bankroll: 1_000.0,
            num_bets: 200,
            win_probability: 45.0,
            average_odds: 2.0,
            stake_percent: 5.0,
            seed: 3,
        };
        let r = simulate_betting(&cfg);
        assert!(r.avg_final_bankroll < 1_000.0, "avg={}", r.avg_final_bankroll);
        assert!(r.summary.probability_of_loss > 50.0);
        assert!(r.avg_max_drawdown > 0.0);
        assert!((0.0..=100.0).contains(&r.ruin_probability));
    }

    #[test]
    fn test_dcf_reference_case() {
        let result = valuation::dcf(&reference_dcf()).unwrap();
        assert!(result.intrinsic_value > 0.0);
        assert_eq!(result.per_share_value, result.intrinsic_value / 1e7);
        assert_eq!(result.projected_cash_flows.len(), 5);
        for pair in result.projected_cash_flows.windows(2) {
            assert!(pair[1].cash_flow > pair[0].cash_flow);
        }
    }

    #[test]
    fn test_reverse_dcf_recovers_growth() {
        let inputs = reference_dcf();
        let target = valuation::dcf(&inputs).unwrap().per_share_value;
        let implied = valuation::reverse_dcf(target, &inputs).unwrap();
        assert!(implied.converged);
        assert!(
            (implied.implied_growth_rate - inputs.growth_rate).abs() <= 0.5,
            "implied={}",
            implied.implied_growth_rate
        );
    }

    #[test]
    fn test_dcf_rejects_terminal_growth_at_discount_rate() {
        let inputs = DcfInputs {
            terminal_growth_rate: 10.0,
            ..reference_dcf()
        };
        let err = valuation::dcf(&inputs).unwrap_err();
        assert!(matches!(err, EngineError::InvalidInputs { .. }));
        assert!(valuation::reverse_dcf(50.0, &inputs).is_err());
    }

    #[test]
    fn test_pe_valuation_rating() {
        let v = valuation::pe_valuation(5.0, 20.0, 70.0);
        assert_eq!(v.fair_value, 100.0);
        assert_eq!(v.rating, InvestmentRating::StrongBuy);
    }

    #[test]
    fn test_equity_curve_drawdown_matches_reference() {
        let values = [100.0, 110.0, 90.0, 95.0, 105.0];
        assert!((risk::max_drawdown(&values) - 18.18).abs() < 0.01);

        let episodes = risk::drawdown_durations(&values);
        assert_eq!(episodes.len(), 1);
        assert!(!episodes[0].recovered);
        assert_eq!(episodes[0].start_index, 1);
    }

    #[test]
    fn test_risk_report_on_losing_series() {
        let returns = [-1.0, -2.0, 0.5, -1.5, -0.5];
        let report = RiskReport::from_returns(&returns, None, &RiskConfig::default(), 100.0);
        assert!(report.sharpe_ratio < 0.0);
        assert!(report.sortino_ratio < 0.0);
        assert!(report.annualized_return < 0.0);
        assert!(report.max_drawdown > 4.0);
    }

    #[test]
    fn test_sample_config_builds_full_report() {
        let config = Config::load(std::path::Path::new("config.toml")).unwrap();
        let report = report::build(&config).unwrap();

        let m = report.match_analysis.expect("match section");
        assert!((m.prediction.home_win + m.prediction.draw + m.prediction.away_win - 100.0).abs() < 1.0);
        assert_eq!(m.bookmaker_margins.len(), 2);

        let season = report.season.expect("season section");
        assert_eq!(season.standings.len(), 4);

        let stock = report.stock.expect("stock section");
        assert!(stock.dcf.is_some());
        assert!(stock.price_earnings.is_some());

        let portfolio = report.portfolio.expect("portfolio section");
        assert_eq!(portfolio.simulation_count, 10_000);

        let betting = report.betting.expect("betting section");
        assert_eq!(betting.summary.simulation_count, 5_000);

        let returns = report.returns.expect("returns section");
        assert!(returns.benchmark.is_some());

        let json = serde_json::to_value(report::build(&config).unwrap()).unwrap();
        assert!(json["match_analysis"]["value_bets"].is_array());
        assert!(json["stock"]["dcf"]["valuation"]["fair_value"].is_number());
    }
}
