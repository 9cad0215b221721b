//! Scalar market scoring: simulated impact, funding direction, and
//! collateral-swap cost combined into one comparable number.

use super::simulator::Simulation;
use crate::domain::{Decimal, MarketScore, PerpMarket, Side};
use std::collections::HashSet;

/// Conservative swap penalty applied when no estimate is available.
pub const DEFAULT_SWAP_PENALTY_BPS: i64 = 50;

pub struct MarketScorer;

impl MarketScorer {
    /// Score one market for one simulated fill. Lower is better.
    ///
    /// `funding_benefit` is the negated funding rate for buys and the raw
    /// rate for sells; the x3 factor scales per-period funding into a
    /// cost-comparable basis-point figure.
    pub fn score(
        simulation: &Simulation,
        market: &PerpMarket,
        side: Side,
        user_collateral: &HashSet<String>,
        swap_cost_bps: Option<Decimal>,
    ) -> MarketScore {
        let funding_benefit = match side {
            Side::Buy => -market.funding,
            Side::Sell => market.funding,
        };
        let funding_score = funding_benefit * Decimal::from_i64(10_000) * Decimal::from_i64(3);

        let collateral_match = user_collateral.contains(&market.collateral);
        let penalty = if collateral_match {
            Decimal::zero()
        } else {
            swap_cost_bps.unwrap_or_else(|| Decimal::from_i64(DEFAULT_SWAP_PENALTY_BPS))
        };

        let total_score = simulation.price_impact_bps - funding_score + penalty;
        let reason = (!collateral_match).then(|| {
            format!(
                "requires {} collateral ({} bps swap penalty)",
                market.collateral, penalty
            )
        });

        MarketScore {
            market: market.clone(),
            price_impact_bps: simulation.price_impact_bps,
            funding_rate: market.funding,
            collateral_match,
            swap_cost_bps: (!collateral_match).then_some(penalty),
            total_score,
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Coin;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn market(collateral: &str, funding: &str) -> PerpMarket {
        PerpMarket {
            base_asset: "TSLA".to_string(),
            coin: Coin::new("xyz:TSLA0"),
            asset_index: 110_000,
            dex_name: "xyz".to_string(),
            collateral: collateral.to_string(),
            is_native: false,
            funding: d(funding),
            open_interest: d("1000"),
            mark_price: d("431.25"),
            oracle_price: None,
        }
    }

    fn sim(impact_bps: &str) -> Simulation {
        Simulation {
            avg_price: d("431.50"),
            mid_price: d("431.25"),
            price_impact_bps: d(impact_bps),
            total_cost: d("1294.50"),
            filled_size: d("3"),
        }
    }

    fn usdc_only() -> HashSet<String> {
        HashSet::from(["USDC".to_string()])
    }

    #[test]
    fn test_matching_collateral_no_penalty() {
        let score = MarketScorer::score(
            &sim("5.797"),
            &market("USDC", "0.00000625"),
            Side::Buy,
            &usdc_only(),
            None,
        );
        assert!(score.collateral_match);
        assert_eq!(score.swap_cost_bps, None);
        assert!(score.reason.is_none());
        // 5.797 - (-0.00000625 * 30000) = 5.797 + 0.1875
        assert_eq!(score.total_score, d("5.9845"));
    }

    #[test]
    fn test_funding_sign_flips_for_sells() {
        let buy = MarketScorer::score(
            &sim("5"),
            &market("USDC", "0.0001"),
            Side::Buy,
            &usdc_only(),
            None,
        );
        let sell = MarketScorer::score(
            &sim("5"),
            &market("USDC", "0.0001"),
            Side::Sell,
            &usdc_only(),
            None,
        );
        // Positive funding hurts buys and helps sells.
        assert!(buy.total_score > sell.total_score);
        assert_eq!(buy.total_score, d("8"));
        assert_eq!(sell.total_score, d("2"));
    }

    #[test]
    fn test_missing_collateral_default_penalty() {
        let score = MarketScorer::score(
            &sim("5"),
            &market("USDH", "0"),
            Side::Buy,
            &usdc_only(),
            None,
        );
        assert!(!score.collateral_match);
        assert_eq!(score.swap_cost_bps, Some(d("50")));
        assert_eq!(score.total_score, d("55"));
        let reason = score.reason.unwrap();
        assert!(reason.contains("USDH"));
        assert!(reason.contains("50"));
    }

    #[test]
    fn test_missing_collateral_custom_swap_cost() {
        let score = MarketScorer::score(
            &sim("5"),
            &market("USDH", "0"),
            Side::Buy,
            &usdc_only(),
            Some(d("5")),
        );
        assert!(!score.collateral_match);
        assert_eq!(score.swap_cost_bps, Some(d("5")));
        assert_eq!(score.total_score, d("10"));
    }

    #[test]
    fn test_score_monotone_in_impact() {
        let low = MarketScorer::score(&sim("2"), &market("USDC", "0"), Side::Buy, &usdc_only(), None);
        let high =
            MarketScorer::score(&sim("9"), &market("USDC", "0"), Side::Buy, &usdc_only(), None);
        assert!(low.total_score < high.total_score);
    }
}
