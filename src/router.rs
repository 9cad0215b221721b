//! Order routing: simulate and score every candidate market, or split the
//! order across the merged book, and emit executable plans.

use crate::aggregator::BookAggregator;
use crate::collateral::CollateralManager;
use crate::domain::{
    CollateralPlan, Decimal, ExecutionPlan, MarketScore, OrderType, PerpMarket, Quote, Side,
    SplitExecutionPlan, SplitQuote, NATIVE_COLLATERAL,
};
use crate::engine::{FillSimulator, MarketScorer, Simulation, SplitOptimizer};
use crate::error::RouteError;
use crate::registry::MarketRegistry;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// Decimal places applied to limit prices. Tick alignment stays the
/// venue's problem.
const LIMIT_PRICE_DECIMALS: u32 = 6;

#[derive(Debug)]
pub struct Router {
    registry: Arc<MarketRegistry>,
    aggregator: Arc<BookAggregator>,
    collateral: Arc<CollateralManager>,
    splitter: SplitOptimizer,
}

impl Router {
    pub fn new(
        registry: Arc<MarketRegistry>,
        aggregator: Arc<BookAggregator>,
        collateral: Arc<CollateralManager>,
    ) -> Self {
        Router {
            registry,
            aggregator,
            collateral,
            splitter: SplitOptimizer::new(),
        }
    }

    /// Route the full size to the single best-scoring market.
    pub async fn quote(
        &self,
        base_asset: &str,
        side: Side,
        size: Decimal,
        user_collateral: &HashSet<String>,
        slippage: Decimal,
    ) -> Result<Quote, RouteError> {
        let markets = self.registry.get_markets(base_asset);
        if markets.is_empty() {
            return Err(RouteError::NoMarkets(base_asset.to_uppercase()));
        }

        let aggregated = self.aggregator.aggregate(base_asset).await;
        if aggregated.per_market_books.is_empty() {
            return Err(RouteError::MarketDataUnavailable {
                base_asset: base_asset.to_uppercase(),
                failed_coins: aggregated.failed_coins,
            });
        }

        let mut scored: Vec<(MarketScore, Simulation)> = Vec::new();
        for market_book in &aggregated.per_market_books {
            let simulation = match FillSimulator::simulate(&market_book.book, side, size) {
                Ok(simulation) => simulation,
                Err(e) => {
                    debug!(coin = %market_book.market.coin, error = %e, "market cannot fill");
                    continue;
                }
            };
            let swap_cost = if user_collateral.contains(&market_book.market.collateral) {
                None
            } else {
                Some(
                    self.collateral
                        .estimate_swap_cost(
                            NATIVE_COLLATERAL,
                            &market_book.market.collateral,
                            simulation.total_cost,
                        )
                        .await,
                )
            };
            let score = MarketScorer::score(
                &simulation,
                &market_book.market,
                side,
                user_collateral,
                swap_cost,
            );
            scored.push((score, simulation));
        }

        if scored.is_empty() {
            return Err(RouteError::InsufficientLiquidity {
                base_asset: base_asset.to_uppercase(),
                requested_size: size,
            });
        }
        scored.sort_by(|a, b| a.0.total_score.cmp(&b.0.total_score));

        let mut warnings = Vec::new();
        if !aggregated.failed_coins.is_empty() {
            warnings.push(format!(
                "Partial market data: {}/{} markets responded",
                aggregated.per_market_books.len(),
                markets.len()
            ));
        }

        let (best, best_simulation) = (scored[0].0.clone(), scored[0].1);
        let plan = build_leg(&best.market, side, size, best_simulation.avg_price, slippage);

        Ok(Quote {
            base_asset: base_asset.to_uppercase(),
            side,
            requested_size: size,
            selected_market: best.market.clone(),
            estimated_avg_price: best_simulation.avg_price,
            estimated_price_impact_bps: best_simulation.price_impact_bps,
            estimated_funding_rate: best.market.funding,
            alternatives_considered: scored.into_iter().map(|(score, _)| score).collect(),
            warnings,
            plan,
        })
    }

    /// Split the order across the merged book. The attached collateral plan
    /// is a placeholder; real requirements are recomputed at execution time
    /// against live balances, so stale quotes cannot under- or over-swap.
    pub async fn quote_split(
        &self,
        base_asset: &str,
        side: Side,
        size: Decimal,
        slippage: Decimal,
    ) -> Result<SplitQuote, RouteError> {
        let markets = self.registry.get_markets(base_asset);
        if markets.is_empty() {
            return Err(RouteError::NoMarkets(base_asset.to_uppercase()));
        }

        let aggregated = self.aggregator.aggregate_for_order(base_asset, side, size).await;
        if aggregated.per_market_books.is_empty() {
            return Err(RouteError::MarketDataUnavailable {
                base_asset: base_asset.to_uppercase(),
                failed_coins: aggregated.failed_coins,
            });
        }

        let lookup: HashMap<String, PerpMarket> = aggregated
            .per_market_books
            .iter()
            .map(|mb| (mb.market.coin.as_str().to_string(), mb.market.clone()))
            .collect();
        let outcome = self.splitter.optimize(&aggregated, side, size, &lookup)?;

        let mut legs = Vec::new();
        for allocation in &outcome.allocations {
            let market_book = aggregated
                .per_market_books
                .iter()
                .find(|mb| mb.market.coin == allocation.market.coin)
                .ok_or_else(|| RouteError::Execution {
                    message: format!("no snapshot for {}", allocation.market.coin),
                    raw: None,
                })?;
            // Per-leg limit comes from that market's own snapshot, not the
            // blended average.
            let simulation = FillSimulator::simulate(&market_book.book, side, allocation.size)
                .map_err(|_| RouteError::InsufficientLiquidity {
                    base_asset: base_asset.to_uppercase(),
                    requested_size: allocation.size,
                })?;
            legs.push(build_leg(
                &allocation.market,
                side,
                allocation.size,
                simulation.avg_price,
                slippage,
            ));
        }

        let mut warnings = Vec::new();
        if !aggregated.failed_coins.is_empty() {
            warnings.push(format!(
                "Partial market data: {}/{} markets responded",
                aggregated.per_market_books.len(),
                markets.len()
            ));
        }
        warnings.push(
            "Collateral requirements are computed at execution time against live balances"
                .to_string(),
        );

        let plan = SplitExecutionPlan {
            legs,
            allocations: outcome.allocations,
            collateral_plan: CollateralPlan::pending(),
            side,
            total_size: size,
            slippage,
        };

        Ok(SplitQuote {
            base_asset: base_asset.to_uppercase(),
            side,
            requested_size: size,
            estimated_avg_price: outcome.avg_price,
            estimated_price_impact_bps: outcome.price_impact_bps,
            warnings,
            plan,
        })
    }
}

/// Limit price is the simulated average padded by slippage in the
/// adverse direction, rounded to six decimals.
fn build_leg(
    market: &PerpMarket,
    side: Side,
    size: Decimal,
    avg_price: Decimal,
    slippage: Decimal,
) -> ExecutionPlan {
    let factor = match side {
        Side::Buy => Decimal::one() + slippage,
        Side::Sell => Decimal::one() - slippage,
    };
    ExecutionPlan {
        market: market.clone(),
        side,
        size,
        limit_price: (avg_price * factor).round_dp(LIMIT_PRICE_DECIMALS),
        order_type: OrderType::ioc(),
        slippage,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Coin;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn market() -> PerpMarket {
        PerpMarket {
            base_asset: "TSLA".to_string(),
            coin: Coin::new("TSLA"),
            asset_index: 3,
            dex_name: crate::domain::NATIVE_DEX.to_string(),
            collateral: "USDC".to_string(),
            is_native: true,
            funding: Decimal::zero(),
            open_interest: d("1000"),
            mark_price: d("431.25"),
            oracle_price: None,
        }
    }

    #[test]
    fn test_buy_limit_padded_up() {
        let leg = build_leg(&market(), Side::Buy, d("3"), d("431.50"), d("0.01"));
        assert_eq!(leg.limit_price, d("435.815"));
        assert_eq!(leg.order_type, OrderType::ioc());
    }

    #[test]
    fn test_sell_limit_padded_down() {
        let leg = build_leg(&market(), Side::Sell, d("3"), d("431.50"), d("0.01"));
        assert_eq!(leg.limit_price, d("427.185"));
    }

    #[test]
    fn test_limit_rounded_to_six_decimals() {
        let leg = build_leg(&market(), Side::Buy, d("1"), d("431.333333333"), d("0.01"));
        assert_eq!(leg.limit_price, d("435.646667"));
    }
}
