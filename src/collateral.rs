//! Collateral management: per-token shortfall estimation, swap-cost
//! probes against spot books, and pre-trade preparation.

use crate::domain::{
    spot_asset_index, Address, CollateralPlan, CollateralReceipt, CollateralRequirement, Decimal,
    ExecutedSwap, OrderRequest, OrderStatus, OrderType, SplitAllocation, NATIVE_COLLATERAL,
};
use crate::engine::{FillSimulator, DEFAULT_SWAP_PENALTY_BPS};
use crate::error::RouteError;
use crate::venue::VenueClient;
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Penalty reported when the spot book exists but cannot absorb the swap.
pub const ILLIQUID_SWAP_PENALTY_BPS: i64 = 100;

/// Multiplier on the USDC transferred ahead of a swap; the 1% buffer
/// absorbs swap slippage.
fn transfer_buffer() -> Decimal {
    Decimal::scaled(101, 2)
}

/// Padding over best ask for the IOC spot buy.
fn spot_limit_padding() -> Decimal {
    Decimal::scaled(1005, 3)
}

#[derive(Debug)]
pub struct CollateralManager {
    venue: Arc<dyn VenueClient>,
    abstraction_enabled: AtomicBool,
}

impl CollateralManager {
    pub fn new(venue: Arc<dyn VenueClient>) -> Self {
        CollateralManager {
            venue,
            abstraction_enabled: AtomicBool::new(false),
        }
    }

    /// Per-token requirements for a set of allocations, read against live
    /// balances.
    ///
    /// The account-native token never has a shortfall: abstraction mode
    /// draws it from the perp balance directly. Every other token compares
    /// the aggregated need against the available spot balance.
    pub async fn estimate_requirements(
        &self,
        allocations: &[SplitAllocation],
        user: &Address,
    ) -> Result<CollateralPlan, RouteError> {
        let spot_state = self.venue.spot_clearinghouse_state(user).await?;
        let perp_state = self.venue.clearinghouse_state(user).await?;

        let mut token_order: Vec<String> = Vec::new();
        let mut needed: HashMap<String, Decimal> = HashMap::new();
        for allocation in allocations {
            let token = allocation.market.collateral.clone();
            let entry = needed.entry(token.clone()).or_insert_with(|| {
                token_order.push(token);
                Decimal::zero()
            });
            *entry += allocation.estimated_cost;
        }

        let mut requirements = Vec::new();
        for token in token_order {
            let amount_needed = needed[&token];
            if token == NATIVE_COLLATERAL {
                requirements.push(CollateralRequirement {
                    token,
                    amount_needed,
                    current_balance: perp_state.withdrawable,
                    shortfall: Decimal::zero(),
                    swap_from: None,
                    estimated_swap_cost_bps: None,
                });
                continue;
            }
            let current_balance = spot_state
                .balances
                .iter()
                .find(|b| b.coin == token)
                .map(|b| b.available())
                .unwrap_or_else(Decimal::zero);
            let shortfall = if amount_needed > current_balance {
                amount_needed - current_balance
            } else {
                Decimal::zero()
            };
            let swap_from = shortfall
                .is_positive()
                .then(|| NATIVE_COLLATERAL.to_string());
            requirements.push(CollateralRequirement {
                token,
                amount_needed,
                current_balance,
                shortfall,
                swap_from,
                estimated_swap_cost_bps: None,
            });
        }

        let estimates = join_all(
            requirements
                .iter()
                .filter(|r| r.shortfall.is_positive())
                .map(|r| {
                    let token = r.token.clone();
                    let amount = r.shortfall;
                    async move {
                        let bps = self
                            .estimate_swap_cost(NATIVE_COLLATERAL, &token, amount)
                            .await;
                        (token, bps)
                    }
                }),
        )
        .await;
        let cost_by_token: HashMap<String, Decimal> = estimates.into_iter().collect();

        let mut weighted = Decimal::zero();
        let mut weights = Decimal::zero();
        for requirement in &mut requirements {
            if !requirement.shortfall.is_positive() {
                continue;
            }
            if let Some(bps) = cost_by_token.get(&requirement.token) {
                requirement.estimated_swap_cost_bps = Some(*bps);
                weighted += *bps * requirement.amount_needed;
                weights += requirement.amount_needed;
            }
        }
        let total_swap_cost_bps = if weights.is_positive() {
            weighted / weights
        } else {
            Decimal::zero()
        };

        let swaps_needed = requirements.iter().any(|r| r.shortfall.is_positive());
        Ok(CollateralPlan {
            requirements,
            total_swap_cost_bps,
            swaps_needed,
            abstraction_enabled: self.abstraction_enabled.load(Ordering::SeqCst),
        })
    }

    /// Basis-point cost of swapping `amount` units into `to`.
    ///
    /// Falls back to 50 bps when the spot book is unavailable and 100 bps
    /// when it exists but is too shallow; otherwise reports the simulated
    /// impact. Never fails: the caller treats this as advisory.
    pub async fn estimate_swap_cost(&self, from: &str, to: &str, amount: Decimal) -> Decimal {
        if from == to {
            return Decimal::zero();
        }
        let fallback = Decimal::from_i64(DEFAULT_SWAP_PENALTY_BPS);

        let spot = match self.venue.spot_meta().await {
            Ok(spot) => spot,
            Err(e) => {
                debug!(error = %e, "spot metadata unavailable for swap estimate");
                return fallback;
            }
        };
        let (Some(to_index), Some(from_index)) = (spot.token_index(to), spot.token_index(from))
        else {
            return fallback;
        };
        let Some(pair) = spot.pair_for(to_index, from_index) else {
            return fallback;
        };
        let book = match self.venue.l2_book(&pair.name, None).await {
            Ok(book) => book,
            Err(e) => {
                debug!(pair = %pair.name, error = %e, "spot book unavailable for swap estimate");
                return fallback;
            }
        };

        let levels: Vec<(Decimal, Decimal)> = book.asks.iter().map(|l| (l.px, l.sz)).collect();
        let mid = FillSimulator::mid_price(
            book.best_bid().map(|l| l.px),
            book.best_ask().map(|l| l.px),
        );
        match FillSimulator::walk(&levels, mid, amount) {
            Ok(simulation) => simulation.price_impact_bps,
            Err(_) => Decimal::from_i64(ILLIQUID_SWAP_PENALTY_BPS),
        }
    }

    /// Execute the plan's swaps: enable abstraction once, then per token
    /// transfer USDC perp→spot and place an IOC spot buy. Steps are serial
    /// so every swap observes the preceding transfer.
    pub async fn prepare(&self, plan: &CollateralPlan, user: &Address) -> CollateralReceipt {
        let mut receipt = CollateralReceipt {
            success: true,
            swaps_executed: Vec::new(),
            abstraction_was_enabled: false,
            error: None,
        };
        if let Err(e) = self.prepare_steps(plan, user, &mut receipt).await {
            receipt.success = false;
            receipt.error = Some(e.to_string());
        }
        receipt
    }

    async fn prepare_steps(
        &self,
        plan: &CollateralPlan,
        _user: &Address,
        receipt: &mut CollateralReceipt,
    ) -> Result<(), RouteError> {
        if !self.abstraction_enabled.load(Ordering::SeqCst) {
            self.venue.set_dex_abstraction(true).await?;
            self.abstraction_enabled.store(true, Ordering::SeqCst);
            receipt.abstraction_was_enabled = true;
        }

        let pending: Vec<&CollateralRequirement> = plan
            .requirements
            .iter()
            .filter(|r| r.shortfall.is_positive() && r.token != NATIVE_COLLATERAL)
            .collect();
        if pending.is_empty() {
            return Ok(());
        }

        // Spot metadata is loaded once for all swaps.
        let spot = self.venue.spot_meta().await?;
        let usdc_index = spot
            .token_index(NATIVE_COLLATERAL)
            .ok_or_else(|| RouteError::Collateral("spot metadata missing USDC".to_string()))?;

        for requirement in pending {
            let token_index = spot.token_index(&requirement.token).ok_or_else(|| {
                RouteError::Collateral(format!("unknown spot token {}", requirement.token))
            })?;
            let pair = spot.pair_for(token_index, usdc_index).ok_or_else(|| {
                RouteError::Collateral(format!("no spot market for {}", requirement.token))
            })?;

            let transfer = (requirement.shortfall * transfer_buffer()).round_dp(6);
            self.venue.usd_class_transfer(transfer, false).await?;

            let book = self.venue.l2_book(&pair.name, None).await?;
            let best_ask = book.asks.first().ok_or_else(|| {
                RouteError::Collateral(format!("no spot liquidity for {}", requirement.token))
            })?;
            let price = (best_ask.px * spot_limit_padding()).round_dp(6);

            let order = OrderRequest {
                asset_index: spot_asset_index(pair.index),
                is_buy: true,
                price,
                size: requirement.shortfall,
                reduce_only: false,
                order_type: OrderType::ioc(),
                client_order_id: None,
            };
            let status = self.venue.place_order(&order, None).await?;
            let (filled, avg_price) = match status {
                OrderStatus::Filled {
                    total_size,
                    avg_price,
                    ..
                } => (total_size, Some(avg_price)),
                OrderStatus::Resting { .. }
                | OrderStatus::WaitingForFill
                | OrderStatus::WaitingForTrigger => (Decimal::zero(), None),
                OrderStatus::Error(msg) => {
                    return Err(RouteError::Collateral(format!(
                        "spot swap for {} rejected: {}",
                        requirement.token, msg
                    )));
                }
            };

            info!(token = %requirement.token, %filled, "collateral swap executed");
            receipt.swaps_executed.push(ExecutedSwap {
                token: requirement.token.clone(),
                requested: requirement.shortfall,
                filled,
                avg_price,
            });
        }

        Ok(())
    }
}
