//! Quotes, execution plans, split allocations, collateral plans, and the
//! receipts produced by execution.

use super::{Coin, Decimal, OrderType, PerpMarket, Side};
use serde::{Deserialize, Serialize};

/// Per-market routing score. Lower is better.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketScore {
    pub market: PerpMarket,
    pub price_impact_bps: Decimal,
    pub funding_rate: Decimal,
    pub collateral_match: bool,
    /// Swap penalty applied when collateral is missing.
    #[serde(default)]
    pub swap_cost_bps: Option<Decimal>,
    pub total_score: Decimal,
    /// Populated only when collateral is missing.
    #[serde(default)]
    pub reason: Option<String>,
}

/// One executable leg: market, side, size, and a slippage-padded limit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionPlan {
    pub market: PerpMarket,
    pub side: Side,
    pub size: Decimal,
    /// `avg_price * (1 ± slippage)`, rounded to six decimals.
    pub limit_price: Decimal,
    pub order_type: OrderType,
    pub slippage: Decimal,
}

/// Single-market routing result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub base_asset: String,
    pub side: Side,
    pub requested_size: Decimal,
    pub selected_market: PerpMarket,
    pub estimated_avg_price: Decimal,
    pub estimated_price_impact_bps: Decimal,
    pub estimated_funding_rate: Decimal,
    /// All feasible markets, best score first.
    pub alternatives_considered: Vec<MarketScore>,
    pub warnings: Vec<String>,
    pub plan: ExecutionPlan,
}

/// Per-market slice of a split order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitAllocation {
    pub market: PerpMarket,
    pub size: Decimal,
    pub estimated_cost: Decimal,
    pub estimated_avg_price: Decimal,
    /// Fraction of the total size, in [0, 1]. Sums to 1 across allocations.
    pub proportion: Decimal,
}

/// Collateral needed for one margin token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollateralRequirement {
    pub token: String,
    pub amount_needed: Decimal,
    pub current_balance: Decimal,
    /// `max(0, needed - balance)`; always zero for the account-native token.
    pub shortfall: Decimal,
    #[serde(default)]
    pub swap_from: Option<String>,
    #[serde(default)]
    pub estimated_swap_cost_bps: Option<Decimal>,
}

/// Aggregate collateral picture for a planned execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CollateralPlan {
    pub requirements: Vec<CollateralRequirement>,
    pub total_swap_cost_bps: Decimal,
    pub swaps_needed: bool,
    pub abstraction_enabled: bool,
}

impl CollateralPlan {
    /// Placeholder attached to quotes; real requirements are computed at
    /// execution time against live balances.
    pub fn pending() -> Self {
        CollateralPlan::default()
    }
}

/// Multi-leg execution plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitExecutionPlan {
    pub legs: Vec<ExecutionPlan>,
    pub allocations: Vec<SplitAllocation>,
    pub collateral_plan: CollateralPlan,
    pub side: Side,
    pub total_size: Decimal,
    pub slippage: Decimal,
}

/// Split routing result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitQuote {
    pub base_asset: String,
    pub side: Side,
    pub requested_size: Decimal,
    pub estimated_avg_price: Decimal,
    pub estimated_price_impact_bps: Decimal,
    pub warnings: Vec<String>,
    pub plan: SplitExecutionPlan,
}

/// One executed collateral swap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutedSwap {
    pub token: String,
    pub requested: Decimal,
    pub filled: Decimal,
    #[serde(default)]
    pub avg_price: Option<Decimal>,
}

/// Outcome of collateral preparation. `swaps_executed` is accurate up to
/// the point of failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollateralReceipt {
    pub success: bool,
    pub swaps_executed: Vec<ExecutedSwap>,
    pub abstraction_was_enabled: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// Outcome of one order submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionReceipt {
    pub success: bool,
    pub coin: Coin,
    pub side: Side,
    pub requested_size: Decimal,
    pub filled_size: Decimal,
    #[serde(default)]
    pub avg_price: Option<Decimal>,
    #[serde(default)]
    pub order_id: Option<u64>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Outcome of a multi-leg execution. `success` is the AND of all legs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitExecutionReceipt {
    pub success: bool,
    pub legs: Vec<ExecutionReceipt>,
    #[serde(default)]
    pub collateral: Option<CollateralReceipt>,
    #[serde(default)]
    pub error: Option<String>,
}
