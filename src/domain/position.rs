//! Normalized positions across markets.

use super::{Coin, Decimal, Side};
use serde::{Deserialize, Serialize};

/// Whether a position was opened through this layer.
///
/// Tracking is advisory; without a durable local fills index everything
/// reports [`ManagedBy::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ManagedBy {
    Managed,
    External,
    #[default]
    Unknown,
}

/// A position normalized across native and deployer markets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogicalPosition {
    pub base_asset: String,
    pub coin: Coin,
    pub side: Side,
    /// Unsigned size; direction lives in `side`.
    pub size: Decimal,
    #[serde(default)]
    pub entry_price: Option<Decimal>,
    #[serde(default)]
    pub mark_price: Option<Decimal>,
    pub unrealized_pnl: Decimal,
    pub leverage: u32,
    #[serde(default)]
    pub liquidation_price: Option<Decimal>,
    pub managed_by: ManagedBy,
}
