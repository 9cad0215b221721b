//! Markets, market groups, and the global asset-index encoding.

use super::{Coin, Decimal};
use serde::{Deserialize, Serialize};

/// Sentinel deployer label for first-party markets.
pub const NATIVE_DEX: &str = "__native__";

/// The account-native collateral token.
pub const NATIVE_COLLATERAL: &str = "USDC";

/// Base offset for deployer market asset indices.
pub const DEPLOYER_INDEX_BASE: u32 = 100_000;

/// Per-deployer stride within the deployer index space.
pub const DEPLOYER_INDEX_STRIDE: u32 = 10_000;

/// Base offset for spot asset indices used in swap orders.
pub const SPOT_INDEX_BASE: u32 = 10_000;

/// Global asset index for a perp market.
///
/// Native markets (deployer 0) use their local index directly; deployer
/// markets use `100000 + deployer_index * 10000 + local_index`. This
/// encoding is a wire contract and must stay bit-exact.
pub fn perp_asset_index(deployer_index: usize, local_index: usize) -> u32 {
    if deployer_index == 0 {
        local_index as u32
    } else {
        DEPLOYER_INDEX_BASE + deployer_index as u32 * DEPLOYER_INDEX_STRIDE + local_index as u32
    }
}

/// Wire asset index for a spot pair: `10000 + 2 * pair_index`.
pub fn spot_asset_index(pair_index: u32) -> u32 {
    SPOT_INDEX_BASE + 2 * pair_index
}

/// Normalize a venue coin into a base-asset ticker.
///
/// Native coins are used as-is. Deployer coins drop everything up to the
/// first colon, then strip trailing ASCII digits; if stripping would leave
/// nothing, the unstripped suffix is kept. The result is uppercased.
pub fn extract_base_asset(coin: &str, is_native: bool) -> String {
    if is_native {
        return coin.to_uppercase();
    }
    let suffix = match coin.split_once(':') {
        Some((_, rest)) => rest,
        None => coin,
    };
    let stripped = suffix.trim_end_matches(|c: char| c.is_ascii_digit());
    let base = if stripped.is_empty() { suffix } else { stripped };
    base.to_uppercase()
}

/// A single tradable perpetual market.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerpMarket {
    /// Normalized ticker, uppercase, deployer prefix stripped.
    pub base_asset: String,
    /// Opaque venue-native identifier used in all wire calls.
    pub coin: Coin,
    /// Global numeric ID (see [`perp_asset_index`]).
    pub asset_index: u32,
    /// Deployer label, or [`NATIVE_DEX`] for first-party markets.
    pub dex_name: String,
    /// Resolved margin token symbol, or a `TOKEN_<n>` placeholder.
    pub collateral: String,
    pub is_native: bool,
    /// Current funding rate per funding period.
    pub funding: Decimal,
    pub open_interest: Decimal,
    pub mark_price: Decimal,
    pub oracle_price: Option<Decimal>,
}

/// All markets trading the same base asset, in discovery order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketGroup {
    pub base_asset: String,
    pub markets: Vec<PerpMarket>,
    pub has_alternatives: bool,
}

impl MarketGroup {
    pub fn new(base_asset: String, markets: Vec<PerpMarket>) -> Self {
        let has_alternatives = markets.len() > 1;
        MarketGroup {
            base_asset,
            markets,
            has_alternatives,
        }
    }
}
