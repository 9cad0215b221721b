//! Typed venue metadata snapshots: perp universes, asset contexts,
//! deployers, spot metadata, and account state reads.

use super::{Coin, Decimal, PerpMarket, TimeMs};
use serde::{Deserialize, Serialize};

/// One asset entry in a perp universe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerpAssetMeta {
    pub name: String,
    pub sz_decimals: u32,
    #[serde(default)]
    pub max_leverage: u32,
    #[serde(default)]
    pub is_delisted: bool,
}

/// Per-asset market context: funding, open interest, marks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AssetContext {
    pub funding: Decimal,
    pub open_interest: Decimal,
    pub mark_px: Decimal,
    #[serde(default)]
    pub oracle_px: Option<Decimal>,
    #[serde(default)]
    pub mid_px: Option<Decimal>,
}

/// A perp deployer ("dex"). The native first-party dex has an empty name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PerpDex {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub deployer: Option<String>,
    /// Spot token index of the margin token, when the dex is not
    /// USDC-margined.
    #[serde(default)]
    pub collateral_token: Option<u32>,
}

/// Spot token entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpotToken {
    pub name: String,
    pub index: u32,
}

/// Spot trading pair. `tokens` is `[base, quote]` by token index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpotPair {
    pub name: String,
    pub index: u32,
    pub tokens: [u32; 2],
}

/// Spot metadata: the token table and the pair universe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SpotMeta {
    pub tokens: Vec<SpotToken>,
    pub universe: Vec<SpotPair>,
}

impl SpotMeta {
    pub fn token_index(&self, name: &str) -> Option<u32> {
        self.tokens.iter().find(|t| t.name == name).map(|t| t.index)
    }

    pub fn token_name(&self, index: u32) -> Option<&str> {
        self.tokens
            .iter()
            .find(|t| t.index == index)
            .map(|t| t.name.as_str())
    }

    /// The pair trading `base_token` against `quote_token`.
    pub fn pair_for(&self, base_token: u32, quote_token: u32) -> Option<&SpotPair> {
        self.universe
            .iter()
            .find(|p| p.tokens == [base_token, quote_token])
    }
}

/// One spot balance row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpotBalance {
    pub coin: String,
    pub token: u32,
    pub total: Decimal,
    #[serde(default)]
    pub hold: Decimal,
}

impl SpotBalance {
    /// Balance not locked by resting orders.
    pub fn available(&self) -> Decimal {
        self.total - self.hold
    }
}

/// Spot account state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SpotClearinghouseState {
    pub balances: Vec<SpotBalance>,
}

/// Perp margin summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MarginSummary {
    pub account_value: Decimal,
    pub total_margin_used: Decimal,
}

/// One open perp position as the venue reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetPosition {
    pub coin: Coin,
    /// Signed size: positive long, negative short.
    pub szi: Decimal,
    #[serde(default)]
    pub entry_px: Option<Decimal>,
    #[serde(default)]
    pub unrealized_pnl: Decimal,
    #[serde(default)]
    pub leverage: u32,
    #[serde(default)]
    pub liquidation_px: Option<Decimal>,
    #[serde(default)]
    pub margin_used: Decimal,
}

/// Perp account state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ClearinghouseState {
    pub margin_summary: MarginSummary,
    pub withdrawable: Decimal,
    pub asset_positions: Vec<AssetPosition>,
}

/// A resting order as reported by the venue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenOrder {
    pub coin: Coin,
    pub is_buy: bool,
    pub limit_px: Decimal,
    pub sz: Decimal,
    pub oid: u64,
    pub timestamp: TimeMs,
}

/// A historical fill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VenueFill {
    pub coin: Coin,
    pub px: Decimal,
    pub sz: Decimal,
    pub is_buy: bool,
    pub time: TimeMs,
    #[serde(default)]
    pub fee: Decimal,
    #[serde(default)]
    pub closed_pnl: Decimal,
    #[serde(default)]
    pub oid: Option<u64>,
}

/// A funding-history sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundingEntry {
    pub coin: Coin,
    pub funding_rate: Decimal,
    #[serde(default)]
    pub premium: Decimal,
    pub time: TimeMs,
}

/// One market's funding view: the current rate alongside the history
/// samples fetched for the requested window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketFunding {
    pub market: PerpMarket,
    pub history: Vec<FundingEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta() -> SpotMeta {
        SpotMeta {
            tokens: vec![
                SpotToken {
                    name: "USDC".to_string(),
                    index: 0,
                },
                SpotToken {
                    name: "USDH".to_string(),
                    index: 7,
                },
            ],
            universe: vec![SpotPair {
                name: "USDH/USDC".to_string(),
                index: 107,
                tokens: [7, 0],
            }],
        }
    }

    #[test]
    fn test_spot_meta_lookups() {
        let m = meta();
        assert_eq!(m.token_index("USDH"), Some(7));
        assert_eq!(m.token_name(0), Some("USDC"));
        assert_eq!(m.pair_for(7, 0).map(|p| p.index), Some(107));
        assert_eq!(m.pair_for(0, 7), None);
    }

    #[test]
    fn test_spot_balance_available() {
        let b = SpotBalance {
            coin: "USDH".to_string(),
            token: 7,
            total: Decimal::from_i64(100),
            hold: Decimal::from_i64(30),
        };
        assert_eq!(b.available(), Decimal::from_i64(70));
    }

    #[test]
    fn test_asset_context_parses_wire_shape() {
        let ctx: AssetContext = serde_json::from_str(
            r#"{"funding":"0.00000625","openInterest":"120.5","markPx":"431.25","oraclePx":"431.20"}"#,
        )
        .unwrap();
        assert_eq!(ctx.funding.to_string(), "0.00000625");
        assert_eq!(ctx.oracle_px.unwrap().to_string(), "431.20");
        assert_eq!(ctx.mid_px, None);
    }
}
