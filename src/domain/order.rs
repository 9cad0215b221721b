//! Order requests, tagged order types, builder attribution, and the
//! status variants the venue returns for submissions.

use super::{Address, Decimal};
use serde::{Deserialize, Serialize};

/// Time-in-force for limit orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tif {
    /// Add-liquidity-only (post only).
    Alo,
    /// Immediate-or-cancel.
    Ioc,
    /// Good-till-cancel.
    Gtc,
}

/// Take-profit or stop-loss marker for trigger orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TpSl {
    Tp,
    Sl,
}

/// Tagged order type, mirroring the venue wire variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OrderType {
    Limit {
        tif: Tif,
    },
    #[serde(rename_all = "camelCase")]
    Trigger {
        trigger_px: Decimal,
        is_market: bool,
        tp_or_sl: TpSl,
    },
}

impl OrderType {
    /// Immediate-or-cancel limit, the only type the router emits.
    pub fn ioc() -> Self {
        OrderType::Limit { tif: Tif::Ioc }
    }
}

/// A single order submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    pub asset_index: u32,
    pub is_buy: bool,
    pub price: Decimal,
    pub size: Decimal,
    pub reduce_only: bool,
    pub order_type: OrderType,
    #[serde(default)]
    pub client_order_id: Option<String>,
}

/// Builder attribution attached to submissions. The fee travels in
/// tenth-of-a-basis-point wire units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuilderInfo {
    pub address: Address,
    pub fee_in_tenth_bps: u32,
}

/// Status the venue reports per submitted order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OrderStatus {
    #[serde(rename_all = "camelCase")]
    Filled {
        total_size: Decimal,
        avg_price: Decimal,
        order_id: u64,
    },
    #[serde(rename_all = "camelCase")]
    Resting {
        order_id: u64,
        client_order_id: Option<String>,
    },
    Error(String),
    WaitingForFill,
    WaitingForTrigger,
}

impl OrderStatus {
    pub fn is_error(&self) -> bool {
        matches!(self, OrderStatus::Error(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ioc_shorthand() {
        assert_eq!(OrderType::ioc(), OrderType::Limit { tif: Tif::Ioc });
    }

    #[test]
    fn test_order_type_tagged_serialization() {
        let limit = OrderType::ioc();
        assert_eq!(
            serde_json::to_string(&limit).unwrap(),
            r#"{"limit":{"tif":"Ioc"}}"#
        );

        let trigger = OrderType::Trigger {
            trigger_px: "430.00".parse().unwrap(),
            is_market: true,
            tp_or_sl: TpSl::Sl,
        };
        let json = serde_json::to_value(&trigger).unwrap();
        assert_eq!(json["trigger"]["triggerPx"], "430.00");
        assert_eq!(json["trigger"]["tpOrSl"], "sl");
    }

    #[test]
    fn test_status_error_predicate() {
        assert!(OrderStatus::Error("bad tick".to_string()).is_error());
        assert!(!OrderStatus::WaitingForFill.is_error());
    }
}
