//! Top-level error taxonomy for routing, collateral, and execution.

use crate::domain::{Coin, Decimal};
use crate::venue::VenueError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RouteError {
    /// API used before discovery ran.
    #[error("not connected: run discovery before querying markets")]
    NotConnected,

    /// Trading operation attempted without credentials.
    #[error("no wallet configured for trading operations")]
    NoWallet,

    /// Asset unknown to the registry.
    #[error("no markets found for {0}")]
    NoMarkets(String),

    /// Every relevant book fetch failed.
    #[error("market data unavailable for {base_asset} ({} failed fetches)", .failed_coins.len())]
    MarketDataUnavailable {
        base_asset: String,
        failed_coins: Vec<Coin>,
    },

    /// Aggregate depth below the requested size.
    #[error("insufficient liquidity for {base_asset}: requested {requested_size}")]
    InsufficientLiquidity {
        base_asset: String,
        requested_size: Decimal,
    },

    /// The venue rejected an order; `raw` retains the wire status.
    #[error("execution failed: {message}")]
    Execution {
        message: String,
        raw: Option<String>,
    },

    /// Builder fee out of range, malformed key, or similar.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Collateral preparation failed.
    #[error("collateral failure: {0}")]
    Collateral(String),

    /// Transport-level venue failure.
    #[error("venue error: {0}")]
    Venue(#[from] VenueError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_carries_context() {
        let err = RouteError::MarketDataUnavailable {
            base_asset: "TSLA".to_string(),
            failed_coins: vec![Coin::new("xyz:TSLA0"), Coin::new("abc:TSLA")],
        };
        assert_eq!(
            err.to_string(),
            "market data unavailable for TSLA (2 failed fetches)"
        );

        let err = RouteError::InsufficientLiquidity {
            base_asset: "TSLA".to_string(),
            requested_size: Decimal::from_i64(200),
        };
        assert!(err.to_string().contains("requested 200"));
    }
}
