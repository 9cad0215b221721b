//! Venue client abstraction: typed reads and writes against the exchange.
//!
//! The rest of the crate consumes the venue exclusively through
//! [`VenueClient`]; transport, signing, and wire encoding stay behind it.

use crate::domain::{
    Address, AssetContext, BuilderInfo, ClearinghouseState, Decimal, FundingEntry, L2Book,
    OpenOrder, OrderRequest, OrderStatus, PerpAssetMeta, PerpDex, SpotClearinghouseState, SpotMeta,
    VenueFill,
};
use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

pub mod hyperliquid;
pub mod mock;

pub use hyperliquid::HttpVenueClient;
pub use mock::MockVenueClient;

/// Transport-level failure talking to the venue.
#[derive(Debug, Clone, Error)]
pub enum VenueError {
    #[error("network error: {0}")]
    Network(String),

    #[error("http {status}: {message}")]
    Http { status: u16, message: String },

    #[error("parse error: {0}")]
    Parse(String),

    #[error("rate limited")]
    RateLimited,

    /// The venue accepted the request but reported a failure.
    #[error("venue rejected request: {0}")]
    Rejected(String),

    /// Write attempted on a client constructed without a signing key.
    #[error("read-only client: {0}")]
    ReadOnly(String),
}

/// Typed venue surface consumed by the core.
///
/// Implementations must be safe under concurrent read calls; writes are
/// serialized internally.
#[async_trait]
pub trait VenueClient: Send + Sync + fmt::Debug {
    /// Native perp universe.
    async fn meta(&self) -> Result<Vec<PerpAssetMeta>, VenueError>;

    /// Universe plus per-asset contexts for one dex (`None` = native).
    async fn meta_and_asset_ctxs(
        &self,
        dex: Option<&str>,
    ) -> Result<(Vec<PerpAssetMeta>, Vec<AssetContext>), VenueError>;

    /// Deployer list. Index 0 is the native first-party dex.
    async fn perp_dexs(&self) -> Result<Vec<PerpDex>, VenueError>;

    /// Spot token table and pair universe.
    async fn spot_meta(&self) -> Result<SpotMeta, VenueError>;

    /// Orderbook snapshot for one coin.
    async fn l2_book(&self, coin: &str, n_sig_figs: Option<u32>) -> Result<L2Book, VenueError>;

    async fn clearinghouse_state(&self, user: &Address)
        -> Result<ClearinghouseState, VenueError>;

    async fn spot_clearinghouse_state(
        &self,
        user: &Address,
    ) -> Result<SpotClearinghouseState, VenueError>;

    async fn open_orders(&self, user: &Address) -> Result<Vec<OpenOrder>, VenueError>;

    async fn user_fills(&self, user: &Address) -> Result<Vec<VenueFill>, VenueError>;

    async fn funding_history(
        &self,
        coin: &str,
        start_ms: i64,
        end_ms: Option<i64>,
    ) -> Result<Vec<FundingEntry>, VenueError>;

    async fn place_order(
        &self,
        order: &OrderRequest,
        builder: Option<&BuilderInfo>,
    ) -> Result<OrderStatus, VenueError>;

    /// Submit several orders as one logical group.
    async fn batch_orders(
        &self,
        orders: &[OrderRequest],
        builder: Option<&BuilderInfo>,
    ) -> Result<Vec<OrderStatus>, VenueError>;

    async fn cancel_order(&self, asset_index: u32, order_id: u64) -> Result<(), VenueError>;

    /// Authorize a builder fee. `max_fee_rate_pct` is a percent string,
    /// e.g. `"0.05%"`.
    async fn approve_builder_fee(
        &self,
        max_fee_rate_pct: &str,
        builder: &Address,
    ) -> Result<(), VenueError>;

    /// Currently authorized builder fee, in tenth-of-a-bps wire units.
    async fn max_builder_fee(&self, user: &Address, builder: &Address)
        -> Result<u32, VenueError>;

    async fn set_leverage(
        &self,
        asset_index: u32,
        leverage: u32,
        is_cross: bool,
    ) -> Result<(), VenueError>;

    /// Move USDC between the perp and spot balances.
    async fn usd_class_transfer(&self, amount: Decimal, to_perp: bool) -> Result<(), VenueError>;

    /// Toggle collateral abstraction for the account.
    async fn set_dex_abstraction(&self, enabled: bool) -> Result<(), VenueError>;
}
