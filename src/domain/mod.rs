//! Domain types for the routing layer.
//!
//! This module provides:
//! - Lossless numeric handling via the Decimal wrapper
//! - Domain primitives: TimeMs, Address, Coin, Side
//! - Markets, books, and the merged multi-market view
//! - Orders, quotes, plans, and receipts with canonical JSON serialization

pub mod book;
pub mod decimal;
pub mod market;
pub mod meta;
pub mod order;
pub mod position;
pub mod primitives;
pub mod quote;

pub use book::{AggregatedBook, AggregatedLevel, BookLevel, L2Book, LevelSource, MarketBook};
pub use decimal::Decimal;
pub use market::{
    extract_base_asset, perp_asset_index, spot_asset_index, MarketGroup, PerpMarket,
    NATIVE_COLLATERAL, NATIVE_DEX,
};
pub use meta::{
    AssetContext, AssetPosition, ClearinghouseState, FundingEntry, MarginSummary, MarketFunding,
    OpenOrder, PerpAssetMeta, PerpDex, SpotBalance, SpotClearinghouseState, SpotMeta, SpotPair,
    SpotToken, VenueFill,
};
pub use order::{BuilderInfo, OrderRequest, OrderStatus, OrderType, Tif, TpSl};
pub use position::{LogicalPosition, ManagedBy};
pub use primitives::{Address, AddressParseError, Coin, Side, TimeMs};
pub use quote::{
    CollateralPlan, CollateralReceipt, CollateralRequirement, ExecutedSwap, ExecutionPlan,
    ExecutionReceipt, MarketScore, Quote, SplitAllocation, SplitExecutionPlan,
    SplitExecutionReceipt, SplitQuote,
};
