//! Orderbook snapshots: per-market books and the multi-market merged view.

use super::{Coin, Decimal, PerpMarket, Side, TimeMs};
use serde::{Deserialize, Serialize};

/// One price level of a single market's book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookLevel {
    pub px: Decimal,
    pub sz: Decimal,
    /// Number of resting orders at this level.
    #[serde(default)]
    pub n: u32,
}

/// Snapshot of one market's book. Bids descending, asks ascending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct L2Book {
    pub coin: Coin,
    pub time_ms: TimeMs,
    pub bids: Vec<BookLevel>,
    pub asks: Vec<BookLevel>,
}

impl L2Book {
    pub fn best_bid(&self) -> Option<&BookLevel> {
        self.bids.first()
    }

    pub fn best_ask(&self) -> Option<&BookLevel> {
        self.asks.first()
    }

    /// Levels consumed by an order on `side`: asks for buys, bids for sells.
    pub fn active_levels(&self, side: Side) -> &[BookLevel] {
        match side {
            Side::Buy => &self.asks,
            Side::Sell => &self.bids,
        }
    }

    /// Total quoted size on the active side for `side`.
    pub fn depth(&self, side: Side) -> Decimal {
        self.active_levels(side).iter().map(|l| l.sz).sum()
    }
}

/// Per-source contribution to a merged level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelSource {
    pub coin: Coin,
    pub size: Decimal,
}

/// One merged price level. `sum(sources.size) == total_size`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedLevel {
    pub px: Decimal,
    pub total_size: Decimal,
    pub sources: Vec<LevelSource>,
}

/// A market's own snapshot kept alongside the merged view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketBook {
    pub market: PerpMarket,
    pub book: L2Book,
}

/// Merged multi-market book for one base asset.
///
/// Bids descend, asks ascend. Markets whose fetch failed appear in
/// `failed_coins` and contribute nothing to the merged sides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedBook {
    pub base_asset: String,
    pub bids: Vec<AggregatedLevel>,
    pub asks: Vec<AggregatedLevel>,
    pub per_market_books: Vec<MarketBook>,
    pub failed_coins: Vec<Coin>,
    pub timestamp_ms: TimeMs,
}

impl AggregatedBook {
    pub fn empty(base_asset: impl Into<String>) -> Self {
        AggregatedBook {
            base_asset: base_asset.into(),
            bids: Vec::new(),
            asks: Vec::new(),
            per_market_books: Vec::new(),
            failed_coins: Vec::new(),
            timestamp_ms: TimeMs::now(),
        }
    }

    pub fn best_bid_px(&self) -> Option<Decimal> {
        self.bids.first().map(|l| l.px)
    }

    pub fn best_ask_px(&self) -> Option<Decimal> {
        self.asks.first().map(|l| l.px)
    }

    /// Merged levels consumed by an order on `side`.
    pub fn active_levels(&self, side: Side) -> &[AggregatedLevel] {
        match side {
            Side::Buy => &self.asks,
            Side::Sell => &self.bids,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }
}
