//! Per-asset book aggregation: parallel fetch with partial-failure
//! tolerance, then a provenance-preserving price-level merge.

use crate::domain::{
    AggregatedBook, AggregatedLevel, BookLevel, Coin, Decimal, L2Book, LevelSource, MarketBook,
    PerpMarket, Side, TimeMs,
};
use crate::registry::MarketRegistry;
use crate::venue::VenueClient;
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::warn;

/// Per-book fetch timeout; one slow venue must not stall routing.
pub const BOOK_FETCH_TIMEOUT: Duration = Duration::from_millis(2500);

#[derive(Debug)]
pub struct BookAggregator {
    venue: Arc<dyn VenueClient>,
    registry: Arc<MarketRegistry>,
    fetch_timeout: Duration,
}

impl BookAggregator {
    pub fn new(venue: Arc<dyn VenueClient>, registry: Arc<MarketRegistry>) -> Self {
        BookAggregator {
            venue,
            registry,
            fetch_timeout: BOOK_FETCH_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, fetch_timeout: Duration) -> Self {
        self.fetch_timeout = fetch_timeout;
        self
    }

    /// Full merged book for `base_asset`. An unknown asset yields an empty
    /// book; callers enforce "no data" as an error where it matters.
    pub async fn aggregate(&self, base_asset: &str) -> AggregatedBook {
        let markets = self.registry.get_markets(base_asset);
        if markets.is_empty() {
            return AggregatedBook::empty(base_asset.to_uppercase());
        }

        let (books, failed_coins) = self.fetch_books(&markets).await;
        let bids = merge_side(&books, |book| &book.bids, false);
        let asks = merge_side(&books, |book| &book.asks, true);

        AggregatedBook {
            base_asset: base_asset.to_uppercase(),
            bids,
            asks,
            per_market_books: books,
            failed_coins,
            timestamp_ms: TimeMs::now(),
        }
    }

    /// Merged view holding at least the depth needed for `size` on the
    /// active side. The passive side is returned in full.
    pub async fn aggregate_for_order(
        &self,
        base_asset: &str,
        side: Side,
        size: Decimal,
    ) -> AggregatedBook {
        let mut book = self.aggregate(base_asset).await;
        match side {
            Side::Buy => book.asks = truncate_to_depth(std::mem::take(&mut book.asks), size),
            Side::Sell => book.bids = truncate_to_depth(std::mem::take(&mut book.bids), size),
        }
        book
    }

    async fn fetch_books(&self, markets: &[PerpMarket]) -> (Vec<MarketBook>, Vec<Coin>) {
        let fetches = markets.iter().map(|market| {
            let venue = Arc::clone(&self.venue);
            let market = market.clone();
            let per_fetch = self.fetch_timeout;
            async move {
                let result = timeout(per_fetch, venue.l2_book(market.coin.as_str(), None)).await;
                (market, result)
            }
        });

        let mut books = Vec::new();
        let mut failed_coins = Vec::new();
        for (market, result) in join_all(fetches).await {
            match result {
                Ok(Ok(book)) => books.push(MarketBook { market, book }),
                Ok(Err(e)) => {
                    warn!(coin = %market.coin, error = %e, "book fetch failed");
                    failed_coins.push(market.coin);
                }
                Err(_) => {
                    warn!(coin = %market.coin, "book fetch timed out");
                    failed_coins.push(market.coin);
                }
            }
        }
        (books, failed_coins)
    }
}

/// Merge one side across books. Levels are keyed by the original decimal
/// string of the price, never by float equality; source order within a
/// level follows input book order.
fn merge_side<F>(books: &[MarketBook], select: F, ascending: bool) -> Vec<AggregatedLevel>
where
    F: Fn(&L2Book) -> &Vec<BookLevel>,
{
    let mut order: Vec<String> = Vec::new();
    let mut merged: HashMap<String, AggregatedLevel> = HashMap::new();

    for market_book in books {
        for level in select(&market_book.book) {
            let key = level.px.to_string();
            let entry = merged.entry(key.clone()).or_insert_with(|| {
                order.push(key);
                AggregatedLevel {
                    px: level.px,
                    total_size: Decimal::zero(),
                    sources: Vec::new(),
                }
            });
            entry.total_size += level.sz;
            entry.sources.push(LevelSource {
                coin: market_book.market.coin.clone(),
                size: level.sz,
            });
        }
    }

    let mut levels: Vec<AggregatedLevel> = order
        .into_iter()
        .filter_map(|key| merged.remove(&key))
        .collect();
    if ascending {
        levels.sort_by(|a, b| a.px.cmp(&b.px));
    } else {
        levels.sort_by(|a, b| b.px.cmp(&a.px));
    }
    levels
}

/// Keep the smallest prefix whose cumulative size covers `size`; keep
/// everything when depth is insufficient.
fn truncate_to_depth(levels: Vec<AggregatedLevel>, size: Decimal) -> Vec<AggregatedLevel> {
    let mut cumulative = Decimal::zero();
    let mut keep = levels.len();
    for (i, level) in levels.iter().enumerate() {
        cumulative += level.total_size;
        if cumulative >= size {
            keep = i + 1;
            break;
        }
    }
    levels.into_iter().take(keep).collect()
}
