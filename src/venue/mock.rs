//! Mock venue client for testing without network calls.
//!
//! Builder-style configuration plus an ordered call log, so tests can
//! assert both results and side-effect sequencing.

use super::{VenueClient, VenueError};
use crate::domain::{
    Address, AssetContext, BuilderInfo, ClearinghouseState, Coin, Decimal, FundingEntry, L2Book,
    OpenOrder, OrderRequest, OrderStatus, PerpAssetMeta, PerpDex, SpotClearinghouseState, SpotMeta,
    TimeMs, VenueFill,
};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

/// Build an [`L2Book`] from price/size string pairs. Test convenience.
pub fn book_from(coin: &str, bids: &[(&str, &str)], asks: &[(&str, &str)]) -> L2Book {
    let level = |(px, sz): &(&str, &str)| crate::domain::BookLevel {
        px: px.parse().expect("bad test price"),
        sz: sz.parse().expect("bad test size"),
        n: 1,
    };
    L2Book {
        coin: Coin::new(coin),
        time_ms: TimeMs::new(1_700_000_000_000),
        bids: bids.iter().map(level).collect(),
        asks: asks.iter().map(level).collect(),
    }
}

#[derive(Debug, Default)]
struct MockState {
    statuses: VecDeque<OrderStatus>,
    calls: Vec<String>,
    next_oid: u64,
}

/// Mock venue client backed by predefined data.
#[derive(Debug, Default)]
pub struct MockVenueClient {
    dexs: Vec<PerpDex>,
    metas: HashMap<String, (Vec<PerpAssetMeta>, Vec<AssetContext>)>,
    failing_meta_dexs: HashSet<String>,
    spot: SpotMeta,
    books: HashMap<String, L2Book>,
    failing_books: HashSet<String>,
    slow_books: HashMap<String, Duration>,
    perp_state: ClearinghouseState,
    spot_state: SpotClearinghouseState,
    open_orders: Vec<OpenOrder>,
    fills: Vec<VenueFill>,
    funding: Vec<FundingEntry>,
    max_builder_fee: u32,
    fail_approval: bool,
    fail_transfers: bool,
    state: Mutex<MockState>,
}

impl MockVenueClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_perp_dexs(mut self, dexs: Vec<PerpDex>) -> Self {
        self.dexs = dexs;
        self
    }

    /// Install a universe + contexts for one dex. Use `""` for the native dex.
    pub fn with_universe(
        mut self,
        dex: &str,
        universe: Vec<PerpAssetMeta>,
        ctxs: Vec<AssetContext>,
    ) -> Self {
        self.metas.insert(dex.to_string(), (universe, ctxs));
        self
    }

    pub fn with_failing_meta(mut self, dex: &str) -> Self {
        self.failing_meta_dexs.insert(dex.to_string());
        self
    }

    pub fn with_spot_meta(mut self, spot: SpotMeta) -> Self {
        self.spot = spot;
        self
    }

    pub fn with_book(mut self, book: L2Book) -> Self {
        self.books.insert(book.coin.as_str().to_string(), book);
        self
    }

    pub fn with_failing_book(mut self, coin: &str) -> Self {
        self.failing_books.insert(coin.to_string());
        self
    }

    /// Delay a book fetch; pair with a short aggregator timeout to force
    /// the timed-out path.
    pub fn with_slow_book(mut self, coin: &str, delay: Duration) -> Self {
        self.slow_books.insert(coin.to_string(), delay);
        self
    }

    pub fn with_perp_state(mut self, state: ClearinghouseState) -> Self {
        self.perp_state = state;
        self
    }

    pub fn with_spot_state(mut self, state: SpotClearinghouseState) -> Self {
        self.spot_state = state;
        self
    }

    pub fn with_open_orders(mut self, orders: Vec<OpenOrder>) -> Self {
        self.open_orders = orders;
        self
    }

    pub fn with_fills(mut self, fills: Vec<VenueFill>) -> Self {
        self.fills = fills;
        self
    }

    pub fn with_funding_history(mut self, entries: Vec<FundingEntry>) -> Self {
        self.funding = entries;
        self
    }

    /// Queue an explicit status for the next submitted order. When the
    /// queue is empty, submissions fill at their limit price.
    pub fn with_order_status(self, status: OrderStatus) -> Self {
        self.state
            .lock()
            .unwrap()
            .statuses
            .push_back(status);
        self
    }

    pub fn with_max_builder_fee(mut self, tenth_bps: u32) -> Self {
        self.max_builder_fee = tenth_bps;
        self
    }

    pub fn with_failing_approval(mut self) -> Self {
        self.fail_approval = true;
        self
    }

    pub fn with_failing_transfers(mut self) -> Self {
        self.fail_transfers = true;
        self
    }

    /// Ordered method-call log.
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    fn log(&self, entry: String) {
        self.state.lock().unwrap().calls.push(entry);
    }

    fn next_status(&self, order: &OrderRequest) -> OrderStatus {
        let mut state = self.state.lock().unwrap();
        if let Some(status) = state.statuses.pop_front() {
            return status;
        }
        state.next_oid += 1;
        OrderStatus::Filled {
            total_size: order.size,
            avg_price: order.price,
            order_id: state.next_oid,
        }
    }
}

#[async_trait]
impl VenueClient for MockVenueClient {
    async fn meta(&self) -> Result<Vec<PerpAssetMeta>, VenueError> {
        Ok(self
            .metas
            .get("")
            .map(|(universe, _)| universe.clone())
            .unwrap_or_default())
    }

    async fn meta_and_asset_ctxs(
        &self,
        dex: Option<&str>,
    ) -> Result<(Vec<PerpAssetMeta>, Vec<AssetContext>), VenueError> {
        let key = dex.unwrap_or("");
        if self.failing_meta_dexs.contains(key) {
            return Err(VenueError::Network(format!(
                "simulated meta failure for dex '{}'",
                key
            )));
        }
        self.metas
            .get(key)
            .cloned()
            .ok_or_else(|| VenueError::Network(format!("no universe for dex '{}'", key)))
    }

    async fn perp_dexs(&self) -> Result<Vec<PerpDex>, VenueError> {
        Ok(self.dexs.clone())
    }

    async fn spot_meta(&self) -> Result<SpotMeta, VenueError> {
        self.log("spotMeta".to_string());
        Ok(self.spot.clone())
    }

    async fn l2_book(&self, coin: &str, _n_sig_figs: Option<u32>) -> Result<L2Book, VenueError> {
        self.log(format!("l2Book {}", coin));
        if let Some(delay) = self.slow_books.get(coin) {
            tokio::time::sleep(*delay).await;
        }
        if self.failing_books.contains(coin) {
            return Err(VenueError::Network(format!(
                "simulated book failure for {}",
                coin
            )));
        }
        self.books
            .get(coin)
            .cloned()
            .ok_or_else(|| VenueError::Network(format!("no book for {}", coin)))
    }

    async fn clearinghouse_state(
        &self,
        _user: &Address,
    ) -> Result<ClearinghouseState, VenueError> {
        self.log("clearinghouseState".to_string());
        Ok(self.perp_state.clone())
    }

    async fn spot_clearinghouse_state(
        &self,
        _user: &Address,
    ) -> Result<SpotClearinghouseState, VenueError> {
        self.log("spotClearinghouseState".to_string());
        Ok(self.spot_state.clone())
    }

    async fn open_orders(&self, _user: &Address) -> Result<Vec<OpenOrder>, VenueError> {
        Ok(self.open_orders.clone())
    }

    async fn user_fills(&self, _user: &Address) -> Result<Vec<VenueFill>, VenueError> {
        Ok(self.fills.clone())
    }

    async fn funding_history(
        &self,
        coin: &str,
        start_ms: i64,
        end_ms: Option<i64>,
    ) -> Result<Vec<FundingEntry>, VenueError> {
        Ok(self
            .funding
            .iter()
            .filter(|f| {
                f.coin.as_str() == coin
                    && f.time.as_i64() >= start_ms
                    && end_ms.map_or(true, |end| f.time.as_i64() <= end)
            })
            .cloned()
            .collect())
    }

    async fn place_order(
        &self,
        order: &OrderRequest,
        builder: Option<&BuilderInfo>,
    ) -> Result<OrderStatus, VenueError> {
        self.log(format!(
            "placeOrder asset={} buy={} px={} sz={} builderFee={}",
            order.asset_index,
            order.is_buy,
            order.price,
            order.size,
            builder.map(|b| b.fee_in_tenth_bps as i64).unwrap_or(-1),
        ));
        Ok(self.next_status(order))
    }

    async fn batch_orders(
        &self,
        orders: &[OrderRequest],
        builder: Option<&BuilderInfo>,
    ) -> Result<Vec<OrderStatus>, VenueError> {
        self.log(format!(
            "batchOrders n={} builderFee={}",
            orders.len(),
            builder.map(|b| b.fee_in_tenth_bps as i64).unwrap_or(-1),
        ));
        Ok(orders.iter().map(|o| self.next_status(o)).collect())
    }

    async fn cancel_order(&self, asset_index: u32, order_id: u64) -> Result<(), VenueError> {
        self.log(format!("cancelOrder asset={} oid={}", asset_index, order_id));
        Ok(())
    }

    async fn approve_builder_fee(
        &self,
        max_fee_rate_pct: &str,
        _builder: &Address,
    ) -> Result<(), VenueError> {
        self.log(format!("approveBuilderFee {}", max_fee_rate_pct));
        if self.fail_approval {
            return Err(VenueError::Rejected("simulated approval failure".to_string()));
        }
        Ok(())
    }

    async fn max_builder_fee(
        &self,
        _user: &Address,
        _builder: &Address,
    ) -> Result<u32, VenueError> {
        self.log("maxBuilderFee".to_string());
        Ok(self.max_builder_fee)
    }

    async fn set_leverage(
        &self,
        asset_index: u32,
        leverage: u32,
        is_cross: bool,
    ) -> Result<(), VenueError> {
        self.log(format!(
            "updateLeverage asset={} leverage={} cross={}",
            asset_index, leverage, is_cross
        ));
        Ok(())
    }

    async fn usd_class_transfer(&self, amount: Decimal, to_perp: bool) -> Result<(), VenueError> {
        self.log(format!("usdClassTransfer {} toPerp={}", amount, to_perp));
        if self.fail_transfers {
            return Err(VenueError::Rejected("simulated transfer failure".to_string()));
        }
        Ok(())
    }

    async fn set_dex_abstraction(&self, enabled: bool) -> Result<(), VenueError> {
        self.log(format!("setDexAbstraction {}", enabled));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_default_submission_fills_at_limit() {
        let mock = MockVenueClient::new();
        let order = OrderRequest {
            asset_index: 3,
            is_buy: true,
            price: "431.50".parse().unwrap(),
            size: "2".parse().unwrap(),
            reduce_only: false,
            order_type: crate::domain::OrderType::ioc(),
            client_order_id: None,
        };
        let status = mock.place_order(&order, None).await.unwrap();
        match status {
            OrderStatus::Filled {
                total_size,
                avg_price,
                ..
            } => {
                assert_eq!(total_size, order.size);
                assert_eq!(avg_price, order.price);
            }
            other => panic!("expected fill, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_call_log_records_order() {
        let mock = MockVenueClient::new().with_book(book_from(
            "TSLA",
            &[("431.00", "2")],
            &[("431.50", "5")],
        ));
        mock.l2_book("TSLA", None).await.unwrap();
        mock.set_dex_abstraction(true).await.unwrap();
        assert_eq!(mock.calls(), vec!["l2Book TSLA", "setDexAbstraction true"]);
    }

    #[tokio::test]
    async fn test_failing_book_errors() {
        let mock = MockVenueClient::new().with_failing_book("abc:TSLA");
        assert!(mock.l2_book("abc:TSLA", None).await.is_err());
    }
}
