//! Facade wiring the registry, aggregator, router, collateral manager,
//! executor, and position manager behind one connected client.

use crate::aggregator::BookAggregator;
use crate::collateral::CollateralManager;
use crate::config::Config;
use crate::domain::{
    AggregatedBook, Address, ClearinghouseState, Decimal, ExecutionReceipt, LogicalPosition,
    MarketFunding, MarketGroup, PerpMarket, Quote, Side, SpotClearinghouseState,
    SplitExecutionReceipt, SplitQuote, NATIVE_COLLATERAL,
};
use crate::error::RouteError;
use crate::executor::Executor;
use crate::positions::PositionManager;
use crate::registry::MarketRegistry;
use crate::router::Router;
use crate::venue::{HttpVenueClient, VenueClient};
use futures::future::join_all;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::warn;

#[derive(Debug)]
pub struct PrimeBroker {
    config: Config,
    venue: Arc<dyn VenueClient>,
    registry: Arc<MarketRegistry>,
    aggregator: Arc<BookAggregator>,
    router: Router,
    collateral: Arc<CollateralManager>,
    executor: Executor,
    positions: PositionManager,
}

impl PrimeBroker {
    /// Build an HTTP-backed broker and run discovery.
    pub async fn connect(config: Config) -> Result<Self, RouteError> {
        let config = config.validated()?;
        let venue: Arc<dyn VenueClient> = match &config.private_key {
            Some(key) => Arc::new(HttpVenueClient::with_wallet(config.api_url(), key)?),
            None => Arc::new(HttpVenueClient::new(config.api_url())),
        };
        let broker = Self::with_client(config, venue)?;
        broker.refresh().await?;
        Ok(broker)
    }

    /// Wire the components around an existing venue client without running
    /// discovery. Data operations fail `NotConnected` until `refresh()`.
    pub fn with_client(config: Config, venue: Arc<dyn VenueClient>) -> Result<Self, RouteError> {
        let config = config.validated()?;
        let registry = Arc::new(MarketRegistry::new(Arc::clone(&venue)));
        let aggregator = Arc::new(BookAggregator::new(
            Arc::clone(&venue),
            Arc::clone(&registry),
        ));
        let collateral = Arc::new(CollateralManager::new(Arc::clone(&venue)));
        let router = Router::new(
            Arc::clone(&registry),
            Arc::clone(&aggregator),
            Arc::clone(&collateral),
        );
        let executor = Executor::new(Arc::clone(&venue), config.resolved_builder());
        let positions = PositionManager::new(Arc::clone(&venue), Arc::clone(&registry));
        Ok(PrimeBroker {
            config,
            venue,
            registry,
            aggregator,
            router,
            collateral,
            executor,
            positions,
        })
    }

    /// Re-run market discovery. Idempotent.
    pub async fn refresh(&self) -> Result<(), RouteError> {
        self.registry.discover().await
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &Arc<MarketRegistry> {
        &self.registry
    }

    fn ensure_connected(&self) -> Result<(), RouteError> {
        if self.registry.is_ready() {
            Ok(())
        } else {
            Err(RouteError::NotConnected)
        }
    }

    fn wallet_address(&self) -> Result<Address, RouteError> {
        self.config
            .wallet_address
            .clone()
            .ok_or(RouteError::NoWallet)
    }

    fn require_signer(&self) -> Result<Address, RouteError> {
        if self.config.private_key.is_none() {
            return Err(RouteError::NoWallet);
        }
        self.wallet_address()
    }

    fn validate_size(size: Decimal) -> Result<(), RouteError> {
        if size.is_positive() {
            Ok(())
        } else {
            Err(RouteError::InvalidConfig(format!(
                "order size must be positive, got {}",
                size
            )))
        }
    }

    /// Tokens usable as collateral without swapping: the account-native
    /// token plus every spot token with a positive balance. Degrades to
    /// the native token alone when balances cannot be read.
    pub async fn user_collateral(&self) -> HashSet<String> {
        let mut tokens = HashSet::from([NATIVE_COLLATERAL.to_string()]);
        if let Some(address) = &self.config.wallet_address {
            match self.venue.spot_clearinghouse_state(address).await {
                Ok(state) => {
                    for balance in state.balances {
                        if balance.total.is_positive() {
                            tokens.insert(balance.coin);
                        }
                    }
                }
                Err(e) => {
                    warn!(error = %e, "spot balances unavailable; assuming native collateral only")
                }
            }
        }
        tokens
    }

    /// Single-market quote at the configured slippage.
    pub async fn quote(
        &self,
        base_asset: &str,
        side: Side,
        size: Decimal,
    ) -> Result<Quote, RouteError> {
        self.ensure_connected()?;
        Self::validate_size(size)?;
        let collateral = self.user_collateral().await;
        self.router
            .quote(
                base_asset,
                side,
                size,
                &collateral,
                self.config.default_slippage,
            )
            .await
    }

    /// Split quote across all markets for the asset.
    pub async fn quote_split(
        &self,
        base_asset: &str,
        side: Side,
        size: Decimal,
    ) -> Result<SplitQuote, RouteError> {
        self.ensure_connected()?;
        Self::validate_size(size)?;
        self.router
            .quote_split(base_asset, side, size, self.config.default_slippage)
            .await
    }

    /// Submit a single-market quote's plan.
    pub async fn execute(&self, quote: &Quote) -> Result<ExecutionReceipt, RouteError> {
        let user = self.require_signer()?;
        Ok(self.executor.execute(&quote.plan, &user).await)
    }

    /// Prepare collateral and submit a split quote's legs.
    pub async fn execute_split(
        &self,
        quote: &SplitQuote,
    ) -> Result<SplitExecutionReceipt, RouteError> {
        let user = self.require_signer()?;
        Ok(self
            .executor
            .execute_split(&quote.plan, &self.collateral, &user)
            .await)
    }

    /// Quote-split then execute in one step.
    pub async fn place(
        &self,
        base_asset: &str,
        side: Side,
        size: Decimal,
    ) -> Result<(SplitQuote, SplitExecutionReceipt), RouteError> {
        let quote = self.quote_split(base_asset, side, size).await?;
        let receipt = self.execute_split(&quote).await?;
        Ok((quote, receipt))
    }

    /// Markets trading `base_asset`.
    pub fn markets(&self, base_asset: &str) -> Result<Vec<PerpMarket>, RouteError> {
        self.ensure_connected()?;
        let markets = self.registry.get_markets(base_asset);
        if markets.is_empty() {
            return Err(RouteError::NoMarkets(base_asset.to_uppercase()));
        }
        Ok(markets)
    }

    pub fn groups_with_alternatives(&self) -> Result<Vec<MarketGroup>, RouteError> {
        self.ensure_connected()?;
        Ok(self.registry.get_groups_with_alternatives())
    }

    /// Merged book for `base_asset`.
    pub async fn book(&self, base_asset: &str) -> Result<AggregatedBook, RouteError> {
        let markets = self.markets(base_asset)?;
        let book = self.aggregator.aggregate(base_asset).await;
        if book.per_market_books.is_empty() {
            return Err(RouteError::MarketDataUnavailable {
                base_asset: base_asset.to_uppercase(),
                failed_coins: book.failed_coins,
            });
        }
        debug_assert!(book.per_market_books.len() <= markets.len());
        Ok(book)
    }

    /// Funding history for every market trading `base_asset`, fetched
    /// concurrently over the requested window. A market whose history
    /// fetch fails reports an empty history rather than failing the call.
    pub async fn funding(
        &self,
        base_asset: &str,
        start_ms: i64,
        end_ms: Option<i64>,
    ) -> Result<Vec<MarketFunding>, RouteError> {
        let markets = self.markets(base_asset)?;
        let fetches = markets.into_iter().map(|market| {
            let venue = Arc::clone(&self.venue);
            async move {
                let history = match venue
                    .funding_history(market.coin.as_str(), start_ms, end_ms)
                    .await
                {
                    Ok(history) => history,
                    Err(e) => {
                        warn!(coin = %market.coin, error = %e, "funding history unavailable");
                        Vec::new()
                    }
                };
                MarketFunding { market, history }
            }
        });
        Ok(join_all(fetches).await)
    }

    pub async fn positions(&self) -> Result<Vec<LogicalPosition>, RouteError> {
        self.ensure_connected()?;
        let user = self.wallet_address()?;
        self.positions.positions(&user).await
    }

    pub async fn grouped_positions(
        &self,
    ) -> Result<HashMap<String, Vec<LogicalPosition>>, RouteError> {
        self.ensure_connected()?;
        let user = self.wallet_address()?;
        self.positions.grouped_positions(&user).await
    }

    /// Perp and spot account state.
    pub async fn balances(
        &self,
    ) -> Result<(ClearinghouseState, SpotClearinghouseState), RouteError> {
        let user = self.wallet_address()?;
        let perp = self.venue.clearinghouse_state(&user).await?;
        let spot = self.venue.spot_clearinghouse_state(&user).await?;
        Ok((perp, spot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::venue::MockVenueClient;

    fn broker() -> PrimeBroker {
        PrimeBroker::with_client(Config::default(), Arc::new(MockVenueClient::new())).unwrap()
    }

    #[tokio::test]
    async fn test_not_connected_before_discovery() {
        let broker = broker();
        match broker.quote("TSLA", Side::Buy, Decimal::from_i64(1)).await {
            Err(RouteError::NotConnected) => {}
            other => panic!("expected NotConnected, got {:?}", other.map(|_| ())),
        }
        assert!(matches!(
            broker.markets("TSLA"),
            Err(RouteError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_no_wallet_guards_trading_ops() {
        let broker = broker();
        broker.refresh().await.unwrap();

        assert!(matches!(broker.positions().await, Err(RouteError::NoWallet)));
        assert!(matches!(broker.balances().await, Err(RouteError::NoWallet)));
    }

    #[tokio::test]
    async fn test_zero_size_rejected() {
        let broker = broker();
        broker.refresh().await.unwrap();
        assert!(matches!(
            broker.quote("TSLA", Side::Buy, Decimal::zero()).await,
            Err(RouteError::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn test_collateral_defaults_to_native_without_wallet() {
        let broker = broker();
        let tokens = broker.user_collateral().await;
        assert_eq!(tokens, HashSet::from([NATIVE_COLLATERAL.to_string()]));
    }
}
