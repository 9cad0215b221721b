//! Market discovery and indexing across deployers.
//!
//! `discover()` rebuilds the whole per-asset index and swaps it in
//! atomically; readers always see a consistent generation.

use crate::domain::{
    extract_base_asset, perp_asset_index, Coin, MarketGroup, PerpDex, PerpMarket,
    NATIVE_COLLATERAL, NATIVE_DEX,
};
use crate::error::RouteError;
use crate::venue::VenueClient;
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use tracing::{info, warn};

#[derive(Debug)]
pub struct MarketRegistry {
    venue: Arc<dyn VenueClient>,
    index: RwLock<HashMap<String, MarketGroup>>,
    ready: AtomicBool,
}

impl MarketRegistry {
    pub fn new(venue: Arc<dyn VenueClient>) -> Self {
        MarketRegistry {
            venue,
            index: RwLock::new(HashMap::new()),
            ready: AtomicBool::new(false),
        }
    }

    /// True once discovery has populated the index.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    /// Build the full per-asset index.
    ///
    /// Top-level spot/deployer fetch failures propagate. Per-deployer
    /// context failures only skip that deployer. Idempotent: repeated runs
    /// against unchanged venue state yield the same index.
    pub async fn discover(&self) -> Result<(), RouteError> {
        let spot = self.venue.spot_meta().await?;
        let token_names: HashMap<u32, String> = spot
            .tokens
            .iter()
            .map(|t| (t.index, t.name.clone()))
            .collect();

        let dexs = self.venue.perp_dexs().await?;
        let fetches = dexs.iter().enumerate().map(|(d, dex)| {
            let venue = Arc::clone(&self.venue);
            let name = dex.name.clone();
            async move {
                let arg = if d == 0 { None } else { Some(name.as_str()) };
                (d, venue.meta_and_asset_ctxs(arg).await)
            }
        });
        let results = join_all(fetches).await;

        let mut index: HashMap<String, MarketGroup> = HashMap::new();
        for (d, result) in results {
            let dex = &dexs[d];
            let is_native = d == 0;
            let dex_label = if is_native {
                NATIVE_DEX.to_string()
            } else {
                dex.name.clone()
            };

            let (universe, ctxs) = match result {
                Ok(pair) => pair,
                Err(e) => {
                    warn!(dex = %dex_label, error = %e, "skipping deployer: context fetch failed");
                    continue;
                }
            };

            let collateral = resolve_collateral(dex, &token_names);
            for (local, asset) in universe.iter().enumerate() {
                if asset.is_delisted {
                    continue;
                }
                let Some(ctx) = ctxs.get(local) else {
                    warn!(coin = %asset.name, "skipping asset: context missing");
                    continue;
                };

                let base_asset = extract_base_asset(&asset.name, is_native);
                let market = PerpMarket {
                    base_asset: base_asset.clone(),
                    coin: Coin::new(asset.name.clone()),
                    asset_index: perp_asset_index(d, local),
                    dex_name: dex_label.clone(),
                    collateral: collateral.clone(),
                    is_native,
                    funding: ctx.funding,
                    open_interest: ctx.open_interest,
                    mark_price: ctx.mark_px,
                    oracle_price: ctx.oracle_px,
                };
                index
                    .entry(base_asset.clone())
                    .or_insert_with(|| MarketGroup::new(base_asset, Vec::new()))
                    .markets
                    .push(market);
            }
        }

        for group in index.values_mut() {
            group.has_alternatives = group.markets.len() > 1;
        }

        info!(groups = index.len(), "market discovery complete");
        *self.index.write().unwrap() = index;
        self.ready.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Markets trading `base_asset`, case-insensitive. Empty when unknown.
    pub fn get_markets(&self, base_asset: &str) -> Vec<PerpMarket> {
        self.index
            .read()
            .unwrap()
            .get(&base_asset.to_uppercase())
            .map(|g| g.markets.clone())
            .unwrap_or_default()
    }

    pub fn get_group(&self, base_asset: &str) -> Option<MarketGroup> {
        self.index
            .read()
            .unwrap()
            .get(&base_asset.to_uppercase())
            .cloned()
    }

    /// All groups, sorted by base asset for deterministic iteration.
    pub fn get_all_groups(&self) -> Vec<MarketGroup> {
        let mut groups: Vec<MarketGroup> = self.index.read().unwrap().values().cloned().collect();
        groups.sort_by(|a, b| a.base_asset.cmp(&b.base_asset));
        groups
    }

    pub fn get_groups_with_alternatives(&self) -> Vec<MarketGroup> {
        self.get_all_groups()
            .into_iter()
            .filter(|g| g.has_alternatives)
            .collect()
    }

    /// Resolve a venue coin back to its market.
    pub fn find_by_coin(&self, coin: &str) -> Option<PerpMarket> {
        self.index
            .read()
            .unwrap()
            .values()
            .flat_map(|g| g.markets.iter())
            .find(|m| m.coin.as_str() == coin)
            .cloned()
    }
}

fn resolve_collateral(dex: &PerpDex, token_names: &HashMap<u32, String>) -> String {
    match dex.collateral_token {
        None => NATIVE_COLLATERAL.to_string(),
        Some(index) => token_names
            .get(&index)
            .cloned()
            .unwrap_or_else(|| format!("TOKEN_{}", index)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AssetContext, Decimal, PerpAssetMeta, SpotMeta, SpotToken};
    use crate::venue::MockVenueClient;

    fn asset(name: &str) -> PerpAssetMeta {
        PerpAssetMeta {
            name: name.to_string(),
            sz_decimals: 2,
            max_leverage: 10,
            is_delisted: false,
        }
    }

    fn delisted(name: &str) -> PerpAssetMeta {
        PerpAssetMeta {
            is_delisted: true,
            ..asset(name)
        }
    }

    fn ctx(funding: &str) -> AssetContext {
        AssetContext {
            funding: funding.parse().unwrap(),
            open_interest: Decimal::from_i64(1000),
            mark_px: "431.25".parse().unwrap(),
            oracle_px: None,
            mid_px: None,
        }
    }

    fn spot_meta() -> SpotMeta {
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
            universe: Vec::new(),
        }
    }

    fn mock() -> MockVenueClient {
        MockVenueClient::new()
            .with_spot_meta(spot_meta())
            .with_perp_dexs(vec![
                PerpDex::default(),
                PerpDex {
                    name: "xyz".to_string(),
                    collateral_token: Some(7),
                    ..PerpDex::default()
                },
                PerpDex {
                    name: "abc".to_string(),
                    collateral_token: Some(99),
                    ..PerpDex::default()
                },
            ])
            .with_universe("", vec![asset("ETH"), asset("TSLA")], vec![ctx("0.0001"), ctx("0")])
            .with_universe(
                "xyz",
                vec![asset("xyz:TSLA0"), delisted("xyz:DEAD")],
                vec![ctx("0.00000625"), ctx("0")],
            )
            .with_universe("abc", vec![asset("abc:TSLA")], vec![ctx("-0.0002")])
    }

    #[tokio::test]
    async fn test_discovery_indexes_all_deployers() {
        let registry = MarketRegistry::new(Arc::new(mock()));
        registry.discover().await.unwrap();
        assert!(registry.is_ready());

        let tsla = registry.get_markets("tsla");
        assert_eq!(tsla.len(), 3);
        let native = &tsla[0];
        assert!(native.is_native);
        assert_eq!(native.dex_name, NATIVE_DEX);
        assert_eq!(native.asset_index, 1);
        assert_eq!(native.collateral, "USDC");

        let xyz = tsla.iter().find(|m| m.dex_name == "xyz").unwrap();
        assert_eq!(xyz.asset_index, 110_000);
        assert_eq!(xyz.collateral, "USDH");
        assert_eq!(xyz.coin.as_str(), "xyz:TSLA0");

        let abc = tsla.iter().find(|m| m.dex_name == "abc").unwrap();
        assert_eq!(abc.asset_index, 120_000);
        assert_eq!(abc.collateral, "TOKEN_99");
    }

    #[tokio::test]
    async fn test_delisted_assets_excluded() {
        let registry = MarketRegistry::new(Arc::new(mock()));
        registry.discover().await.unwrap();
        assert!(registry.get_markets("DEAD").is_empty());
    }

    #[tokio::test]
    async fn test_alternatives_flag() {
        let registry = MarketRegistry::new(Arc::new(mock()));
        registry.discover().await.unwrap();

        assert!(registry.get_group("TSLA").unwrap().has_alternatives);
        assert!(!registry.get_group("ETH").unwrap().has_alternatives);
        let alternatives = registry.get_groups_with_alternatives();
        assert_eq!(alternatives.len(), 1);
        assert_eq!(alternatives[0].base_asset, "TSLA");
    }

    #[tokio::test]
    async fn test_deployer_failure_degrades_to_partial_index() {
        let venue = mock().with_failing_meta("xyz");
        let registry = MarketRegistry::new(Arc::new(venue));
        registry.discover().await.unwrap();

        let tsla = registry.get_markets("TSLA");
        assert_eq!(tsla.len(), 2);
        assert!(tsla.iter().all(|m| m.dex_name != "xyz"));
    }

    #[tokio::test]
    async fn test_discovery_is_idempotent() {
        let registry = MarketRegistry::new(Arc::new(mock()));
        registry.discover().await.unwrap();
        let first = registry.get_all_groups();
        registry.discover().await.unwrap();
        assert_eq!(registry.get_all_groups(), first);
    }

    #[tokio::test]
    async fn test_find_by_coin() {
        let registry = MarketRegistry::new(Arc::new(mock()));
        registry.discover().await.unwrap();
        let market = registry.find_by_coin("xyz:TSLA0").unwrap();
        assert_eq!(market.base_asset, "TSLA");
        assert!(registry.find_by_coin("nope").is_none());
    }

    #[tokio::test]
    async fn test_not_ready_before_discovery() {
        let registry = MarketRegistry::new(Arc::new(mock()));
        assert!(!registry.is_ready());
        assert!(registry.get_markets("TSLA").is_empty());
    }
}
