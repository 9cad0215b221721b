//! Position normalization across native and deployer markets.

use crate::domain::{extract_base_asset, Address, LogicalPosition, ManagedBy, Side};
use crate::error::RouteError;
use crate::registry::MarketRegistry;
use crate::venue::VenueClient;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug)]
pub struct PositionManager {
    venue: Arc<dyn VenueClient>,
    registry: Arc<MarketRegistry>,
}

impl PositionManager {
    pub fn new(venue: Arc<dyn VenueClient>, registry: Arc<MarketRegistry>) -> Self {
        PositionManager { venue, registry }
    }

    /// All open positions, normalized. Managed-by tracking is advisory and
    /// currently reports `Unknown` pending a durable fills index.
    pub async fn positions(&self, user: &Address) -> Result<Vec<LogicalPosition>, RouteError> {
        let state = self.venue.clearinghouse_state(user).await?;
        let positions = state
            .asset_positions
            .into_iter()
            .filter(|p| !p.szi.is_zero())
            .map(|p| {
                let market = self.registry.find_by_coin(p.coin.as_str());
                let base_asset = market
                    .as_ref()
                    .map(|m| m.base_asset.clone())
                    .unwrap_or_else(|| {
                        extract_base_asset(p.coin.as_str(), !p.coin.is_deployer_scoped())
                    });
                let side = if p.szi.is_positive() {
                    Side::Buy
                } else {
                    Side::Sell
                };
                LogicalPosition {
                    base_asset,
                    coin: p.coin,
                    side,
                    size: p.szi.abs(),
                    entry_price: p.entry_px,
                    mark_price: market.map(|m| m.mark_price),
                    unrealized_pnl: p.unrealized_pnl,
                    leverage: p.leverage,
                    liquidation_price: p.liquidation_px,
                    managed_by: ManagedBy::Unknown,
                }
            })
            .collect();
        Ok(positions)
    }

    /// Positions grouped by base asset.
    pub async fn grouped_positions(
        &self,
        user: &Address,
    ) -> Result<HashMap<String, Vec<LogicalPosition>>, RouteError> {
        let mut grouped: HashMap<String, Vec<LogicalPosition>> = HashMap::new();
        for position in self.positions(user).await? {
            grouped
                .entry(position.base_asset.clone())
                .or_default()
                .push(position);
        }
        Ok(grouped)
    }
}
