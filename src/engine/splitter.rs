//! Greedy split optimization over the merged book, with proportional
//! per-source distribution and dust redistribution.

use super::simulator::FillSimulator;
use crate::domain::{AggregatedBook, Decimal, PerpMarket, Side, SplitAllocation};
use crate::error::RouteError;
use std::collections::HashMap;

/// Allocations below this size are folded into the primary allocation.
pub fn default_min_allocation() -> Decimal {
    Decimal::scaled(1, 3)
}

/// Aggregate result of a split optimization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitOutcome {
    pub allocations: Vec<SplitAllocation>,
    pub avg_price: Decimal,
    pub price_impact_bps: Decimal,
    pub total_cost: Decimal,
}

#[derive(Debug)]
pub struct SplitOptimizer {
    min_allocation_size: Decimal,
}

impl Default for SplitOptimizer {
    fn default() -> Self {
        Self::new()
    }
}

impl SplitOptimizer {
    pub fn new() -> Self {
        SplitOptimizer {
            min_allocation_size: default_min_allocation(),
        }
    }

    pub fn with_min_allocation(min_allocation_size: Decimal) -> Self {
        SplitOptimizer {
            min_allocation_size,
        }
    }

    /// Walk the pre-sorted active side greedily, splitting each level's
    /// fill across its sources in proportion to their quoted size.
    ///
    /// # Errors
    /// `InsufficientLiquidity` when the merged depth cannot cover the
    /// request (beyond a `size * 0.001` rounding tolerance).
    pub fn optimize(
        &self,
        book: &AggregatedBook,
        side: Side,
        size: Decimal,
        markets: &HashMap<String, PerpMarket>,
    ) -> Result<SplitOutcome, RouteError> {
        let insufficient = || RouteError::InsufficientLiquidity {
            base_asset: book.base_asset.clone(),
            requested_size: size,
        };

        if !size.is_positive() {
            return Err(insufficient());
        }

        let mut remaining = size;
        let mut source_order: Vec<String> = Vec::new();
        let mut accumulated: HashMap<String, (Decimal, Decimal)> = HashMap::new();

        for level in book.active_levels(side) {
            if !remaining.is_positive() {
                break;
            }
            if !level.total_size.is_positive() {
                continue;
            }
            let level_fill = remaining.min(level.total_size);
            for source in &level.sources {
                let share = (level_fill * source.size / level.total_size).min(source.size);
                if !share.is_positive() {
                    continue;
                }
                let key = source.coin.as_str().to_string();
                let entry = accumulated.entry(key.clone()).or_insert_with(|| {
                    source_order.push(key);
                    (Decimal::zero(), Decimal::zero())
                });
                entry.0 += share;
                entry.1 += share * level.px;
            }
            remaining -= level_fill;
        }

        let tolerance = size * Decimal::scaled(1, 3);
        if remaining > tolerance {
            return Err(insufficient());
        }

        let mut allocations = Vec::new();
        for coin in &source_order {
            let (alloc_size, alloc_cost) = accumulated[coin];
            if !alloc_size.is_positive() {
                continue;
            }
            let market = markets.get(coin).cloned().ok_or_else(|| {
                RouteError::Execution {
                    message: format!("no market metadata for {}", coin),
                    raw: None,
                }
            })?;
            allocations.push(SplitAllocation {
                market,
                size: alloc_size,
                estimated_cost: alloc_cost,
                estimated_avg_price: alloc_cost / alloc_size,
                proportion: Decimal::zero(),
            });
        }

        if allocations.is_empty() {
            return Err(insufficient());
        }

        // Dust filter: largest allocation first (stable sort keeps source
        // order on ties), then fold sub-minimum tails into the primary at
        // the primary's average price.
        allocations.sort_by(|a, b| b.size.cmp(&a.size));
        let mut survivors: Vec<SplitAllocation> = vec![allocations.remove(0)];
        for allocation in allocations {
            if allocation.size < self.min_allocation_size {
                let primary = &mut survivors[0];
                let primary_avg = primary.estimated_avg_price;
                primary.size += allocation.size;
                primary.estimated_cost += allocation.size * primary_avg;
                primary.estimated_avg_price = primary.estimated_cost / primary.size;
            } else {
                survivors.push(allocation);
            }
        }

        let total_size: Decimal = survivors.iter().map(|a| a.size).sum();
        let total_cost: Decimal = survivors.iter().map(|a| a.estimated_cost).sum();
        for allocation in &mut survivors {
            allocation.proportion = allocation.size / total_size;
        }

        let avg_price = total_cost / total_size;
        let mid = FillSimulator::mid_price(book.best_bid_px(), book.best_ask_px());
        let price_impact_bps = if mid.is_positive() {
            (avg_price - mid).abs() / mid * Decimal::from_i64(10_000)
        } else {
            Decimal::zero()
        };

        Ok(SplitOutcome {
            allocations: survivors,
            avg_price,
            price_impact_bps,
            total_cost,
        })
    }
}
