//! Deterministic fill simulation: walk one book side and report average
//! price, mid, and impact.

use crate::domain::{Decimal, L2Book, Side};
use thiserror::Error;

/// Result of walking a book side for a given size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Simulation {
    pub avg_price: Decimal,
    pub mid_price: Decimal,
    pub price_impact_bps: Decimal,
    pub total_cost: Decimal,
    pub filled_size: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SimulationError {
    /// The walked side's cumulative size is below the requested size.
    /// The contract is strict: full fill or fail.
    #[error("insufficient depth: requested {requested}, available {available}")]
    InsufficientDepth {
        requested: Decimal,
        available: Decimal,
    },
}

pub struct FillSimulator;

impl FillSimulator {
    /// Simulate filling `size` against one market's book.
    pub fn simulate(book: &L2Book, side: Side, size: Decimal) -> Result<Simulation, SimulationError> {
        let levels: Vec<(Decimal, Decimal)> = book
            .active_levels(side)
            .iter()
            .map(|l| (l.px, l.sz))
            .collect();
        let mid = Self::mid_price(
            book.best_bid().map(|l| l.px),
            book.best_ask().map(|l| l.px),
        );
        Self::walk(&levels, mid, size)
    }

    /// Walk pre-sorted `(price, size)` levels, consuming best-first.
    pub fn walk(
        levels: &[(Decimal, Decimal)],
        mid_price: Decimal,
        size: Decimal,
    ) -> Result<Simulation, SimulationError> {
        if !size.is_positive() {
            return Err(SimulationError::InsufficientDepth {
                requested: size,
                available: Decimal::zero(),
            });
        }

        let mut remaining = size;
        let mut total_cost = Decimal::zero();
        for &(px, sz) in levels {
            if !remaining.is_positive() {
                break;
            }
            let take = remaining.min(sz);
            total_cost += take * px;
            remaining -= take;
        }

        if remaining.is_positive() {
            return Err(SimulationError::InsufficientDepth {
                requested: size,
                available: size - remaining,
            });
        }

        let avg_price = total_cost / size;
        let price_impact_bps = if mid_price.is_positive() {
            (avg_price - mid_price).abs() / mid_price * Decimal::from_i64(10_000)
        } else {
            Decimal::zero()
        };

        Ok(Simulation {
            avg_price,
            mid_price,
            price_impact_bps,
            total_cost,
            filled_size: size,
        })
    }

    /// Midpoint of best bid and ask; the single-sided best when only one
    /// side exists; zero for an empty book.
    pub fn mid_price(best_bid: Option<Decimal>, best_ask: Option<Decimal>) -> Decimal {
        match (best_bid, best_ask) {
            (Some(bid), Some(ask)) => (bid + ask) / Decimal::from_i64(2),
            (Some(px), None) | (None, Some(px)) => px,
            (None, None) => Decimal::zero(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::venue::mock::book_from;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_single_level_buy() {
        // Deep first ask level: buy 3 of (431.50, 5).
        let book = book_from(
            "TSLA",
            &[("431.00", "2")],
            &[("431.50", "5"), ("432.00", "10")],
        );
        let sim = FillSimulator::simulate(&book, Side::Buy, d("3")).unwrap();
        assert_eq!(sim.avg_price, d("431.50"));
        assert_eq!(sim.mid_price, d("431.25"));
        assert_eq!(sim.total_cost, d("1294.50"));
        assert_eq!(sim.price_impact_bps.round_dp(3), d("5.797"));
    }

    #[test]
    fn test_multi_level_walk() {
        let book = book_from("TSLA", &[], &[("431.50", "5"), ("432.00", "10")]);
        let sim = FillSimulator::simulate(&book, Side::Buy, d("8")).unwrap();
        // 5 @ 431.50 + 3 @ 432.00 = 3453.50 over 8.
        assert_eq!(sim.total_cost, d("3453.50"));
        assert_eq!(sim.avg_price, d("431.6875"));
        // Avg lies between the best and the worst consumed level.
        assert!(sim.avg_price >= d("431.50") && sim.avg_price <= d("432.00"));
    }

    #[test]
    fn test_sell_walks_bids() {
        let book = book_from("TSLA", &[("431.00", "2"), ("430.50", "4")], &[]);
        let sim = FillSimulator::simulate(&book, Side::Sell, d("3")).unwrap();
        // 2 @ 431.00 + 1 @ 430.50.
        assert_eq!(sim.total_cost, d("1292.50"));
    }

    #[test]
    fn test_insufficient_depth_fails() {
        let book = book_from("TSLA", &[], &[("431.50", "5")]);
        let err = FillSimulator::simulate(&book, Side::Buy, d("6")).unwrap_err();
        assert_eq!(
            err,
            SimulationError::InsufficientDepth {
                requested: d("6"),
                available: d("5"),
            }
        );
    }

    #[test]
    fn test_empty_book_fails() {
        let book = book_from("TSLA", &[], &[]);
        assert!(FillSimulator::simulate(&book, Side::Buy, d("1")).is_err());
    }

    #[test]
    fn test_single_sided_mid() {
        let book = book_from("TSLA", &[], &[("431.50", "5")]);
        let sim = FillSimulator::simulate(&book, Side::Buy, d("1")).unwrap();
        assert_eq!(sim.mid_price, d("431.50"));
        assert_eq!(sim.price_impact_bps, Decimal::zero());
    }

    #[test]
    fn test_deterministic_output() {
        let book = book_from("TSLA", &[("431.00", "2")], &[("431.50", "5"), ("432.00", "10")]);
        let a = FillSimulator::simulate(&book, Side::Buy, d("7")).unwrap();
        let b = FillSimulator::simulate(&book, Side::Buy, d("7")).unwrap();
        assert_eq!(a, b);
    }
}
