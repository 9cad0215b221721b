//! Prime-broker routing layer over a venue hosting fragmented
//! perpetual-futures markets.
//!
//! Discovery indexes every market per base asset across deployers; the
//! aggregator merges their books with per-source provenance; the router
//! simulates, scores, and splits orders into executable plans; and the
//! collateral manager plus executor turn a plan into prepared, batched
//! submissions.

pub mod aggregator;
pub mod broker;
pub mod cli;
pub mod collateral;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod executor;
pub mod positions;
pub mod registry;
pub mod router;
pub mod venue;

pub use broker::PrimeBroker;
pub use config::{BuilderConfig, BuilderSetting, Config, LogLevel};
pub use domain::{
    AggregatedBook, Coin, Decimal, LogicalPosition, MarketGroup, PerpMarket, Quote, Side,
    SplitQuote,
};
pub use error::RouteError;
pub use venue::{HttpVenueClient, MockVenueClient, VenueClient, VenueError};
