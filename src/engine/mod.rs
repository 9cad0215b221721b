//! Pure routing computations: fill simulation, market scoring, and split
//! optimization. Nothing here touches the venue.

pub mod scorer;
pub mod simulator;
pub mod splitter;

pub use scorer::{MarketScorer, DEFAULT_SWAP_PENALTY_BPS};
pub use simulator::{FillSimulator, Simulation, SimulationError};
pub use splitter::{SplitOptimizer, SplitOutcome};
