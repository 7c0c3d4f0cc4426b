//! DeFi Positions
//!
//! Read-only aggregation of lending, liquidity and staking positions
//! across Aave, Uniswap, Compound, Lido and Curve.

pub mod types;
pub mod aggregator;

pub use types::{
    is_valid_wallet, DefiPosition, DefiSummary, FetchFailure, PositionKind, Protocol,
    ProtocolTotals, RawPosition,
};
pub use aggregator::{DefiAggregator, DefiError};
