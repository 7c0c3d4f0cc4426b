//! Ports Layer - Trait definitions for external dependencies
//!
//! This module defines the interfaces (ports) that adapters must implement:
//! - Market data feeds (spot prices, market tables, search)
//! - DeFi position sources (raw protocol balances per wallet)

pub mod market_data;
pub mod positions;
pub mod models;

pub use market_data::{PriceFeedError, PriceFeedPort};
pub use positions::{PositionSourceError, PositionSourcePort};
pub use models::{CoinMarket, MarketQuery, SearchCoin, SimplePrices};
