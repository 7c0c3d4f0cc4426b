//! Adapters Layer - External System Implementations
//!
//! This module contains implementations of the port traits:
//! - CoinGecko: market data REST client
//! - Positions: DeFi position sources
//! - CLI: Command-line interface definitions

pub mod coingecko;
pub mod positions;
pub mod cli;

pub use coingecko::{CoinGeckoClient, CoinGeckoConfig};
pub use positions::JsonFilePositionSource;
pub use cli::CliApp;
