//! KryptoTrac - Crypto Portfolio Market Data Library
//!
//! Price lookups through a process-wide TTL cache, with static fallbacks when
//! the price API is unreachable, plus read-only DeFi position aggregation.
//!
//! # Modules
//!
//! - `cache`: MemoryCache with per-entry TTL and background sweep
//! - `ports`: Trait abstractions (PriceFeedPort, PositionSourcePort)
//! - `adapters`: External implementations (CoinGecko, JSON position snapshot, CLI)
//! - `pricing`: Cached price helpers and the DeFi price snapshot
//! - `defi`: Wallet × protocol position aggregation
//! - `alerts`: Price alert evaluation
//! - `config`: Configuration loading and validation

pub mod cache;
pub mod ports;
pub mod adapters;
pub mod pricing;
pub mod defi;
pub mod alerts;
pub mod config;
