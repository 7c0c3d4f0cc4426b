//! CoinGecko Adapter
//!
//! `PriceFeedPort` implementation over the CoinGecko REST API:
//! - `/simple/price` for spot prices
//! - `/coins/markets` for market tables
//! - `/search` for coin lookup

mod client;

pub use client::{CoinGeckoClient, CoinGeckoConfig, COINGECKO_API_URL, COINGECKO_PRO_API_URL};
