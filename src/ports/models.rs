//! Market data structures shared by the price feed port and its adapters

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// `/simple/price` payload: coin id -> currency -> price
pub type SimplePrices = HashMap<String, HashMap<String, f64>>;

/// One row of the `/coins/markets` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinMarket {
    pub id: String,
    pub symbol: String,
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub current_price: Option<f64>,
    #[serde(default)]
    pub market_cap: Option<f64>,
    #[serde(default)]
    pub market_cap_rank: Option<u32>,
    #[serde(default)]
    pub total_volume: Option<f64>,
    #[serde(default)]
    pub high_24h: Option<f64>,
    #[serde(default)]
    pub low_24h: Option<f64>,
    #[serde(default)]
    pub price_change_percentage_24h: Option<f64>,
    #[serde(default)]
    pub last_updated: Option<String>,
}

/// Coin hit from `/search`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchCoin {
    pub id: String,
    pub name: String,
    pub symbol: String,
    #[serde(default)]
    pub market_cap_rank: Option<u32>,
    #[serde(default)]
    pub thumb: Option<String>,
}

/// Parameters for a markets table request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketQuery {
    pub vs_currency: String,
    /// Restrict to these ids (empty = top coins by market cap)
    pub ids: Vec<String>,
    pub per_page: u32,
    pub page: u32,
}

impl MarketQuery {
    /// Top `limit` coins by market cap
    pub fn top(vs_currency: impl Into<String>, limit: u32) -> Self {
        Self {
            vs_currency: vs_currency.into(),
            ids: Vec::new(),
            per_page: limit,
            page: 1,
        }
    }

    /// Market rows for specific coin ids
    pub fn for_ids(vs_currency: impl Into<String>, ids: Vec<String>) -> Self {
        let per_page = ids.len().max(1) as u32;
        Self {
            vs_currency: vs_currency.into(),
            ids,
            per_page,
            page: 1,
        }
    }
}
