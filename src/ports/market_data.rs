use async_trait::async_trait;
use thiserror::Error;

use super::models::{CoinMarket, MarketQuery, SearchCoin, SimplePrices};

/// Price feed error type
#[derive(Error, Debug)]
pub enum PriceFeedError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Rate limited by price API")]
    RateLimited,

    #[error("Data parsing error: {0}")]
    Parse(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Market data source (CoinGecko in production)
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PriceFeedPort: Send + Sync {
    /// Spot prices for `ids` in `vs_currency`
    async fn simple_price(&self, ids: &[String], vs_currency: &str)
        -> Result<SimplePrices, PriceFeedError>;

    /// Market table rows ordered by market cap
    async fn coins_markets(&self, query: &MarketQuery)
        -> Result<Vec<CoinMarket>, PriceFeedError>;

    /// Coins matching a free-text query
    async fn search(&self, query: &str) -> Result<Vec<SearchCoin>, PriceFeedError>;
}
