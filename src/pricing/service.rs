//! Price Helpers
//!
//! Cached wrappers over the price feed. Every helper returns a value:
//! network and parse failures are logged and replaced by a static fallback,
//! never surfaced to the caller. Fallbacks are not cached, so the next call
//! tries the network again.
//!
//! No retry, backoff or request de-duplication.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::cache::MemoryCache;
use crate::ports::market_data::PriceFeedPort;
use crate::ports::models::{CoinMarket, MarketQuery, SearchCoin, SimplePrices};

use super::price_map::{PriceMap, DEFI_PRICE_IDS, ETH_ID, FALLBACK_PRICES, STETH_ID, USDC_ID, WETH_ID};

/// CoinGecko caps `per_page` at 250
pub const MAX_MARKET_PAGE: u32 = 250;

const DEFI_PRICES_KEY: &str = "defi:prices";

/// Fallback USD prices for well-known coin ids
const FALLBACK_COIN_PRICES: &[(&str, f64)] = &[
    ("bitcoin", 60_000.0),
    ("ethereum", 2_500.0),
    ("staked-ether", 2_500.0),
    ("weth", 2_500.0),
    ("solana", 150.0),
    ("usd-coin", 1.0),
    ("tether", 1.0),
    ("dai", 1.0),
];

/// Static fallback for a coin id, `0.0` when unknown
pub fn fallback_price(id: &str) -> f64 {
    FALLBACK_COIN_PRICES
        .iter()
        .find(|(known, _)| *known == id)
        .map(|(_, price)| *price)
        .unwrap_or(0.0)
}

/// Cache lifetimes and quote currency for the price helpers
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSettings {
    pub vs_currency: String,
    pub price_ttl: Duration,
    pub market_ttl: Duration,
    pub search_ttl: Duration,
}

impl Default for PriceSettings {
    fn default() -> Self {
        Self {
            vs_currency: "usd".to_string(),
            price_ttl: Duration::from_secs(60),
            market_ttl: Duration::from_secs(60),
            search_ttl: Duration::from_secs(300),
        }
    }
}

/// Price lookups backed by a `PriceFeedPort` and the shared TTL cache
pub struct PriceService {
    feed: Arc<dyn PriceFeedPort>,
    cache: Arc<MemoryCache>,
    settings: PriceSettings,
}

impl PriceService {
    /// Service using the process-wide cache
    pub fn new(feed: Arc<dyn PriceFeedPort>, settings: PriceSettings) -> Self {
        Self::with_cache(feed, MemoryCache::global(), settings)
    }

    pub fn with_cache(
        feed: Arc<dyn PriceFeedPort>,
        cache: Arc<MemoryCache>,
        settings: PriceSettings,
    ) -> Self {
        Self { feed, cache, settings }
    }

    pub fn cache(&self) -> &Arc<MemoryCache> {
        &self.cache
    }

    pub fn settings(&self) -> &PriceSettings {
        &self.settings
    }

    /// Current price of one coin
    pub async fn get_coin_price(&self, id: &str) -> f64 {
        let id = normalize_id(id);
        if id.is_empty() {
            return fallback_price(&id);
        }
        let key = price_key(&id);

        if let Some(price) = self.cache.get_json::<f64>(&key) {
            debug!(coin = %id, price, "Price cache hit");
            return price;
        }

        let vs = &self.settings.vs_currency;
        match self.feed.simple_price(std::slice::from_ref(&id), vs).await {
            Ok(prices) => match lookup(&prices, &id, vs) {
                Some(price) => {
                    self.cache.set_json(key, &price, self.settings.price_ttl);
                    price
                }
                None => {
                    warn!(coin = %id, "No price returned, using fallback");
                    fallback_price(&id)
                }
            },
            Err(e) => {
                warn!(coin = %id, error = %e, "Price fetch failed, using fallback");
                fallback_price(&id)
            }
        }
    }

    /// Prices for several coins, fetching only the uncached ones in one request
    pub async fn get_coin_prices(&self, ids: &[String]) -> HashMap<String, f64> {
        let wanted: BTreeSet<String> = ids
            .iter()
            .map(|id| normalize_id(id))
            .filter(|id| !id.is_empty())
            .collect();

        let mut result = HashMap::with_capacity(wanted.len());
        let mut missing = Vec::new();

        for id in wanted {
            match self.cache.get_json::<f64>(&price_key(&id)) {
                Some(price) => {
                    result.insert(id, price);
                }
                None => missing.push(id),
            }
        }

        if missing.is_empty() {
            return result;
        }

        debug!(cached = result.len(), missing = missing.len(), "Fetching uncached prices");
        let vs = &self.settings.vs_currency;

        match self.feed.simple_price(&missing, vs).await {
            Ok(prices) => {
                for id in missing {
                    let price = match lookup(&prices, &id, vs) {
                        Some(price) => {
                            self.cache.set_json(price_key(&id), &price, self.settings.price_ttl);
                            price
                        }
                        None => {
                            warn!(coin = %id, "No price returned, using fallback");
                            fallback_price(&id)
                        }
                    };
                    result.insert(id, price);
                }
            }
            Err(e) => {
                warn!(count = missing.len(), error = %e, "Batch price fetch failed, using fallbacks");
                for id in missing {
                    let price = fallback_price(&id);
                    result.insert(id, price);
                }
            }
        }

        result
    }

    /// ETH / stETH / USDC / WETH snapshot for valuing DeFi positions
    ///
    /// Any price absent from the response is filled from `FALLBACK_PRICES`;
    /// a partially filled snapshot is returned but not cached.
    pub async fn get_defi_prices(&self) -> PriceMap {
        if let Some(map) = self.cache.get_json::<PriceMap>(DEFI_PRICES_KEY) {
            debug!("DeFi price cache hit");
            return map;
        }

        let ids: Vec<String> = DEFI_PRICE_IDS.iter().map(|id| id.to_string()).collect();
        let prices = match self.feed.simple_price(&ids, "usd").await {
            Ok(prices) => prices,
            Err(e) => {
                warn!(error = %e, "DeFi price fetch failed, using fallback prices");
                return PriceMap::fallback();
            }
        };

        let mut complete = true;
        let mut field = |id: &str, fallback: Decimal| -> Decimal {
            match lookup(&prices, id, "usd").and_then(Decimal::from_f64) {
                Some(price) => price,
                None => {
                    warn!(coin = %id, "DeFi price missing, using fallback");
                    complete = false;
                    fallback
                }
            }
        };

        let map = PriceMap {
            eth: field(ETH_ID, FALLBACK_PRICES.eth),
            steth: field(STETH_ID, FALLBACK_PRICES.steth),
            usdc: field(USDC_ID, FALLBACK_PRICES.usdc),
            weth: field(WETH_ID, FALLBACK_PRICES.weth),
            timestamp: Utc::now(),
        };

        if complete {
            self.cache.set_json(DEFI_PRICES_KEY, &map, self.settings.price_ttl);
        }
        map
    }

    /// Market rows for specific coins, empty on failure
    pub async fn get_market_data(&self, ids: &[String]) -> Vec<CoinMarket> {
        let ids: Vec<String> = ids
            .iter()
            .map(|id| normalize_id(id))
            .filter(|id| !id.is_empty())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        if ids.is_empty() {
            return Vec::new();
        }

        let key = format!("markets:{}", ids.join(","));
        let query = MarketQuery::for_ids(self.settings.vs_currency.clone(), ids);
        self.cached_markets(&key, &query).await
    }

    /// Top coins by market cap, empty on failure
    pub async fn get_top_coins(&self, limit: u32) -> Vec<CoinMarket> {
        let limit = limit.min(MAX_MARKET_PAGE);
        if limit == 0 {
            return Vec::new();
        }

        let key = format!("markets:top:{}", limit);
        let query = MarketQuery::top(self.settings.vs_currency.clone(), limit);
        self.cached_markets(&key, &query).await
    }

    /// Coins matching a free-text query, empty on failure
    pub async fn search_coins(&self, query: &str) -> Vec<SearchCoin> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return Vec::new();
        }

        let key = format!("search:{}", query);
        if let Some(coins) = self.cache.get_json::<Vec<SearchCoin>>(&key) {
            debug!(query = %query, "Search cache hit");
            return coins;
        }

        match self.feed.search(&query).await {
            Ok(coins) => {
                self.cache.set_json(key, &coins, self.settings.search_ttl);
                coins
            }
            Err(e) => {
                warn!(query = %query, error = %e, "Coin search failed");
                Vec::new()
            }
        }
    }

    async fn cached_markets(&self, key: &str, query: &MarketQuery) -> Vec<CoinMarket> {
        if let Some(rows) = self.cache.get_json::<Vec<CoinMarket>>(key) {
            debug!(key, "Market cache hit");
            return rows;
        }

        match self.feed.coins_markets(query).await {
            Ok(rows) => {
                self.cache.set_json(key, &rows, self.settings.market_ttl);
                rows
            }
            Err(e) => {
                warn!(key, error = %e, "Market data fetch failed");
                Vec::new()
            }
        }
    }
}

fn normalize_id(id: &str) -> String {
    id.trim().to_lowercase()
}

fn price_key(id: &str) -> String {
    format!("price:{}", id)
}

fn lookup(prices: &SimplePrices, id: &str, vs: &str) -> Option<f64> {
    prices.get(id).and_then(|quotes| quotes.get(vs)).copied()
}
