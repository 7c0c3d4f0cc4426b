//! CoinGecko API Client
//!
//! HTTP client for the CoinGecko v3 REST API.
//! Covers spot prices, the markets table and coin search.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::ports::market_data::{PriceFeedError, PriceFeedPort};
use crate::ports::models::{CoinMarket, MarketQuery, SearchCoin, SimplePrices};

pub const COINGECKO_API_URL: &str = "https://api.coingecko.com/api/v3";
pub const COINGECKO_PRO_API_URL: &str = "https://pro-api.coingecko.com/api/v3";

const DEMO_KEY_HEADER: &str = "x-cg-demo-api-key";
const PRO_KEY_HEADER: &str = "x-cg-pro-api-key";

/// CoinGecko client configuration
#[derive(Debug, Clone)]
pub struct CoinGeckoConfig {
    /// Base URL for the API (public or pro)
    pub api_base_url: String,
    /// Optional API key, sent on every request
    pub api_key: Option<String>,
    /// Request timeout
    pub timeout: Duration,
}

impl Default for CoinGeckoConfig {
    fn default() -> Self {
        Self {
            api_base_url: COINGECKO_API_URL.to_string(),
            api_key: None,
            timeout: Duration::from_secs(10),
        }
    }
}

impl CoinGeckoConfig {
    /// Config pointed at a custom base URL
    pub fn with_base_url(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            ..Default::default()
        }
    }

    /// Header name the key goes in: pro keys only work against the pro host
    fn key_header(&self) -> &'static str {
        if self.api_base_url.contains("pro-api.") {
            PRO_KEY_HEADER
        } else {
            DEMO_KEY_HEADER
        }
    }
}

/// CoinGecko market data client
#[derive(Debug, Clone)]
pub struct CoinGeckoClient {
    config: CoinGeckoConfig,
    http: Client,
}

impl CoinGeckoClient {
    /// Create a client against the public API
    pub fn new() -> Result<Self, PriceFeedError> {
        Self::with_config(CoinGeckoConfig::default())
    }

    pub fn with_config(config: CoinGeckoConfig) -> Result<Self, PriceFeedError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self { config, http })
    }

    /// Get the configured API base URL
    pub fn api_base_url(&self) -> &str {
        &self.config.api_base_url
    }

    fn get(&self, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.config.api_base_url.trim_end_matches('/'), path);
        let req = self.http.get(url).header("accept", "application/json");

        match self.config.api_key.as_deref() {
            Some(key) if !key.is_empty() => req.header(self.config.key_header(), key),
            _ => req,
        }
    }

    /// Send the request and deserialize a successful body
    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, PriceFeedError> {
        let response = req.send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(PriceFeedError::RateLimited);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PriceFeedError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes)
            .map_err(|e| PriceFeedError::Parse(format!("Failed to parse response: {}", e)))
    }
}

#[async_trait]
impl PriceFeedPort for CoinGeckoClient {
    async fn simple_price(
        &self,
        ids: &[String],
        vs_currency: &str,
    ) -> Result<SimplePrices, PriceFeedError> {
        if ids.is_empty() {
            return Err(PriceFeedError::InvalidRequest("no coin ids given".into()));
        }

        let ids = ids.join(",");
        tracing::debug!(ids = %ids, vs = vs_currency, "GET /simple/price");

        let req = self
            .get("/simple/price")
            .query(&[("ids", ids.as_str()), ("vs_currencies", vs_currency)]);

        self.send(req).await
    }

    async fn coins_markets(&self, query: &MarketQuery) -> Result<Vec<CoinMarket>, PriceFeedError> {
        if query.per_page == 0 {
            return Err(PriceFeedError::InvalidRequest("per_page must be > 0".into()));
        }

        tracing::debug!(ids = query.ids.len(), per_page = query.per_page, "GET /coins/markets");

        let mut req = self.get("/coins/markets").query(&[
            ("vs_currency", query.vs_currency.as_str()),
            ("order", "market_cap_desc"),
            ("sparkline", "false"),
        ]);
        req = req.query(&[("per_page", query.per_page), ("page", query.page.max(1))]);

        if !query.ids.is_empty() {
            req = req.query(&[("ids", query.ids.join(","))]);
        }

        self.send(req).await
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchCoin>, PriceFeedError> {
        tracing::debug!(query, "GET /search");

        let req = self.get("/search").query(&[("query", query)]);
        let response: SearchResponse = self.send(req).await?;
        Ok(response.coins)
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    coins: Vec<SearchCoin>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, api_key: Option<&str>) -> CoinGeckoClient {
        let mut config = CoinGeckoConfig::with_base_url(server.uri());
        config.api_key = api_key.map(str::to_string);
        CoinGeckoClient::with_config(config).unwrap()
    }

    #[test]
    fn test_config_default() {
        let config = CoinGeckoConfig::default();
        assert_eq!(config.api_base_url, COINGECKO_API_URL);
        assert!(config.api_key.is_none());
        assert_eq!(config.key_header(), DEMO_KEY_HEADER);
    }

    #[test]
    fn test_pro_host_uses_pro_header() {
        let config = CoinGeckoConfig::with_base_url(COINGECKO_PRO_API_URL);
        assert_eq!(config.key_header(), PRO_KEY_HEADER);
    }

    #[tokio::test]
    async fn test_simple_price_parses_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/simple/price"))
            .and(query_param("ids", "bitcoin,ethereum"))
            .and(query_param("vs_currencies", "usd"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "bitcoin": { "usd": 50000.0 },
                "ethereum": { "usd": 3000.5 }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        let ids = vec!["bitcoin".to_string(), "ethereum".to_string()];
        let prices = client.simple_price(&ids, "usd").await.unwrap();

        assert_eq!(prices["bitcoin"]["usd"], 50000.0);
        assert_eq!(prices["ethereum"]["usd"], 3000.5);
    }

    #[tokio::test]
    async fn test_api_key_header_sent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/simple/price"))
            .and(header(DEMO_KEY_HEADER, "demo-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Some("demo-key"));
        let prices = client.simple_price(&["bitcoin".to_string()], "usd").await.unwrap();
        assert!(prices.is_empty());
    }

    #[tokio::test]
    async fn test_rate_limit_maps_to_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        let result = client.simple_price(&["bitcoin".to_string()], "usd").await;
        assert!(matches!(result, Err(PriceFeedError::RateLimited)));
    }

    #[tokio::test]
    async fn test_server_error_maps_to_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        match client.search("btc").await {
            Err(PriceFeedError::Status { status, body }) => {
                assert_eq!(status, 500);
                assert_eq!(body, "boom");
            }
            other => panic!("expected status error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_body_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        let result = client.simple_price(&["bitcoin".to_string()], "usd").await;
        assert!(matches!(result, Err(PriceFeedError::Parse(_))));
    }

    #[tokio::test]
    async fn test_empty_ids_rejected_without_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        let result = client.simple_price(&[], "usd").await;
        assert!(matches!(result, Err(PriceFeedError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_coins_markets_query_and_nullable_fields() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/coins/markets"))
            .and(query_param("vs_currency", "usd"))
            .and(query_param("ids", "bitcoin"))
            .and(query_param("per_page", "1"))
            .and(query_param("page", "1"))
            .and(query_param("order", "market_cap_desc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "id": "bitcoin",
                "symbol": "btc",
                "name": "Bitcoin",
                "image": "https://assets.coingecko.com/coins/images/1/large/bitcoin.png",
                "current_price": 50000.0,
                "market_cap": 980000000000.0,
                "market_cap_rank": 1,
                "total_volume": 25000000000.0,
                "high_24h": 51000.0,
                "low_24h": 49000.0,
                "price_change_percentage_24h": null,
                "last_updated": "2024-01-01T00:00:00.000Z"
            }])))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        let query = MarketQuery::for_ids("usd", vec!["bitcoin".to_string()]);
        let rows = client.coins_markets(&query).await.unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].symbol, "btc");
        assert_eq!(rows[0].market_cap_rank, Some(1));
        assert_eq!(rows[0].price_change_percentage_24h, None);
    }

    #[tokio::test]
    async fn test_search_returns_coins_only() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("query", "eth"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "coins": [
                    { "id": "ethereum", "name": "Ethereum", "symbol": "ETH",
                      "market_cap_rank": 2, "thumb": "https://example.com/eth.png" }
                ],
                "exchanges": [],
                "categories": []
            })))
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        let coins = client.search("eth").await.unwrap();

        assert_eq!(coins.len(), 1);
        assert_eq!(coins[0].id, "ethereum");
        assert_eq!(coins[0].market_cap_rank, Some(2));
    }
}
