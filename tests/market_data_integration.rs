//! Market Data Integration Tests
//!
//! End-to-end tests wiring the real components together against a local
//! mock of the CoinGecko API:
//! 1. CoinGeckoClient -> PriceService -> MemoryCache (cache hits, fallbacks)
//! 2. PriceService -> DefiAggregator over a JSON position snapshot
//! 3. PriceService -> AlertChecker
//!
//! No real network calls are made.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal_macros::dec;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use kryptotrac::adapters::{CoinGeckoClient, CoinGeckoConfig, JsonFilePositionSource};
use kryptotrac::alerts::{AlertChecker, AlertCondition, PriceAlert};
use kryptotrac::cache::MemoryCache;
use kryptotrac::defi::{DefiAggregator, Protocol};
use kryptotrac::pricing::{PriceService, PriceSettings, FALLBACK_PRICES};

// ============================================================================
// Test Fixtures
// ============================================================================

const WALLET: &str = "0x52908400098527886e0f7030069857d2e4169ee7";

/// PriceService over a CoinGecko client pointed at `base_url` with a private cache
fn price_service(base_url: &str, settings: PriceSettings) -> Arc<PriceService> {
    let mut config = CoinGeckoConfig::with_base_url(base_url);
    config.timeout = Duration::from_secs(2);
    let client = CoinGeckoClient::with_config(config).unwrap();

    Arc::new(PriceService::with_cache(
        Arc::new(client),
        Arc::new(MemoryCache::new()),
        settings,
    ))
}

/// Discard port on loopback: nothing listens, every request is refused
const UNREACHABLE_URL: &str = "http://127.0.0.1:9";

async fn mount_defi_prices(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/simple/price"))
        .and(query_param("ids", "ethereum,staked-ether,usd-coin,weth"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ethereum": { "usd": 3000.0 },
            "staked-ether": { "usd": 2990.0 },
            "usd-coin": { "usd": 1.0 },
            "weth": { "usd": 3000.0 }
        })))
        .mount(server)
        .await;
}

// ============================================================================
// Price helpers + cache
// ============================================================================

#[tokio::test]
async fn test_coin_price_second_call_served_from_cache() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/simple/price"))
        .and(query_param("ids", "bitcoin"))
        .and(query_param("vs_currencies", "usd"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "bitcoin": { "usd": 50000 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let prices = price_service(&server.uri(), PriceSettings::default());

    assert_eq!(prices.get_coin_price("bitcoin").await, 50000.0);
    assert_eq!(prices.get_coin_price("bitcoin").await, 50000.0);

    let stats = prices.cache().stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.entries, 1);
    // MockServer verifies `expect(1)` on drop
}

#[tokio::test]
async fn test_coin_price_refetched_after_ttl() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/simple/price"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "bitcoin": { "usd": 50000 }
        })))
        .expect(2)
        .mount(&server)
        .await;

    let settings = PriceSettings {
        price_ttl: Duration::from_millis(50),
        ..PriceSettings::default()
    };
    let prices = price_service(&server.uri(), settings);

    prices.get_coin_price("bitcoin").await;
    tokio::time::sleep(Duration::from_millis(80)).await;
    prices.get_coin_price("bitcoin").await;
}

#[tokio::test]
async fn test_unreachable_api_returns_fallbacks() {
    let prices = price_service(UNREACHABLE_URL, PriceSettings::default());

    assert_eq!(prices.get_coin_price("ethereum").await, 2500.0);
    assert_eq!(prices.get_coin_price("unlisted-token").await, 0.0);

    let map = prices.get_defi_prices().await;
    assert_eq!(map.eth, FALLBACK_PRICES.eth);
    assert_eq!(map.usdc, FALLBACK_PRICES.usdc);

    assert!(prices.search_coins("btc").await.is_empty());
    assert!(prices.get_top_coins(10).await.is_empty());
    assert!(prices.cache().is_empty());
}

#[tokio::test]
async fn test_server_error_returns_fallback() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let prices = price_service(&server.uri(), PriceSettings::default());
    assert_eq!(prices.get_coin_price("bitcoin").await, 60000.0);
}

// ============================================================================
// DeFi aggregation
// ============================================================================

#[tokio::test]
async fn test_aggregates_snapshot_with_live_prices() {
    let server = MockServer::start().await;
    mount_defi_prices(&server).await;
    let prices = price_service(&server.uri(), PriceSettings::default());

    let source = JsonFilePositionSource::from_json(&format!(
        r#"{{
            "{wallet}": {{
                "aave": [
                    {{ "kind": "supply", "token": "WETH", "amount": "1" }},
                    {{ "kind": "borrow", "token": "USDC", "amount": "500" }}
                ],
                "lido": [ {{ "kind": "staking", "token": "stETH", "amount": "2" }} ],
                "curve": [ {{ "kind": "liquidity", "token": "DAI", "amount": "100" }} ]
            }}
        }}"#,
        wallet = WALLET
    ))
    .unwrap();

    let aggregator = DefiAggregator::new(Arc::new(source), prices);
    let summary = aggregator.aggregate(&[WALLET.to_string()]).await.unwrap();

    assert_eq!(summary.positions.len(), 4);
    assert!(summary.failures.is_empty());
    // 3000 + 5980 + 100 supplied, 500 borrowed
    assert_eq!(summary.total_supplied_usd, dec!(9080));
    assert_eq!(summary.total_borrowed_usd, dec!(500));
    assert_eq!(summary.net_value_usd, dec!(8580));
    assert_eq!(summary.prices.steth, dec!(2990));

    let protocols: Vec<Protocol> = summary.by_protocol.iter().map(|t| t.protocol).collect();
    assert_eq!(protocols, vec![Protocol::Aave, Protocol::Lido, Protocol::Curve]);
}

// ============================================================================
// Alerts
// ============================================================================

#[tokio::test]
async fn test_alerts_checked_against_api_prices() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/simple/price"))
        .and(query_param("ids", "bitcoin,solana"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "bitcoin": { "usd": 71000.0 },
            "solana": { "usd": 140.0 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let prices = price_service(&server.uri(), PriceSettings::default());
    let checker = AlertChecker::new(prices);

    let alerts = vec![
        PriceAlert {
            id: "btc-70k".into(),
            user_id: "user-1".into(),
            coin_id: "bitcoin".into(),
            condition: AlertCondition::Above,
            target_price: 70000.0,
            active: true,
        },
        PriceAlert {
            id: "sol-100".into(),
            user_id: "user-2".into(),
            coin_id: "solana".into(),
            condition: AlertCondition::Below,
            target_price: 100.0,
            active: true,
        },
    ];

    let triggered = checker.check(&alerts).await;
    assert_eq!(triggered.len(), 1);
    assert_eq!(triggered[0].alert.id, "btc-70k");
    assert_eq!(triggered[0].price, 71000.0);
}
