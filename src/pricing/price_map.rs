use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// CoinGecko ids backing each `PriceMap` field
pub const ETH_ID: &str = "ethereum";
pub const STETH_ID: &str = "staked-ether";
pub const USDC_ID: &str = "usd-coin";
pub const WETH_ID: &str = "weth";

pub const DEFI_PRICE_IDS: [&str; 4] = [ETH_ID, STETH_ID, USDC_ID, WETH_ID];

/// Static prices used when the price API is unreachable
pub const FALLBACK_PRICES: FallbackPrices = FallbackPrices {
    eth: dec!(2500),
    steth: dec!(2500),
    usdc: dec!(1),
    weth: dec!(2500),
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FallbackPrices {
    pub eth: Decimal,
    pub steth: Decimal,
    pub usdc: Decimal,
    pub weth: Decimal,
}

/// USD prices needed to value DeFi positions, taken at `timestamp`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceMap {
    #[serde(rename = "ETH")]
    pub eth: Decimal,
    #[serde(rename = "STETH")]
    pub steth: Decimal,
    #[serde(rename = "USDC")]
    pub usdc: Decimal,
    #[serde(rename = "WETH")]
    pub weth: Decimal,
    pub timestamp: DateTime<Utc>,
}

impl PriceMap {
    /// Snapshot built from `FALLBACK_PRICES`, stamped now
    pub fn fallback() -> Self {
        Self {
            eth: FALLBACK_PRICES.eth,
            steth: FALLBACK_PRICES.steth,
            usdc: FALLBACK_PRICES.usdc,
            weth: FALLBACK_PRICES.weth,
            timestamp: Utc::now(),
        }
    }

    /// USD price for a token symbol
    ///
    /// Dollar stablecoins other than USDC are pegged at 1.
    pub fn price_of(&self, symbol: &str) -> Option<Decimal> {
        match symbol.trim().to_ascii_uppercase().as_str() {
            "ETH" => Some(self.eth),
            "WETH" => Some(self.weth),
            "STETH" => Some(self.steth),
            "USDC" => Some(self.usdc),
            "USDT" | "DAI" => Some(Decimal::ONE),
            _ => None,
        }
    }
}
