//! Pricing
//!
//! Cached price helpers and the DeFi price snapshot.

mod price_map;
mod service;

pub use price_map::{PriceMap, FallbackPrices, FALLBACK_PRICES, DEFI_PRICE_IDS};
pub use service::{PriceService, PriceSettings, fallback_price, MAX_MARKET_PAGE};
