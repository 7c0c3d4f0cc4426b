use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::pricing::PriceMap;

/// Supported DeFi protocols
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Aave,
    Uniswap,
    Compound,
    Lido,
    Curve,
}

impl Protocol {
    pub const ALL: [Protocol; 5] = [
        Protocol::Aave,
        Protocol::Uniswap,
        Protocol::Compound,
        Protocol::Lido,
        Protocol::Curve,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Aave => "aave",
            Protocol::Uniswap => "uniswap",
            Protocol::Compound => "compound",
            Protocol::Lido => "lido",
            Protocol::Curve => "curve",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "aave" => Ok(Protocol::Aave),
            "uniswap" => Ok(Protocol::Uniswap),
            "compound" => Ok(Protocol::Compound),
            "lido" => Ok(Protocol::Lido),
            "curve" => Ok(Protocol::Curve),
            other => Err(format!("unknown protocol: {}", other)),
        }
    }
}

/// What a position represents inside its protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionKind {
    Supply,
    Borrow,
    Liquidity,
    Staking,
}

impl PositionKind {
    pub fn is_debt(&self) -> bool {
        matches!(self, PositionKind::Borrow)
    }
}

/// Balance reported by a protocol before valuation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPosition {
    pub kind: PositionKind,
    /// Token symbol (e.g. "WETH", "USDC")
    pub token: String,
    /// Token amount in whole units
    pub amount: Decimal,
}

/// Valued position belonging to one wallet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefiPosition {
    pub wallet: String,
    pub protocol: Protocol,
    pub kind: PositionKind,
    pub token: String,
    pub amount: Decimal,
    /// Unit price used, `None` when the token could not be priced
    pub price_usd: Option<Decimal>,
    /// Signed USD value: debt is negative
    pub value_usd: Decimal,
}

impl DefiPosition {
    /// Value `raw` with the snapshot prices
    ///
    /// A value that does not fit in a `Decimal` leaves the position unpriced.
    pub fn value(wallet: &str, protocol: Protocol, raw: RawPosition, prices: &PriceMap) -> Self {
        let priced = prices.price_of(&raw.token).map(|price| (price, price.checked_mul(raw.amount)));
        let (price_usd, gross) = match priced {
            Some((price, Some(gross))) => (Some(price), gross),
            Some((_, None)) => {
                warn!(token = %raw.token, amount = %raw.amount, %protocol, "Position value overflowed, valued at 0");
                (None, Decimal::ZERO)
            }
            None => (None, Decimal::ZERO),
        };
        let value_usd = if raw.kind.is_debt() { -gross } else { gross };

        Self {
            wallet: wallet.to_string(),
            protocol,
            kind: raw.kind,
            token: raw.token,
            amount: raw.amount,
            price_usd,
            value_usd,
        }
    }
}

/// Per-protocol rollup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolTotals {
    pub protocol: Protocol,
    pub supplied_usd: Decimal,
    pub borrowed_usd: Decimal,
    pub net_usd: Decimal,
    pub position_count: usize,
}

/// A (wallet, protocol) fetch that failed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchFailure {
    pub wallet: String,
    pub protocol: Protocol,
    pub error: String,
}

/// Merged result of one aggregation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefiSummary {
    pub wallets: Vec<String>,
    pub positions: Vec<DefiPosition>,
    pub total_supplied_usd: Decimal,
    pub total_borrowed_usd: Decimal,
    pub net_value_usd: Decimal,
    pub by_protocol: Vec<ProtocolTotals>,
    pub failures: Vec<FetchFailure>,
    pub prices: PriceMap,
}

/// `0x` followed by 40 hex digits
pub fn is_valid_wallet(address: &str) -> bool {
    let Some(hex) = address.strip_prefix("0x").or_else(|| address.strip_prefix("0X")) else {
        return false;
    };
    hex.len() == 40 && hex.chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const WALLET: &str = "0x52908400098527886e0f7030069857d2e4169ee7";

    #[test]
    fn test_protocol_parse_and_display() {
        for protocol in Protocol::ALL {
            assert_eq!(protocol.to_string().parse::<Protocol>(), Ok(protocol));
        }
        assert_eq!(" AAVE ".parse::<Protocol>(), Ok(Protocol::Aave));
        assert!("sushiswap".parse::<Protocol>().is_err());
    }

    #[test]
    fn test_wallet_validation() {
        assert!(is_valid_wallet(WALLET));
        assert!(is_valid_wallet("0xDE0B295669A9FD93D5F28D9EC85E40F4CB697BAE"));
        assert!(!is_valid_wallet("52908400098527886e0f7030069857d2e4169ee7"));
        assert!(!is_valid_wallet("0x1234"));
        assert!(!is_valid_wallet("0xz2908400098527886e0f7030069857d2e4169ee7"));
    }

    #[test]
    fn test_borrow_valued_negative() {
        let prices = PriceMap::fallback();
        let raw = RawPosition { kind: PositionKind::Borrow, token: "USDC".into(), amount: dec!(1000) };

        let position = DefiPosition::value(WALLET, Protocol::Aave, raw, &prices);
        assert_eq!(position.value_usd, dec!(-1000));
        assert_eq!(position.price_usd, Some(dec!(1)));
    }

    #[test]
    fn test_unknown_token_valued_zero() {
        let prices = PriceMap::fallback();
        let raw = RawPosition { kind: PositionKind::Liquidity, token: "CRV".into(), amount: dec!(10) };

        let position = DefiPosition::value(WALLET, Protocol::Curve, raw, &prices);
        assert_eq!(position.value_usd, Decimal::ZERO);
        assert!(position.price_usd.is_none());
    }

    #[test]
    fn test_overflowing_value_left_unpriced() {
        let prices = PriceMap::fallback();
        let raw = RawPosition { kind: PositionKind::Supply, token: "WETH".into(), amount: Decimal::MAX };

        let position = DefiPosition::value(WALLET, Protocol::Aave, raw, &prices);
        assert_eq!(position.value_usd, Decimal::ZERO);
        assert!(position.price_usd.is_none());
        assert_eq!(position.amount, Decimal::MAX);
    }

    #[test]
    fn test_raw_position_json_shape() {
        let raw: RawPosition = serde_json::from_str(
            r#"{ "kind": "staking", "token": "stETH", "amount": "1.5" }"#,
        ).unwrap();
        assert_eq!(raw.kind, PositionKind::Staking);
        assert_eq!(raw.amount, dec!(1.5));
    }
}
