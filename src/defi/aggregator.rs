//! DeFi Position Aggregator
//!
//! Fans out one fetch per (wallet, protocol) pair, values every position
//! against a single price snapshot and merges the results.
//! A failed fetch is recorded in the summary and never aborts the run.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use futures::future::join_all;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::ports::positions::PositionSourcePort;
use crate::pricing::PriceService;

use super::types::{
    is_valid_wallet, DefiPosition, DefiSummary, FetchFailure, Protocol, ProtocolTotals,
};

#[derive(Debug, Error, PartialEq)]
pub enum DefiError {
    #[error("Invalid wallet address: {0}")]
    InvalidWallet(String),
    #[error("No wallets given")]
    NoWallets,
    #[error("No protocols enabled")]
    NoProtocols,
}

/// Aggregates positions across wallets and protocols
pub struct DefiAggregator {
    source: Arc<dyn PositionSourcePort>,
    prices: Arc<PriceService>,
    protocols: Vec<Protocol>,
}

impl DefiAggregator {
    /// Aggregator over every supported protocol
    pub fn new(source: Arc<dyn PositionSourcePort>, prices: Arc<PriceService>) -> Self {
        Self::with_protocols(source, prices, Protocol::ALL.to_vec())
    }

    pub fn with_protocols(
        source: Arc<dyn PositionSourcePort>,
        prices: Arc<PriceService>,
        protocols: Vec<Protocol>,
    ) -> Self {
        let mut seen = HashSet::new();
        let protocols = protocols.into_iter().filter(|p| seen.insert(*p)).collect();
        Self { source, prices, protocols }
    }

    pub fn protocols(&self) -> &[Protocol] {
        &self.protocols
    }

    /// Fetch, value and merge positions for `wallets`
    pub async fn aggregate(&self, wallets: &[String]) -> Result<DefiSummary, DefiError> {
        let wallets = normalize_wallets(wallets)?;
        if self.protocols.is_empty() {
            return Err(DefiError::NoProtocols);
        }

        let prices = self.prices.get_defi_prices().await;
        info!(
            wallets = wallets.len(),
            protocols = self.protocols.len(),
            "Aggregating DeFi positions"
        );

        let fetches = wallets.iter().flat_map(|wallet| {
            self.protocols.iter().map(move |&protocol| {
                let source = Arc::clone(&self.source);
                async move {
                    let result = source.fetch_positions(wallet, protocol).await;
                    (wallet, protocol, result)
                }
            })
        });

        let mut positions = Vec::new();
        let mut failures = Vec::new();

        for (wallet, protocol, result) in join_all(fetches).await {
            match result {
                Ok(raw) => {
                    debug!(wallet = %wallet, %protocol, count = raw.len(), "Fetched positions");
                    for raw in raw {
                        let position = DefiPosition::value(wallet, protocol, raw, &prices);
                        if position.price_usd.is_none() {
                            warn!(token = %position.token, %protocol, "No price for token, valued at 0");
                        }
                        positions.push(position);
                    }
                }
                Err(e) => {
                    warn!(wallet = %wallet, %protocol, error = %e, "Position fetch failed");
                    failures.push(FetchFailure {
                        wallet: wallet.clone(),
                        protocol,
                        error: e.to_string(),
                    });
                }
            }
        }

        positions.sort_by(|a, b| b.value_usd.abs().cmp(&a.value_usd.abs()));

        let by_protocol = protocol_totals(&positions);
        let total_supplied_usd = by_protocol
            .iter()
            .fold(Decimal::ZERO, |acc, t| acc.saturating_add(t.supplied_usd));
        let total_borrowed_usd = by_protocol
            .iter()
            .fold(Decimal::ZERO, |acc, t| acc.saturating_add(t.borrowed_usd));

        Ok(DefiSummary {
            wallets,
            positions,
            total_supplied_usd,
            total_borrowed_usd,
            net_value_usd: total_supplied_usd.saturating_sub(total_borrowed_usd),
            by_protocol,
            failures,
            prices,
        })
    }
}

/// Lowercase, validate and de-duplicate wallet addresses, keeping order
fn normalize_wallets(wallets: &[String]) -> Result<Vec<String>, DefiError> {
    let mut seen = HashSet::new();
    let mut result = Vec::with_capacity(wallets.len());

    for wallet in wallets {
        let wallet = wallet.trim();
        if !is_valid_wallet(wallet) {
            return Err(DefiError::InvalidWallet(wallet.to_string()));
        }
        let wallet = wallet.to_ascii_lowercase();
        if seen.insert(wallet.clone()) {
            result.push(wallet);
        }
    }

    if result.is_empty() {
        return Err(DefiError::NoWallets);
    }
    Ok(result)
}

fn protocol_totals(positions: &[DefiPosition]) -> Vec<ProtocolTotals> {
    let mut totals: BTreeMap<Protocol, ProtocolTotals> = BTreeMap::new();

    for position in positions {
        let entry = totals.entry(position.protocol).or_insert_with(|| ProtocolTotals {
            protocol: position.protocol,
            supplied_usd: Decimal::ZERO,
            borrowed_usd: Decimal::ZERO,
            net_usd: Decimal::ZERO,
            position_count: 0,
        });

        // Totals saturate at the Decimal bounds
        if position.kind.is_debt() {
            entry.borrowed_usd = entry.borrowed_usd.saturating_add(position.value_usd.abs());
        } else {
            entry.supplied_usd = entry.supplied_usd.saturating_add(position.value_usd);
        }
        entry.net_usd = entry.net_usd.saturating_add(position.value_usd);
        entry.position_count += 1;
    }

    totals.into_values().collect()
}
