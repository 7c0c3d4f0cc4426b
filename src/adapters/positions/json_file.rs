//! JSON Snapshot Position Source
//!
//! Serves raw DeFi balances from a snapshot file shaped as
//! `{ "<wallet>": { "<protocol>": [ { "kind", "token", "amount" } ] } }`.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use async_trait::async_trait;

use crate::defi::{is_valid_wallet, Protocol, RawPosition};
use crate::ports::positions::{PositionSourceError, PositionSourcePort};

type Snapshot = HashMap<String, HashMap<Protocol, Vec<RawPosition>>>;

/// In-memory position source loaded from a JSON snapshot
#[derive(Debug, Clone, Default)]
pub struct JsonFilePositionSource {
    wallets: Snapshot,
}

impl JsonFilePositionSource {
    /// Load a snapshot file
    pub fn from_path(path: &Path) -> Result<Self, PositionSourceError> {
        let content = fs::read_to_string(path)?;
        let source = Self::from_json(&content)?;
        tracing::info!(
            path = %path.display(),
            wallets = source.wallets.len(),
            "Loaded position snapshot"
        );
        Ok(source)
    }

    /// Parse a snapshot document
    ///
    /// Wallet keys are lowercased; keys that are not addresses are rejected.
    pub fn from_json(content: &str) -> Result<Self, PositionSourceError> {
        let raw: Snapshot = serde_json::from_str(content)
            .map_err(|e| PositionSourceError::Parse(e.to_string()))?;

        let mut wallets = Snapshot::with_capacity(raw.len());
        for (wallet, protocols) in raw {
            if !is_valid_wallet(&wallet) {
                return Err(PositionSourceError::Parse(format!(
                    "invalid wallet key: {}",
                    wallet
                )));
            }
            wallets
                .entry(wallet.to_ascii_lowercase())
                .or_default()
                .extend(protocols);
        }

        Ok(Self { wallets })
    }

    pub fn wallets(&self) -> Vec<String> {
        let mut wallets: Vec<String> = self.wallets.keys().cloned().collect();
        wallets.sort();
        wallets
    }
}

#[async_trait]
impl PositionSourcePort for JsonFilePositionSource {
    async fn fetch_positions(
        &self,
        wallet: &str,
        protocol: Protocol,
    ) -> Result<Vec<RawPosition>, PositionSourceError> {
        Ok(self
            .wallets
            .get(&wallet.to_ascii_lowercase())
            .and_then(|protocols| protocols.get(&protocol))
            .cloned()
            .unwrap_or_default())
    }
}
