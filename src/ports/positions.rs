use async_trait::async_trait;
use thiserror::Error;

use crate::defi::{Protocol, RawPosition};

/// Position source error type
#[derive(Error, Debug)]
pub enum PositionSourceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Data parsing error: {0}")]
    Parse(String),

    #[error("Source unavailable for {protocol}: {reason}")]
    Unavailable { protocol: Protocol, reason: String },
}

/// Read-only source of protocol balances for a wallet
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PositionSourcePort: Send + Sync {
    /// Raw positions `wallet` holds in `protocol` (empty if none)
    async fn fetch_positions(&self, wallet: &str, protocol: Protocol)
        -> Result<Vec<RawPosition>, PositionSourceError>;
}
