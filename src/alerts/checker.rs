//! Price Alert Checker
//!
//! Evaluates user price alerts against current prices. All coins referenced
//! by active alerts are priced in a single batched lookup.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::pricing::PriceService;

#[derive(Debug, Error)]
pub enum AlertError {
    #[error("Failed to read alerts file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse alerts: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid alert {id}: {reason}")]
    Invalid { id: String, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertCondition {
    /// Fires when price >= target
    Above,
    /// Fires when price <= target
    Below,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceAlert {
    pub id: String,
    pub user_id: String,
    pub coin_id: String,
    pub condition: AlertCondition,
    pub target_price: f64,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl PriceAlert {
    /// Whether `price` satisfies the alert condition
    ///
    /// A zero price means the coin could not be priced and never triggers.
    pub fn is_triggered_by(&self, price: f64) -> bool {
        if price <= 0.0 {
            return false;
        }
        match self.condition {
            AlertCondition::Above => price >= self.target_price,
            AlertCondition::Below => price <= self.target_price,
        }
    }

    fn validate(&self) -> Result<(), AlertError> {
        if self.coin_id.trim().is_empty() {
            return Err(AlertError::Invalid {
                id: self.id.clone(),
                reason: "coin_id cannot be empty".into(),
            });
        }
        if !self.target_price.is_finite() || self.target_price <= 0.0 {
            return Err(AlertError::Invalid {
                id: self.id.clone(),
                reason: format!("target_price must be > 0, got {}", self.target_price),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggeredAlert {
    pub alert: PriceAlert,
    pub price: f64,
    pub triggered_at: DateTime<Utc>,
}

/// Load and validate alerts from a JSON array file
pub fn load_alerts(path: &Path) -> Result<Vec<PriceAlert>, AlertError> {
    let content = fs::read_to_string(path)?;
    let alerts: Vec<PriceAlert> = serde_json::from_str(&content)?;
    for alert in &alerts {
        alert.validate()?;
    }
    Ok(alerts)
}

pub struct AlertChecker {
    prices: Arc<PriceService>,
}

impl AlertChecker {
    pub fn new(prices: Arc<PriceService>) -> Self {
        Self { prices }
    }

    /// Return the active alerts whose condition currently holds
    pub async fn check(&self, alerts: &[PriceAlert]) -> Vec<TriggeredAlert> {
        let active: Vec<&PriceAlert> = alerts.iter().filter(|a| a.active).collect();
        if active.is_empty() {
            debug!("No active alerts to check");
            return Vec::new();
        }

        let coin_ids: Vec<String> = active
            .iter()
            .map(|a| a.coin_id.trim().to_lowercase())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let prices = self.prices.get_coin_prices(&coin_ids).await;
        let now = Utc::now();

        let triggered: Vec<TriggeredAlert> = active
            .into_iter()
            .filter_map(|alert| {
                let price = prices
                    .get(&alert.coin_id.trim().to_lowercase())
                    .copied()
                    .unwrap_or(0.0);
                alert.is_triggered_by(price).then(|| TriggeredAlert {
                    alert: alert.clone(),
                    price,
                    triggered_at: now,
                })
            })
            .collect();

        info!(
            checked = alerts.len(),
            coins = coin_ids.len(),
            triggered = triggered.len(),
            "Checked price alerts"
        );
        triggered
    }
}
