//! Price Alerts
//!
//! Checks user price alerts against current prices (the cron job behind
//! alert notifications; delivery happens elsewhere).

mod checker;

pub use checker::{load_alerts, AlertChecker, AlertCondition, AlertError, PriceAlert, TriggeredAlert};
