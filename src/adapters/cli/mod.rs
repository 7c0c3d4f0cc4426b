//! CLI Adapter
//!
//! Command-line interface for KryptoTrac.
//! Uses clap derive macros for argument parsing.

mod commands;

pub use commands::{CliApp, Command, PriceCmd, MarketsCmd, SearchCmd, PositionsCmd, CheckAlertsCmd};
