//! CLI Command Definitions
//!
//! Argument structures for every KryptoTrac command.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::defi::Protocol;

/// KryptoTrac - crypto portfolio market data tools
#[derive(Parser, Debug)]
#[command(
    name = "kryptotrac",
    version = env!("CARGO_PKG_VERSION"),
    author = env!("CARGO_PKG_AUTHORS"),
    about = "Cached CoinGecko prices, market tables and DeFi position aggregation",
    long_about = "KryptoTrac looks up coin prices through a TTL cache with static fallbacks, \
                  aggregates DeFi positions across wallets and protocols, and checks price alerts."
)]
pub struct CliApp {
    /// The command to execute
    #[command(subcommand)]
    pub command: Command,

    /// Path to configuration file
    #[arg(short, long, global = true, value_name = "FILE", default_value = "config/kryptotrac.toml")]
    pub config: PathBuf,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Current price of one or more coins
    Price(PriceCmd),

    /// Market table (top coins or specific ids)
    Markets(MarketsCmd),

    /// Search coins by name or symbol
    Search(SearchCmd),

    /// ETH / stETH / USDC / WETH snapshot used for DeFi valuation
    DefiPrices,

    /// Aggregate DeFi positions across wallets and protocols
    Positions(PositionsCmd),

    /// Evaluate price alerts against current prices
    CheckAlerts(CheckAlertsCmd),
}

/// Look up coin prices
#[derive(Parser, Debug)]
pub struct PriceCmd {
    /// CoinGecko coin ids (e.g. bitcoin ethereum)
    #[arg(value_name = "ID", required = true)]
    pub ids: Vec<String>,
}

/// Show a market table
#[derive(Parser, Debug)]
pub struct MarketsCmd {
    /// Restrict to these coin ids (comma separated)
    #[arg(long, value_name = "IDS", value_delimiter = ',')]
    pub ids: Vec<String>,

    /// Number of top coins when no ids are given
    #[arg(short, long, value_name = "N", default_value = "20")]
    pub limit: u32,
}

/// Search coins
#[derive(Parser, Debug)]
pub struct SearchCmd {
    /// Free-text query
    #[arg(value_name = "QUERY")]
    pub query: String,
}

/// Aggregate DeFi positions
#[derive(Parser, Debug)]
pub struct PositionsCmd {
    /// Wallet addresses (defaults to `defi.wallets` from config)
    #[arg(short, long = "wallet", value_name = "ADDRESS")]
    pub wallets: Vec<String>,

    /// Override the positions snapshot file
    #[arg(long, value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Only query these protocols (comma separated)
    #[arg(long, value_name = "PROTOCOLS", value_delimiter = ',')]
    pub protocols: Vec<Protocol>,
}

/// Check price alerts
#[derive(Parser, Debug)]
pub struct CheckAlertsCmd {
    /// Override the alerts file
    #[arg(long, value_name = "FILE")]
    pub file: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        CliApp::command().debug_assert();
    }

    #[test]
    fn test_parse_price_command() {
        let app = CliApp::parse_from(["kryptotrac", "price", "bitcoin", "ethereum", "--json"]);
        assert!(app.json);
        match app.command {
            Command::Price(cmd) => assert_eq!(cmd.ids, vec!["bitcoin", "ethereum"]),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_positions_command() {
        let app = CliApp::parse_from([
            "kryptotrac",
            "positions",
            "--wallet",
            "0x52908400098527886e0f7030069857d2e4169ee7",
            "--protocols",
            "aave,lido",
        ]);
        match app.command {
            Command::Positions(cmd) => {
                assert_eq!(cmd.wallets.len(), 1);
                assert_eq!(cmd.protocols, vec![Protocol::Aave, Protocol::Lido]);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_markets_ids_split_on_comma() {
        let app = CliApp::parse_from(["kryptotrac", "markets", "--ids", "bitcoin,solana"]);
        match app.command {
            Command::Markets(cmd) => {
                assert_eq!(cmd.ids, vec!["bitcoin", "solana"]);
                assert_eq!(cmd.limit, 20);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
