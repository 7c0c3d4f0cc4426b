//! KryptoTrac - crypto portfolio market data CLI

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing_subscriber::{fmt, EnvFilter};

use kryptotrac::adapters::cli::{CheckAlertsCmd, CliApp, Command, MarketsCmd, PositionsCmd, PriceCmd, SearchCmd};
use kryptotrac::adapters::{CoinGeckoClient, CoinGeckoConfig, JsonFilePositionSource};
use kryptotrac::alerts::{load_alerts, AlertChecker};
use kryptotrac::cache::MemoryCache;
use kryptotrac::config::{load_config_or_default, Config};
use kryptotrac::defi::DefiAggregator;
use kryptotrac::pricing::{PriceService, PriceSettings};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (API keys go here, not in the config file)
    dotenvy::dotenv().ok();

    let app = CliApp::parse();
    let config = load_config_or_default(&app.config)
        .with_context(|| format!("Failed to load configuration from {}", app.config.display()))?;
    init_logging(app.verbose, app.debug, &config.logging.level)?;

    let cache = MemoryCache::global();
    let _sweeper = cache.spawn_sweeper(config.sweep_interval());

    let client = CoinGeckoClient::with_config(CoinGeckoConfig::from(&config))
        .context("Failed to create CoinGecko client")?;
    let prices = Arc::new(PriceService::with_cache(
        Arc::new(client),
        cache,
        PriceSettings::from(&config),
    ));

    match app.command {
        Command::Price(cmd) => price_command(&prices, cmd, app.json).await,
        Command::Markets(cmd) => markets_command(&prices, cmd, app.json).await,
        Command::Search(cmd) => search_command(&prices, cmd, app.json).await,
        Command::DefiPrices => defi_prices_command(&prices, app.json).await,
        Command::Positions(cmd) => positions_command(&config, prices, cmd, app.json).await,
        Command::CheckAlerts(cmd) => check_alerts_command(&config, prices, cmd, app.json).await,
    }
}

/// Initialize logging: RUST_LOG wins, then CLI flags, then config level
fn init_logging(verbose: bool, debug: bool, level: &str) -> Result<()> {
    let fallback = if debug {
        "debug"
    } else if verbose {
        "info"
    } else {
        level
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn fmt_opt(value: Option<f64>, decimals: usize) -> String {
    value
        .map(|v| format!("{:.*}", decimals, v))
        .unwrap_or_else(|| "-".to_string())
}

async fn price_command(prices: &PriceService, cmd: PriceCmd, json: bool) -> Result<()> {
    let result: HashMap<String, f64> = if cmd.ids.len() == 1 {
        let price = prices.get_coin_price(&cmd.ids[0]).await;
        [(cmd.ids[0].trim().to_lowercase(), price)].into_iter().collect()
    } else {
        prices.get_coin_prices(&cmd.ids).await
    };

    if json {
        return print_json(&result);
    }

    let mut rows: Vec<_> = result.into_iter().collect();
    rows.sort_by(|a, b| a.0.cmp(&b.0));
    let vs = prices.settings().vs_currency.to_uppercase();
    for (id, price) in rows {
        println!("{:<20} {:>16.4} {}", id, price, vs);
    }
    Ok(())
}

async fn markets_command(prices: &PriceService, cmd: MarketsCmd, json: bool) -> Result<()> {
    let rows = if cmd.ids.is_empty() {
        prices.get_top_coins(cmd.limit).await
    } else {
        prices.get_market_data(&cmd.ids).await
    };

    if json {
        return print_json(&rows);
    }

    if rows.is_empty() {
        println!("No market data available");
        return Ok(());
    }

    println!("{:>4}  {:<8} {:<24} {:>14} {:>9} {:>20}", "#", "SYMBOL", "NAME", "PRICE", "24H %", "MARKET CAP");
    for row in rows {
        println!(
            "{:>4}  {:<8} {:<24} {:>14} {:>9} {:>20}",
            row.market_cap_rank.map(|r| r.to_string()).unwrap_or_else(|| "-".into()),
            row.symbol.to_uppercase(),
            row.name,
            fmt_opt(row.current_price, 4),
            fmt_opt(row.price_change_percentage_24h, 2),
            fmt_opt(row.market_cap, 0),
        );
    }
    Ok(())
}

async fn search_command(prices: &PriceService, cmd: SearchCmd, json: bool) -> Result<()> {
    let coins = prices.search_coins(&cmd.query).await;

    if json {
        return print_json(&coins);
    }

    if coins.is_empty() {
        println!("No coins found for '{}'", cmd.query);
        return Ok(());
    }

    for coin in coins {
        println!(
            "{:<32} {:<10} {:>6}  {}",
            coin.id,
            coin.symbol,
            coin.market_cap_rank.map(|r| r.to_string()).unwrap_or_else(|| "-".into()),
            coin.name,
        );
    }
    Ok(())
}

async fn defi_prices_command(prices: &PriceService, json: bool) -> Result<()> {
    let map = prices.get_defi_prices().await;

    if json {
        return print_json(&map);
    }

    println!("ETH    {}", map.eth);
    println!("STETH  {}", map.steth);
    println!("USDC   {}", map.usdc);
    println!("WETH   {}", map.weth);
    println!("as of  {}", map.timestamp.to_rfc3339());
    Ok(())
}

async fn positions_command(
    config: &Config,
    prices: Arc<PriceService>,
    cmd: PositionsCmd,
    json: bool,
) -> Result<()> {
    let wallets = if cmd.wallets.is_empty() {
        config.defi.wallets.clone()
    } else {
        cmd.wallets
    };
    if wallets.is_empty() {
        bail!("No wallets given. Pass --wallet or set defi.wallets in the config file");
    }

    let path = cmd.file.unwrap_or_else(|| config.defi.positions_path());
    let source = JsonFilePositionSource::from_path(&path)
        .with_context(|| format!("Failed to load positions from {}", path.display()))?;

    let protocols = if cmd.protocols.is_empty() {
        config.defi.protocols.clone()
    } else {
        cmd.protocols
    };

    let aggregator = DefiAggregator::with_protocols(Arc::new(source), prices, protocols);
    let summary = aggregator.aggregate(&wallets).await?;

    if json {
        return print_json(&summary);
    }

    for position in &summary.positions {
        println!(
            "{:<44} {:<9} {:<10} {:<8} {:>18} {:>16.2}",
            position.wallet,
            position.protocol,
            format!("{:?}", position.kind).to_lowercase(),
            position.token,
            position.amount,
            position.value_usd,
        );
    }
    println!();
    for totals in &summary.by_protocol {
        println!(
            "{:<9} supplied {:>14.2}  borrowed {:>14.2}  net {:>14.2}",
            totals.protocol, totals.supplied_usd, totals.borrowed_usd, totals.net_usd,
        );
    }
    println!();
    println!("Total supplied: {:.2} USD", summary.total_supplied_usd);
    println!("Total borrowed: {:.2} USD", summary.total_borrowed_usd);
    println!("Net value:      {:.2} USD", summary.net_value_usd);

    for failure in &summary.failures {
        eprintln!("warning: {} on {} failed: {}", failure.wallet, failure.protocol, failure.error);
    }
    Ok(())
}

async fn check_alerts_command(
    config: &Config,
    prices: Arc<PriceService>,
    cmd: CheckAlertsCmd,
    json: bool,
) -> Result<()> {
    let path = cmd.file.unwrap_or_else(|| config.alerts.alerts_path());
    let alerts = load_alerts(&path)
        .with_context(|| format!("Failed to load alerts from {}", path.display()))?;

    let triggered = AlertChecker::new(prices).check(&alerts).await;

    if json {
        return print_json(&triggered);
    }

    if triggered.is_empty() {
        println!("No alerts triggered ({} checked)", alerts.len());
        return Ok(());
    }

    for hit in &triggered {
        println!(
            "[{}] user {}: {} is {:.4} ({:?} {:.4})",
            hit.alert.id,
            hit.alert.user_id,
            hit.alert.coin_id,
            hit.price,
            hit.alert.condition,
            hit.alert.target_price,
        );
    }
    Ok(())
}
