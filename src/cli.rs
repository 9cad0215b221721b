//! Command-line front-end over the broker facade.

use crate::broker::PrimeBroker;
use crate::config::{BuilderSetting, Config, DEFAULT_KEY_ENV};
use crate::domain::{AggregatedBook, Decimal, PerpMarket, Side, TimeMs};
use crate::error::RouteError;
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;

/// Funding lookback window for the `funding` command: one day.
const FUNDING_LOOKBACK_MS: i64 = 24 * 60 * 60 * 1000;

#[derive(Parser, Debug)]
#[command(
    name = "hyperprime",
    version,
    about = "Prime-broker routing over fragmented perpetual markets"
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug)]
pub struct GlobalArgs {
    #[arg(long, help = "Use the testnet API")]
    pub testnet: bool,

    #[arg(long, value_name = "HEX", help = "Signing key (prefer --key-env)")]
    pub key: Option<String>,

    #[arg(
        long,
        value_name = "NAME",
        default_value = DEFAULT_KEY_ENV,
        help = "Environment variable holding the signing key"
    )]
    pub key_env: String,

    #[arg(
        long,
        value_name = "LEVEL",
        help = "debug, info, warn, error, or silent (default info)"
    )]
    pub log_level: Option<String>,

    #[arg(long, help = "Print results as JSON")]
    pub json: bool,

    #[arg(long, help = "Disable the default builder fee")]
    pub no_builder_fee: bool,

    #[arg(long, value_name = "FRACTION", help = "Slippage tolerance, e.g. 0.01")]
    pub slippage: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List every market trading an asset
    Markets { asset: String },
    /// Show the merged orderbook for an asset
    Book {
        asset: String,
        #[arg(long, default_value_t = 10)]
        depth: usize,
    },
    /// Show funding rates across an asset's markets
    Funding { asset: String },
    /// Route an order without executing it
    Quote {
        asset: String,
        side: SideArg,
        size: String,
    },
    /// Buy an asset, splitting across markets when it pays
    Long { asset: String, size: String },
    /// Sell an asset, splitting across markets when it pays
    Short { asset: String, size: String },
    /// Show open positions grouped by asset
    Positions,
    /// Show perp and spot balances
    Balance,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SideArg {
    Buy,
    Sell,
}

impl From<SideArg> for Side {
    fn from(side: SideArg) -> Self {
        match side {
            SideArg::Buy => Side::Buy,
            SideArg::Sell => Side::Sell,
        }
    }
}

/// Translate CLI arguments into a client configuration. The environment
/// is read first through `Config::from_env` (the key under the variable
/// named by `--key-env`); explicit flags override it.
pub fn build_config(global: &GlobalArgs) -> Result<Config, RouteError> {
    let mut config = Config::from_env(&global.key_env)?;
    if let Some(key) = &global.key {
        config.private_key = Some(key.clone());
    }
    if global.testnet {
        config.testnet = true;
    }
    if let Some(raw) = &global.log_level {
        config.log_level = raw.parse().map_err(RouteError::InvalidConfig)?;
    }
    if let Some(raw) = &global.slippage {
        config.default_slippage = parse_decimal(raw, "slippage")?;
    }
    if global.no_builder_fee {
        config.builder = BuilderSetting::Disabled;
    }
    config.validated()
}

pub async fn run(cli: Cli, config: Config) -> Result<(), RouteError> {
    let json = cli.global.json;
    let broker = PrimeBroker::connect(config).await?;

    match cli.command {
        Command::Markets { asset } => {
            let markets = broker.markets(&asset)?;
            if json {
                print_json(&markets)?;
            } else {
                print_markets(&markets);
            }
        }
        Command::Book { asset, depth } => {
            let book = broker.book(&asset).await?;
            if json {
                print_json(&book)?;
            } else {
                print_book(&book, depth);
            }
        }
        Command::Funding { asset } => {
            let start_ms = TimeMs::now().as_i64() - FUNDING_LOOKBACK_MS;
            let funding = broker.funding(&asset, start_ms, None).await?;
            if json {
                print_json(&funding)?;
            } else {
                println!(
                    "{:<14} {:<12} {:>14} {:>8}",
                    "COIN", "DEX", "CURRENT", "SAMPLES"
                );
                for market_funding in &funding {
                    println!(
                        "{:<14} {:<12} {:>14} {:>8}",
                        market_funding.market.coin,
                        market_funding.market.dex_name,
                        market_funding.market.funding,
                        market_funding.history.len()
                    );
                    if let Some(latest) = market_funding.history.last() {
                        println!(
                            "    latest {} at {}",
                            latest.funding_rate,
                            latest.time.as_i64()
                        );
                    }
                }
            }
        }
        Command::Quote { asset, side, size } => {
            let size = parse_decimal(&size, "size")?;
            let quote = broker.quote(&asset, side.into(), size).await?;
            if json {
                print_json(&quote)?;
            } else {
                println!(
                    "{} {} {} via {} ({})",
                    quote.side, quote.requested_size, quote.base_asset,
                    quote.selected_market.coin, quote.selected_market.dex_name
                );
                println!("  avg price    {}", quote.estimated_avg_price);
                println!("  impact       {} bps", quote.estimated_price_impact_bps.round_dp(3));
                println!("  funding      {}", quote.estimated_funding_rate);
                println!("  limit (ioc)  {}", quote.plan.limit_price);
                for alt in &quote.alternatives_considered {
                    println!(
                        "  candidate    {:<14} score {}",
                        alt.market.coin,
                        alt.total_score.round_dp(3)
                    );
                }
                for warning in &quote.warnings {
                    println!("  warning: {}", warning);
                }
            }
        }
        Command::Long { asset, size } => {
            place(&broker, &asset, Side::Buy, &size, json).await?;
        }
        Command::Short { asset, size } => {
            place(&broker, &asset, Side::Sell, &size, json).await?;
        }
        Command::Positions => {
            let grouped = broker.grouped_positions().await?;
            if json {
                print_json(&grouped)?;
            } else if grouped.is_empty() {
                println!("no open positions");
            } else {
                let mut assets: Vec<&String> = grouped.keys().collect();
                assets.sort();
                for asset in assets {
                    println!("{}", asset);
                    for p in &grouped[asset] {
                        println!(
                            "  {:<14} {:<5} {:>12} @ {}  upnl {}",
                            p.coin,
                            p.side,
                            p.size,
                            p.entry_price
                                .map(|px| px.to_string())
                                .unwrap_or_else(|| "-".to_string()),
                            p.unrealized_pnl
                        );
                    }
                }
            }
        }
        Command::Balance => {
            let (perp, spot) = broker.balances().await?;
            if json {
                print_json(&serde_json::json!({ "perp": perp, "spot": spot }))?;
            } else {
                println!("perp account value {}", perp.margin_summary.account_value);
                println!("perp withdrawable  {}", perp.withdrawable);
                for balance in &spot.balances {
                    println!("spot {:<8} {}", balance.coin, balance.total);
                }
            }
        }
    }
    Ok(())
}

async fn place(
    broker: &PrimeBroker,
    asset: &str,
    side: Side,
    size: &str,
    json: bool,
) -> Result<(), RouteError> {
    let size = parse_decimal(size, "size")?;
    let (quote, receipt) = broker.place(asset, side, size).await?;
    if json {
        print_json(&serde_json::json!({ "quote": quote, "receipt": receipt }))?;
    } else {
        println!(
            "{} {} {} across {} market(s), est avg {}",
            side,
            size,
            quote.base_asset,
            quote.plan.legs.len(),
            quote.estimated_avg_price
        );
        for leg in &receipt.legs {
            let outcome = if leg.success {
                format!(
                    "filled {} @ {}",
                    leg.filled_size,
                    leg.avg_price
                        .map(|px| px.to_string())
                        .unwrap_or_else(|| "-".to_string())
                )
            } else {
                format!("failed: {}", leg.error.as_deref().unwrap_or("unknown"))
            };
            println!("  {:<14} {}", leg.coin, outcome);
        }
        if let Some(collateral) = &receipt.collateral {
            for swap in &collateral.swaps_executed {
                println!("  swapped {} {} (requested {})", swap.filled, swap.token, swap.requested);
            }
        }
    }
    if !receipt.success {
        return Err(RouteError::Execution {
            message: receipt
                .error
                .unwrap_or_else(|| "one or more legs failed".to_string()),
            raw: None,
        });
    }
    Ok(())
}

fn print_markets(markets: &[PerpMarket]) {
    println!(
        "{:<14} {:<12} {:>8} {:<8} {:>12} {:>14}",
        "COIN", "DEX", "INDEX", "MARGIN", "MARK", "FUNDING"
    );
    for market in markets {
        println!(
            "{:<14} {:<12} {:>8} {:<8} {:>12} {:>14}",
            market.coin,
            market.dex_name,
            market.asset_index,
            market.collateral,
            market.mark_price,
            market.funding
        );
    }
}

fn print_book(book: &AggregatedBook, depth: usize) {
    println!("{} ({} markets)", book.base_asset, book.per_market_books.len());
    println!("{:>14} {:>12}   {:>14} {:>12}", "BID", "SIZE", "ASK", "SIZE");
    let rows = depth.max(1);
    for i in 0..rows {
        let bid = book.bids.get(i);
        let ask = book.asks.get(i);
        if bid.is_none() && ask.is_none() {
            break;
        }
        let (bid_px, bid_sz) = bid
            .map(|l| (l.px.to_string(), l.total_size.to_string()))
            .unwrap_or_default();
        let (ask_px, ask_sz) = ask
            .map(|l| (l.px.to_string(), l.total_size.to_string()))
            .unwrap_or_default();
        println!("{:>14} {:>12}   {:>14} {:>12}", bid_px, bid_sz, ask_px, ask_sz);
    }
    for coin in &book.failed_coins {
        println!("warning: no data from {}", coin);
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), RouteError> {
    let rendered = serde_json::to_string_pretty(value).map_err(|e| RouteError::Execution {
        message: format!("serialization failed: {}", e),
        raw: None,
    })?;
    println!("{}", rendered);
    Ok(())
}

fn parse_decimal(raw: &str, label: &str) -> Result<Decimal, RouteError> {
    Decimal::from_str_canonical(raw)
        .map_err(|_| RouteError::InvalidConfig(format!("invalid {}: {}", label, raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_quote_command() {
        let cli = Cli::try_parse_from(["hyperprime", "quote", "TSLA", "buy", "3"]).unwrap();
        match cli.command {
            Command::Quote { asset, side, size } => {
                assert_eq!(asset, "TSLA");
                assert!(matches!(side, SideArg::Buy));
                assert_eq!(size, "3");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_global_flags() {
        let cli = Cli::try_parse_from([
            "hyperprime",
            "--testnet",
            "--json",
            "--no-builder-fee",
            "--slippage",
            "0.02",
            "book",
            "TSLA",
            "--depth",
            "5",
        ])
        .unwrap();
        assert!(cli.global.testnet);
        assert!(cli.global.json);
        assert!(cli.global.no_builder_fee);
        match cli.command {
            Command::Book { asset, depth } => {
                assert_eq!(asset, "TSLA");
                assert_eq!(depth, 5);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_key_env_default() {
        let cli = Cli::try_parse_from(["hyperprime", "positions"]).unwrap();
        assert_eq!(cli.global.key_env, DEFAULT_KEY_ENV);
    }

    #[test]
    fn test_build_config_applies_flags() {
        let cli = Cli::try_parse_from([
            "hyperprime",
            "--testnet",
            "--no-builder-fee",
            "--slippage",
            "0.02",
            "balance",
        ])
        .unwrap();
        let config = build_config(&cli.global).unwrap();
        assert!(config.testnet);
        assert_eq!(config.builder, BuilderSetting::Disabled);
        assert_eq!(config.default_slippage, "0.02".parse().unwrap());
    }

    #[test]
    fn test_build_config_log_level_flag() {
        let cli =
            Cli::try_parse_from(["hyperprime", "--log-level", "warn", "balance"]).unwrap();
        let config = build_config(&cli.global).unwrap();
        assert_eq!(config.log_level, crate::config::LogLevel::Warn);
    }

    #[test]
    fn test_build_config_rejects_bad_slippage() {
        let cli =
            Cli::try_parse_from(["hyperprime", "--slippage", "lots", "balance"]).unwrap();
        assert!(matches!(
            build_config(&cli.global),
            Err(RouteError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_invalid_side_rejected() {
        assert!(Cli::try_parse_from(["hyperprime", "quote", "TSLA", "hold", "3"]).is_err());
    }
}
