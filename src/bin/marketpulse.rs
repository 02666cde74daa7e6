use marketpulse::config::Config;
use marketpulse::services::fetch_service::FetchService;
use marketpulse::services::ticker::TickerController;

use clap::{Arg, ArgMatches, Command};
use log::{info, warn};
use serde::Serialize;
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn build_cli() -> Command<'static> {
    Command::new("MarketPulse")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Market data fetcher with fallback sources and demo data")
        .subcommand(Command::new("market").about("Fetch the market overview"))
        .subcommand(
            Command::new("search")
                .about("Search stocks by symbol or company name")
                .arg(
                    Arg::new("query")
                        .short('q')
                        .long("query")
                        .value_name("QUERY")
                        .help("Symbol or company name to search for")
                        .required(true)
                        .takes_value(true),
                ),
        )
        .subcommand(
            Command::new("quote")
                .about("Fetch a single stock quote")
                .arg(
                    Arg::new("symbol")
                        .short('s')
                        .long("symbol")
                        .value_name("SYMBOL")
                        .help("NSE symbol, e.g. TCS")
                        .required(true)
                        .takes_value(true),
                ),
        )
        .subcommand(
            Command::new("news")
                .about("Fetch market news")
                .arg(
                    Arg::new("topic")
                        .short('t')
                        .long("topic")
                        .value_name("TOPIC")
                        .help("Symbol or topic to filter news by (optional)")
                        .takes_value(true),
                ),
        )
        .subcommand(
            Command::new("watch")
                .about("Poll the market overview periodically")
                .arg(
                    Arg::new("interval")
                        .short('i')
                        .long("interval")
                        .value_name("SECONDS")
                        .help("Polling interval in seconds (defaults to MARKETPULSE_POLL_SECS or 30)")
                        .takes_value(true),
                )
                .arg(
                    Arg::new("ticks")
                        .short('n')
                        .long("ticks")
                        .value_name("TICKS")
                        .help("Number of snapshots to print before exiting")
                        .takes_value(true)
                        .default_value("5"),
                ),
        )
}

/// watch 子命令的 (次数, 间隔)，间隔未给出时用配置值
fn watch_args(matches: &ArgMatches) -> Result<(usize, Option<Duration>), Box<dyn Error>> {
    let ticks = matches.value_of("ticks").unwrap_or("5").parse::<usize>()?;
    let interval = match matches.value_of("interval") {
        Some(secs) => Some(Duration::from_secs(secs.parse::<u64>()?)),
        None => None,
    };
    Ok((ticks, interval))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let matches = build_cli().get_matches();

    let config = Config::from_env()?;
    let service = Arc::new(FetchService::from_config(config)?);

    if matches.subcommand_matches("market").is_some() {
        let result = service.fetch_market_snapshot().await;
        info!("Market overview [{}] from {}", result.provenance.badge(), result.source);
        print_json(&result)?;
    } else if let Some(matches) = matches.subcommand_matches("search") {
        let query = matches.value_of("query").unwrap_or_default();
        let result = service.search_quotes(query).await;
        info!("Found {} stock(s) [{}]", result.data.len(), result.provenance.badge());
        print_json(&result)?;
    } else if let Some(matches) = matches.subcommand_matches("quote") {
        let symbol = matches.value_of("symbol").unwrap_or_default();
        let result = service.fetch_quote(symbol).await;
        print_json(&result)?;
    } else if let Some(matches) = matches.subcommand_matches("news") {
        let result = service.fetch_news(matches.value_of("topic")).await;
        if !result.is_live() {
            warn!("Using offline data for news");
        }
        print_json(&result)?;
    } else if let Some(matches) = matches.subcommand_matches("watch") {
        let (ticks, interval) = watch_args(matches)?;

        let mut ticker = match interval {
            Some(interval) => TickerController::new(service.clone(), interval),
            None => TickerController::with_config_interval(service.clone()),
        };

        let mut rx = ticker.subscribe();
        ticker.start();

        for _ in 0..ticks {
            if rx.changed().await.is_err() {
                break;
            }
            let latest = rx.borrow_and_update().clone();
            if let Some(result) = latest {
                info!("Snapshot [{}] from {}", result.provenance.badge(), result.source);
                print_json(&result)?;
            }
        }

        ticker.stop();
    } else {
        info!("No command specified. Use --help for usage information.");
    }

    Ok(())
}
