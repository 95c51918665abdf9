//! Command-line entry point for the cross-venue funding-rate arbitrage
//! engine: loads configuration, wires the sign store and venue adapters,
//! and runs the cycle scheduler until interrupted.

mod fixture;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use funding_arb_core::{ConfigLoader, VenueAdapter};
use funding_arb_scheduler::CycleScheduler;
use funding_arb_signstore::SignStore;

use fixture::{FixtureVenue, SymbolQuote};

#[derive(Parser, Debug)]
#[command(name = "funding-arb", about = "Cross-venue funding-rate arbitrage engine")]
struct Cli {
    /// Path to a TOML config file; overridden by `FUNDING_ARB_*` env vars.
    #[arg(long, global = true, env = "FUNDING_ARB_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the cycle scheduler.
    Run {
        /// Path to the durable sign-store JSON file.
        #[arg(long, default_value = "data/funding_diff_signs.json")]
        sign_store_path: PathBuf,
    },
    /// Load and print the effective configuration, then exit.
    PrintConfig,
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}

/// Deterministic fixture quotes: BTC carries a funding differential large
/// enough to trigger the default `funding_only` open condition, ETH does
/// not, so a demonstration run exercises both the open and no-op paths.
fn fixture_quotes_a() -> HashMap<String, SymbolQuote> {
    use rust_decimal_macros::dec;
    HashMap::from([
        ("BTC".to_string(), SymbolQuote { price: dec!(65000), funding_rate: dec!(0.0004) }),
        ("ETH".to_string(), SymbolQuote { price: dec!(3200), funding_rate: dec!(0.00001) }),
    ])
}

fn fixture_quotes_b() -> HashMap<String, SymbolQuote> {
    use rust_decimal_macros::dec;
    HashMap::from([
        ("BTC".to_string(), SymbolQuote { price: dec!(64950), funding_rate: dec!(0.00002) }),
        ("ETH".to_string(), SymbolQuote { price: dec!(3198), funding_rate: dec!(0.000012) }),
    ])
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = match cli.config.as_deref() {
        Some(path) => ConfigLoader::load_from(path),
        None => ConfigLoader::load(),
    }
    .context("failed to load strategy configuration")?;

    match cli.command {
        Command::PrintConfig => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
        Command::Run { sign_store_path } => {
            let sign_store = Arc::new(SignStore::open(sign_store_path));
            let venue_a: Arc<dyn VenueAdapter> = Arc::new(FixtureVenue::new("venue_a", fixture_quotes_a()));
            let venue_b: Arc<dyn VenueAdapter> = Arc::new(FixtureVenue::new("venue_b", fixture_quotes_b()));

            let scheduler = CycleScheduler::new(venue_a, venue_b, sign_store, config);
            let stop = scheduler.stop_handle();

            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::info!("received interrupt, requesting graceful shutdown");
                    stop.store(true, std::sync::atomic::Ordering::SeqCst);
                }
            });

            scheduler.run().await;
            Ok(())
        }
    }
}
