//! Ratekeeper CLI
//!
//! Ask the FX engine for conversions and rate tables from the command line.
//! Results are printed as JSON on stdout; logs go to stderr.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ratekeeper_common::ServiceError;
use ratekeeper_fx::{FallbackRateTable, FxEngine, HttpRateProvider, RateTableSnapshot};

mod config;
mod input;

use config::CliConfig;

/// Ratekeeper CLI
#[derive(Parser, Debug)]
#[command(name = "ratekeeper")]
#[command(about = "Exchange rates with caching and fallback")]
struct Args {
    /// Upstream rate service (overrides RATEKEEPER_PROVIDER_URL)
    #[arg(long)]
    provider_url: Option<String>,

    /// Upstream timeout in seconds
    #[arg(long)]
    timeout: Option<i64>,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    /// Print engine statistics to stderr when done
    #[arg(long)]
    stats: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert an amount from one currency to another
    Convert {
        from: String,
        to: String,
        amount: f64,
    },
    /// Show the rate table for a base currency
    Rates {
        base: String,
        /// Comma-separated currencies to keep, e.g. GBP,JPY
        #[arg(long)]
        currencies: Option<String>,
    },
    /// Show the built-in fallback table
    Fallback,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = CliConfig::from_env();
    if let Some(url) = &args.provider_url {
        config.provider.base_url = url.clone();
    }
    if let Some(secs) = args.timeout {
        config
            .set_provider_timeout_secs(secs)
            .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;
    }
    config.json_logs |= args.json_logs;

    init_logging(&config);

    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid configuration");
        return Err(anyhow::anyhow!("Configuration error: {}", e));
    }

    let provider = Arc::new(HttpRateProvider::new(config.provider.clone())?);
    let engine = FxEngine::new(provider, config.engine.clone());

    let outcome = run(&engine, args.command).await;

    if args.stats {
        eprintln!("{:#?}", engine.stats());
    }

    match outcome {
        Ok(body) => {
            println!("{}", serde_json::to_string_pretty(&body)?);
            Ok(())
        }
        Err(e) => {
            let body = json!({
                "error": {
                    "code": e.error_code(),
                    "status": e.status_code(),
                    "message": e.to_string(),
                }
            });
            println!("{}", serde_json::to_string_pretty(&body)?);
            std::process::exit(1);
        }
    }
}

fn init_logging(config: &CliConfig) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| config.log_level.clone()),
    );
    let registry = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

async fn run(engine: &FxEngine, command: Command) -> ratekeeper_common::Result<Value> {
    match command {
        Command::Convert { from, to, amount } => {
            let from = input::currency("from", &from)?;
            let to = input::currency("to", &to)?;
            let amount = input::amount(amount)?;

            let conversion = engine
                .convert_amount(from.code(), to.code(), amount)
                .await?;
            info!(
                from = %conversion.from,
                to = %conversion.to,
                rate = conversion.rate,
                "Conversion completed"
            );
            to_json(&conversion)
        }
        Command::Rates { base, currencies } => {
            let base = input::currency("base", &base)?;
            let filter = input::currency_filter(currencies.as_deref())?;

            let snapshot = engine.rates_for(base.code(), filter.as_deref()).await?;
            info!(base = %snapshot.base, currencies = snapshot.rates.len(), "Rate table served");
            to_json(&snapshot)
        }
        Command::Fallback => {
            let snapshot = RateTableSnapshot {
                base: ratekeeper_common::CurrencyCode::usd(),
                rates: FallbackRateTable::standard().to_table(),
                last_updated: ratekeeper_common::now(),
            };
            to_json(&snapshot)
        }
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> ratekeeper_common::Result<Value> {
    serde_json::to_value(value)
        .map_err(|e| ServiceError::ExternalService(format!("Failed to encode response: {}", e)))
}
