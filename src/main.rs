//! PROMEDIO — Periodic Dollar-Cost-Averaging Agent for Crypto Spot Markets
//!
//! Entry point. Loads configuration, initialises structured logging, wires
//! the exchange, reference venue, converter, and ledger together, and runs
//! exactly one investment decision. Scheduling is external (cron/systemd
//! timer); the exit code tells the scheduler how the run went.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use promedio::config::AppConfig;
use promedio::convert::{Converter, ConverterProvider};
use promedio::engine::executor::OrderExecutor;
use promedio::engine::intervals::AmountCalculator;
use promedio::engine::sweeper::Sweeper;
use promedio::engine::Engine;
use promedio::exchange::buda::BudaClient;
use promedio::ledger::Ledger;
use promedio::money::{Currency, MarketPair};
use promedio::reference::{ReferencePricer, ReferenceVenue};
use promedio::storage::FileStore;

const BANNER: &str = r#"
 ____  ____   ___  __  __ _____ ____ ___ ___
|  _ \|  _ \ / _ \|  \/  | ____|  _ \_ _/ _ \
| |_) | |_) | | | | |\/| |  _| | | | | | | | |
|  __/|  _ <| |_| | |  | | |___| |_| | | |_| |
|_|   |_| \_\\___/|_|  |_|_____|____/___\___/

  Periodic Dollar-Cost-Averaging Agent
  v0.1.0 — one run, one decision
"#;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    // Load configuration from TOML
    let cfg = AppConfig::load("config.toml")?;

    // Initialise structured logging
    init_logging();

    // Print startup banner
    println!("{BANNER}");

    let market: MarketPair = cfg
        .agent
        .market
        .parse()
        .with_context(|| format!("invalid market in config: {}", cfg.agent.market))?;

    info!(
        market = %market,
        monthly_budget = %cfg.agent.monthly_budget,
        interval_hours = cfg.agent.interval_hours,
        overprice_limit = %cfg.agent.overprice_limit,
        dry_run = cfg.agent.dry_run,
        "PROMEDIO starting up"
    );

    // -- Exchange ---------------------------------------------------------

    let api_key = AppConfig::resolve_env(&cfg.exchange.api_key_env)?;
    let api_secret = AppConfig::resolve_env(&cfg.exchange.api_secret_env)?;
    let exchange = Arc::new(BudaClient::new(
        api_key,
        api_secret,
        cfg.exchange.base_url.clone(),
    )?);

    // -- Reference pricing ------------------------------------------------

    let venue: ReferenceVenue = cfg.reference.venue.parse()?;
    let venue_client = venue.client(&cfg.reference.market)?;

    let provider: ConverterProvider = cfg.converter.provider.parse()?;
    let converter_key = match &cfg.converter.api_key_env {
        Some(env) => Some(AppConfig::resolve_env(env)?),
        None => None,
    };
    let converter = Converter::new(provider, converter_key)?;

    let pricer = ReferencePricer::new(
        venue_client,
        Box::new(converter),
        Currency::new(&cfg.reference.quote_currency),
        market.quote.clone(),
        cfg.exchange.quote_precision,
    );

    // -- Ledger and engine ------------------------------------------------

    let store = Arc::new(FileStore::new(&cfg.storage.path));
    let ledger = Ledger::load(store, &market)?;

    let calculator = AmountCalculator::new(
        cfg.agent.monthly_budget,
        cfg.agent.interval_hours,
        market.quote.clone(),
        cfg.exchange.quote_precision,
        cfg.agent.min_order_amount,
    );

    let executor = OrderExecutor::new(
        Duration::from_secs(cfg.execution.poll_interval_secs),
        cfg.execution.max_poll_attempts,
    );

    let sweeper = if cfg.withdrawal.enabled {
        Some(Sweeper::new(
            cfg.withdrawal.address.clone(),
            cfg.withdrawal.min_amount,
            cfg.withdrawal
                .amount_currency
                .as_deref()
                .map(Currency::new),
        ))
    } else {
        None
    };

    let mut engine = Engine::new(
        market,
        exchange,
        pricer,
        calculator,
        executor,
        ledger,
        sweeper,
        cfg.agent.overprice_limit,
        cfg.exchange.base_precision,
        cfg.agent.dry_run,
    );

    // -- Single decision --------------------------------------------------

    let report = engine.run().await?;
    if let Some(tx) = &report.transaction {
        info!(%tx, "Purchase settled");
    }

    std::process::exit(report.outcome.exit_code());
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("promedio=info"));

    let json_logging = std::env::var("PROMEDIO_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
