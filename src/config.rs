//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Secrets (API keys) are referenced by env-var name in the config and
//! resolved at runtime via `std::env::var`.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::fs;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub agent: AgentConfig,
    pub exchange: ExchangeConfig,
    pub reference: ReferenceConfig,
    pub converter: ConverterConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub withdrawal: WithdrawalConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AgentConfig {
    /// Market to invest in, e.g. "BTC-CLP" or "btcclp".
    pub market: String,
    /// Monthly budget in the quote currency; divided by 30 for the daily
    /// budget.
    #[serde(with = "rust_decimal::serde::float")]
    pub monthly_budget: Decimal,
    /// Length of one investment interval.
    pub interval_hours: u32,
    /// Maximum tolerated premium over the fair price, as a fraction
    /// (0.05 = 5%).
    #[serde(with = "rust_decimal::serde::float")]
    pub overprice_limit: Decimal,
    /// Runs whose computed amount is at or below this abort before any
    /// external call.
    #[serde(with = "rust_decimal::serde::float")]
    pub min_order_amount: Decimal,
    /// Log the decision but place no order and write nothing.
    #[serde(default)]
    pub dry_run: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExchangeConfig {
    #[serde(default)]
    pub base_url: Option<String>,
    pub api_key_env: String,
    pub api_secret_env: String,
    /// Order precision (decimal places) for the base asset.
    pub base_precision: u32,
    /// Order precision (decimal places) for the quote currency.
    pub quote_precision: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReferenceConfig {
    /// Reference venue name: "bitstamp" | "kraken".
    pub venue: String,
    /// Venue-native market code for the asset, e.g. "btcusd".
    pub market: String,
    /// Quote currency the venue prices in, e.g. "USD".
    pub quote_currency: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ConverterConfig {
    /// Conversion-rate provider: "currencyconverterapi" | "exchangeratehost".
    pub provider: String,
    #[serde(default)]
    pub api_key_env: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExecutionConfig {
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_max_poll_attempts")]
    pub max_poll_attempts: u32,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            max_poll_attempts: default_max_poll_attempts(),
        }
    }
}

fn default_poll_interval_secs() -> u64 {
    1
}

fn default_max_poll_attempts() -> u32 {
    120
}

#[derive(Debug, Deserialize, Clone)]
pub struct WithdrawalConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub address: String,
    /// Minimum settled balance before a sweep is requested.
    #[serde(default, with = "rust_decimal::serde::float")]
    pub min_amount: Decimal,
    /// Currency `min_amount` is expressed in: the base asset, or the quote
    /// currency (converted via the current fair price).
    #[serde(default)]
    pub amount_currency: Option<String>,
}

impl Default for WithdrawalConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            address: String::new(),
            min_amount: Decimal::ZERO,
            amount_currency: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_store_path")]
    pub path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

fn default_store_path() -> String {
    "promedio_store.json".to_string()
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))?;
        Ok(config)
    }

    /// Resolve an environment variable name to its value.
    /// Useful for loading secrets referenced in the config.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }
}
