//! Currency conversion.
//!
//! Turns the reference venue's quote currency into the local market's quote
//! currency. Provider choice is a configuration enum — adding a provider
//! means adding a variant and a request shape, not a subtype. Each provider
//! carries its own credential, resolved from the environment.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, Secret};
use std::str::FromStr;
use tracing::debug;

use crate::money::Currency;
use crate::types::AgentError;

// ---------------------------------------------------------------------------
// Rate source seam
// ---------------------------------------------------------------------------

/// Source of fiat conversion rates. The engine and pricer depend on this
/// seam; production code plugs in `Converter`, tests plug in a fixed rate.
#[async_trait]
pub trait RateSource: Send + Sync {
    /// Rate such that `amount_from * rate = amount_to`.
    async fn rate(&self, from: &Currency, to: &Currency) -> Result<Decimal>;

    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Providers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConverterProvider {
    CurrencyConverterApi,
    ExchangeRateHost,
}

impl ConverterProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConverterProvider::CurrencyConverterApi => "currencyconverterapi",
            ConverterProvider::ExchangeRateHost => "exchangeratehost",
        }
    }
}

impl FromStr for ConverterProvider {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "currencyconverterapi" | "currency-converter-api" => {
                Ok(ConverterProvider::CurrencyConverterApi)
            }
            "exchangeratehost" | "exchangerate-host" => Ok(ConverterProvider::ExchangeRateHost),
            other => Err(AgentError::Config(format!(
                "unknown converter provider: {other}"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Converter client
// ---------------------------------------------------------------------------

pub struct Converter {
    provider: ConverterProvider,
    http: Client,
    api_key: Option<Secret<String>>,
}

impl Converter {
    pub fn new(provider: ConverterProvider, api_key: Option<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to build converter HTTP client")?;
        Ok(Self {
            provider,
            http,
            api_key: api_key.map(Secret::new),
        })
    }

    fn key(&self) -> Result<&str> {
        self.api_key
            .as_ref()
            .map(|k| k.expose_secret().as_str())
            .ok_or_else(|| anyhow!("provider {} requires an API key", self.provider.as_str()))
    }

    async fn fetch_currencyconverterapi(&self, from: &Currency, to: &Currency) -> Result<Decimal> {
        let pair = format!("{}_{}", from.as_str(), to.as_str());
        let url = format!(
            "https://free.currencyconverterapi.com/api/v6/convert?q={pair}&compact=y&apiKey={}",
            self.key()?
        );

        let body: serde_json::Value = self
            .http
            .get(&url)
            .send()
            .await
            .context("currencyconverterapi request failed")?
            .error_for_status()
            .context("currencyconverterapi returned an error status")?
            .json()
            .await
            .context("currencyconverterapi returned invalid JSON")?;

        let val = body
            .get(&pair)
            .and_then(|entry| entry.get("val"))
            .and_then(|v| v.as_f64())
            .ok_or_else(|| anyhow!("currencyconverterapi response missing {pair}.val"))?;

        Decimal::from_f64(val).ok_or_else(|| anyhow!("rate {val} is not a valid decimal"))
    }

    async fn fetch_exchangeratehost(&self, from: &Currency, to: &Currency) -> Result<Decimal> {
        let url = format!(
            "https://api.exchangerate.host/convert?from={}&to={}&amount=1&access_key={}",
            from.as_str(),
            to.as_str(),
            self.key()?
        );

        #[derive(serde::Deserialize)]
        struct ConvertResponse {
            success: bool,
            #[serde(default)]
            result: Option<f64>,
        }

        let body: ConvertResponse = self
            .http
            .get(&url)
            .send()
            .await
            .context("exchangerate.host request failed")?
            .error_for_status()
            .context("exchangerate.host returned an error status")?
            .json()
            .await
            .context("exchangerate.host returned invalid JSON")?;

        if !body.success {
            return Err(anyhow!("exchangerate.host reported failure"));
        }
        let val = body
            .result
            .ok_or_else(|| anyhow!("exchangerate.host response missing result"))?;
        Decimal::from_f64(val).ok_or_else(|| anyhow!("rate {val} is not a valid decimal"))
    }
}

#[async_trait]
impl RateSource for Converter {
    async fn rate(&self, from: &Currency, to: &Currency) -> Result<Decimal> {
        if from == to {
            return Ok(Decimal::ONE);
        }

        let rate = match self.provider {
            ConverterProvider::CurrencyConverterApi => {
                self.fetch_currencyconverterapi(from, to).await?
            }
            ConverterProvider::ExchangeRateHost => self.fetch_exchangeratehost(from, to).await?,
        };

        debug!(provider = self.provider.as_str(), %from, %to, %rate, "Conversion rate fetched");
        Ok(rate)
    }

    fn name(&self) -> &str {
        self.provider.as_str()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
