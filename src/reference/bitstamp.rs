//! Bitstamp public ticker client.
//!
//! API docs: https://www.bitstamp.net/api/
//! Base URL: https://www.bitstamp.net/api/v2/
//! No auth required for the public ticker.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;

use super::ReferenceExchange;

const BASE_URL: &str = "https://www.bitstamp.net/api/v2";
const VENUE_NAME: &str = "bitstamp";

#[derive(Debug, Deserialize)]
struct BitstampTicker {
    /// Last traded price, as a decimal string.
    last: String,
}

pub struct BitstampClient {
    http: Client,
    market_code: String,
}

impl BitstampClient {
    pub fn new(market_code: &str) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to build Bitstamp HTTP client")?;
        Ok(Self {
            http,
            market_code: market_code.to_lowercase(),
        })
    }
}

#[async_trait]
impl ReferenceExchange for BitstampClient {
    async fn fetch_last_price(&self) -> Result<Decimal> {
        let url = format!("{BASE_URL}/ticker/{}/", self.market_code);
        let ticker: BitstampTicker = self
            .http
            .get(&url)
            .send()
            .await
            .context("Bitstamp ticker request failed")?
            .error_for_status()
            .context("Bitstamp ticker returned an error status")?
            .json()
            .await
            .context("Bitstamp ticker returned invalid JSON")?;

        Decimal::from_str(&ticker.last)
            .with_context(|| format!("invalid last price from Bitstamp: {}", ticker.last))
    }

    fn name(&self) -> &str {
        VENUE_NAME
    }
}
