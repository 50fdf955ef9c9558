//! Kraken public ticker client.
//!
//! API docs: https://docs.kraken.com/rest/
//! Base URL: https://api.kraken.com/0/public
//! No auth required. Kraken wraps results in `{error: [], result: {PAIR:
//! {c: [price, lot]}}}` with venue-normalized pair keys, so the pair entry
//! is looked up positionally rather than by the requested code.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::str::FromStr;

use super::ReferenceExchange;

const BASE_URL: &str = "https://api.kraken.com/0/public";
const VENUE_NAME: &str = "kraken";

#[derive(Debug, Deserialize)]
struct KrakenResponse {
    #[serde(default)]
    error: Vec<String>,
    #[serde(default)]
    result: HashMap<String, KrakenTicker>,
}

#[derive(Debug, Deserialize)]
struct KrakenTicker {
    /// Last trade closed: [price, lot volume].
    c: Vec<String>,
}

pub struct KrakenClient {
    http: Client,
    market_code: String,
}

impl KrakenClient {
    pub fn new(market_code: &str) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to build Kraken HTTP client")?;
        Ok(Self {
            http,
            market_code: market_code.to_uppercase(),
        })
    }

    fn last_from_response(response: KrakenResponse) -> Result<Decimal> {
        if !response.error.is_empty() {
            return Err(anyhow!("Kraken error: {}", response.error.join(", ")));
        }
        let ticker = response
            .result
            .into_values()
            .next()
            .ok_or_else(|| anyhow!("Kraken response contained no ticker"))?;
        let last = ticker
            .c
            .first()
            .ok_or_else(|| anyhow!("Kraken ticker missing last trade price"))?;
        Decimal::from_str(last).with_context(|| format!("invalid last price from Kraken: {last}"))
    }
}

#[async_trait]
impl ReferenceExchange for KrakenClient {
    async fn fetch_last_price(&self) -> Result<Decimal> {
        let url = format!("{BASE_URL}/Ticker?pair={}", self.market_code);
        let response: KrakenResponse = self
            .http
            .get(&url)
            .send()
            .await
            .context("Kraken ticker request failed")?
            .error_for_status()
            .context("Kraken ticker returned an error status")?
            .json()
            .await
            .context("Kraken ticker returned invalid JSON")?;

        Self::last_from_response(response)
    }

    fn name(&self) -> &str {
        VENUE_NAME
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_ticker_response() {
        let raw = r#"{
            "error": [],
            "result": {
                "XXBTZUSD": {"c": ["67123.40000", "0.00500000"], "v": ["100", "200"]}
            }
        }"#;
        let response: KrakenResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(
            KrakenClient::last_from_response(response).unwrap(),
            dec!(67123.4)
        );
    }

    #[test]
    fn test_error_response_surfaces() {
        let raw = r#"{"error": ["EQuery:Unknown asset pair"], "result": {}}"#;
        let response: KrakenResponse = serde_json::from_str(raw).unwrap();
        let err = KrakenClient::last_from_response(response).unwrap_err();
        assert!(err.to_string().contains("Unknown asset pair"));
    }

    #[test]
    fn test_empty_result_errors() {
        let raw = r#"{"error": [], "result": {}}"#;
        let response: KrakenResponse = serde_json::from_str(raw).unwrap();
        assert!(KrakenClient::last_from_response(response).is_err());
    }
}
