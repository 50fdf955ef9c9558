//! Buda exchange client.
//!
//! REST adapter for the Buda spot exchange (Chilean/LatAm fiat markets).
//!
//! API docs: https://api.buda.com
//! Base URL: https://www.buda.com/api/v2
//! Auth: HMAC-SHA384 over "METHOD path [base64-body] nonce", sent as
//! `X-SBTC-APIKEY` / `X-SBTC-NONCE` / `X-SBTC-SIGNATURE` headers.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use hmac::{Hmac, Mac};
use reqwest::Client;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use sha2::Sha384;
use std::str::FromStr;
use tracing::{debug, warn};

use super::ExchangeClient;
use crate::money::{Currency, MarketPair, Money};
use crate::types::{Order, OrderSide, OrderStatus};

const DEFAULT_BASE_URL: &str = "https://www.buda.com/api/v2";
const EXCHANGE_NAME: &str = "buda";

type HmacSha384 = Hmac<Sha384>;

// ---------------------------------------------------------------------------
// API response types (Buda JSON → Rust)
// ---------------------------------------------------------------------------

/// Buda encodes amounts as `["0.00419299", "BTC"]` pairs.
#[derive(Debug, Deserialize)]
struct AmountPair(String, String);

impl AmountPair {
    fn to_money(&self) -> Result<Money> {
        let amount = Decimal::from_str(&self.0)
            .with_context(|| format!("invalid amount in response: {}", self.0))?;
        Ok(Money::new(amount, Currency::new(&self.1)))
    }
}

#[derive(Debug, Deserialize)]
struct BalanceEnvelope {
    balance: BudaBalance,
}

#[derive(Debug, Deserialize)]
struct BudaBalance {
    available_amount: AmountPair,
}

#[derive(Debug, Deserialize)]
struct QuotationEnvelope {
    quotation: BudaQuotation,
}

#[derive(Debug, Deserialize)]
struct BudaQuotation {
    /// Base-asset change for the requested quote amount.
    base_balance_change: AmountPair,
}

#[derive(Debug, Deserialize)]
struct OrderEnvelope {
    order: BudaOrder,
}

#[derive(Debug, Deserialize)]
struct BudaOrder {
    id: u64,
    state: String,
}

impl BudaOrder {
    fn into_order(self) -> Result<Order> {
        let status = OrderStatus::from_str(&self.state)
            .with_context(|| format!("order {} has unmapped state", self.id))?;
        Ok(Order {
            id: self.id.to_string(),
            status,
        })
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct BudaClient {
    http: Client,
    base_url: String,
    api_key: Secret<String>,
    api_secret: Secret<String>,
}

impl BudaClient {
    pub fn new(api_key: String, api_secret: String, base_url: Option<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to build Buda HTTP client")?;
        Ok(Self {
            http,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            api_key: Secret::new(api_key),
            api_secret: Secret::new(api_secret),
        })
    }

    fn nonce() -> String {
        chrono::Utc::now().timestamp_micros().to_string()
    }

    /// HMAC-SHA384 over "METHOD path [base64(body)] nonce", hex encoded.
    fn sign(&self, method: &str, path: &str, body: Option<&str>, nonce: &str) -> Result<String> {
        let payload = match body {
            Some(b) => format!(
                "{method} {path} {} {nonce}",
                general_purpose::STANDARD.encode(b)
            ),
            None => format!("{method} {path} {nonce}"),
        };
        let mut mac = HmacSha384::new_from_slice(self.api_secret.expose_secret().as_bytes())
            .map_err(|_| anyhow!("invalid Buda API secret"))?;
        mac.update(payload.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    async fn get_signed<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let nonce = Self::nonce();
        let signature = self.sign("GET", path, None, &nonce)?;
        let resp = self
            .http
            .get(format!("{}{path}", self.base_url))
            .header("X-SBTC-APIKEY", self.api_key.expose_secret())
            .header("X-SBTC-NONCE", &nonce)
            .header("X-SBTC-SIGNATURE", &signature)
            .send()
            .await
            .with_context(|| format!("GET {path} failed"))?
            .error_for_status()
            .with_context(|| format!("GET {path} returned an error status"))?;
        resp.json()
            .await
            .with_context(|| format!("GET {path} returned invalid JSON"))
    }

    async fn post_signed<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<T> {
        let raw = body.to_string();
        let nonce = Self::nonce();
        let signature = self.sign("POST", path, Some(&raw), &nonce)?;
        let resp = self
            .http
            .post(format!("{}{path}", self.base_url))
            .header("X-SBTC-APIKEY", self.api_key.expose_secret())
            .header("X-SBTC-NONCE", &nonce)
            .header("X-SBTC-SIGNATURE", &signature)
            .header("Content-Type", "application/json")
            .body(raw)
            .send()
            .await
            .with_context(|| format!("POST {path} failed"))?
            .error_for_status()
            .with_context(|| format!("POST {path} returned an error status"))?;
        resp.json()
            .await
            .with_context(|| format!("POST {path} returned invalid JSON"))
    }

    fn order_type(side: OrderSide) -> &'static str {
        match side {
            OrderSide::Buy => "Bid",
            OrderSide::Sell => "Ask",
        }
    }
}

#[async_trait]
impl ExchangeClient for BudaClient {
    async fn get_available_balance(&self, currency: &Currency) -> Result<Money> {
        let path = format!("/balances/{}", currency.as_str().to_lowercase());
        let envelope: BalanceEnvelope = self.get_signed(&path).await?;
        let money = envelope.balance.available_amount.to_money()?;
        debug!(%currency, balance = %money, "Balance fetched");
        Ok(money)
    }

    async fn quote_order_book(
        &self,
        market: &MarketPair,
        side: OrderSide,
        quote_amount: &Money,
    ) -> Result<Decimal> {
        // "bid_given_value": how much base a bid for `value` quote obtains.
        let quotation_type = match side {
            OrderSide::Buy => "bid_given_value",
            OrderSide::Sell => "ask_given_value",
        };
        let path = format!("/markets/{}/quotations", market.code());
        let body = serde_json::json!({
            "type": quotation_type,
            "amount": quote_amount.amount.to_string(),
        });
        let envelope: QuotationEnvelope = self.post_signed(&path, &body).await?;
        let base = envelope.quotation.base_balance_change.to_money()?;
        debug!(market = %market, quote = %quote_amount, base = %base, "Order book quoted");
        Ok(base.amount.abs())
    }

    async fn place_market_order(
        &self,
        market: &MarketPair,
        side: OrderSide,
        base_amount: Decimal,
    ) -> Result<Option<Order>> {
        let path = format!("/markets/{}/orders", market.code());
        let body = serde_json::json!({
            "type": Self::order_type(side),
            "price_type": "market",
            "amount": base_amount.to_string(),
        });

        let envelope: OrderEnvelope = match self.post_signed(&path, &body).await {
            Ok(env) => env,
            Err(e) => {
                warn!(market = %market, error = %e, "Order placement call failed");
                return Ok(None);
            }
        };
        Ok(Some(envelope.order.into_order()?))
    }

    async fn fetch_order(&self, order_id: &str) -> Result<Order> {
        let path = format!("/orders/{order_id}");
        let envelope: OrderEnvelope = self.get_signed(&path).await?;
        envelope.order.into_order()
    }

    async fn request_withdrawal(
        &self,
        amount: &Money,
        address: &str,
        subtract_fee: bool,
    ) -> Result<()> {
        let path = format!(
            "/currencies/{}/withdrawals",
            amount.currency.as_str().to_lowercase()
        );
        let body = serde_json::json!({
            "amount": amount.amount.to_string(),
            "currency": amount.currency.as_str(),
            "simulate": false,
            "amount_includes_fee": subtract_fee,
            "withdrawal_data": { "target_address": address },
        });
        let _: serde_json::Value = self.post_signed(&path, &body).await?;
        debug!(amount = %amount, address, "Withdrawal requested");
        Ok(())
    }

    fn name(&self) -> &str {
        EXCHANGE_NAME
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
