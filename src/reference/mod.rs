//! Reference pricing.
//!
//! Fetches the asset's last traded price on an external reference venue and
//! converts it into the local quote currency, producing the "fair price"
//! the overprice guard compares against.
//!
//! Venue selection is a configuration enum resolved through a registry
//! constructor — new venues register a variant and a client, nothing
//! subclasses anything.

pub mod bitstamp;
pub mod kraken;

use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::str::FromStr;
use tracing::debug;

use crate::convert::RateSource;
use crate::money::{Currency, Money};
use crate::types::AgentError;

// ---------------------------------------------------------------------------
// Venue seam
// ---------------------------------------------------------------------------

/// A read-only reference exchange: one job, the last traded price of a
/// configured market in the venue's own quote currency.
#[async_trait]
pub trait ReferenceExchange: Send + Sync {
    async fn fetch_last_price(&self) -> Result<Decimal>;

    /// Venue name for logging and identification.
    fn name(&self) -> &str;
}

/// Supported reference venues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceVenue {
    Bitstamp,
    Kraken,
}

impl FromStr for ReferenceVenue {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "bitstamp" => Ok(ReferenceVenue::Bitstamp),
            "kraken" => Ok(ReferenceVenue::Kraken),
            other => Err(AgentError::Config(format!(
                "unknown reference venue: {other}"
            ))),
        }
    }
}

impl ReferenceVenue {
    /// Registry: venue variant → ticker client for `market_code` (the
    /// venue-native pair code, e.g. "btcusd").
    pub fn client(&self, market_code: &str) -> Result<Box<dyn ReferenceExchange>> {
        match self {
            ReferenceVenue::Bitstamp => {
                Ok(Box::new(bitstamp::BitstampClient::new(market_code)?))
            }
            ReferenceVenue::Kraken => Ok(Box::new(kraken::KrakenClient::new(market_code)?)),
        }
    }
}

// ---------------------------------------------------------------------------
// Fair price
// ---------------------------------------------------------------------------

/// The components of one fair-price computation, kept for diagnostics.
#[derive(Debug, Clone)]
pub struct FairPrice {
    /// Last traded price on the reference venue, in its quote currency.
    pub reference_price: Decimal,
    /// Conversion rate from the venue quote currency to the target one.
    pub conversion_rate: Decimal,
    /// Converted, truncated price in the target quote currency.
    pub fair: Money,
}

pub struct ReferencePricer {
    venue: Box<dyn ReferenceExchange>,
    rates: Box<dyn RateSource>,
    venue_quote: Currency,
    target_quote: Currency,
    target_precision: u32,
}

impl ReferencePricer {
    pub fn new(
        venue: Box<dyn ReferenceExchange>,
        rates: Box<dyn RateSource>,
        venue_quote: Currency,
        target_quote: Currency,
        target_precision: u32,
    ) -> Self {
        Self {
            venue,
            rates,
            venue_quote,
            target_quote,
            target_precision,
        }
    }

    /// Reference price × conversion rate, truncated to the target currency's
    /// precision. Any upstream failure surfaces as a distinct error; the
    /// engine never places an order without a fair price.
    pub async fn fair_price(&self) -> Result<FairPrice, AgentError> {
        let reference_price = self
            .venue
            .fetch_last_price()
            .await
            .map_err(|e| AgentError::ReferencePrice(format!("{}: {e:#}", self.venue.name())))?;

        let conversion_rate = self
            .rates
            .rate(&self.venue_quote, &self.target_quote)
            .await
            .map_err(|e| AgentError::Conversion {
                provider: self.rates.name().to_string(),
                message: format!("{e:#}"),
            })?;

        let fair = Money::new(reference_price * conversion_rate, self.target_quote.clone())
            .truncate(self.target_precision);

        debug!(
            venue = self.venue.name(),
            %reference_price,
            %conversion_rate,
            fair = %fair,
            "Fair price computed"
        );

        Ok(FairPrice {
            reference_price,
            conversion_rate,
            fair,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
