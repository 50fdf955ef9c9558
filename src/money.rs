//! Money and market value objects.
//!
//! All monetary amounts are `rust_decimal::Decimal` tagged with a currency
//! code. Arithmetic between two `Money` values requires identical currencies
//! and fails with `AgentError::CurrencyMismatch` otherwise — amounts are
//! never silently coerced across currencies. Truncation to an exchange's
//! order precision is explicit and happens only at sizing/presentation
//! boundaries.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::types::AgentError;

// ---------------------------------------------------------------------------
// Currency
// ---------------------------------------------------------------------------

/// An asset or fiat currency code, normalized to uppercase ("BTC", "CLP").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Currency(String);

impl Currency {
    pub fn new(code: &str) -> Self {
        Self(code.trim().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Currency {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err(AgentError::Config("empty currency code".to_string()));
        }
        Ok(Currency::new(s))
    }
}

// ---------------------------------------------------------------------------
// Money
// ---------------------------------------------------------------------------

/// A decimal amount in a specific currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Money {
    pub amount: Decimal,
    pub currency: Currency,
}

impl Money {
    pub fn new(amount: Decimal, currency: Currency) -> Self {
        Self { amount, currency }
    }

    pub fn zero(currency: Currency) -> Self {
        Self::new(Decimal::ZERO, currency)
    }

    fn ensure_same_currency(&self, other: &Money) -> Result<(), AgentError> {
        if self.currency != other.currency {
            return Err(AgentError::CurrencyMismatch {
                left: self.currency.clone(),
                right: other.currency.clone(),
            });
        }
        Ok(())
    }

    pub fn checked_add(&self, other: &Money) -> Result<Money, AgentError> {
        self.ensure_same_currency(other)?;
        Ok(Money::new(self.amount + other.amount, self.currency.clone()))
    }

    pub fn checked_sub(&self, other: &Money) -> Result<Money, AgentError> {
        self.ensure_same_currency(other)?;
        Ok(Money::new(self.amount - other.amount, self.currency.clone()))
    }

    /// Dimensionless ratio `self / other`. Both sides must share a currency.
    pub fn ratio(&self, other: &Money) -> Result<Decimal, AgentError> {
        self.ensure_same_currency(other)?;
        if other.amount.is_zero() {
            return Err(AgentError::Arithmetic(format!(
                "division by zero: {self} / {other}"
            )));
        }
        Ok(self.amount / other.amount)
    }

    /// Ordered comparison; currencies must match.
    pub fn gt(&self, other: &Money) -> Result<bool, AgentError> {
        self.ensure_same_currency(other)?;
        Ok(self.amount > other.amount)
    }

    pub fn scale_by(&self, factor: Decimal) -> Money {
        Money::new(self.amount * factor, self.currency.clone())
    }

    /// Truncate (never round) to `scale` decimal places.
    pub fn truncate(&self, scale: u32) -> Money {
        Money::new(self.amount.trunc_with_scale(scale), self.currency.clone())
    }

    pub fn is_positive(&self) -> bool {
        self.amount > Decimal::ZERO
    }

    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.currency)
    }
}

// ---------------------------------------------------------------------------
// Market pair
// ---------------------------------------------------------------------------

/// An ordered (base, quote) trading pair: base is bought, quote is spent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketPair {
    pub base: Currency,
    pub quote: Currency,
}

impl MarketPair {
    pub fn new(base: Currency, quote: Currency) -> Self {
        Self { base, quote }
    }

    /// Canonical lowercase code used by exchange URLs ("btc-clp").
    pub fn code(&self) -> String {
        format!(
            "{}-{}",
            self.base.as_str().to_lowercase(),
            self.quote.as_str().to_lowercase()
        )
    }

    /// Storage key under which this market's transaction history lives.
    /// Case-normalized so "BTC-CLP" and "btc-clp" share one history.
    pub fn ledger_key(&self) -> String {
        format!("transactions:{}", self.code())
    }
}

impl FromStr for MarketPair {
    type Err = AgentError;

    /// Accepts "BTC-CLP", "btc/clp", or the compact six-letter "btcclp".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some((base, quote)) = s.split_once(['-', '/']) {
            if base.is_empty() || quote.is_empty() {
                return Err(AgentError::Config(format!("invalid market code: {s}")));
            }
            return Ok(MarketPair::new(Currency::new(base), Currency::new(quote)));
        }
        if s.len() == 6 && s.is_ascii() {
            let (base, quote) = s.split_at(3);
            return Ok(MarketPair::new(Currency::new(base), Currency::new(quote)));
        }
        Err(AgentError::Config(format!("invalid market code: {s}")))
    }
}

impl fmt::Display for MarketPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.base, self.quote)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn clp(amount: Decimal) -> Money {
        Money::new(amount, Currency::new("CLP"))
    }

    #[test]
    fn test_currency_normalizes_case() {
        assert_eq!(Currency::new("btc"), Currency::new("BTC"));
        assert_eq!(Currency::new(" clp ").as_str(), "CLP");
    }

    #[test]
    fn test_add_same_currency() {
        let sum = clp(dec!(100)).checked_add(&clp(dec!(50))).unwrap();
        assert_eq!(sum, clp(dec!(150)));
    }

    #[test]
    fn test_add_mismatched_currency_fails() {
        let usd = Money::new(dec!(10), Currency::new("USD"));
        let err = clp(dec!(100)).checked_add(&usd).unwrap_err();
        assert!(matches!(err, AgentError::CurrencyMismatch { .. }));
    }

    #[test]
    fn test_compare_mismatched_currency_fails() {
        let usd = Money::new(dec!(10), Currency::new("USD"));
        assert!(clp(dec!(100)).gt(&usd).is_err());
    }

    #[test]
    fn test_ratio() {
        let r = clp(dec!(110)).ratio(&clp(dec!(100))).unwrap();
        assert_eq!(r, dec!(1.1));
    }

    #[test]
    fn test_ratio_division_by_zero() {
        let err = clp(dec!(110)).ratio(&clp(dec!(0))).unwrap_err();
        assert!(matches!(err, AgentError::Arithmetic(_)));
    }

    #[test]
    fn test_truncate_truncates_never_rounds() {
        let m = Money::new(dec!(0.12345678999), Currency::new("BTC"));
        assert_eq!(m.truncate(8).amount, dec!(0.12345678));
        // 0.999 must truncate down, not round up
        assert_eq!(clp(dec!(74.999)).truncate(0).amount, dec!(74));
    }

    #[test]
    fn test_money_serialization_roundtrip() {
        let m = Money::new(dec!(0.00419299), Currency::new("BTC"));
        let json = serde_json::to_string(&m).unwrap();
        let parsed: Money = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, m);
    }

    #[test]
    fn test_market_pair_parse_variants() {
        let dash: MarketPair = "BTC-CLP".parse().unwrap();
        let slash: MarketPair = "btc/clp".parse().unwrap();
        let compact: MarketPair = "btcclp".parse().unwrap();
        assert_eq!(dash, slash);
        assert_eq!(dash, compact);
        assert_eq!(dash.base.as_str(), "BTC");
        assert_eq!(dash.quote.as_str(), "CLP");
    }

    #[test]
    fn test_market_pair_parse_rejects_garbage() {
        assert!("".parse::<MarketPair>().is_err());
        assert!("btc-".parse::<MarketPair>().is_err());
        assert!("btcusdclp".parse::<MarketPair>().is_err());
    }

    #[test]
    fn test_ledger_key_case_normalized() {
        let a: MarketPair = "BTC-CLP".parse().unwrap();
        let b: MarketPair = "btc-clp".parse().unwrap();
        assert_eq!(a.ledger_key(), b.ledger_key());
        assert_eq!(a.ledger_key(), "transactions:btc-clp");
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", clp(dec!(75))), "75 CLP");
        let pair: MarketPair = "btcclp".parse().unwrap();
        assert_eq!(format!("{pair}"), "BTC-CLP");
    }
}
