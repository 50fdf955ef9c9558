//! Transaction ledger.
//!
//! An append-only, ordered sequence of completed purchases, persisted under
//! a market-derived key. The last entry gates re-entrancy: a second run in
//! the same interval sees it and skips. Every append re-serializes the full
//! sequence — never a partial update — so the stored value is always a
//! complete, ordered history.
//!
//! No locking: the external scheduler guarantees at most one concurrent run
//! per market key.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, info};

use crate::money::MarketPair;
use crate::storage::KeyValueStore;
use crate::types::Transaction;

pub struct Ledger {
    key: String,
    transactions: Vec<Transaction>,
    store: Arc<dyn KeyValueStore>,
}

impl Ledger {
    /// Load a market's history from the store. A missing key is an empty
    /// ledger.
    pub fn load(store: Arc<dyn KeyValueStore>, market: &MarketPair) -> Result<Self> {
        let key = market.ledger_key();
        let transactions: Vec<Transaction> = match store
            .get(&key)
            .with_context(|| format!("Failed to read ledger {key}"))?
        {
            Some(raw) => serde_json::from_str(&raw)
                .with_context(|| format!("Failed to parse ledger {key}"))?,
            None => Vec::new(),
        };

        info!(key = %key, entries = transactions.len(), "Ledger loaded");
        Ok(Self {
            key,
            transactions,
            store,
        })
    }

    /// Append a transaction and persist the entire updated sequence.
    pub fn record(&mut self, tx: Transaction) -> Result<()> {
        self.transactions.push(tx);
        let raw = serde_json::to_string(&self.transactions)
            .context("Failed to serialise ledger")?;
        self.store
            .set(&self.key, &raw)
            .with_context(|| format!("Failed to persist ledger {}", self.key))?;
        debug!(key = %self.key, entries = self.transactions.len(), "Ledger persisted");
        Ok(())
    }

    /// Most recent transaction by construction order.
    pub fn last(&self) -> Option<&Transaction> {
        self.transactions.last()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::{Currency, Money};
    use crate::storage::MemoryStore;
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn pair() -> MarketPair {
        "BTC-CLP".parse().unwrap()
    }

    fn tx(n: i64) -> Transaction {
        Transaction {
            date: Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).unwrap() + chrono::Duration::hours(n),
            buy_price: Money::new(dec!(17000) + Decimal::from(n), Currency::new("CLP")),
            quote_amount: Money::new(dec!(75), Currency::new("CLP")),
            base_amount: Money::new(dec!(0.004), Currency::new("BTC")),
        }
    }

    #[test]
    fn test_load_empty() {
        let store = Arc::new(MemoryStore::new());
        let ledger = Ledger::load(store, &pair()).unwrap();
        assert!(ledger.is_empty());
        assert!(ledger.last().is_none());
        assert_eq!(ledger.key(), "transactions:btc-clp");
    }

    #[test]
    fn test_record_appends_and_persists() {
        let store = Arc::new(MemoryStore::new());
        let mut ledger = Ledger::load(store.clone(), &pair()).unwrap();
        ledger.record(tx(0)).unwrap();
        ledger.record(tx(1)).unwrap();
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.last(), Some(&tx(1)));

        // Stored value is the full sequence
        let raw = store.get("transactions:btc-clp").unwrap().unwrap();
        let stored: Vec<Transaction> = serde_json::from_str(&raw).unwrap();
        assert_eq!(stored, vec![tx(0), tx(1)]);
    }

    #[test]
    fn test_round_trip_preserves_order() {
        let store = Arc::new(MemoryStore::new());
        let mut ledger = Ledger::load(store.clone(), &pair()).unwrap();
        for n in 0..5 {
            ledger.record(tx(n)).unwrap();
        }

        let reloaded = Ledger::load(store, &pair()).unwrap();
        assert_eq!(reloaded.len(), 5);
        for n in 0..5 {
            assert_eq!(reloaded.transactions[n as usize], tx(n));
        }
        assert_eq!(reloaded.last(), Some(&tx(4)));
    }

    #[test]
    fn test_histories_keyed_per_market() {
        let store: Arc<MemoryStore> = Arc::new(MemoryStore::new());
        let mut btc = Ledger::load(store.clone(), &pair()).unwrap();
        btc.record(tx(0)).unwrap();

        let eth: MarketPair = "ETH-CLP".parse().unwrap();
        let eth_ledger = Ledger::load(store, &eth).unwrap();
        assert!(eth_ledger.is_empty());
    }

    #[test]
    fn test_corrupt_value_errors() {
        let store = Arc::new(MemoryStore::new());
        store.set("transactions:btc-clp", "not json").unwrap();
        assert!(Ledger::load(store, &pair()).is_err());
    }
}
