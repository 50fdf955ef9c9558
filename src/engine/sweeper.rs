//! Accumulated-balance withdrawal sweep.
//!
//! After a run's investment decision is settled, the sweeper checks the
//! settled base-asset balance and moves it to a configured external address
//! once it crosses a threshold. The threshold can be denominated in the
//! base asset directly or in the quote currency, valued at the same fair
//! price the guard used this run.

use anyhow::Result;
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::exchange::ExchangeClient;
use crate::money::{Currency, Money};

#[derive(Debug, Clone, PartialEq)]
pub enum SweepOutcome {
    BelowThreshold,
    Swept { amount: Money },
}

pub struct Sweeper {
    address: String,
    min_amount: Decimal,
    /// Currency the threshold is denominated in. `None` means the base
    /// asset itself.
    threshold_currency: Option<Currency>,
}

impl Sweeper {
    pub fn new(address: String, min_amount: Decimal, threshold_currency: Option<Currency>) -> Self {
        Self {
            address,
            min_amount,
            threshold_currency,
        }
    }

    /// Withdraw the full settled base balance when it crosses the
    /// threshold. The network fee is subtracted from the withdrawn amount
    /// so the sweep never dips into unsettled funds.
    pub async fn sweep(
        &self,
        exchange: &dyn ExchangeClient,
        base: &Currency,
        fair_price: &Money,
    ) -> Result<SweepOutcome> {
        let balance = exchange.get_available_balance(base).await?;
        if !balance.is_positive() {
            debug!(currency = %base, "No settled balance to sweep");
            return Ok(SweepOutcome::BelowThreshold);
        }

        let measured = match &self.threshold_currency {
            Some(currency) if *currency != *base => {
                // Valued in the quote currency at this run's fair price.
                balance.amount * fair_price.amount
            }
            _ => balance.amount,
        };

        if measured < self.min_amount {
            debug!(
                balance = %balance,
                measured = %measured,
                threshold = %self.min_amount,
                "Balance below withdrawal threshold"
            );
            return Ok(SweepOutcome::BelowThreshold);
        }

        exchange
            .request_withdrawal(&balance, &self.address, true)
            .await?;

        info!(amount = %balance, address = %self.address, "Withdrawal requested");
        Ok(SweepOutcome::Swept { amount: balance })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::MarketPair;
    use crate::types::{Order, OrderSide};
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use std::sync::Mutex;

    struct BalanceExchange {
        balance: Decimal,
        withdrawals: Mutex<Vec<(Money, String, bool)>>,
    }

    impl BalanceExchange {
        fn new(balance: Decimal) -> Self {
            Self {
                balance,
                withdrawals: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ExchangeClient for BalanceExchange {
        async fn get_available_balance(&self, currency: &Currency) -> Result<Money> {
            Ok(Money::new(self.balance, currency.clone()))
        }

        async fn quote_order_book(
            &self,
            _market: &MarketPair,
            _side: OrderSide,
            _quote_amount: &Money,
        ) -> Result<Decimal> {
            Ok(Decimal::ZERO)
        }

        async fn place_market_order(
            &self,
            _market: &MarketPair,
            _side: OrderSide,
            _base_amount: Decimal,
        ) -> Result<Option<Order>> {
            Ok(None)
        }

        async fn fetch_order(&self, _order_id: &str) -> Result<Order> {
            unreachable!("sweeper never fetches orders")
        }

        async fn request_withdrawal(
            &self,
            amount: &Money,
            address: &str,
            subtract_fee: bool,
        ) -> Result<()> {
            self.withdrawals
                .lock()
                .unwrap()
                .push((amount.clone(), address.to_string(), subtract_fee));
            Ok(())
        }

        fn name(&self) -> &str {
            "balance-only"
        }
    }

    fn btc() -> Currency {
        Currency::new("BTC")
    }

    fn fair() -> Money {
        Money::new(dec!(60000000), Currency::new("CLP"))
    }

    #[tokio::test]
    async fn test_sweeps_full_balance_above_base_threshold() {
        let exchange = BalanceExchange::new(dec!(0.05));
        let sweeper = Sweeper::new("bc1qtest".into(), dec!(0.01), None);
        let outcome = sweeper.sweep(&exchange, &btc(), &fair()).await.unwrap();
        assert_eq!(
            outcome,
            SweepOutcome::Swept {
                amount: Money::new(dec!(0.05), btc())
            }
        );
        let withdrawals = exchange.withdrawals.lock().unwrap();
        assert_eq!(withdrawals.len(), 1);
        assert_eq!(withdrawals[0].1, "bc1qtest");
        assert!(withdrawals[0].2, "fee must come out of the swept amount");
    }

    #[tokio::test]
    async fn test_below_base_threshold_does_nothing() {
        let exchange = BalanceExchange::new(dec!(0.001));
        let sweeper = Sweeper::new("bc1qtest".into(), dec!(0.01), None);
        let outcome = sweeper.sweep(&exchange, &btc(), &fair()).await.unwrap();
        assert_eq!(outcome, SweepOutcome::BelowThreshold);
        assert!(exchange.withdrawals.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_quote_denominated_threshold_uses_fair_price() {
        // 0.002 BTC * 60M CLP = 120k CLP, above a 100k CLP threshold
        let exchange = BalanceExchange::new(dec!(0.002));
        let sweeper = Sweeper::new(
            "bc1qtest".into(),
            dec!(100000),
            Some(Currency::new("CLP")),
        );
        let outcome = sweeper.sweep(&exchange, &btc(), &fair()).await.unwrap();
        assert!(matches!(outcome, SweepOutcome::Swept { .. }));
    }

    #[tokio::test]
    async fn test_quote_denominated_threshold_below() {
        // 0.001 BTC * 60M CLP = 60k CLP, below 100k
        let exchange = BalanceExchange::new(dec!(0.001));
        let sweeper = Sweeper::new(
            "bc1qtest".into(),
            dec!(100000),
            Some(Currency::new("CLP")),
        );
        let outcome = sweeper.sweep(&exchange, &btc(), &fair()).await.unwrap();
        assert_eq!(outcome, SweepOutcome::BelowThreshold);
    }

    #[tokio::test]
    async fn test_zero_balance_short_circuits() {
        let exchange = BalanceExchange::new(Decimal::ZERO);
        let sweeper = Sweeper::new("bc1qtest".into(), Decimal::ZERO, None);
        let outcome = sweeper.sweep(&exchange, &btc(), &fair()).await.unwrap();
        assert_eq!(outcome, SweepOutcome::BelowThreshold);
        assert!(exchange.withdrawals.lock().unwrap().is_empty());
    }
}
