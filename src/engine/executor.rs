//! Order execution state machine.
//!
//! Places a market buy sized in base-asset units, then polls the order by
//! id until it reaches a terminal state. Placement failures are terminal —
//! no retry within a run. The poll loop is bounded: when the budget runs
//! out the outcome is explicitly "unresolved" rather than an indefinite
//! block.

use anyhow::Result;
use rust_decimal::Decimal;
use std::time::Duration;
use tracing::{info, warn};

use crate::exchange::ExchangeClient;
use crate::money::MarketPair;
use crate::types::{Order, OrderSide, OrderStatus};

/// Terminal result of one execution attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    /// Order fully executed; the caller records the transaction.
    Filled(Order),
    /// The venue rejected or canceled the order. No ledger write.
    Rejected,
    /// Poll budget exhausted with the order still open. The id is surfaced
    /// so the operator can reconcile manually.
    Unresolved { order_id: String },
}

pub struct OrderExecutor {
    poll_interval: Duration,
    max_poll_attempts: u32,
}

impl OrderExecutor {
    pub fn new(poll_interval: Duration, max_poll_attempts: u32) -> Self {
        Self {
            poll_interval,
            max_poll_attempts,
        }
    }

    /// Run the NotPlaced → Open → terminal state machine once.
    pub async fn execute(
        &self,
        exchange: &dyn ExchangeClient,
        market: &MarketPair,
        base_amount: Decimal,
    ) -> Result<ExecutionOutcome> {
        let mut order = match exchange
            .place_market_order(market, OrderSide::Buy, base_amount)
            .await
        {
            Ok(Some(order)) => order,
            Ok(None) => {
                warn!(market = %market, "Order placement returned no order");
                return Ok(ExecutionOutcome::Rejected);
            }
            Err(e) => {
                warn!(market = %market, error = format!("{e:#}"), "Order placement failed");
                return Ok(ExecutionOutcome::Rejected);
            }
        };

        info!(
            order_id = %order.id,
            amount = %base_amount,
            "Market order placed, waiting for traded state"
        );

        let mut attempts = 0;
        loop {
            match order.status {
                OrderStatus::Traded => {
                    info!(order_id = %order.id, "Order traded");
                    return Ok(ExecutionOutcome::Filled(order));
                }
                OrderStatus::Canceled => {
                    warn!(order_id = %order.id, "Order canceled by venue");
                    return Ok(ExecutionOutcome::Rejected);
                }
                OrderStatus::Open => {
                    if attempts >= self.max_poll_attempts {
                        warn!(
                            order_id = %order.id,
                            attempts,
                            "Poll budget exhausted, order outcome unknown"
                        );
                        return Ok(ExecutionOutcome::Unresolved { order_id: order.id });
                    }
                    attempts += 1;
                    tokio::time::sleep(self.poll_interval).await;
                    // Status-refresh failures propagate: upstream
                    // unavailability, not an order decision.
                    order = exchange.fetch_order(&order.id).await?;
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::{Currency, Money};
    use anyhow::anyhow;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Scripted exchange: placement result plus a queue of statuses served
    /// by successive `fetch_order` calls.
    struct ScriptedExchange {
        placement: Option<Order>,
        placement_fails: bool,
        statuses: Mutex<Vec<OrderStatus>>,
        fetches: Mutex<u32>,
    }

    impl ScriptedExchange {
        fn new(placement: Option<Order>, statuses: Vec<OrderStatus>) -> Self {
            Self {
                placement,
                placement_fails: false,
                statuses: Mutex::new(statuses),
                fetches: Mutex::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                placement: None,
                placement_fails: true,
                statuses: Mutex::new(Vec::new()),
                fetches: Mutex::new(0),
            }
        }

        fn fetch_count(&self) -> u32 {
            *self.fetches.lock().unwrap()
        }
    }

    #[async_trait]
    impl ExchangeClient for ScriptedExchange {
        async fn get_available_balance(&self, currency: &Currency) -> Result<Money> {
            Ok(Money::zero(currency.clone()))
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
            if self.placement_fails {
                return Err(anyhow!("venue says no"));
            }
            Ok(self.placement.clone())
        }

        async fn fetch_order(&self, order_id: &str) -> Result<Order> {
            *self.fetches.lock().unwrap() += 1;
            let mut statuses = self.statuses.lock().unwrap();
            let status = if statuses.is_empty() {
                OrderStatus::Open
            } else {
                statuses.remove(0)
            };
            Ok(Order {
                id: order_id.to_string(),
                status,
            })
        }

        async fn request_withdrawal(
            &self,
            _amount: &Money,
            _address: &str,
            _subtract_fee: bool,
        ) -> Result<()> {
            Ok(())
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    fn executor() -> OrderExecutor {
        OrderExecutor::new(Duration::from_millis(1), 5)
    }

    fn open_order() -> Order {
        Order {
            id: "o-1".to_string(),
            status: OrderStatus::Open,
        }
    }

    fn pair() -> MarketPair {
        "BTC-CLP".parse().unwrap()
    }

    #[tokio::test]
    async fn test_fills_after_polling() {
        let exchange = ScriptedExchange::new(
            Some(open_order()),
            vec![OrderStatus::Open, OrderStatus::Open, OrderStatus::Traded],
        );
        let outcome = executor()
            .execute(&exchange, &pair(), Decimal::ONE)
            .await
            .unwrap();
        assert!(matches!(outcome, ExecutionOutcome::Filled(o) if o.id == "o-1"));
        assert_eq!(exchange.fetch_count(), 3);
    }

    #[tokio::test]
    async fn test_immediately_traded_needs_no_poll() {
        let traded = Order {
            id: "o-2".to_string(),
            status: OrderStatus::Traded,
        };
        let exchange = ScriptedExchange::new(Some(traded), vec![]);
        let outcome = executor()
            .execute(&exchange, &pair(), Decimal::ONE)
            .await
            .unwrap();
        assert!(matches!(outcome, ExecutionOutcome::Filled(_)));
        assert_eq!(exchange.fetch_count(), 0);
    }

    #[tokio::test]
    async fn test_no_order_is_rejected() {
        let exchange = ScriptedExchange::new(None, vec![]);
        let outcome = executor()
            .execute(&exchange, &pair(), Decimal::ONE)
            .await
            .unwrap();
        assert_eq!(outcome, ExecutionOutcome::Rejected);
    }

    #[tokio::test]
    async fn test_placement_error_is_rejected_not_propagated() {
        let exchange = ScriptedExchange::failing();
        let outcome = executor()
            .execute(&exchange, &pair(), Decimal::ONE)
            .await
            .unwrap();
        assert_eq!(outcome, ExecutionOutcome::Rejected);
    }

    #[tokio::test]
    async fn test_cancellation_is_rejected() {
        let exchange = ScriptedExchange::new(Some(open_order()), vec![OrderStatus::Canceled]);
        let outcome = executor()
            .execute(&exchange, &pair(), Decimal::ONE)
            .await
            .unwrap();
        assert_eq!(outcome, ExecutionOutcome::Rejected);
    }

    #[tokio::test]
    async fn test_poll_budget_exhaustion_is_unresolved() {
        // Status never leaves Open; 5 attempts then give up.
        let exchange = ScriptedExchange::new(Some(open_order()), vec![]);
        let outcome = executor()
            .execute(&exchange, &pair(), Decimal::ONE)
            .await
            .unwrap();
        assert_eq!(
            outcome,
            ExecutionOutcome::Unresolved {
                order_id: "o-1".to_string()
            }
        );
        assert_eq!(exchange.fetch_count(), 5);
    }
}
