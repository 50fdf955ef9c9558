//! Run orchestration.
//!
//! One `Engine::run` call is one scheduled invocation: gate on the interval
//! accountant, size the investment, fetch balance / fair price / order-book
//! quotation, consult the guard, execute, record. The ledger is written
//! exactly once per run, and only after the order reaches the traded state.

pub mod executor;
pub mod guard;
pub mod intervals;
pub mod sweeper;

use anyhow::{anyhow, Result};
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::exchange::ExchangeClient;
use crate::ledger::Ledger;
use crate::money::{MarketPair, Money};
use crate::reference::ReferencePricer;
use crate::types::{OrderSide, RunOutcome, RunReport, Transaction};

use executor::{ExecutionOutcome, OrderExecutor};
use intervals::AmountCalculator;
use sweeper::Sweeper;

pub struct Engine {
    market: MarketPair,
    exchange: Arc<dyn ExchangeClient>,
    pricer: ReferencePricer,
    calculator: AmountCalculator,
    executor: OrderExecutor,
    ledger: Ledger,
    sweeper: Option<Sweeper>,
    overprice_limit: Decimal,
    base_precision: u32,
    dry_run: bool,
}

impl Engine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        market: MarketPair,
        exchange: Arc<dyn ExchangeClient>,
        pricer: ReferencePricer,
        calculator: AmountCalculator,
        executor: OrderExecutor,
        ledger: Ledger,
        sweeper: Option<Sweeper>,
        overprice_limit: Decimal,
        base_precision: u32,
        dry_run: bool,
    ) -> Self {
        Self {
            market,
            exchange,
            pricer,
            calculator,
            executor,
            ledger,
            sweeper,
            overprice_limit,
            base_precision,
            dry_run,
        }
    }

    /// Execute one scheduled invocation end to end.
    pub async fn run(&mut self) -> Result<RunReport> {
        let now = Utc::now();
        let last = self.ledger.last().map(|tx| tx.date);
        let intervals =
            intervals::intervals_elapsed(last, now, self.calculator.interval_hours());

        info!(
            market = %self.market,
            intervals,
            history = self.ledger.len(),
            "Run started"
        );

        if intervals == 0 {
            info!("Already invested this interval, nothing to do");
            return Ok(self.report(RunOutcome::SkippedAlreadyInvested, 0, None));
        }

        let amount = self.calculator.amount_to_invest(intervals);
        if self.calculator.below_minimum(&amount) {
            warn!(amount = %amount, "Computed amount at or below the order minimum");
            return Ok(self.report(RunOutcome::SkippedAmountTooLow, intervals, None));
        }

        // All three reads must succeed before any decision is made.
        let balance = self
            .exchange
            .get_available_balance(&self.market.quote)
            .await?;
        let fair = self.pricer.fair_price().await?;
        let base_estimate = self
            .exchange
            .quote_order_book(&self.market, OrderSide::Buy, &amount)
            .await?;
        if base_estimate <= Decimal::ZERO {
            return Err(anyhow!(
                "order book quotation for {amount} returned {base_estimate}"
            ));
        }
        let buy_price = Money::new(amount.amount / base_estimate, self.market.quote.clone());

        info!(
            amount = %amount,
            balance = %balance,
            buy_price = %buy_price,
            fair_price = %fair.fair,
            reference_price = %fair.reference_price,
            conversion_rate = %fair.conversion_rate,
            "Purchase candidate"
        );

        let verdict = guard::evaluate(
            &buy_price,
            &fair.fair,
            &balance,
            &amount,
            self.overprice_limit,
        )?;
        if !verdict.approved {
            self.run_sweep(&fair.fair).await;
            return Ok(self.report(RunOutcome::SkippedGuardRejected, intervals, None));
        }

        if self.dry_run {
            info!(amount = %amount, "Dry run: guard approved, no order placed");
            return Ok(self.report(RunOutcome::DryRun, intervals, None));
        }

        let base_amount = base_estimate.trunc_with_scale(self.base_precision);
        let outcome = match self
            .executor
            .execute(self.exchange.as_ref(), &self.market, base_amount)
            .await?
        {
            ExecutionOutcome::Filled(order) => {
                let tx = Transaction {
                    date: now,
                    buy_price,
                    quote_amount: amount,
                    base_amount: Money::new(base_amount, self.market.base.clone()),
                };
                self.ledger.record(tx.clone())?;
                info!(order_id = %order.id, %tx, "Investment recorded");
                self.run_sweep(&fair.fair).await;
                return Ok(self.report(RunOutcome::Invested, intervals, Some(tx)));
            }
            ExecutionOutcome::Rejected => RunOutcome::OrderRejected,
            ExecutionOutcome::Unresolved { order_id } => RunOutcome::OrderUnresolved { order_id },
        };

        Ok(self.report(outcome, intervals, None))
    }

    /// Sweep failures are logged, never escalated: the investment already
    /// settled and a retry happens naturally next run.
    async fn run_sweep(&self, fair_price: &Money) {
        let Some(sweeper) = &self.sweeper else {
            return;
        };
        if let Err(e) = sweeper
            .sweep(self.exchange.as_ref(), &self.market.base, fair_price)
            .await
        {
            error!(error = format!("{e:#}"), "Withdrawal sweep failed");
        }
    }

    fn report(
        &self,
        outcome: RunOutcome,
        intervals_elapsed: u32,
        transaction: Option<Transaction>,
    ) -> RunReport {
        info!(outcome = %outcome, intervals_elapsed, "Run finished");
        RunReport {
            outcome,
            intervals_elapsed,
            transaction,
        }
    }
}
