//! Interval accounting and investment sizing.
//!
//! The interval accountant decides how many whole investment intervals have
//! passed since the last recorded purchase; zero means this interval is
//! already covered and the run must not place an order. The amount
//! calculator amortizes the budget across missed intervals instead of
//! capping at one.

use chrono::{DateTime, Duration, DurationRound, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::debug;

use crate::money::{Currency, Money};

/// Whole intervals elapsed since `last`, measured in wall-clock hours from
/// the start of `last`'s hour.
///
/// No prior transaction bootstraps to 1 so an initial investment is always
/// permitted. A `now` before `last` (clock skew, manual ledger edit) clamps
/// to 0 — treated as already invested, never an error.
pub fn intervals_elapsed(
    last: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    interval_hours: u32,
) -> u32 {
    let Some(last) = last else {
        return 1;
    };

    let floored = last
        .duration_trunc(Duration::hours(1))
        .unwrap_or(last);
    let hours = (now - floored).num_hours();
    if hours <= 0 {
        return 0;
    }
    hours as u32 / interval_hours.max(1)
}

/// Idempotency gate: true when the current interval already holds an
/// investment.
pub fn already_invested_this_interval(
    last: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    interval_hours: u32,
) -> bool {
    intervals_elapsed(last, now, interval_hours) == 0
}

// ---------------------------------------------------------------------------
// Amount calculator
// ---------------------------------------------------------------------------

/// Sizes each run's investment from the monthly budget. Order precision and
/// the minimum order amount are explicit per-instance configuration.
pub struct AmountCalculator {
    monthly_budget: Decimal,
    interval_hours: u32,
    quote: Currency,
    quote_precision: u32,
    min_order_amount: Decimal,
}

impl AmountCalculator {
    pub fn new(
        monthly_budget: Decimal,
        interval_hours: u32,
        quote: Currency,
        quote_precision: u32,
        min_order_amount: Decimal,
    ) -> Self {
        Self {
            monthly_budget,
            interval_hours,
            quote,
            quote_precision,
            min_order_amount,
        }
    }

    pub fn interval_hours(&self) -> u32 {
        self.interval_hours
    }

    /// Budget for a single interval: monthly / 30 days / 24 hours ×
    /// interval length.
    pub fn per_interval(&self) -> Decimal {
        self.monthly_budget / dec!(30) / dec!(24) * Decimal::from(self.interval_hours)
    }

    /// Amount to deploy this run, amortizing missed intervals. Truncated to
    /// the quote currency's order precision.
    pub fn amount_to_invest(&self, intervals: u32) -> Money {
        let raw = self.per_interval() * Decimal::from(intervals);
        let amount = Money::new(raw, self.quote.clone()).truncate(self.quote_precision);
        debug!(intervals, amount = %amount, "Investment amount computed");
        amount
    }

    /// Precondition gate: amounts at or below the minimum abort the run
    /// before any external call.
    pub fn below_minimum(&self, amount: &Money) -> bool {
        amount.amount <= self.min_order_amount
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
