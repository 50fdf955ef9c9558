//! Shared types for the PROMEDIO agent.
//!
//! The transaction record, order model, run outcomes, and the domain error
//! enum live here so that engine, exchange, and storage modules can depend
//! on them without circular references.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::money::{Currency, Money};

// ---------------------------------------------------------------------------
// Transaction
// ---------------------------------------------------------------------------

/// A completed purchase. Created only after an order reaches the traded
/// state; immutable once written to the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Purchase time, always UTC.
    pub date: DateTime<Utc>,
    /// Effective buy price in the quote currency (quote spent per base unit).
    pub buy_price: Money,
    /// Quote currency invested.
    pub quote_amount: Money,
    /// Base asset received.
    pub base_amount: Money,
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | bought {} for {} @ {}",
            self.date.format("%Y-%m-%d %H:%M:%S"),
            self.base_amount,
            self.quote_amount,
            self.buy_price,
        )
    }
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

/// Order direction on the local exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "buy"),
            OrderSide::Sell => write!(f, "sell"),
        }
    }
}

/// Order lifecycle as reported by the venue. `Traded` and `Canceled` are
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Open,
    Traded,
    Canceled,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Traded | OrderStatus::Canceled)
    }
}

impl FromStr for OrderStatus {
    type Err = AgentError;

    /// Maps venue state strings onto the three states the engine cares
    /// about. Pre-trade states all count as open.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "received" | "pending" | "accepted" | "open" => Ok(OrderStatus::Open),
            "traded" | "closed" | "filled" => Ok(OrderStatus::Traded),
            "canceling" | "canceled" | "cancelled" | "rejected" => Ok(OrderStatus::Canceled),
            other => Err(AgentError::Exchange(format!("unknown order state: {other}"))),
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderStatus::Open => write!(f, "open"),
            OrderStatus::Traded => write!(f, "traded"),
            OrderStatus::Canceled => write!(f, "canceled"),
        }
    }
}

/// Local reference to a venue-owned order, refreshed by polling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub status: OrderStatus,
}

// ---------------------------------------------------------------------------
// Run outcome
// ---------------------------------------------------------------------------

/// Terminal result of a single agent invocation. The surrounding runner maps
/// these onto process exit codes.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// A purchase completed and was recorded.
    Invested,
    /// An investment already happened within the current interval.
    SkippedAlreadyInvested,
    /// Computed amount fell at or below the configured minimum.
    SkippedAmountTooLow,
    /// Overprice guard rejected the purchase (too expensive or underfunded).
    SkippedGuardRejected,
    /// Guard approved but dry-run mode suppressed placement.
    DryRun,
    /// The venue rejected the order placement outright.
    OrderRejected,
    /// The order never reached a terminal state within the poll budget.
    OrderUnresolved { order_id: String },
}

impl RunOutcome {
    /// Process exit status: benign outcomes exit 0, order-level failures 2.
    /// Propagated errors exit 1 via `main` returning `Err`.
    pub fn exit_code(&self) -> i32 {
        match self {
            RunOutcome::Invested
            | RunOutcome::SkippedAlreadyInvested
            | RunOutcome::SkippedAmountTooLow
            | RunOutcome::SkippedGuardRejected
            | RunOutcome::DryRun => 0,
            RunOutcome::OrderRejected | RunOutcome::OrderUnresolved { .. } => 2,
        }
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::Invested => write!(f, "invested"),
            RunOutcome::SkippedAlreadyInvested => {
                write!(f, "skipped: already invested this interval")
            }
            RunOutcome::SkippedAmountTooLow => write!(f, "skipped: investment amount too low"),
            RunOutcome::SkippedGuardRejected => {
                write!(f, "skipped: overpriced or insufficient balance")
            }
            RunOutcome::DryRun => write!(f, "dry run: no order placed"),
            RunOutcome::OrderRejected => write!(f, "order rejected by venue"),
            RunOutcome::OrderUnresolved { order_id } => {
                write!(f, "order outcome unknown (id {order_id})")
            }
        }
    }
}

/// What a single run did, for logging and the runner's exit mapping.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub intervals_elapsed: u32,
    pub transaction: Option<Transaction>,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Domain-specific error types for PROMEDIO.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("currency mismatch: {left} vs {right}")]
    CurrencyMismatch { left: Currency, right: Currency },

    #[error("arithmetic error: {0}")]
    Arithmetic(String),

    #[error("reference price unavailable: {0}")]
    ReferencePrice(String),

    #[error("conversion rate unavailable ({provider}): {message}")]
    Conversion { provider: String, message: String },

    #[error("exchange error: {0}")]
    Exchange(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("configuration error: {0}")]
    Config(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
