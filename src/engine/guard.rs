//! Overprice guard.
//!
//! Compares the local market's effective buy price against the converted
//! reference price and refuses to buy when the premium exceeds the
//! configured limit or the balance can't cover the investment. Callers
//! branch on the single `approved` boolean; the reason is a diagnostic side
//! channel only.

use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::money::Money;
use crate::types::AgentError;

/// Why the guard said no. Logged, never branched on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    Overpriced,
    InsufficientBalance,
}

#[derive(Debug, Clone)]
pub struct GuardVerdict {
    pub approved: bool,
    /// Signed premium of the local price over the fair price; negative
    /// means the local market is cheaper.
    pub overprice: Decimal,
    pub reason: Option<RejectReason>,
}

/// `local_buy_price / fair_price - 1`.
pub fn overprice(local_buy_price: &Money, fair_price: &Money) -> Result<Decimal, AgentError> {
    Ok(local_buy_price.ratio(fair_price)? - Decimal::ONE)
}

/// Evaluate the purchase decision. Approval requires the premium to stay
/// under the limit AND the available balance to exceed the amount.
pub fn evaluate(
    local_buy_price: &Money,
    fair_price: &Money,
    available_balance: &Money,
    amount_to_invest: &Money,
    overprice_limit: Decimal,
) -> Result<GuardVerdict, AgentError> {
    let overprice = overprice(local_buy_price, fair_price)?;
    let price_ok = overprice < overprice_limit;
    let funded = available_balance.gt(amount_to_invest)?;

    let approved = price_ok && funded;
    let reason = if approved {
        None
    } else if !price_ok {
        Some(RejectReason::Overpriced)
    } else {
        Some(RejectReason::InsufficientBalance)
    };

    if approved {
        info!(
            overprice = format!("{:.2}%", overprice * Decimal::from(100)),
            limit = format!("{:.2}%", overprice_limit * Decimal::from(100)),
            "Guard approved purchase"
        );
    } else {
        match reason {
            Some(RejectReason::Overpriced) => warn!(
                overprice = format!("{:.2}%", overprice * Decimal::from(100)),
                limit = format!("{:.2}%", overprice_limit * Decimal::from(100)),
                local = %local_buy_price,
                fair = %fair_price,
                "Guard rejected: local price too far above reference"
            ),
            Some(RejectReason::InsufficientBalance) => warn!(
                balance = %available_balance,
                needed = %amount_to_invest,
                "Guard rejected: insufficient available balance"
            ),
            None => {}
        }
    }

    Ok(GuardVerdict {
        approved,
        overprice,
        reason,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
