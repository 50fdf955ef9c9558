//! Local exchange integration.
//!
//! Defines the `ExchangeClient` trait the engine executes against, and the
//! Buda implementation. The engine only ever sees this seam: balances,
//! order-book quotations, market orders, order polling, and withdrawals.

pub mod buda;

use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::money::{Currency, MarketPair, Money};
use crate::types::{Order, OrderSide};

/// Abstraction over the exchange where orders are actually placed.
#[async_trait]
pub trait ExchangeClient: Send + Sync {
    /// Available (settled, unreserved) balance for a currency.
    async fn get_available_balance(&self, currency: &Currency) -> Result<Money>;

    /// How much base asset `quote_amount` buys at current order-book depth.
    async fn quote_order_book(
        &self,
        market: &MarketPair,
        side: OrderSide,
        quote_amount: &Money,
    ) -> Result<Decimal>;

    /// Submit a market order sized in base-asset units. `Ok(None)` means the
    /// venue accepted the call but produced no order.
    async fn place_market_order(
        &self,
        market: &MarketPair,
        side: OrderSide,
        base_amount: Decimal,
    ) -> Result<Option<Order>>;

    /// Refresh order state by id.
    async fn fetch_order(&self, order_id: &str) -> Result<Order>;

    /// Move `amount` to an external address. With `subtract_fee` the network
    /// fee comes out of the withdrawn amount.
    async fn request_withdrawal(
        &self,
        amount: &Money,
        address: &str,
        subtract_fee: bool,
    ) -> Result<()>;

    /// Exchange name for logging and identification.
    fn name(&self) -> &str;
}
