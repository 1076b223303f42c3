//! Exchange provider boundary.
//!
//! Responsibilities:
//! • List markets with their limits and precision.
//! • Report top-of-book tickers, with the order book as a fallback.
//! • Report balances.
//! • Report maker fees.
//! • Submit and cancel orders.
//!
//! Everything behind this trait is I/O; routing, valuation and order
//! preparation only ever see the values it returns.

use crate::errors::Result;
use crate::models::{Balance, BookDepth, Direction, Market, Ticker};
use crate::order::{ExchangeRounding, PreparedOrder};
use async_trait::async_trait;
use serde::Serialize;

pub mod binance;
pub mod paper;

pub use binance::{BinanceConfig, BinanceProvider};
pub use paper::{DEFAULT_MAKER_FEE, PaperFixture, PaperProvider};

/// Acknowledgement of a submitted order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderReceipt {
    pub id: String,
    pub symbol: String,
    pub status: String,
}

/// An order resting on the exchange.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpenOrder {
    pub id: String,
    pub symbol: String,
    pub direction: Direction,
    pub amount: f64,
    pub price: f64,
}

#[async_trait]
pub trait ExchangeProvider: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// All markets, active or not, in the exchange's listing order.
    async fn list_markets(&self) -> Result<Vec<Market>>;

    /// Tickers for every symbol the exchange reports on.
    async fn fetch_tickers(&self) -> Result<Vec<Ticker>>;

    async fn fetch_order_book(&self, symbol: &str) -> Result<BookDepth>;

    async fn fetch_balances(&self) -> Result<Vec<Balance>>;

    /// Maker fee rate on `symbol`, as a fraction (0.001 is 0.1%).
    async fn trading_fee(&self, symbol: &str) -> Result<f64>;

    async fn submit_order(&self, order: &PreparedOrder) -> Result<OrderReceipt>;

    async fn fetch_open_orders(&self, symbol: &str) -> Result<Vec<OpenOrder>>;

    async fn cancel_order(&self, id: &str, symbol: &str) -> Result<()>;

    /// How this exchange snaps amounts and prices onto a market's precision.
    fn rounding(&self) -> ExchangeRounding {
        ExchangeRounding::default()
    }
}
