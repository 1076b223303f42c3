//! In-memory exchange used for dry runs and tests.

use super::{ExchangeProvider, OpenOrder, OrderReceipt};
use crate::errors::{AppError, Result};
use crate::models::{Balance, BookDepth, Market, Ticker};
use crate::order::PreparedOrder;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;
use tracing::info;

/// Maker fee charged on symbols without an explicit rate.
pub const DEFAULT_MAKER_FEE: f64 = 0.001;

#[derive(Debug, Default)]
struct PaperState {
    next_id: u64,
    open: Vec<OpenOrder>,
    submitted: Vec<PreparedOrder>,
    cancelled: Vec<String>,
}

/// Serialized contents of a paper exchange.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PaperFixture {
    pub markets: Vec<Market>,
    pub tickers: Vec<Ticker>,
    pub books: HashMap<String, BookDepth>,
    pub balances: Vec<Balance>,
    pub fees: HashMap<String, f64>,
}

/// Exchange whose markets, prices and balances are fixed at construction.
///
/// Submitted orders rest as open orders until cancelled; nothing fills.
#[derive(Debug, Default)]
pub struct PaperProvider {
    markets: Vec<Market>,
    tickers: Vec<Ticker>,
    books: HashMap<String, BookDepth>,
    balances: Vec<Balance>,
    fees: HashMap<String, f64>,
    state: Mutex<PaperState>,
    book_requests: AtomicUsize,
}

impl PaperProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fixture(fixture: PaperFixture) -> Self {
        Self {
            markets: fixture.markets,
            tickers: fixture.tickers,
            books: fixture.books,
            balances: fixture.balances,
            fees: fixture.fees,
            ..Self::default()
        }
    }

    /// Loads a fixture from JSON.
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(Self::from_fixture(serde_json::from_str(raw)?))
    }

    pub fn with_market(mut self, market: Market) -> Self {
        self.markets.push(market);
        self
    }

    /// Adds a ticker with both sides present.
    pub fn with_ticker(self, symbol: &str, bid: f64, ask: f64) -> Self {
        self.with_raw_ticker(Ticker {
            symbol: symbol.to_string(),
            bid: Some(bid),
            ask: Some(ask),
        })
    }

    pub fn with_raw_ticker(mut self, ticker: Ticker) -> Self {
        self.tickers.push(ticker);
        self
    }

    pub fn with_book(mut self, symbol: &str, book: BookDepth) -> Self {
        self.books.insert(symbol.to_string(), book);
        self
    }

    pub fn with_fee(mut self, symbol: &str, maker: f64) -> Self {
        self.fees.insert(symbol.to_string(), maker);
        self
    }

    pub fn with_balance(mut self, asset: &str, free: f64, locked: f64) -> Self {
        self.balances.push(Balance::new(asset, free, locked));
        self
    }

    /// Orders submitted so far, oldest first.
    pub async fn submitted(&self) -> Vec<PreparedOrder> {
        self.state.lock().await.submitted.clone()
    }

    /// Ids of orders cancelled so far.
    pub async fn cancelled(&self) -> Vec<String> {
        self.state.lock().await.cancelled.clone()
    }

    /// Number of order-book requests served.
    pub fn book_requests(&self) -> usize {
        self.book_requests.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ExchangeProvider for PaperProvider {
    fn name(&self) -> &'static str {
        "paper"
    }

    async fn list_markets(&self) -> Result<Vec<Market>> {
        Ok(self.markets.clone())
    }

    async fn fetch_tickers(&self) -> Result<Vec<Ticker>> {
        Ok(self.tickers.clone())
    }

    async fn fetch_order_book(&self, symbol: &str) -> Result<BookDepth> {
        self.book_requests.fetch_add(1, Ordering::Relaxed);
        self.books.get(symbol).cloned().ok_or_else(|| AppError::Exchange {
            status: 404,
            body: format!("no order book for {symbol}"),
        })
    }

    async fn fetch_balances(&self) -> Result<Vec<Balance>> {
        Ok(self.balances.clone())
    }

    async fn trading_fee(&self, symbol: &str) -> Result<f64> {
        Ok(self.fees.get(symbol).copied().unwrap_or(DEFAULT_MAKER_FEE))
    }

    async fn submit_order(&self, order: &PreparedOrder) -> Result<OrderReceipt> {
        let mut state = self.state.lock().await;
        state.next_id += 1;
        let id = format!("paper-{}", state.next_id);
        state.open.push(OpenOrder {
            id: id.clone(),
            symbol: order.pair().to_string(),
            direction: order.direction(),
            amount: order.amount(),
            price: order.price(),
        });
        state.submitted.push(order.clone());
        info!(%id, order = %order, "[EXCHANGE] paper order accepted");
        Ok(OrderReceipt {
            id,
            symbol: order.pair().to_string(),
            status: "NEW".to_string(),
        })
    }

    async fn fetch_open_orders(&self, symbol: &str) -> Result<Vec<OpenOrder>> {
        let state = self.state.lock().await;
        Ok(state
            .open
            .iter()
            .filter(|o| o.symbol == symbol)
            .cloned()
            .collect())
    }

    async fn cancel_order(&self, id: &str, symbol: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        let before = state.open.len();
        state.open.retain(|o| !(o.id == id && o.symbol == symbol));
        if state.open.len() == before {
            return Err(AppError::Exchange {
                status: 404,
                body: format!("unknown order {id} on {symbol}"),
            });
        }
        state.cancelled.push(id.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Direction, Precision};
    use crate::order::RawOrder;
    use crate::routing::MarketGraph;

    #[tokio::test]
    async fn loads_fixture_from_json() {
        let raw = r#"{
            "markets": [{
                "symbol": "BTC/USDT", "id": "BTCUSDT", "base": "BTC", "quote": "USDT",
                "active": true,
                "limits": {"amount_min": 0.0001, "cost_min": 10.0},
                "price_precision": {"Decimals": 2},
                "amount_precision": {"Step": 0.0001}
            }],
            "tickers": [{"symbol": "BTC/USDT", "bid": 30000.0, "ask": null}],
            "books": {"BTC/USDT": {"bids": [[29990.0, 1.0]], "asks": [[30010.0, 2.0]]}},
            "balances": [{"asset": "BTC", "free": 0.5, "locked": 0.0}],
            "fees": {"BTC/USDT": 0.00075}
        }"#;
        let p = PaperProvider::from_json(raw).unwrap();
        let markets = p.list_markets().await.unwrap();
        assert_eq!(markets[0].amount_precision, Precision::Step(0.0001));
        assert_eq!(p.fetch_tickers().await.unwrap()[0].ask, None);
        assert_eq!(p.fetch_order_book("BTC/USDT").await.unwrap().best_ask(), Some(30010.0));
        assert_eq!(p.fetch_balances().await.unwrap()[0].total(), 0.5);
        assert_eq!(p.trading_fee("BTC/USDT").await.unwrap(), 0.00075);
        assert_eq!(p.trading_fee("ETH/USDT").await.unwrap(), DEFAULT_MAKER_FEE);
    }

    #[tokio::test]
    async fn submitted_orders_rest_until_cancelled() {
        let graph = MarketGraph::build(vec![Market::spot("BTC", "USDT")]);
        let order = crate::order::prepare_order(
            RawOrder::new("BTC/USDT", Direction::Buy, 0.01, 25_000.0),
            &graph,
            &crate::order::ExchangeRounding::default(),
        )
        .unwrap();
        let p = PaperProvider::new();
        let receipt = p.submit_order(&order).await.unwrap();
        assert_eq!(p.fetch_open_orders("BTC/USDT").await.unwrap().len(), 1);

        p.cancel_order(&receipt.id, "BTC/USDT").await.unwrap();
        assert!(p.fetch_open_orders("BTC/USDT").await.unwrap().is_empty());
        assert!(p.cancel_order(&receipt.id, "BTC/USDT").await.is_err());
    }
}
