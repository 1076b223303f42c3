//! Per-cycle view of an exchange: markets, quotes and balances fetched once
//! and then read by the pure routing, valuation and order code.

use crate::errors::Result;
use crate::exchange::ExchangeProvider;
use crate::models::{Balance, PriceMode, Quote, Ticker};
use crate::portfolio::{PortfolioValuation, QuoteSource, value_portfolio};
use crate::routing::{MarketGraph, Route, resolve_route};
use futures::future::join_all;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, info, warn};

/// Quotes captured for one cycle, keyed by canonical symbol.
#[derive(Debug, Clone, Default)]
pub struct QuoteBook {
    quotes: HashMap<String, Quote>,
}

impl QuoteBook {
    pub fn from_quotes(quotes: impl IntoIterator<Item = Quote>) -> Self {
        Self {
            quotes: quotes.into_iter().map(|q| (q.symbol.clone(), q)).collect(),
        }
    }

    /// Quotes every ticker reporting both a bid and an ask, then falls back to
    /// the order book for each of `required` still missing.
    ///
    /// A failed order-book request leaves that symbol unquoted.
    pub async fn build<P: ExchangeProvider + ?Sized>(
        provider: &P,
        tickers: &[Ticker],
        required: &BTreeSet<String>,
    ) -> Self {
        let mut book = Self::from_quotes(tickers.iter().filter_map(Quote::from_ticker));

        let missing: Vec<&String> = required
            .iter()
            .filter(|s| !book.quotes.contains_key(s.as_str()))
            .collect();
        if missing.is_empty() {
            return book;
        }
        debug!(count = missing.len(), "[CYCLE] falling back to order books");

        let fetched = join_all(missing.iter().map(|s| provider.fetch_order_book(s))).await;
        for (symbol, res) in missing.into_iter().zip(fetched) {
            match res {
                Ok(depth) => match Quote::from_book(symbol, &depth) {
                    Some(q) => {
                        book.quotes.insert(symbol.clone(), q);
                    }
                    None => warn!(%symbol, "[CYCLE] order book has an empty side"),
                },
                Err(e) => warn!(%symbol, error = %e, "[CYCLE] order book fetch failed"),
            }
        }
        book
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }
}

impl QuoteSource for QuoteBook {
    fn quote(&self, symbol: &str) -> Option<&Quote> {
        self.quotes.get(symbol)
    }
}

/// Everything one valuation or order-preparation cycle reads from the exchange.
///
/// Built once, never mutated; a new cycle captures a new snapshot.
#[derive(Debug, Clone)]
pub struct Snapshot {
    destination: String,
    graph: MarketGraph,
    quotes: QuoteBook,
    balances: Vec<Balance>,
}

impl Snapshot {
    /// Fetches markets, then tickers and balances concurrently, and quotes
    /// every symbol on the routes from held assets to `destination`.
    pub async fn capture<P: ExchangeProvider + ?Sized>(provider: &P, destination: &str) -> Result<Self> {
        let markets = provider.list_markets().await?;
        let (tickers, balances) =
            futures::try_join!(provider.fetch_tickers(), provider.fetch_balances())?;
        let graph = MarketGraph::build(markets);

        let required: BTreeSet<String> = balances
            .iter()
            .filter(|b| b.total() != 0.0)
            .filter_map(|b| resolve_route(&b.asset, destination, &graph))
            .flat_map(|r| r.symbols().map(str::to_string).collect::<Vec<_>>())
            .collect();
        let quotes = QuoteBook::build(provider, &tickers, &required).await;

        info!(
            exchange = provider.name(),
            markets = graph.len(),
            quotes = quotes.len(),
            balances = balances.len(),
            "[CYCLE] snapshot captured"
        );
        Ok(Self::from_parts(destination, graph, quotes, balances))
    }

    pub fn from_parts(
        destination: &str,
        graph: MarketGraph,
        quotes: QuoteBook,
        balances: Vec<Balance>,
    ) -> Self {
        Self {
            destination: destination.to_string(),
            graph,
            quotes,
            balances,
        }
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    pub fn graph(&self) -> &MarketGraph {
        &self.graph
    }

    pub fn quotes(&self) -> &QuoteBook {
        &self.quotes
    }

    pub fn balances(&self) -> &[Balance] {
        &self.balances
    }

    pub fn route(&self, source: &str) -> Option<Route> {
        resolve_route(source, &self.destination, &self.graph)
    }

    pub fn value(&self, mode: PriceMode) -> PortfolioValuation {
        value_portfolio(&self.balances, &self.destination, mode, &self.graph, &self.quotes)
    }

    /// Assets with a nonzero free amount.
    pub fn free_balances(&self) -> BTreeMap<&str, f64> {
        self.nonzero(|b| b.free)
    }

    /// Assets with a nonzero amount tied up in open orders.
    pub fn locked_balances(&self) -> BTreeMap<&str, f64> {
        self.nonzero(|b| b.locked)
    }

    /// Assets with a nonzero free plus locked amount.
    pub fn total_balances(&self) -> BTreeMap<&str, f64> {
        self.nonzero(Balance::total)
    }

    pub fn held_assets(&self) -> Vec<String> {
        self.total_balances().keys().map(|a| a.to_string()).collect()
    }

    /// Active markets between two held assets.
    pub fn held_pairs(&self) -> Vec<String> {
        self.graph.active_pairs_among(&self.held_assets())
    }

    fn nonzero(&self, amount: impl Fn(&Balance) -> f64) -> BTreeMap<&str, f64> {
        self.balances
            .iter()
            .map(|b| (b.asset.as_str(), amount(b)))
            .filter(|(_, v)| *v != 0.0)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::PaperProvider;
    use crate::models::{BookDepth, Market};
    use crate::portfolio::AssetStatus;

    fn provider() -> PaperProvider {
        PaperProvider::new()
            .with_market(Market::spot("BTC", "USDT"))
            .with_market(Market::spot("ETH", "BTC"))
            .with_market(Market::spot("XRP", "BTC"))
            .with_ticker("BTC/USDT", 29_990.0, 30_010.0)
            .with_ticker("XRP/BTC", 0.00002, 0.00002)
            .with_raw_ticker(Ticker {
                symbol: "ETH/BTC".into(),
                bid: None,
                ask: None,
            })
            .with_book(
                "ETH/BTC",
                BookDepth {
                    bids: vec![(0.0625, 1.0)],
                    asks: vec![(0.1875, 1.0)],
                },
            )
            .with_balance("BTC", 0.5, 0.0)
            .with_balance("ETH", 1.0, 1.0)
            .with_balance("USDT", 1000.0, 0.0)
            .with_balance("DOGE", 0.0, 0.0)
    }

    #[tokio::test]
    async fn falls_back_to_order_book_for_route_symbols_only() {
        let p = provider();
        let snap = Snapshot::capture(&p, "USDT").await.unwrap();
        assert_eq!(p.book_requests(), 1);
        let q = snap.quotes().quote("ETH/BTC").unwrap();
        assert_eq!(q.mid, 0.125);
    }

    #[tokio::test]
    async fn values_a_mixed_portfolio() {
        let p = provider();
        let snap = Snapshot::capture(&p, "USDT").await.unwrap();
        let v = snap.value(PriceMode::Mid);
        // 0.5 BTC = 15000, 2 ETH = 0.25 BTC = 7500, 1000 USDT
        assert_eq!(v.total, 23_500.0);
        assert!(!v.assets.contains_key("DOGE"));
    }

    #[tokio::test]
    async fn balance_views_skip_zero_amounts() {
        let snap = Snapshot::capture(&provider(), "USDT").await.unwrap();
        assert_eq!(snap.locked_balances().len(), 1);
        assert_eq!(snap.free_balances()["ETH"], 1.0);
        assert_eq!(snap.total_balances()["ETH"], 2.0);
        assert_eq!(snap.held_assets(), vec!["BTC", "ETH", "USDT"]);
        assert_eq!(snap.held_pairs(), vec!["BTC/USDT".to_string(), "ETH/BTC".to_string()]);
    }

    #[tokio::test]
    async fn zero_priced_market_values_to_zero_without_book_fetch() {
        let p = PaperProvider::new()
            .with_market(Market::spot("DEAD", "USDT"))
            .with_ticker("DEAD/USDT", 0.0, 0.0)
            .with_balance("DEAD", 50.0, 0.0)
            .with_balance("USDT", 10.0, 0.0);
        let snap = Snapshot::capture(&p, "USDT").await.unwrap();
        assert_eq!(p.book_requests(), 0);

        let v = snap.value(PriceMode::Mid);
        let dead = &v.assets["DEAD"];
        assert_eq!(dead.value, 0.0);
        assert!(matches!(dead.status, AssetStatus::Valued { .. }));
        assert!(v.unpriced().is_empty());
        assert_eq!(v.total, 10.0);
    }

    #[tokio::test]
    async fn failed_book_fetch_leaves_asset_unpriced() {
        let p = PaperProvider::new()
            .with_market(Market::spot("ETH", "USDT"))
            .with_balance("ETH", 1.0, 0.0);
        let snap = Snapshot::capture(&p, "USDT").await.unwrap();
        let v = snap.value(PriceMode::Mid);
        assert_eq!(v.unpriced(), vec!["ETH"]);
        assert_eq!(v.total, 0.0);
    }
}
