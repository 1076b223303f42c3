use crate::models::{Market, MarketLimits};
use crate::utils::format_symbol;
use std::collections::HashMap;

/// In-memory index of the active markets of one cycle.
///
/// Listing order from the provider is preserved; the two-hop search in the
/// resolver depends on it for deterministic tie-breaking.
#[derive(Debug, Clone, Default)]
pub struct MarketGraph {
    markets: Vec<Market>,
    by_symbol: HashMap<String, usize>,
    by_base: HashMap<String, Vec<usize>>,
    by_asset: HashMap<String, Vec<usize>>,
}

impl MarketGraph {
    /// Indexes the active markets of a listing. Inactive markets are dropped;
    /// when a symbol repeats, the first listing wins.
    pub fn build(markets: impl IntoIterator<Item = Market>) -> Self {
        let mut graph = Self::default();
        for market in markets.into_iter().filter(|m| m.active) {
            if graph.by_symbol.contains_key(&market.symbol) {
                continue;
            }
            let idx = graph.markets.len();
            graph.by_symbol.insert(market.symbol.clone(), idx);
            graph.by_base.entry(market.base.clone()).or_default().push(idx);
            graph.by_asset.entry(market.base.clone()).or_default().push(idx);
            graph
                .by_asset
                .entry(market.quote.clone())
                .or_default()
                .push(idx);
            graph.markets.push(market);
        }
        graph
    }

    /// Exact lookup of the active market "BASE/QUOTE".
    pub fn has_direct(&self, base: &str, quote: &str) -> Option<&Market> {
        self.market(&format_symbol(base, quote))
    }

    pub fn market(&self, symbol: &str) -> Option<&Market> {
        self.by_symbol.get(symbol).map(|&i| &self.markets[i])
    }

    pub fn limits(&self, symbol: &str) -> Option<MarketLimits> {
        self.market(symbol).map(|m| m.limits)
    }

    /// Active markets where `asset` is the base, in listing order.
    pub fn markets_with_base(&self, asset: &str) -> Vec<&Market> {
        self.collect(self.by_base.get(asset))
    }

    /// Active markets where `asset` is either side, in listing order.
    pub fn markets_touching(&self, asset: &str) -> Vec<&Market> {
        self.collect(self.by_asset.get(asset))
    }

    /// Symbols of every active market whose base and quote are both in `assets`.
    pub fn active_pairs_among(&self, assets: &[String]) -> Vec<String> {
        let mut pairs = Vec::new();
        for base in assets {
            for quote in assets {
                if let Some(m) = self.has_direct(base, quote) {
                    pairs.push(m.symbol.clone());
                }
            }
        }
        pairs
    }

    pub fn markets(&self) -> &[Market] {
        &self.markets
    }

    pub fn len(&self) -> usize {
        self.markets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markets.is_empty()
    }

    fn collect(&self, indices: Option<&Vec<usize>>) -> Vec<&Market> {
        indices
            .map(|ids| ids.iter().map(|&i| &self.markets[i]).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing() -> Vec<Market> {
        vec![
            Market::spot("BTC", "USDT"),
            Market::spot("ETH", "BTC"),
            Market::spot("ETH", "USDT"),
            Market::spot("LUNA", "USDT").inactive(),
        ]
    }

    #[test]
    fn drops_inactive_markets() {
        let graph = MarketGraph::build(listing());
        assert_eq!(graph.len(), 3);
        assert!(graph.has_direct("LUNA", "USDT").is_none());
        assert!(graph.markets_touching("LUNA").is_empty());
    }

    #[test]
    fn direct_lookup_is_directional() {
        let graph = MarketGraph::build(listing());
        assert_eq!(graph.has_direct("ETH", "BTC").unwrap().symbol, "ETH/BTC");
        assert!(graph.has_direct("BTC", "ETH").is_none());
    }

    #[test]
    fn base_fan_out_keeps_listing_order() {
        let graph = MarketGraph::build(listing());
        let quotes: Vec<&str> = graph
            .markets_with_base("ETH")
            .iter()
            .map(|m| m.quote.as_str())
            .collect();
        assert_eq!(quotes, vec!["BTC", "USDT"]);

        let touching: Vec<&str> = graph
            .markets_touching("BTC")
            .iter()
            .map(|m| m.symbol.as_str())
            .collect();
        assert_eq!(touching, vec!["BTC/USDT", "ETH/BTC"]);
    }

    #[test]
    fn first_listing_of_duplicate_symbol_wins() {
        let graph = MarketGraph::build(vec![
            Market::spot("BTC", "USDT").with_limits(0.001, 10.0),
            Market::spot("BTC", "USDT").with_limits(1.0, 1.0),
        ]);
        assert_eq!(graph.len(), 1);
        assert_eq!(graph.limits("BTC/USDT").unwrap().amount_min, 0.001);
    }

    #[test]
    fn active_pairs_among_held_assets() {
        let graph = MarketGraph::build(listing());
        let held = vec!["ETH".to_string(), "BTC".to_string(), "LUNA".to_string()];
        assert_eq!(graph.active_pairs_among(&held), vec!["ETH/BTC".to_string()]);
    }
}
