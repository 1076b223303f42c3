use super::types::{AssetStatus, AssetValuation, PortfolioValuation};
use crate::models::{Balance, Direction, PriceMode, Quote};
use crate::routing::{MarketGraph, Route, resolve_route};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

/// Read access to the quotes captured for the current cycle.
pub trait QuoteSource {
    fn quote(&self, symbol: &str) -> Option<&Quote>;
}

impl QuoteSource for HashMap<String, Quote> {
    fn quote(&self, symbol: &str) -> Option<&Quote> {
        self.get(symbol)
    }
}

/// Converts `quantity` of a route's source asset into its destination asset.
///
/// BUY legs divide by the leg price, SELL legs multiply. A leg that produces
/// zero (zero-priced or delisted market) short-circuits the whole route to 0.
///
/// Returns `Err(symbol)` naming the first leg with no quote.
pub fn convert_along_route<Q: QuoteSource + ?Sized>(
    quantity: f64,
    route: &Route,
    mode: PriceMode,
    quotes: &Q,
) -> Result<f64, String> {
    let mut value = quantity;
    for leg in route.legs() {
        let price = quotes
            .quote(&leg.symbol)
            .ok_or_else(|| leg.symbol.clone())?
            .price(mode);
        value = match leg.direction {
            Direction::Buy if price == 0.0 => 0.0,
            Direction::Buy => value / price,
            Direction::Sell => value * price,
        };
        if value == 0.0 {
            return Ok(0.0);
        }
    }
    Ok(value)
}

/// Values every nonzero balance in `destination` and sums the results.
///
/// A single asset that cannot be routed or priced contributes 0 and is
/// recorded with its status; it never fails the whole valuation.
pub fn value_portfolio<Q: QuoteSource + ?Sized>(
    balances: &[Balance],
    destination: &str,
    mode: PriceMode,
    graph: &MarketGraph,
    quotes: &Q,
) -> PortfolioValuation {
    let mut assets = BTreeMap::new();
    let mut total = 0.0;

    for balance in balances {
        let quantity = balance.total();
        if quantity == 0.0 {
            continue;
        }
        let valuation = value_asset(&balance.asset, quantity, destination, mode, graph, quotes);
        total += valuation.value;
        // Repeated assets in a balance listing are merged.
        assets
            .entry(balance.asset.clone())
            .and_modify(|existing: &mut AssetValuation| {
                existing.quantity += valuation.quantity;
                existing.value += valuation.value;
            })
            .or_insert(valuation);
    }

    PortfolioValuation {
        destination: destination.to_string(),
        mode,
        total,
        assets,
    }
}

fn value_asset<Q: QuoteSource + ?Sized>(
    asset: &str,
    quantity: f64,
    destination: &str,
    mode: PriceMode,
    graph: &MarketGraph,
    quotes: &Q,
) -> AssetValuation {
    if asset == destination {
        return AssetValuation {
            asset: asset.to_string(),
            quantity,
            value: quantity,
            status: AssetStatus::Destination,
        };
    }

    let Some(route) = resolve_route(asset, destination, graph) else {
        warn!(asset, destination, quantity, "[CYCLE] asset is unroutable");
        return AssetValuation {
            asset: asset.to_string(),
            quantity,
            value: 0.0,
            status: AssetStatus::Unroutable,
        };
    };

    match convert_along_route(quantity, &route, mode, quotes) {
        Ok(value) => {
            debug!(asset, quantity, value, "[CYCLE] asset valued");
            AssetValuation {
                asset: asset.to_string(),
                quantity,
                value,
                status: AssetStatus::Valued { route },
            }
        }
        Err(symbol) => {
            warn!(asset, %symbol, "[CYCLE] no quote for route leg");
            AssetValuation {
                asset: asset.to_string(),
                quantity,
                value: 0.0,
                status: AssetStatus::Unpriced { route, symbol },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Market;
    use crate::routing::RouteLeg;

    fn quotes(entries: &[(&str, f64, f64)]) -> HashMap<String, Quote> {
        entries
            .iter()
            .map(|(s, bid, ask)| (s.to_string(), Quote::new(s, *bid, *ask)))
            .collect()
    }

    fn graph(markets: &[(&str, &str)]) -> MarketGraph {
        MarketGraph::build(markets.iter().map(|(b, q)| Market::spot(b, q)))
    }

    #[test]
    fn btc_and_usdt_portfolio_in_usdt() {
        let g = graph(&[("BTC", "USDT")]);
        let q = quotes(&[("BTC/USDT", 29_990.0, 30_010.0)]);
        let balances = vec![Balance::new("BTC", 0.5, 0.0), Balance::new("USDT", 1000.0, 0.0)];

        let v = value_portfolio(&balances, "USDT", PriceMode::Mid, &g, &q);
        assert_eq!(v.total, 16_000.0);
        assert_eq!(v.per_asset()["BTC"], 15_000.0);
        assert_eq!(v.per_asset()["USDT"], 1000.0);
        assert_eq!(v.assets["USDT"].status, AssetStatus::Destination);
    }

    #[test]
    fn mode_selects_bid_or_ask_uniformly() {
        let g = graph(&[("BTC", "USDT")]);
        let q = quotes(&[("BTC/USDT", 29_000.0, 31_000.0)]);
        let balances = vec![Balance::new("BTC", 1.0, 0.0)];

        let low = value_portfolio(&balances, "USDT", PriceMode::Low, &g, &q);
        let high = value_portfolio(&balances, "USDT", PriceMode::High, &g, &q);
        assert_eq!(low.total, 29_000.0);
        assert_eq!(high.total, 31_000.0);
    }

    #[test]
    fn buy_leg_divides_by_price() {
        let g = graph(&[("BTC", "USDT")]);
        let q = quotes(&[("BTC/USDT", 20_000.0, 20_000.0)]);
        let balances = vec![Balance::new("USDT", 1000.0, 0.0)];

        let v = value_portfolio(&balances, "BTC", PriceMode::Mid, &g, &q);
        assert_eq!(v.total, 0.05);
    }

    #[test]
    fn two_hop_conversion_feeds_first_leg_into_second() {
        let g = graph(&[("ETH", "BTC"), ("LTC", "BTC")]);
        let q = quotes(&[("ETH/BTC", 0.05, 0.05), ("LTC/BTC", 0.0025, 0.0025)]);
        let balances = vec![Balance::new("ETH", 2.0, 0.0)];

        // 2 ETH -> 0.1 BTC -> 40 LTC
        let v = value_portfolio(&balances, "LTC", PriceMode::Mid, &g, &q);
        assert!((v.total - 40.0).abs() < 1e-9);
    }

    #[test]
    fn unroutable_asset_is_flagged_and_contributes_zero() {
        let g = graph(&[("BTC", "USDT")]);
        let q = quotes(&[("BTC/USDT", 100.0, 100.0)]);
        let balances = vec![Balance::new("BTC", 1.0, 0.0), Balance::new("SHIB", 1e9, 0.0)];

        let v = value_portfolio(&balances, "USDT", PriceMode::Mid, &g, &q);
        assert_eq!(v.total, 100.0);
        assert_eq!(v.unroutable(), vec!["SHIB"]);
        assert_eq!(v.assets["SHIB"].value, 0.0);
        assert_eq!(v.assets["SHIB"].quantity, 1e9);
    }

    #[test]
    fn zero_balances_are_skipped() {
        let g = graph(&[("BTC", "USDT")]);
        let q = quotes(&[("BTC/USDT", 100.0, 100.0)]);
        let balances = vec![Balance::new("BTC", 0.0, 0.0), Balance::new("SHIB", 0.0, 0.0)];

        let v = value_portfolio(&balances, "USDT", PriceMode::Mid, &g, &q);
        assert!(v.assets.is_empty());
        assert!(v.unroutable().is_empty());
    }

    #[test]
    fn zero_priced_first_leg_short_circuits() {
        let g = graph(&[("DEAD", "BTC"), ("BTC", "USDT")]);
        let q = quotes(&[("DEAD/BTC", 0.0, 0.0), ("BTC/USDT", 100.0, 100.0)]);
        let balances = vec![Balance::new("DEAD", 50.0, 0.0)];

        let v = value_portfolio(&balances, "USDT", PriceMode::Mid, &g, &q);
        assert_eq!(v.total, 0.0);
        assert!(matches!(v.assets["DEAD"].status, AssetStatus::Valued { .. }));
    }

    #[test]
    fn zero_priced_buy_leg_does_not_blow_up() {
        let route = Route::direct(RouteLeg::buy("BTC/USDT"));
        let q = quotes(&[("BTC/USDT", 0.0, 0.0)]);
        assert_eq!(convert_along_route(10.0, &route, PriceMode::Mid, &q), Ok(0.0));
    }

    #[test]
    fn missing_quote_marks_asset_unpriced() {
        let g = graph(&[("ETH", "USDT")]);
        let q = quotes(&[]);
        let balances = vec![Balance::new("ETH", 1.0, 0.0)];

        let v = value_portfolio(&balances, "USDT", PriceMode::Mid, &g, &q);
        assert_eq!(v.unpriced(), vec!["ETH"]);
        assert!(v.unroutable().is_empty());
        assert_eq!(v.total, 0.0);
    }

    #[test]
    fn valuation_is_linear_in_quantity() {
        let g = graph(&[("DOGE", "BTC"), ("BTC", "USDT")]);
        let q = quotes(&[("DOGE/BTC", 0.000002, 0.000002), ("BTC/USDT", 30_000.0, 30_000.0)]);

        let single = value_portfolio(&[Balance::new("DOGE", 1000.0, 0.0)], "USDT", PriceMode::Mid, &g, &q);
        let double = value_portfolio(&[Balance::new("DOGE", 2000.0, 0.0)], "USDT", PriceMode::Mid, &g, &q);
        assert!((double.total - 2.0 * single.total).abs() < 1e-9);
    }

    #[test]
    fn round_trip_through_inverse_legs_has_no_drift() {
        let q = quotes(&[("BTC/USDT", 25_000.0, 25_000.0)]);
        let out = Route::direct(RouteLeg::sell("BTC/USDT"));
        let back = Route::direct(RouteLeg::buy("BTC/USDT"));

        let usdt = convert_along_route(0.5, &out, PriceMode::Mid, &q).unwrap();
        let btc = convert_along_route(usdt, &back, PriceMode::Mid, &q).unwrap();
        let again = convert_along_route(btc, &out, PriceMode::Mid, &q).unwrap();
        assert_eq!(btc, 0.5);
        assert_eq!(again, usdt);
    }

    #[test]
    fn locked_funds_count_towards_value() {
        let g = graph(&[("BTC", "USDT")]);
        let q = quotes(&[("BTC/USDT", 100.0, 100.0)]);
        let balances = vec![Balance::new("BTC", 0.5, 0.5)];

        let v = value_portfolio(&balances, "USDT", PriceMode::Mid, &g, &q);
        assert_eq!(v.total, 100.0);
    }
}
