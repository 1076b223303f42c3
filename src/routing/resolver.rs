//! Route discovery between two assets over the active markets of a cycle.

use super::graph::MarketGraph;
use super::types::{Route, RouteLeg};
use crate::utils::format_symbol;
use tracing::debug;

/// Finds a one- or two-leg path converting `source` into `destination`.
///
/// Checked in order, first match wins:
/// 1. same asset: identity route
/// 2. `source/destination` active: SELL it
/// 3. `destination/source` active: BUY it
/// 4. two hops through the first intermediate (in listing order) that
///    `source` can be sold into and that has a market with `destination`
///
/// Returns `None` when the asset is unroutable this cycle. No ranking by
/// price or liquidity is done between candidate intermediates.
pub fn resolve_route(source: &str, destination: &str, graph: &MarketGraph) -> Option<Route> {
    if source == destination {
        return Some(Route::identity());
    }
    if let Some(m) = graph.has_direct(source, destination) {
        return Some(Route::direct(RouteLeg::sell(&m.symbol)));
    }
    if let Some(m) = graph.has_direct(destination, source) {
        return Some(Route::direct(RouteLeg::buy(&m.symbol)));
    }

    let intermediates: Vec<&str> = graph
        .markets_with_base(source)
        .into_iter()
        .map(|m| m.quote.as_str())
        .collect();
    if intermediates.is_empty() {
        debug!(source, destination, "[ROUTE] no markets sell the source asset");
        return None;
    }

    for market in graph.markets_touching(destination) {
        let Some(intermediate) = market.counter_asset(destination) else {
            continue;
        };
        if !intermediates.contains(&intermediate) {
            continue;
        }
        let first = RouteLeg::sell(format_symbol(source, intermediate));
        let second = if market.base == destination {
            RouteLeg::buy(&market.symbol)
        } else {
            RouteLeg::sell(&market.symbol)
        };
        debug!(source, destination, intermediate, "[ROUTE] two-hop route");
        return Some(Route::two_hop(first, second));
    }

    debug!(source, destination, "[ROUTE] unroutable");
    None
}
