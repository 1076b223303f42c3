use super::types::{PreparedOrder, RawOrder, RejectReason, RejectedOrder};
use crate::models::{Market, PriceMode};
use crate::portfolio::QuoteSource;
use crate::routing::{MarketGraph, resolve_route};
use crate::utils::{RoundingMode, round_to_precision};
use tracing::{debug, info};

/// Exchange-specific policy for snapping amounts and prices onto a market's
/// precision grid.
pub trait PrecisionRounding {
    fn amount_to_precision(&self, market: &Market, amount: f64) -> f64;
    fn price_to_precision(&self, market: &Market, price: f64) -> f64;
}

/// Rounding driven by the market's declared precision, with a configurable
/// mode per field. The default truncates amounts and rounds prices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExchangeRounding {
    pub amount: RoundingMode,
    pub price: RoundingMode,
}

impl Default for ExchangeRounding {
    fn default() -> Self {
        Self {
            amount: RoundingMode::Truncate,
            price: RoundingMode::Round,
        }
    }
}

impl PrecisionRounding for ExchangeRounding {
    fn amount_to_precision(&self, market: &Market, amount: f64) -> f64 {
        round_to_precision(amount, market.amount_precision, self.amount)
    }

    fn price_to_precision(&self, market: &Market, price: f64) -> f64 {
        round_to_precision(price, market.price_precision, self.price)
    }
}

/// Validates and normalizes `order` against its market.
///
/// The order is consumed: it either becomes a `PreparedOrder` of type LIMIT,
/// or comes back inside a `RejectedOrder` with the reason.
pub fn prepare_order<R: PrecisionRounding + ?Sized>(
    order: RawOrder,
    graph: &MarketGraph,
    rounding: &R,
) -> Result<PreparedOrder, RejectedOrder> {
    let Some(market) = graph.market(&order.pair) else {
        return Err(reject(order, RejectReason::UnknownPair));
    };

    let amount = rounding.amount_to_precision(market, order.amount);
    let price = rounding.price_to_precision(market, order.price);
    if amount == 0.0 || price == 0.0 {
        return Err(reject(order, RejectReason::ZeroAfterRounding { amount, price }));
    }

    let limits = market.limits;
    if amount < limits.amount_min {
        return Err(reject(
            order,
            RejectReason::BelowMinAmount {
                amount,
                min: limits.amount_min,
            },
        ));
    }
    let cost = amount * price;
    if cost < limits.cost_min {
        return Err(reject(
            order,
            RejectReason::BelowMinCost {
                cost,
                min: limits.cost_min,
            },
        ));
    }

    let prepared = PreparedOrder::limit(RawOrder::new(order.pair, order.direction, amount, price));
    debug!(order = %prepared, "[ORDER] prepared");
    Ok(prepared)
}

fn reject(order: RawOrder, reason: RejectReason) -> RejectedOrder {
    info!(order = %order, %reason, "[ORDER] rejected");
    RejectedOrder { order, reason }
}

/// Reports whether moving `weight` of a portfolio worth `total` (in
/// `destination`) from `source` would clear the minimums of the final leg
/// of the route between them.
///
/// No route, or no quote for the final leg, counts as not tradable.
pub fn check_limits<Q: QuoteSource + ?Sized>(
    source: &str,
    destination: &str,
    weight: f64,
    total: f64,
    mode: PriceMode,
    graph: &MarketGraph,
    quotes: &Q,
) -> bool {
    let Some(route) = resolve_route(source, destination, graph) else {
        return false;
    };
    let Some(leg) = route.last_leg() else {
        return false;
    };
    let (Some(limits), Some(quote)) = (graph.limits(&leg.symbol), quotes.quote(&leg.symbol)) else {
        return false;
    };
    let price = quote.price(mode);
    if price == 0.0 {
        return false;
    }
    let notional = total * weight;
    !(notional / price < limits.amount_min || notional.abs() < limits.cost_min)
}
