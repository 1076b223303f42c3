use crate::errors::Result;
use crate::models::Direction;
use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Order type assigned once an order passes preparation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderType {
    Limit,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Limit => "LIMIT",
        }
    }
}

/// A proposed order that has not been checked against the market's limits.
///
/// Equality and hashing use (pair, direction, amount, price); ordering adds
/// `total_in_quote` as a final key.
#[derive(Debug, Clone, Serialize)]
pub struct RawOrder {
    pub pair: String,
    pub direction: Direction,
    pub amount: f64,
    pub price: f64,
}

impl RawOrder {
    pub fn new(pair: impl Into<String>, direction: Direction, amount: f64, price: f64) -> Self {
        Self {
            pair: pair.into(),
            direction,
            amount,
            price,
        }
    }

    /// Builds an order from a textual direction ("buy"/"SELL"/...).
    pub fn parse(pair: impl Into<String>, direction: &str, amount: f64, price: f64) -> Result<Self> {
        Ok(Self::new(pair, direction.parse()?, amount, price))
    }

    pub fn total_in_quote(&self) -> f64 {
        self.amount * self.price
    }
}

impl fmt::Display for RawOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} @ {}",
            self.direction, self.amount, self.pair, self.price
        )
    }
}

impl PartialEq for RawOrder {
    fn eq(&self, other: &Self) -> bool {
        self.pair == other.pair
            && self.direction == other.direction
            && self.amount.total_cmp(&other.amount) == Ordering::Equal
            && self.price.total_cmp(&other.price) == Ordering::Equal
    }
}

impl Eq for RawOrder {}

impl Hash for RawOrder {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.pair.hash(state);
        self.direction.hash(state);
        self.amount.to_bits().hash(state);
        self.price.to_bits().hash(state);
    }
}

impl PartialOrd for RawOrder {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RawOrder {
    fn cmp(&self, other: &Self) -> Ordering {
        self.pair
            .cmp(&other.pair)
            .then(self.direction.cmp(&other.direction))
            .then(self.amount.total_cmp(&other.amount))
            .then(self.price.total_cmp(&other.price))
            .then(self.total_in_quote().total_cmp(&other.total_in_quote()))
    }
}

/// An order rounded to the market's precision and above its minimums.
///
/// Only `order::prepare_order` creates these, and only a `PreparedOrder`
/// can be submitted to an exchange.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PreparedOrder {
    order: RawOrder,
    order_type: OrderType,
}

impl PreparedOrder {
    pub(crate) fn limit(order: RawOrder) -> Self {
        Self {
            order,
            order_type: OrderType::Limit,
        }
    }

    pub fn pair(&self) -> &str {
        &self.order.pair
    }

    pub fn direction(&self) -> Direction {
        self.order.direction
    }

    pub fn amount(&self) -> f64 {
        self.order.amount
    }

    pub fn price(&self) -> f64 {
        self.order.price
    }

    pub fn total_in_quote(&self) -> f64 {
        self.order.total_in_quote()
    }

    pub fn order_type(&self) -> OrderType {
        self.order_type
    }

    pub fn as_raw(&self) -> &RawOrder {
        &self.order
    }
}

impl fmt::Display for PreparedOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.order_type.as_str(), self.order)
    }
}

/// Why an order failed preparation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RejectReason {
    /// The pair is not an active market this cycle.
    UnknownPair,
    /// Amount or price rounded down to zero.
    ZeroAfterRounding { amount: f64, price: f64 },
    BelowMinAmount { amount: f64, min: f64 },
    BelowMinCost { cost: f64, min: f64 },
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::UnknownPair => f.write_str("unknown or inactive pair"),
            RejectReason::ZeroAfterRounding { amount, price } => {
                write!(f, "zero after rounding (amount {amount}, price {price})")
            }
            RejectReason::BelowMinAmount { amount, min } => {
                write!(f, "amount {amount} below minimum {min}")
            }
            RejectReason::BelowMinCost { cost, min } => {
                write!(f, "cost {cost} below minimum {min}")
            }
        }
    }
}

/// An order that failed preparation, with the order as it was submitted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RejectedOrder {
    pub order: RawOrder,
    pub reason: RejectReason,
}
