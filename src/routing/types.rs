use crate::models::Direction;
use serde::Serialize;

/// One trade within a route: which market, and which side of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteLeg {
    pub symbol: String,
    pub direction: Direction,
}

impl RouteLeg {
    pub fn buy(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            direction: Direction::Buy,
        }
    }

    pub fn sell(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            direction: Direction::Sell,
        }
    }
}

/// Ordered legs converting a source asset into a destination asset.
///
/// Zero legs means source and destination are the same asset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Route {
    legs: Vec<RouteLeg>,
}

impl Route {
    pub fn identity() -> Self {
        Self { legs: Vec::new() }
    }

    pub fn direct(leg: RouteLeg) -> Self {
        Self { legs: vec![leg] }
    }

    pub fn two_hop(first: RouteLeg, second: RouteLeg) -> Self {
        Self {
            legs: vec![first, second],
        }
    }

    pub fn legs(&self) -> &[RouteLeg] {
        &self.legs
    }

    pub fn is_identity(&self) -> bool {
        self.legs.is_empty()
    }

    pub fn last_leg(&self) -> Option<&RouteLeg> {
        self.legs.last()
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.legs.iter().map(|leg| leg.symbol.as_str())
    }
}
