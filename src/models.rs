//! Shared data structures used throughout the application.

use crate::errors::{AppError, Result};
use crate::utils::format_symbol;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Side of a trade, relative to the base asset of the market it runs on.
///
/// `Buy` spends the quote asset to acquire the base asset, `Sell` spends the
/// base asset to acquire the quote asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Buy,
    Sell,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Buy => "BUY",
            Direction::Sell => "SELL",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "BUY" => Ok(Direction::Buy),
            "SELL" => Ok(Direction::Sell),
            _ => Err(AppError::InvalidDirection(s.to_string())),
        }
    }
}

/// Rounding granularity declared by the exchange for a price or an amount.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Precision {
    /// Number of decimal places.
    Decimals(u32),
    /// Tick or lot step, e.g. `0.001`.
    Step(f64),
}

impl Default for Precision {
    fn default() -> Self {
        Precision::Decimals(8)
    }
}

/// Minimums a single order must satisfy on a market.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketLimits {
    pub amount_min: f64,
    pub cost_min: f64,
}

/// A trading pair as listed by the exchange for the current cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Market {
    /// Canonical "BASE/QUOTE" symbol.
    pub symbol: String,
    /// Exchange-native identifier (e.g. "BTCUSDT" on Binance).
    pub id: String,
    pub base: String,
    pub quote: String,
    pub active: bool,
    pub limits: MarketLimits,
    pub price_precision: Precision,
    pub amount_precision: Precision,
}

impl Market {
    /// Active spot market with no minimums and 8-decimal precision.
    pub fn spot(base: &str, quote: &str) -> Self {
        Self {
            symbol: format_symbol(base, quote),
            id: format!("{base}{quote}"),
            base: base.to_string(),
            quote: quote.to_string(),
            active: true,
            limits: MarketLimits::default(),
            price_precision: Precision::default(),
            amount_precision: Precision::default(),
        }
    }

    pub fn with_limits(mut self, amount_min: f64, cost_min: f64) -> Self {
        self.limits = MarketLimits {
            amount_min,
            cost_min,
        };
        self
    }

    pub fn with_precision(mut self, amount: Precision, price: Precision) -> Self {
        self.amount_precision = amount;
        self.price_precision = price;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    /// Returns the asset on the other side of `asset`, if `asset` belongs to this market.
    pub fn counter_asset(&self, asset: &str) -> Option<&str> {
        if self.base == asset {
            Some(&self.quote)
        } else if self.quote == asset {
            Some(&self.base)
        } else {
            None
        }
    }
}

/// Top-of-book ticker as reported by the exchange. Either side may be missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticker {
    pub symbol: String,
    pub bid: Option<f64>,
    pub ask: Option<f64>,
}

/// Price levels of an order book, best first, as `(price, qty)`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookDepth {
    pub bids: Vec<(f64, f64)>,
    pub asks: Vec<(f64, f64)>,
}

impl BookDepth {
    pub fn best_bid(&self) -> Option<f64> {
        self.bids.first().map(|(p, _)| *p)
    }

    pub fn best_ask(&self) -> Option<f64> {
        self.asks.first().map(|(p, _)| *p)
    }
}

/// Price selection policy applied uniformly across a valuation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceMode {
    #[default]
    Mid,
    /// The ask.
    High,
    /// The bid.
    Low,
}

impl FromStr for PriceMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "mid" => Ok(PriceMode::Mid),
            "high" => Ok(PriceMode::High),
            "low" => Ok(PriceMode::Low),
            other => Err(AppError::Config(format!("unknown valuation mode '{other}'"))),
        }
    }
}

/// Bid/ask/mid for one symbol, derived from a ticker or the order book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub bid: f64,
    pub ask: f64,
    pub mid: f64,
}

impl Quote {
    pub fn new(symbol: &str, bid: f64, ask: f64) -> Self {
        Self {
            symbol: symbol.to_string(),
            bid,
            ask,
            mid: (bid + ask) / 2.0,
        }
    }

    /// Builds a quote from a ticker reporting both sides.
    ///
    /// Zero prices are kept: a market quoted at zero values to zero rather
    /// than falling back to the order book.
    pub fn from_ticker(ticker: &Ticker) -> Option<Self> {
        Some(Self::new(&ticker.symbol, ticker.bid?, ticker.ask?))
    }

    /// Builds a quote from the best ask and best bid levels of a book.
    pub fn from_book(symbol: &str, book: &BookDepth) -> Option<Self> {
        Some(Self::new(symbol, book.best_bid()?, book.best_ask()?))
    }

    pub fn price(&self, mode: PriceMode) -> f64 {
        match mode {
            PriceMode::Mid => self.mid,
            PriceMode::High => self.ask,
            PriceMode::Low => self.bid,
        }
    }
}

/// Holdings of one asset on the exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    pub asset: String,
    pub free: f64,
    pub locked: f64,
}

impl Balance {
    pub fn new(asset: &str, free: f64, locked: f64) -> Self {
        Self {
            asset: asset.to_string(),
            free,
            locked,
        }
    }

    pub fn total(&self) -> f64 {
        self.free + self.locked
    }
}
