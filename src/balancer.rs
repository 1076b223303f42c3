//! Caller-facing entry point tying an exchange provider to the pure routing,
//! valuation and order-preparation code.

use crate::errors::{AppError, Result};
use crate::exchange::{ExchangeProvider, OpenOrder, OrderReceipt};
use crate::models::PriceMode;
use crate::order::{self, PreparedOrder, RawOrder, RejectedOrder};
use crate::portfolio::PortfolioValuation;
use crate::routing::{self, Route};
use crate::snapshot::Snapshot;
use std::sync::Arc;
use tracing::{debug, info};

/// Outcome of preparing one order.
pub type Preparation = std::result::Result<PreparedOrder, RejectedOrder>;

#[derive(Debug, Clone)]
pub struct BalancerSettings {
    /// Asset the portfolio is valued in.
    pub destination: String,
    pub mode: PriceMode,
    /// Whether `cancel_open_orders` actually cancels.
    pub cancel_open_orders: bool,
}

impl Default for BalancerSettings {
    fn default() -> Self {
        Self {
            destination: "USDT".to_string(),
            mode: PriceMode::Mid,
            cancel_open_orders: false,
        }
    }
}

/// Holds an exchange provider and the snapshot of its current cycle.
pub struct Balancer {
    provider: Arc<dyn ExchangeProvider>,
    settings: BalancerSettings,
    snapshot: Option<Snapshot>,
}

impl Balancer {
    pub fn new(provider: Arc<dyn ExchangeProvider>, settings: BalancerSettings) -> Self {
        Self {
            provider,
            settings,
            snapshot: None,
        }
    }

    pub fn settings(&self) -> &BalancerSettings {
        &self.settings
    }

    /// Starts a new cycle, replacing the previous snapshot.
    pub async fn refresh(&mut self) -> Result<&Snapshot> {
        let snapshot = Snapshot::capture(self.provider.as_ref(), &self.settings.destination).await?;
        Ok(&*self.snapshot.insert(snapshot))
    }

    pub fn snapshot(&self) -> Result<&Snapshot> {
        self.snapshot.as_ref().ok_or(AppError::NoSnapshot)
    }

    pub fn resolve_route(&self, source: &str, destination: &str) -> Result<Option<Route>> {
        Ok(routing::resolve_route(source, destination, self.snapshot()?.graph()))
    }

    /// Values the portfolio in the configured destination and mode.
    pub fn value_portfolio(&self) -> Result<PortfolioValuation> {
        let valuation = self.snapshot()?.value(self.settings.mode);
        info!(
            destination = %valuation.destination,
            total = valuation.total,
            assets = valuation.assets.len(),
            unroutable = ?valuation.unroutable(),
            "[CYCLE] portfolio valued"
        );
        Ok(valuation)
    }

    pub fn prepare_order(&self, order: RawOrder) -> Result<Preparation> {
        let rounding = self.provider.rounding();
        Ok(order::prepare_order(order, self.snapshot()?.graph(), &rounding))
    }

    /// See [`order::check_limits`]; uses the configured destination and mode.
    pub fn check_limits(&self, source: &str, weight: f64, total: f64) -> Result<bool> {
        let snapshot = self.snapshot()?;
        Ok(order::check_limits(
            source,
            &self.settings.destination,
            weight,
            total,
            self.settings.mode,
            snapshot.graph(),
            snapshot.quotes(),
        ))
    }

    /// Maker fee rate the exchange charges on `symbol`.
    pub async fn trading_fee(&self, symbol: &str) -> Result<f64> {
        let fee = self.provider.trading_fee(symbol).await?;
        debug!(symbol, fee, exchange = self.provider.name(), "[ORDER] maker fee");
        Ok(fee)
    }

    /// Submits a prepared order. Only orders that passed preparation can
    /// reach the exchange.
    pub async fn execute_order(&self, order: PreparedOrder) -> Result<OrderReceipt> {
        info!(order = %order, exchange = self.provider.name(), "[ORDER] submitting");
        self.provider.submit_order(&order).await
    }

    /// Cancels every open order on `pairs` when cancellation is enabled,
    /// returning the orders that were cancelled.
    pub async fn cancel_open_orders(&self, pairs: &[String]) -> Result<Vec<OpenOrder>> {
        if !self.settings.cancel_open_orders {
            return Ok(Vec::new());
        }
        let mut cancelled = Vec::new();
        for pair in pairs {
            for open in self.provider.fetch_open_orders(pair).await? {
                self.provider.cancel_order(&open.id, &open.symbol).await?;
                cancelled.push(open);
            }
        }
        if !cancelled.is_empty() {
            info!(count = cancelled.len(), "[ORDER] cancelled open orders");
        }
        Ok(cancelled)
    }
}
