//! Configuration loader and application settings.

use crate::balancer::BalancerSettings;
use crate::errors::{AppError, Result};
use crate::exchange::BinanceConfig;
use crate::models::PriceMode;
use std::path::PathBuf;
use std::time::Duration;

/// Which exchange backend to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeKind {
    Binance,
    Paper,
}

/// Consolidated application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub exchange: ExchangeKind,
    /// Base URL of the Binance REST API.
    pub rest_url: String,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    /// Asset the portfolio is valued in (e.g. "USDT").
    pub destination: String,
    pub mode: PriceMode,
    /// Cancel open orders on held pairs before valuing.
    pub cancel_open_orders: bool,
    pub recv_window_ms: u64,
    /// JSON file the paper exchange is loaded from.
    pub paper_fixture: Option<PathBuf>,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from any key lookup; unset or blank keys take
    /// their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let exchange = match get("EXCHANGE").as_deref().unwrap_or("binance") {
            "binance" => ExchangeKind::Binance,
            "paper" => ExchangeKind::Paper,
            other => return Err(AppError::Config(format!("unknown EXCHANGE '{other}'"))),
        };
        let mode = match get("VALUATION_MODE") {
            Some(raw) => raw.parse()?,
            None => PriceMode::Mid,
        };
        let cancel_open_orders = match get("CANCEL_OPEN_ORDERS").as_deref() {
            None | Some("0") | Some("false") => false,
            Some("1") | Some("true") => true,
            Some(other) => {
                return Err(AppError::Config(format!(
                    "CANCEL_OPEN_ORDERS must be 0 or 1, got '{other}'"
                )));
            }
        };
        let recv_window_ms = match get("RECV_WINDOW_MS") {
            Some(raw) => raw
                .parse()
                .map_err(|_| AppError::Config(format!("RECV_WINDOW_MS must be an integer, got '{raw}'")))?,
            None => 5000,
        };

        Ok(Self {
            exchange,
            rest_url: get("BINANCE_REST_URL").unwrap_or_else(|| "https://api.binance.com".into()),
            api_key: get("API_KEY"),
            api_secret: get("API_SECRET"),
            destination: get("DESTINATION_ASSET")
                .map(|d| d.to_uppercase())
                .unwrap_or_else(|| "USDT".into()),
            mode,
            cancel_open_orders,
            recv_window_ms,
            paper_fixture: get("PAPER_FIXTURE").map(PathBuf::from),
        })
    }

    pub fn binance(&self) -> BinanceConfig {
        BinanceConfig {
            base_url: self.rest_url.clone(),
            api_key: self.api_key.clone(),
            api_secret: self.api_secret.clone(),
            recv_window_ms: self.recv_window_ms,
            timeout: Duration::from_secs(10),
        }
    }

    pub fn balancer(&self) -> BalancerSettings {
        BalancerSettings {
            destination: self.destination.clone(),
            mode: self.mode,
            cancel_open_orders: self.cancel_open_orders,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig> {
        let env: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|k| env.get(k).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let cfg = load(&[]).unwrap();
        assert_eq!(cfg.exchange, ExchangeKind::Binance);
        assert_eq!(cfg.destination, "USDT");
        assert_eq!(cfg.mode, PriceMode::Mid);
        assert!(!cfg.cancel_open_orders);
        assert_eq!(cfg.recv_window_ms, 5000);
        assert!(cfg.api_key.is_none());
        assert!(cfg.paper_fixture.is_none());
    }

    #[test]
    fn reads_overrides() {
        let cfg = load(&[
            ("EXCHANGE", "paper"),
            ("DESTINATION_ASSET", "btc"),
            ("VALUATION_MODE", "low"),
            ("CANCEL_OPEN_ORDERS", "1"),
            ("API_KEY", "k"),
            ("PAPER_FIXTURE", "fixtures/paper.json"),
        ])
        .unwrap();
        assert_eq!(cfg.exchange, ExchangeKind::Paper);
        assert_eq!(cfg.destination, "BTC");
        assert_eq!(cfg.mode, PriceMode::Low);
        assert!(cfg.cancel_open_orders);
        assert_eq!(cfg.binance().api_key.as_deref(), Some("k"));
        assert_eq!(cfg.paper_fixture, Some(PathBuf::from("fixtures/paper.json")));
    }

    #[test]
    fn rejects_bad_values() {
        assert!(load(&[("VALUATION_MODE", "average")]).is_err());
        assert!(load(&[("EXCHANGE", "kraken")]).is_err());
        assert!(load(&[("CANCEL_OPEN_ORDERS", "yes")]).is_err());
        assert!(load(&[("RECV_WINDOW_MS", "soon")]).is_err());
    }
}
