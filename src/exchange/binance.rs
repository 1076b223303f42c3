use super::{ExchangeProvider, OpenOrder, OrderReceipt};
use crate::errors::{AppError, Result};
use crate::models::{Balance, BookDepth, Market, MarketLimits, Precision, Ticker};
use crate::order::PreparedOrder;
use crate::utils::format_symbol;
use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::{Client, Method};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use sha2::Sha256;
use std::collections::HashMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use url::Url;

const BINANCE_REST_ENDPOINT: &str = "https://api.binance.com";
const ORDER_BOOK_DEPTH: u32 = 5;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone)]
pub struct BinanceConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    pub recv_window_ms: u64,
    pub timeout: Duration,
}

impl Default for BinanceConfig {
    fn default() -> Self {
        Self {
            base_url: BINANCE_REST_ENDPOINT.to_string(),
            api_key: None,
            api_secret: None,
            recv_window_ms: 5000,
            timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ExchangeInfo {
    symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SymbolInfo {
    symbol: String,
    status: String,
    base_asset: String,
    quote_asset: String,
    #[serde(default)]
    filters: Vec<SymbolFilter>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "filterType")]
enum SymbolFilter {
    #[serde(rename = "PRICE_FILTER", rename_all = "camelCase")]
    Price { tick_size: String },
    #[serde(rename = "LOT_SIZE", rename_all = "camelCase")]
    LotSize { min_qty: String, step_size: String },
    #[serde(rename = "MIN_NOTIONAL", rename_all = "camelCase")]
    MinNotional { min_notional: String },
    #[serde(rename = "NOTIONAL", rename_all = "camelCase")]
    Notional { min_notional: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BookTickerMsg {
    symbol: String,
    bid_price: String,
    ask_price: String,
}

#[derive(Debug, Deserialize)]
struct DepthMsg {
    #[serde(rename = "lastUpdateId")]
    _last_update_id: u64,
    bids: Vec<[String; 2]>,
    asks: Vec<[String; 2]>,
}

#[derive(Debug, Deserialize)]
struct AccountMsg {
    balances: Vec<BalanceMsg>,
}

#[derive(Debug, Deserialize)]
struct BalanceMsg {
    asset: String,
    free: String,
    locked: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderMsg {
    symbol: String,
    order_id: u64,
    status: String,
    #[serde(default)]
    side: String,
    #[serde(default)]
    price: String,
    #[serde(default)]
    orig_qty: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommissionMsg {
    standard_commission: CommissionRates,
}

#[derive(Debug, Deserialize)]
struct CommissionRates {
    maker: String,
}

/// Exchange ids ("BTCUSDT") to canonical symbols ("BTC/USDT") and back.
#[derive(Debug, Default)]
struct SymbolIndex {
    by_id: HashMap<String, String>,
    by_symbol: HashMap<String, String>,
}

/// Binance spot REST backend.
pub struct BinanceProvider {
    http: Client,
    base_url: Url,
    api_key: Option<String>,
    api_secret: Option<String>,
    recv_window_ms: u64,
    symbols: RwLock<SymbolIndex>,
}

impl BinanceProvider {
    pub fn new(config: BinanceConfig) -> Result<Self> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            http,
            base_url: Url::parse(&config.base_url)?,
            api_key: config.api_key,
            api_secret: config.api_secret,
            recv_window_ms: config.recv_window_ms,
            symbols: RwLock::new(SymbolIndex::default()),
        })
    }

    async fn public_get<T: DeserializeOwned>(&self, path: &str, params: &[(&str, String)]) -> Result<T> {
        let mut url = self.base_url.join(path)?;
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params.iter().map(|(k, v)| (*k, v.as_str())));
        }
        let resp = self.http.get(url).send().await?;
        Self::decode(path, resp).await
    }

    async fn signed<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T> {
        let (Some(api_key), Some(secret)) = (&self.api_key, &self.api_secret) else {
            return Err(AppError::Config(format!(
                "API_KEY and API_SECRET are required for {path}"
            )));
        };
        let query = signed_query(secret, params, self.recv_window_ms, timestamp_ms()?)?;

        let mut url = self.base_url.join(path)?;
        url.set_query(Some(&query));
        let resp = self
            .http
            .request(method, url)
            .header("X-MBX-APIKEY", api_key)
            .send()
            .await?;
        Self::decode(path, resp).await
    }

    async fn decode<T: DeserializeOwned>(path: &str, resp: reqwest::Response) -> Result<T> {
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            warn!(path, status = status.as_u16(), %body, "[EXCHANGE] binance request failed");
            return Err(AppError::Exchange {
                status: status.as_u16(),
                body,
            });
        }
        Ok(serde_json::from_str(&body)?)
    }

    /// Exchange id for a canonical symbol, loading the market listing if needed.
    async fn exchange_id(&self, symbol: &str) -> Result<String> {
        self.ensure_symbols().await?;
        let index = self.symbols.read().await;
        Ok(index
            .by_symbol
            .get(symbol)
            .cloned()
            .unwrap_or_else(|| symbol.replace('/', "")))
    }

    async fn ensure_symbols(&self) -> Result<()> {
        if self.symbols.read().await.by_id.is_empty() {
            self.list_markets().await?;
        }
        Ok(())
    }
}

#[async_trait]
impl ExchangeProvider for BinanceProvider {
    fn name(&self) -> &'static str {
        "binance"
    }

    async fn list_markets(&self) -> Result<Vec<Market>> {
        let info: ExchangeInfo = self.public_get("/api/v3/exchangeInfo", &[]).await?;
        let markets: Vec<Market> = info.symbols.iter().map(market_from_symbol_info).collect();

        let mut index = self.symbols.write().await;
        for m in &markets {
            index.by_id.insert(m.id.clone(), m.symbol.clone());
            index.by_symbol.insert(m.symbol.clone(), m.id.clone());
        }
        info!(markets = markets.len(), "[EXCHANGE] binance markets loaded");
        Ok(markets)
    }

    async fn fetch_tickers(&self) -> Result<Vec<Ticker>> {
        self.ensure_symbols().await?;
        let raw: Vec<BookTickerMsg> = self.public_get("/api/v3/ticker/bookTicker", &[]).await?;
        let index = self.symbols.read().await;
        Ok(raw
            .into_iter()
            .filter_map(|t| {
                let symbol = index.by_id.get(&t.symbol)?.clone();
                Some(Ticker {
                    symbol,
                    bid: t.bid_price.parse().ok(),
                    ask: t.ask_price.parse().ok(),
                })
            })
            .collect())
    }

    async fn fetch_order_book(&self, symbol: &str) -> Result<BookDepth> {
        let id = self.exchange_id(symbol).await?;
        let depth: DepthMsg = self
            .public_get(
                "/api/v3/depth",
                &[("symbol", id), ("limit", ORDER_BOOK_DEPTH.to_string())],
            )
            .await?;
        debug!(symbol, "[EXCHANGE] order book fetched");
        Ok(book_from_depth(&depth))
    }

    async fn fetch_balances(&self) -> Result<Vec<Balance>> {
        let account: AccountMsg = self.signed(Method::GET, "/api/v3/account", &[]).await?;
        account
            .balances
            .iter()
            .map(|b| -> Result<Balance> {
                Ok(Balance::new(&b.asset, b.free.parse()?, b.locked.parse()?))
            })
            .collect()
    }

    async fn trading_fee(&self, symbol: &str) -> Result<f64> {
        let id = self.exchange_id(symbol).await?;
        let msg: CommissionMsg = self
            .signed(Method::GET, "/api/v3/account/commission", &[("symbol", id)])
            .await?;
        Ok(msg.standard_commission.maker.parse()?)
    }

    async fn submit_order(&self, order: &PreparedOrder) -> Result<OrderReceipt> {
        let id = self.exchange_id(order.pair()).await?;
        let resp: OrderMsg = self
            .signed(
                Method::POST,
                "/api/v3/order",
                &[
                    ("symbol", id),
                    ("side", order.direction().as_str().to_string()),
                    ("type", order.order_type().as_str().to_string()),
                    ("timeInForce", "GTC".to_string()),
                    ("quantity", order.amount().to_string()),
                    ("price", order.price().to_string()),
                ],
            )
            .await?;
        info!(order = %order, order_id = resp.order_id, status = %resp.status, "[EXCHANGE] order submitted");
        Ok(OrderReceipt {
            id: resp.order_id.to_string(),
            symbol: order.pair().to_string(),
            status: resp.status,
        })
    }

    async fn fetch_open_orders(&self, symbol: &str) -> Result<Vec<OpenOrder>> {
        let id = self.exchange_id(symbol).await?;
        let raw: Vec<OrderMsg> = self
            .signed(Method::GET, "/api/v3/openOrders", &[("symbol", id)])
            .await?;
        let mut orders = Vec::with_capacity(raw.len());
        for msg in &raw {
            match open_order_from_msg(symbol, msg) {
                Some(order) => orders.push(order),
                None => warn!(
                    symbol,
                    order_id = msg.order_id,
                    side = %msg.side,
                    price = %msg.price,
                    qty = %msg.orig_qty,
                    "[EXCHANGE] skipping unparseable open order"
                ),
            }
        }
        Ok(orders)
    }

    async fn cancel_order(&self, id: &str, symbol: &str) -> Result<()> {
        let exchange_id = self.exchange_id(symbol).await?;
        let resp: OrderMsg = self
            .signed(
                Method::DELETE,
                "/api/v3/order",
                &[("symbol", exchange_id), ("orderId", id.to_string())],
            )
            .await?;
        info!(order_id = id, symbol = %resp.symbol, status = %resp.status, "[EXCHANGE] order cancelled");
        Ok(())
    }
}

fn market_from_symbol_info(info: &SymbolInfo) -> Market {
    let mut limits = MarketLimits::default();
    let mut amount_precision = Precision::default();
    let mut price_precision = Precision::default();
    for filter in &info.filters {
        match filter {
            SymbolFilter::Price { tick_size } => {
                if let Some(p) = step_precision(tick_size) {
                    price_precision = p;
                }
            }
            SymbolFilter::LotSize { min_qty, step_size } => {
                limits.amount_min = min_qty.parse().unwrap_or(0.0);
                if let Some(p) = step_precision(step_size) {
                    amount_precision = p;
                }
            }
            SymbolFilter::MinNotional { min_notional } | SymbolFilter::Notional { min_notional } => {
                limits.cost_min = min_notional.parse().unwrap_or(0.0);
            }
            SymbolFilter::Other => {}
        }
    }
    Market {
        symbol: format_symbol(&info.base_asset, &info.quote_asset),
        id: info.symbol.clone(),
        base: info.base_asset.clone(),
        quote: info.quote_asset.clone(),
        active: info.status == "TRADING",
        limits,
        price_precision,
        amount_precision,
    }
}

fn open_order_from_msg(symbol: &str, msg: &OrderMsg) -> Option<OpenOrder> {
    Some(OpenOrder {
        id: msg.order_id.to_string(),
        symbol: symbol.to_string(),
        direction: msg.side.parse().ok()?,
        amount: msg.orig_qty.parse().ok()?,
        price: msg.price.parse().ok()?,
    })
}

fn step_precision(raw: &str) -> Option<Precision> {
    let step: f64 = raw.parse().ok()?;
    (step > 0.0).then_some(Precision::Step(step))
}

fn book_from_depth(depth: &DepthMsg) -> BookDepth {
    BookDepth {
        bids: parse_levels(&depth.bids),
        asks: parse_levels(&depth.asks),
    }
}

fn parse_levels(side: &[[String; 2]]) -> Vec<(f64, f64)> {
    side.iter()
        .filter_map(|lvl| Some((lvl[0].parse().ok()?, lvl[1].parse().ok()?)))
        .collect()
}

/// Query string for a signed endpoint: `params`, `recvWindow` and
/// `timestamp`, followed by the signature over all of them.
fn signed_query(
    secret: &str,
    params: &[(&str, String)],
    recv_window_ms: u64,
    timestamp: u128,
) -> Result<String> {
    let query = {
        let mut s = url::form_urlencoded::Serializer::new(String::new());
        for (k, v) in params {
            s.append_pair(k, v);
        }
        s.append_pair("recvWindow", &recv_window_ms.to_string());
        s.append_pair("timestamp", &timestamp.to_string());
        s.finish()
    };
    let signature = sign(secret, &query)?;
    Ok(format!("{query}&signature={signature}"))
}

/// Hex HMAC-SHA256 of a query string, as Binance expects in `signature`.
fn sign(secret: &str, payload: &str) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Signing(e.to_string()))?;
    mac.update(payload.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

fn timestamp_ms() -> Result<u128> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .map_err(|e| AppError::Other(format!("system clock before epoch: {e}")))
}
