use anyhow::{Context, Result};
use crypto_balancer::{
    balancer::Balancer,
    config::{AppConfig, ExchangeKind},
    exchange::{BinanceProvider, ExchangeProvider, PaperProvider},
    utils,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    utils::init_logging();

    let config = AppConfig::load()?;
    tracing::info!(
        exchange = ?config.exchange,
        destination = %config.destination,
        mode = ?config.mode,
        cancel_open_orders = config.cancel_open_orders,
        "[INIT] crypto-balancer starting"
    );

    let provider: Arc<dyn ExchangeProvider> = match config.exchange {
        ExchangeKind::Binance => Arc::new(BinanceProvider::new(config.binance())?),
        ExchangeKind::Paper => match &config.paper_fixture {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("reading paper fixture {}", path.display()))?;
                Arc::new(PaperProvider::from_json(&raw)?)
            }
            None => Arc::new(PaperProvider::new()),
        },
    };

    let mut balancer = Balancer::new(provider, config.balancer());
    let held_pairs = balancer.refresh().await?.held_pairs();

    if config.cancel_open_orders {
        let cancelled = balancer.cancel_open_orders(&held_pairs).await?;
        // Cancelled orders released locked funds.
        if !cancelled.is_empty() {
            balancer.refresh().await?;
        }
    }

    let valuation = balancer.value_portfolio()?;
    for (asset, entry) in &valuation.assets {
        tracing::info!(
            %asset,
            quantity = entry.quantity,
            value = entry.value,
            status = ?entry.status,
            "[CYCLE] asset valued"
        );
    }
    for asset in valuation.unroutable() {
        tracing::warn!(%asset, "[ROUTE] no route to destination");
    }
    tracing::info!(
        total = valuation.total,
        destination = %valuation.destination,
        "[CYCLE] portfolio total"
    );

    println!("{}", serde_json::to_string_pretty(&valuation)?);
    Ok(())
}
