use crate::models::PriceMode;
use crate::routing::Route;
use serde::Serialize;
use std::collections::BTreeMap;

/// How an asset's contribution to the total was obtained.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AssetStatus {
    /// The asset is the destination and counts one to one.
    Destination,
    /// Converted along `route`.
    Valued { route: Route },
    /// No route to the destination exists this cycle.
    Unroutable,
    /// A route exists but no quote was available for one of its legs.
    Unpriced { route: Route, symbol: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssetValuation {
    pub asset: String,
    pub quantity: f64,
    /// Value in the destination asset; 0.0 unless `status` is
    /// `Destination` or `Valued`.
    pub value: f64,
    #[serde(flatten)]
    pub status: AssetStatus,
}

impl AssetValuation {
    pub fn is_unroutable(&self) -> bool {
        matches!(self.status, AssetStatus::Unroutable)
    }

    pub fn is_unpriced(&self) -> bool {
        matches!(self.status, AssetStatus::Unpriced { .. })
    }
}

/// Result of one valuation call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioValuation {
    pub destination: String,
    pub mode: PriceMode,
    pub total: f64,
    pub assets: BTreeMap<String, AssetValuation>,
}

impl PortfolioValuation {
    /// Asset to destination-denominated value, for every held asset.
    pub fn per_asset(&self) -> BTreeMap<&str, f64> {
        self.assets
            .iter()
            .map(|(asset, v)| (asset.as_str(), v.value))
            .collect()
    }

    pub fn unroutable(&self) -> Vec<&str> {
        self.assets
            .values()
            .filter(|v| v.is_unroutable())
            .map(|v| v.asset.as_str())
            .collect()
    }

    pub fn unpriced(&self) -> Vec<&str> {
        self.assets
            .values()
            .filter(|v| v.is_unpriced())
            .map(|v| v.asset.as_str())
            .collect()
    }
}
