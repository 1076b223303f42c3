//! Portfolio valuation in a single destination asset.

pub mod types;
pub mod valuator;

pub use types::{AssetStatus, AssetValuation, PortfolioValuation};
pub use valuator::{QuoteSource, convert_along_route, value_portfolio};
