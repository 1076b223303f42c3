//! Market graph and route discovery between assets.

pub mod graph;
pub mod resolver;
pub mod types;

pub use graph::MarketGraph;
pub use resolver::resolve_route;
pub use types::{Route, RouteLeg};
