//! Core library for the crypto-balancer project.
//!
//! Routing, valuation and order preparation are pure functions over a
//! per-cycle snapshot; everything that talks to an exchange sits behind
//! [`exchange::ExchangeProvider`].

pub mod balancer;
pub mod config;
pub mod errors;
pub mod exchange;
pub mod models;
pub mod order;
pub mod portfolio;
pub mod routing;
pub mod snapshot;
pub mod utils;
