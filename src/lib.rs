//! tradecast: daily-bar signal ensemble, forecaster and backtester.
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`]. [`cli`] wires them together.

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod obs;
pub mod ports;
