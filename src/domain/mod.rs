//! Core domain types and logic.

pub mod analysis;
pub mod backtest;
pub mod config_validation;
pub mod constraints;
pub mod costs;
pub mod ensemble;
pub mod error;
pub mod features;
pub mod fetcher;
pub mod metrics;
pub mod normalize;
pub mod ohlcv;
pub mod portfolio;
pub mod position;
pub mod presets;
pub mod settings;
pub mod signal;
pub mod sizing;
pub mod staleness;
pub mod ticker;
pub mod universe;
pub mod walkforward;
pub mod weight_optimizer;
