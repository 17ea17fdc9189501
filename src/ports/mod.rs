//! Port traits at the I/O seams: market data, bar cache and configuration.

pub mod cache_port;
pub mod config_port;
pub mod data_port;
