//! Concrete adapter implementations for ports.

pub mod csv_adapter;
pub mod file_config_adapter;
#[cfg(feature = "sqlite")]
pub mod sqlite_adapter;
#[cfg(feature = "stooq")]
pub mod stooq_adapter;
#[cfg(feature = "web")]
pub mod web;
