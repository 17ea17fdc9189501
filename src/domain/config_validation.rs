//! Configuration validation.
//!
//! Checks every known key before typed settings are built, so a bad value is
//! reported against its section and key rather than silently replaced by a
//! default.

use crate::domain::error::TradecastError;
use crate::ports::config_port::ConfigPort;

const NUMERIC_KEYS: &[(&str, &str)] = &[
    ("cache", "pool_size"),
    ("stooq", "rate_limit_seconds"),
    ("stooq", "timeout_seconds"),
    ("web", "port"),
    ("backtest", "initial_capital"),
    ("backtest", "target_volatility"),
    ("backtest", "max_position_size"),
    ("backtest", "max_leverage"),
    ("backtest", "transaction_cost_bps"),
    ("backtest", "slippage_factor"),
    ("backtest", "max_drawdown"),
    ("backtest", "max_daily_loss"),
    ("backtest", "turnover_threshold"),
    ("backtest", "min_history"),
    ("walkforward", "train_years"),
    ("walkforward", "test_months"),
    ("walkforward", "step_months"),
];

const BOOL_KEYS: &[(&str, &str)] = &[("cache", "enabled"), ("backtest", "allow_shorting")];

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), TradecastError> {
    validate_value_types(config)?;
    validate_data(config)?;
    validate_cache(config)?;
    validate_stooq(config)?;
    validate_web(config)?;
    validate_backtest(config)?;
    validate_walkforward(config)?;
    validate_logging(config)?;
    Ok(())
}

fn present(config: &dyn ConfigPort, section: &str, key: &str) -> Option<String> {
    config
        .get_string(section, key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn validate_value_types(config: &dyn ConfigPort) -> Result<(), TradecastError> {
    for (section, key) in NUMERIC_KEYS {
        if let Some(v) = present(config, section, key) {
            if v.parse::<f64>().map_or(true, |n| !n.is_finite()) {
                return Err(TradecastError::config_invalid(
                    section,
                    key,
                    format!("'{v}' is not a number"),
                ));
            }
        }
    }
    for (section, key) in BOOL_KEYS {
        if let Some(v) = present(config, section, key) {
            if !matches!(
                v.to_lowercase().as_str(),
                "true" | "yes" | "1" | "false" | "no" | "0"
            ) {
                return Err(TradecastError::config_invalid(
                    section,
                    key,
                    format!("'{v}' is not a boolean"),
                ));
            }
        }
    }
    Ok(())
}

fn validate_data(config: &dyn ConfigPort) -> Result<(), TradecastError> {
    let provider = present(config, "data", "provider").unwrap_or_else(|| "csv".into());
    match provider.to_lowercase().as_str() {
        "csv" | "stooq" => Ok(()),
        other => Err(TradecastError::config_invalid(
            "data",
            "provider",
            format!("unknown provider '{other}', expected csv or stooq"),
        )),
    }
}

fn validate_cache(config: &dyn ConfigPort) -> Result<(), TradecastError> {
    let pool = config.get_int("cache", "pool_size", 4);
    if pool < 1 {
        return Err(TradecastError::config_invalid(
            "cache",
            "pool_size",
            "pool_size must be at least 1",
        ));
    }
    Ok(())
}

fn validate_stooq(config: &dyn ConfigPort) -> Result<(), TradecastError> {
    if config.get_double("stooq", "rate_limit_seconds", 1.0) < 0.0 {
        return Err(TradecastError::config_invalid(
            "stooq",
            "rate_limit_seconds",
            "rate_limit_seconds must be non-negative",
        ));
    }
    if config.get_int("stooq", "timeout_seconds", 30) < 1 {
        return Err(TradecastError::config_invalid(
            "stooq",
            "timeout_seconds",
            "timeout_seconds must be at least 1",
        ));
    }
    if let Some(url) = present(config, "stooq", "base_url") {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(TradecastError::config_invalid(
                "stooq",
                "base_url",
                "base_url must be an http(s) URL",
            ));
        }
    }
    Ok(())
}

fn validate_web(config: &dyn ConfigPort) -> Result<(), TradecastError> {
    let port = config.get_int("web", "port", 8000);
    if !(1..=i64::from(u16::MAX)).contains(&port) {
        return Err(TradecastError::config_invalid(
            "web",
            "port",
            "port must be between 1 and 65535",
        ));
    }
    Ok(())
}

fn validate_backtest(config: &dyn ConfigPort) -> Result<(), TradecastError> {
    let positive = [
        ("initial_capital", 100_000.0),
        ("target_volatility", 0.01),
        ("max_position_size", 1.0),
        ("max_leverage", 1.0),
    ];
    for (key, default) in positive {
        if config.get_double("backtest", key, default) <= 0.0 {
            return Err(TradecastError::config_invalid(
                "backtest",
                key,
                format!("{key} must be positive"),
            ));
        }
    }

    let non_negative = [
        ("transaction_cost_bps", 5.0),
        ("slippage_factor", 0.001),
        ("turnover_threshold", 0.1),
    ];
    for (key, default) in non_negative {
        if config.get_double("backtest", key, default) < 0.0 {
            return Err(TradecastError::config_invalid(
                "backtest",
                key,
                format!("{key} must be non-negative"),
            ));
        }
    }

    for key in ["max_drawdown", "max_daily_loss"] {
        if present(config, "backtest", key).is_some() {
            let v = config.get_double("backtest", key, 0.0);
            if !(-1.0..0.0).contains(&v) {
                return Err(TradecastError::config_invalid(
                    "backtest",
                    key,
                    format!("{key} must be a negative fraction between -1 and 0"),
                ));
            }
        }
    }

    if config.get_int("backtest", "min_history", 60) < 1 {
        return Err(TradecastError::config_invalid(
            "backtest",
            "min_history",
            "min_history must be at least 1",
        ));
    }
    Ok(())
}

fn validate_walkforward(config: &dyn ConfigPort) -> Result<(), TradecastError> {
    for (key, default) in [("train_years", 1), ("test_months", 3), ("step_months", 1)] {
        let v = config.get_int("walkforward", key, default);
        if !(1..=i64::from(u32::MAX)).contains(&v) {
            return Err(TradecastError::config_invalid(
                "walkforward",
                key,
                format!("{key} must be at least 1"),
            ));
        }
    }
    Ok(())
}

fn validate_logging(config: &dyn ConfigPort) -> Result<(), TradecastError> {
    if let Some(level) = present(config, "logging", "level") {
        if !LOG_LEVELS.contains(&level.to_lowercase().as_str()) {
            return Err(TradecastError::config_invalid(
                "logging",
                "level",
                format!("unknown level '{level}'"),
            ));
        }
    }
    if let Some(format) = present(config, "logging", "format") {
        if !matches!(format.to_lowercase().as_str(), "text" | "json") {
            return Err(TradecastError::config_invalid(
                "logging",
                "format",
                "format must be text or json",
            ));
        }
    }
    Ok(())
}
