//! Typed application settings built from a [`ConfigPort`].

use std::path::PathBuf;

use super::backtest::BacktestConfig;
use super::config_validation::validate_config;
use super::constraints::RiskConstraints;
use super::costs::TransactionCostModel;
use super::error::TradecastError;
use super::sizing::{DEFAULT_VOL_FLOOR, SizingParams};
use super::walkforward::WalkForwardConfig;
use crate::ports::config_port::ConfigPort;

pub const DEFAULT_STOOQ_URL: &str = "https://stooq.com/q/d/l/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Csv,
    Stooq,
}

impl ProviderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ProviderKind::Csv => "csv",
            ProviderKind::Stooq => "stooq",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataSettings {
    pub provider: ProviderKind,
    pub csv_dir: PathBuf,
    pub symbols_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CacheSettings {
    pub enabled: bool,
    pub path: PathBuf,
    pub pool_size: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StooqSettings {
    pub base_url: String,
    pub rate_limit_seconds: f64,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WebSettings {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogSettings {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub data: DataSettings,
    pub cache: CacheSettings,
    pub stooq: StooqSettings,
    pub web: WebSettings,
    pub backtest: BacktestConfig,
    pub walkforward: WalkForwardConfig,
    pub logging: LogSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            data: DataSettings {
                provider: ProviderKind::Csv,
                csv_dir: PathBuf::from("data/csv"),
                symbols_path: PathBuf::from("data/symbols_us.csv"),
            },
            cache: CacheSettings {
                enabled: true,
                path: PathBuf::from("data/cache.sqlite"),
                pool_size: 4,
            },
            stooq: StooqSettings {
                base_url: DEFAULT_STOOQ_URL.to_string(),
                rate_limit_seconds: 1.0,
                timeout_seconds: 30,
            },
            web: WebSettings {
                host: "127.0.0.1".to_string(),
                port: 8000,
                cors_origins: vec!["http://localhost:3000".to_string()],
            },
            backtest: BacktestConfig::default(),
            walkforward: WalkForwardConfig::default(),
            logging: LogSettings {
                level: "info".to_string(),
                format: LogFormat::Text,
            },
        }
    }
}

impl Settings {
    /// Validate `config` and overlay it on the defaults.
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, TradecastError> {
        validate_config(config)?;
        let d = Settings::default();

        let string_or = |section: &str, key: &str, default: String| {
            config
                .get_string(section, key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or(default)
        };
        let optional = |key: &str| {
            config
                .get_string("backtest", key)
                .filter(|v| !v.trim().is_empty())
                .map(|_| config.get_double("backtest", key, 0.0))
        };

        let provider = match string_or("data", "provider", "csv".into()).to_lowercase().as_str() {
            "stooq" => ProviderKind::Stooq,
            _ => ProviderKind::Csv,
        };
        let data = DataSettings {
            provider,
            csv_dir: string_or("data", "csv_dir", d.data.csv_dir.display().to_string()).into(),
            symbols_path: string_or(
                "data",
                "symbols_path",
                d.data.symbols_path.display().to_string(),
            )
            .into(),
        };

        let cache = CacheSettings {
            enabled: config.get_bool("cache", "enabled", d.cache.enabled),
            path: string_or("cache", "path", d.cache.path.display().to_string()).into(),
            pool_size: config.get_int("cache", "pool_size", 4) as u32,
        };

        let stooq = StooqSettings {
            base_url: string_or("stooq", "base_url", d.stooq.base_url),
            rate_limit_seconds: config.get_double("stooq", "rate_limit_seconds", 1.0),
            timeout_seconds: config.get_int("stooq", "timeout_seconds", 30) as u64,
        };

        let cors = config.get_list("web", "cors_origins");
        let web = WebSettings {
            host: string_or("web", "host", d.web.host),
            port: config.get_int("web", "port", 8000) as u16,
            cors_origins: if cors.is_empty() { d.web.cors_origins } else { cors },
        };

        let bt = &d.backtest;
        let backtest = BacktestConfig {
            initial_capital: config.get_double("backtest", "initial_capital", bt.initial_capital),
            sizing: SizingParams {
                target_volatility: config.get_double(
                    "backtest",
                    "target_volatility",
                    bt.sizing.target_volatility,
                ),
                max_position_size: config.get_double(
                    "backtest",
                    "max_position_size",
                    bt.sizing.max_position_size,
                ),
                vol_floor: DEFAULT_VOL_FLOOR,
            },
            constraints: RiskConstraints {
                max_leverage: config.get_double(
                    "backtest",
                    "max_leverage",
                    bt.constraints.max_leverage,
                ),
                max_drawdown: optional("max_drawdown"),
                max_daily_loss: optional("max_daily_loss"),
                turnover_threshold: config.get_double(
                    "backtest",
                    "turnover_threshold",
                    bt.constraints.turnover_threshold,
                ),
            },
            costs: TransactionCostModel {
                fixed_bps: config.get_double(
                    "backtest",
                    "transaction_cost_bps",
                    bt.costs.fixed_bps,
                ),
                slippage_factor: config.get_double(
                    "backtest",
                    "slippage_factor",
                    bt.costs.slippage_factor,
                ),
            },
            min_history: config.get_int("backtest", "min_history", bt.min_history as i64) as usize,
            vol_window: bt.vol_window,
            allow_shorting: config.get_bool("backtest", "allow_shorting", bt.allow_shorting),
        };

        let walkforward = WalkForwardConfig {
            train_years: config.get_int("walkforward", "train_years", 1) as u32,
            test_months: config.get_int("walkforward", "test_months", 3) as u32,
            step_months: config.get_int("walkforward", "step_months", 1) as u32,
            optimize_weights: false,
        };

        let logging = LogSettings {
            level: string_or("logging", "level", d.logging.level).to_lowercase(),
            format: match string_or("logging", "format", "text".into()).to_lowercase().as_str() {
                "json" => LogFormat::Json,
                _ => LogFormat::Text,
            },
        };

        Ok(Settings {
            data,
            cache,
            stooq,
            web,
            backtest,
            walkforward,
            logging,
        })
    }
}
