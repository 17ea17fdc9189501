//! Domain error types.

/// Top-level error type for tradecast.
#[derive(Debug, thiserror::Error)]
pub enum TradecastError {
    #[error("database error: {reason}")]
    Database { reason: String },

    #[error("database query error: {reason}")]
    DatabaseQuery { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("invalid ticker '{ticker}': {reason}")]
    InvalidTicker { ticker: String, reason: String },

    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("data provider error: {reason}")]
    Provider { reason: String },

    #[error("Ticker not found. Tried: {}", .tried.join(", "))]
    TickerNotFound { tried: Vec<String> },

    #[error("no data for {ticker} between {start} and {end}")]
    NoData {
        ticker: String,
        start: String,
        end: String,
    },

    #[error("insufficient data for {ticker}: have {bars} bars, need {minimum}")]
    InsufficientData {
        ticker: String,
        bars: usize,
        minimum: usize,
    },

    #[error("backtest error: {reason}")]
    Backtest { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TradecastError {
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        TradecastError::InvalidInput {
            reason: reason.into(),
        }
    }

    pub fn config_invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        TradecastError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<&TradecastError> for std::process::ExitCode {
    fn from(err: &TradecastError) -> Self {
        let code: u8 = match err {
            TradecastError::Io(_) => 1,
            TradecastError::ConfigParse { .. }
            | TradecastError::ConfigMissing { .. }
            | TradecastError::ConfigInvalid { .. } => 2,
            TradecastError::Database { .. }
            | TradecastError::DatabaseQuery { .. }
            | TradecastError::Provider { .. } => 3,
            TradecastError::InvalidTicker { .. } | TradecastError::InvalidInput { .. } => 4,
            TradecastError::TickerNotFound { .. }
            | TradecastError::NoData { .. }
            | TradecastError::InsufficientData { .. }
            | TradecastError::Backtest { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
