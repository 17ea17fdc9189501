#![allow(dead_code)]

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use std::collections::HashMap;
use std::sync::Mutex;
use tradecast::domain::error::TradecastError;
pub use tradecast::domain::ohlcv::OhlcvBar;
use tradecast::ports::data_port::DataPort;

/// In-memory provider keyed by canonical ticker. Records every request.
pub struct MockDataPort {
    pub data: HashMap<String, Vec<OhlcvBar>>,
    pub errors: HashMap<String, String>,
    pub calls: Mutex<Vec<(String, NaiveDate, NaiveDate)>>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_bars(mut self, ticker: &str, bars: Vec<OhlcvBar>) -> Self {
        self.data.insert(ticker.to_string(), bars);
        self
    }

    pub fn with_error(mut self, ticker: &str, reason: &str) -> Self {
        self.errors.insert(ticker.to_string(), reason.to_string());
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl DataPort for MockDataPort {
    fn fetch_daily(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, TradecastError> {
        self.calls
            .lock()
            .unwrap()
            .push((ticker.to_string(), start, end));
        if let Some(reason) = self.errors.get(ticker) {
            return Err(TradecastError::Provider {
                reason: reason.clone(),
            });
        }
        match self.data.get(ticker) {
            Some(bars) => Ok(bars
                .iter()
                .filter(|b| b.date >= start && b.date <= end)
                .cloned()
                .collect()),
            None => Err(TradecastError::TickerNotFound {
                tried: vec![ticker.to_string(), format!("{ticker}.US")],
            }),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn bar(d: NaiveDate, close: f64) -> OhlcvBar {
    OhlcvBar::new(d, close * 0.995, close * 1.01, close * 0.99, close, 1_000_000.0)
}

/// Weekday bars following `closes`, starting on the first weekday at or after `start`.
pub fn bars_from_closes(start: NaiveDate, closes: &[f64]) -> Vec<OhlcvBar> {
    let mut d = start;
    let mut out = Vec::with_capacity(closes.len());
    for &c in closes {
        while matches!(d.weekday(), Weekday::Sat | Weekday::Sun) {
            d += Duration::days(1);
        }
        out.push(bar(d, c));
        d += Duration::days(1);
    }
    out
}

/// Steady compounding drift with a small oscillation.
pub fn trending_bars(
    start: NaiveDate,
    count: usize,
    start_price: f64,
    daily_drift: f64,
) -> Vec<OhlcvBar> {
    let closes: Vec<f64> = (0..count)
        .map(|i| {
            let t = i as f64;
            start_price * (1.0 + daily_drift).powf(t) * (1.0 + 0.004 * (t / 3.0).sin())
        })
        .collect();
    bars_from_closes(start, &closes)
}

/// Oscillates around `mid` with no trend.
pub fn choppy_bars(start: NaiveDate, count: usize, mid: f64) -> Vec<OhlcvBar> {
    let closes: Vec<f64> = (0..count)
        .map(|i| mid * (1.0 + 0.03 * (i as f64 / 4.0).sin()))
        .collect();
    bars_from_closes(start, &closes)
}

/// Closes built by compounding `returns` from 100.
pub fn bars_from_returns(start: NaiveDate, returns: &[f64]) -> Vec<OhlcvBar> {
    let mut price = 100.0;
    let closes: Vec<f64> = returns
        .iter()
        .map(|r| {
            price *= 1.0 + r;
            price
        })
        .collect();
    bars_from_closes(start, &closes)
}
