//! JSON response bodies.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::domain::backtest::BacktestResult;
use crate::domain::ensemble::Forecast;
use crate::domain::metrics::Metrics;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::portfolio::{EquityPoint, Trade};
use crate::domain::signal::SignalResult;
use crate::domain::staleness::Freshness;
use crate::domain::universe::SymbolInfo;

fn iso_date(d: NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

fn iso_timestamp(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Provenance and freshness fields carried by every data response.
#[derive(Debug, Serialize)]
pub struct DataMeta {
    pub ticker: String,
    pub data_source: String,
    pub as_of: String,
    pub is_delayed: bool,
    pub staleness_seconds: Option<i64>,
    pub last_bar_date: Option<String>,
    pub warnings: Vec<String>,
}

impl DataMeta {
    pub fn new(
        ticker: String,
        data_source: &str,
        freshness: Freshness,
        mut warnings: Vec<String>,
    ) -> Self {
        warnings.extend(freshness.warnings);
        Self {
            ticker,
            data_source: data_source.to_string(),
            as_of: iso_timestamp(freshness.as_of),
            is_delayed: freshness.is_delayed,
            staleness_seconds: freshness.staleness_seconds,
            last_bar_date: freshness.last_bar_date.map(iso_date),
            warnings,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub data_source: String,
    pub as_of: String,
    pub is_delayed: bool,
    pub staleness_seconds: Option<i64>,
    pub warnings: Vec<String>,
}

impl HealthResponse {
    pub fn ok(data_source: &str, now: DateTime<Utc>) -> Self {
        Self {
            status: "ok",
            data_source: data_source.to_string(),
            as_of: iso_timestamp(now),
            is_delayed: false,
            staleness_seconds: None,
            warnings: Vec::new(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TickerDto {
    pub symbol: String,
    pub name: String,
}

impl From<SymbolInfo> for TickerDto {
    fn from(s: SymbolInfo) -> Self {
        Self {
            symbol: s.symbol,
            name: s.name,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TickerSearchResponse {
    pub results: Vec<TickerDto>,
}

#[derive(Debug, Serialize)]
pub struct BarDto {
    pub date: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl From<&OhlcvBar> for BarDto {
    fn from(b: &OhlcvBar) -> Self {
        Self {
            date: iso_date(b.date),
            open: b.open,
            high: b.high,
            low: b.low,
            close: b.close,
            volume: b.volume,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    #[serde(flatten)]
    pub meta: DataMeta,
    pub data: Vec<BarDto>,
}

#[derive(Debug, Serialize)]
pub struct SignalDto {
    pub name: String,
    pub score: f64,
    pub confidence: f64,
    pub timestamp: String,
    pub description: String,
    pub reason: Option<String>,
    pub components: BTreeMap<String, f64>,
}

impl From<SignalResult> for SignalDto {
    fn from(s: SignalResult) -> Self {
        Self {
            name: s.name.to_string(),
            score: s.score,
            confidence: s.confidence,
            timestamp: iso_date(s.date),
            description: s.description,
            reason: s.reason,
            components: s.components,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SignalsResponse {
    #[serde(flatten)]
    pub meta: DataMeta,
    pub signals: Vec<SignalDto>,
}

#[derive(Debug, Serialize)]
pub struct ContributorDto {
    pub signal: String,
    pub contribution: f64,
}

#[derive(Debug, Serialize)]
pub struct ExplanationDto {
    pub top_contributors: Vec<ContributorDto>,
    pub regime_filter: String,
}

#[derive(Debug, Serialize)]
pub struct ForecastResponse {
    #[serde(flatten)]
    pub meta: DataMeta,
    pub preset: String,
    pub direction: String,
    pub confidence: f64,
    pub suggested_position_size: Option<f64>,
    pub explanation: ExplanationDto,
    pub signals: Vec<SignalDto>,
}

impl ForecastResponse {
    pub fn new(
        meta: DataMeta,
        preset: &str,
        forecast: Forecast,
        suggested_position_size: Option<f64>,
        signals: Vec<SignalResult>,
    ) -> Self {
        let top_contributors = forecast
            .explanation
            .top_contributors
            .into_iter()
            .map(|c| ContributorDto {
                signal: c.signal,
                contribution: c.contribution,
            })
            .collect();
        Self {
            meta,
            preset: preset.to_string(),
            direction: forecast.direction.to_string(),
            confidence: forecast.confidence,
            suggested_position_size,
            explanation: ExplanationDto {
                top_contributors,
                regime_filter: forecast.explanation.regime_description,
            },
            signals: signals.into_iter().map(SignalDto::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MetricsDto {
    pub cagr: f64,
    pub sharpe: f64,
    pub sortino: f64,
    pub max_drawdown: f64,
    pub max_drawdown_duration: usize,
    pub win_rate: f64,
    pub profit_factor: Option<f64>,
    pub turnover: f64,
    pub exposure: f64,
    pub total_trades: usize,
    pub total_return: f64,
    pub final_equity: f64,
}

impl From<&Metrics> for MetricsDto {
    fn from(m: &Metrics) -> Self {
        Self {
            cagr: m.cagr,
            sharpe: m.sharpe,
            sortino: m.sortino,
            max_drawdown: m.max_drawdown,
            max_drawdown_duration: m.max_drawdown_duration,
            win_rate: m.win_rate,
            profit_factor: m.profit_factor,
            turnover: m.turnover,
            exposure: m.exposure,
            total_trades: m.total_trades,
            total_return: m.total_return,
            final_equity: m.final_equity,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EquityPointDto {
    pub date: String,
    pub equity: f64,
    pub drawdown: f64,
    pub position: f64,
}

impl From<&EquityPoint> for EquityPointDto {
    fn from(p: &EquityPoint) -> Self {
        Self {
            date: iso_date(p.date),
            equity: p.equity,
            drawdown: p.drawdown,
            position: p.position,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TradeDto {
    pub date: String,
    pub action: String,
    pub quantity: f64,
    pub price: f64,
    pub cost: f64,
    pub pnl: f64,
    pub position_after: f64,
}

impl From<&Trade> for TradeDto {
    fn from(t: &Trade) -> Self {
        Self {
            date: iso_date(t.date),
            action: t.action.to_string(),
            quantity: t.quantity,
            price: t.price,
            cost: t.cost,
            pnl: t.pnl,
            position_after: t.position_after,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BacktestResponse {
    #[serde(flatten)]
    pub meta: DataMeta,
    pub preset: String,
    pub metrics: MetricsDto,
    pub equity_curve: Vec<EquityPointDto>,
    pub trades: Vec<TradeDto>,
    pub stopped_on: Option<String>,
}

impl BacktestResponse {
    pub fn new(meta: DataMeta, preset: &str, result: &BacktestResult) -> Self {
        Self {
            meta,
            preset: preset.to_string(),
            metrics: MetricsDto::from(&result.metrics),
            equity_curve: result.equity_curve.iter().map(EquityPointDto::from).collect(),
            trades: result.trades.iter().map(TradeDto::from).collect(),
            stopped_on: result.stopped_on.map(iso_date),
        }
    }
}
