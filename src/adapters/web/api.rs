//! JSON API handlers.

use axum::{
    Json,
    extract::{Query, State},
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use crate::domain::analysis::{
    RECOMMENDED_BACKTEST_BARS, RECOMMENDED_HISTORY_BARS, insufficient_data_warning,
    last_year_window, latest_forecast, parse_iso_date, signal_history, validate_range,
};
use crate::domain::backtest::BacktestEngine;
use crate::domain::error::TradecastError;
use crate::domain::presets::get_preset;
use crate::domain::staleness::Freshness;
use crate::domain::universe::DEFAULT_SEARCH_LIMIT;

use super::dto::*;
use super::{ApiError, AppState, blocking};

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RangeQuery {
    pub ticker: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub preset: Option<String>,
}

fn required(value: Option<String>, name: &str) -> Result<String, ApiError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::bad_request(format!("Missing query parameter '{name}'")))
}

impl RangeQuery {
    fn parse(self) -> Result<(String, NaiveDate, NaiveDate, Option<String>), ApiError> {
        let ticker = required(self.ticker, "ticker")?;
        let start = parse_iso_date(&required(self.start, "start")?, "start")?;
        let end = parse_iso_date(&required(self.end, "end")?, "end")?;
        validate_range(start, end)?;
        Ok((ticker, start, end, self.preset))
    }
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse::ok(state.fetcher.provider_name(), Utc::now()))
}

pub async fn search_tickers(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Json<TickerSearchResponse> {
    let q = query.q.unwrap_or_default();
    let results: Vec<TickerDto> = state
        .symbols
        .search(&q, DEFAULT_SEARCH_LIMIT)
        .into_iter()
        .map(TickerDto::from)
        .collect();
    info!(query = %q, matches = results.len(), "ticker search");
    Json(TickerSearchResponse { results })
}

pub async fn history(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let (ticker, start, end, _) = query.parse()?;
    let fetcher = state.fetcher.clone();
    let fetched =
        blocking(move || fetcher.fetch(&ticker, start, end)?.require_bars(start, end)).await?;

    let mut warnings = fetched.warnings;
    warnings.extend(insufficient_data_warning(
        fetched.bars.len(),
        RECOMMENDED_HISTORY_BARS,
        "",
    ));
    let freshness = Freshness::assess(fetched.bars.last().map(|b| b.date), Utc::now());
    let data = fetched.bars.iter().map(BarDto::from).collect();

    Ok(Json(HistoryResponse {
        meta: DataMeta::new(fetched.ticker, state.fetcher.provider_name(), freshness, warnings),
        data,
    }))
}

pub async fn signals(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<SignalsResponse>, ApiError> {
    let (ticker, start, end, _) = query.parse()?;
    let fetcher = state.fetcher.clone();
    let (fetched, history) = blocking(move || {
        let fetched = fetcher.fetch(&ticker, start, end)?;
        let history = signal_history(&fetched.bars, start, end);
        Ok((fetched, history))
    })
    .await?;

    let mut warnings = fetched.warnings;
    if fetched.bars.is_empty() {
        warnings.push(format!("No data found for {}", fetched.ticker));
    }
    let freshness = Freshness::assess(fetched.bars.last().map(|b| b.date), Utc::now());

    Ok(Json(SignalsResponse {
        meta: DataMeta::new(fetched.ticker, state.fetcher.provider_name(), freshness, warnings),
        signals: history.into_iter().map(SignalDto::from).collect(),
    }))
}

#[derive(Debug, Default, Deserialize)]
pub struct ForecastQuery {
    pub ticker: Option<String>,
    pub preset: Option<String>,
}

pub async fn forecast(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ForecastQuery>,
) -> Result<Json<ForecastResponse>, ApiError> {
    let ticker = required(query.ticker, "ticker")?;
    let (preset, mut warnings) = get_preset(query.preset.as_deref());
    let (start, end) = last_year_window(Utc::now().date_naive());

    let fetcher = state.fetcher.clone();
    let sizing = state.settings.backtest.sizing.clone();
    let model_preset = preset.clone();
    let (fetched, report) = blocking(move || {
        let fetched = fetcher.fetch(&ticker, start, end)?.require_bars(start, end)?;
        let report = latest_forecast(&fetched.bars, &model_preset, &sizing);
        Ok((fetched, report))
    })
    .await?;
    let report = report
        .ok_or_else(|| ApiError::not_found(format!("No data found for {}", fetched.ticker)))?;

    warnings.extend(fetched.warnings);
    let freshness = Freshness::assess(fetched.bars.last().map(|b| b.date), Utc::now());
    let meta = DataMeta::new(fetched.ticker, state.fetcher.provider_name(), freshness, warnings);

    Ok(Json(ForecastResponse::new(
        meta,
        preset.name,
        report.forecast,
        report.suggested_position_size,
        report.signals,
    )))
}

pub async fn backtest(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<BacktestResponse>, ApiError> {
    let (ticker, start, end, preset_name) = query.parse()?;
    let (preset, mut warnings) = get_preset(preset_name.as_deref());

    let fetcher = state.fetcher.clone();
    let engine = BacktestEngine::new(state.settings.backtest.clone(), preset.model());
    let (fetched, result) = blocking(move || {
        let fetched = fetcher.fetch(&ticker, start, end)?.require_bars(start, end)?;
        let result = engine.run(&fetched.bars, Some(start), Some(end))?;
        Ok::<_, TradecastError>((fetched, result))
    })
    .await?;

    warnings.extend(fetched.warnings);
    warnings.extend(insufficient_data_warning(
        fetched.bars.len(),
        RECOMMENDED_BACKTEST_BARS,
        "backtest",
    ));
    let freshness = Freshness::assess(fetched.bars.last().map(|b| b.date), Utc::now());
    info!(
        ticker = %fetched.ticker,
        preset = preset.name,
        trades = result.metrics.total_trades,
        "backtest complete"
    );
    let meta = DataMeta::new(fetched.ticker, state.fetcher.provider_name(), freshness, warnings);

    Ok(Json(BacktestResponse::new(meta, preset.name, &result)))
}

pub async fn not_found() -> ApiError {
    ApiError::not_found("Not found")
}

