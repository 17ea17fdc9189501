//! Dashboard handlers.

use askama::Template;
use axum::{
    Form,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
};
use chrono::{Months, Utc};
use serde::Deserialize;
use std::sync::Arc;

use crate::domain::analysis::{
    RECOMMENDED_BACKTEST_BARS, insufficient_data_warning, latest_forecast, parse_iso_date,
    validate_range,
};
use crate::domain::backtest::BacktestEngine;
use crate::domain::error::TradecastError;
use crate::domain::presets::{PRESET_NAMES, get_preset};

use super::templates::{BasePage, DashboardTemplate, ReportTemplate};
use super::{AppState, WebError, blocking, is_htmx_request};

const DEFAULT_LOOKBACK_MONTHS: u32 = 24;

fn render_page(title: &str, content: &str, fragment: bool) -> Result<Response, WebError> {
    if fragment {
        return Ok(Html(content.to_string()).into_response());
    }
    BasePage { title, content }
        .render()
        .map(|html| Html(html).into_response())
        .map_err(|e| WebError::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string(), false))
}

pub async fn dashboard(headers: HeaderMap) -> Result<Response, WebError> {
    let today = Utc::now().date_naive();
    let start = today
        .checked_sub_months(Months::new(DEFAULT_LOOKBACK_MONTHS))
        .unwrap_or(today);
    let template = DashboardTemplate {
        presets: &PRESET_NAMES,
        default_ticker: "SPY",
        default_start: start.to_string(),
        default_end: today.to_string(),
    };
    let fragment = is_htmx_request(&headers);
    let content = template
        .render()
        .map_err(|e| WebError::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string(), fragment))?;
    render_page("Tradecast", &content, fragment)
}

#[derive(Debug, Deserialize)]
pub struct BacktestFormData {
    pub ticker: String,
    pub start: String,
    pub end: String,
    #[serde(default)]
    pub preset: Option<String>,
}

pub async fn run_backtest(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(form): Form<BacktestFormData>,
) -> Result<Response, WebError> {
    let fragment = is_htmx_request(&headers);
    let to_web = |e: TradecastError| WebError::from_domain(e, fragment);

    let start = parse_iso_date(&form.start, "start").map_err(to_web)?;
    let end = parse_iso_date(&form.end, "end").map_err(to_web)?;
    validate_range(start, end).map_err(to_web)?;
    let (preset, mut warnings) = get_preset(form.preset.as_deref().filter(|p| !p.is_empty()));

    let fetcher = state.fetcher.clone();
    let engine = BacktestEngine::new(state.settings.backtest.clone(), preset.model());
    let sizing = state.settings.backtest.sizing.clone();
    let report_preset = preset.clone();
    let ticker = form.ticker;
    let (fetched, result, forecast) = blocking(move || {
        let fetched = fetcher.fetch(&ticker, start, end)?.require_bars(start, end)?;
        let result = engine.run(&fetched.bars, Some(start), Some(end))?;
        let forecast = latest_forecast(&fetched.bars, &report_preset, &sizing);
        Ok((fetched, result, forecast))
    })
    .await
    .map_err(to_web)?;

    warnings.extend(fetched.warnings);
    warnings.extend(insufficient_data_warning(
        fetched.bars.len(),
        RECOMMENDED_BACKTEST_BARS,
        "backtest",
    ));

    let report = ReportTemplate::new(
        &fetched.ticker,
        preset.name,
        (start, end),
        &result,
        forecast.as_ref(),
        warnings,
    );
    let content = report
        .render()
        .map_err(|e| WebError::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string(), fragment))?;
    render_page(&format!("{} backtest", fetched.ticker), &content, fragment)
}
