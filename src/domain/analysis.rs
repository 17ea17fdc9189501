//! Signal history and latest-forecast pipelines shared by the CLI and web layers.

use chrono::{Months, NaiveDate};

use super::backtest::default_daily_vol;
use super::ensemble::Forecast;
use super::error::TradecastError;
use super::features::FeatureFrame;
use super::features::volatility::{VOL_WINDOW, latest_daily_vol};
use super::ohlcv::{OhlcvBar, closes};
use super::presets::StrategyPreset;
use super::signal::{self, SignalResult, default_signals};
use super::sizing::{SizingParams, compute_position_size};

/// Bars needed before a suggested position size is offered.
pub const MIN_SIZING_BARS: usize = 20;
/// Fewer bars than this in a history or signal request earns a warning.
pub const RECOMMENDED_HISTORY_BARS: usize = 20;
pub const RECOMMENDED_BACKTEST_BARS: usize = 60;

#[derive(Debug, Clone, PartialEq)]
pub struct ForecastReport {
    pub forecast: Forecast,
    pub signals: Vec<SignalResult>,
    pub suggested_position_size: Option<f64>,
    pub preset: &'static str,
}

/// Every signal for each bar dated in `[start, end]`, newest date first.
pub fn signal_history(bars: &[OhlcvBar], start: NaiveDate, end: NaiveDate) -> Vec<SignalResult> {
    let history = &bars[..bars.partition_point(|b| b.date <= end)];
    let frame = FeatureFrame::compute(history);
    let signals = default_signals();

    history
        .iter()
        .rev()
        .take_while(|b| b.date >= start)
        .flat_map(|b| signal::evaluate(&signals, &frame, b.date))
        .collect()
}

/// Signals and ensemble forecast at the last bar. `None` for empty input.
pub fn latest_forecast(
    bars: &[OhlcvBar],
    preset: &StrategyPreset,
    sizing: &SizingParams,
) -> Option<ForecastReport> {
    let last = bars.last()?;
    let frame = FeatureFrame::compute(bars);
    let signals = signal::evaluate(&default_signals(), &frame, last.date);

    let mut forecast = preset.model().combine(&signals, last.date);
    forecast.explanation.regime_description = format!(
        "{} [Preset: {}]",
        forecast.explanation.regime_description, preset.name
    );

    let suggested_position_size = (bars.len() >= MIN_SIZING_BARS).then(|| {
        let vol = latest_daily_vol(&closes(bars), VOL_WINDOW).unwrap_or_else(default_daily_vol);
        compute_position_size(forecast.direction, forecast.confidence, vol, sizing)
    });

    Some(ForecastReport {
        forecast,
        signals,
        suggested_position_size,
        preset: preset.name,
    })
}

/// Ranges must be non-empty: `start` strictly before `end`.
pub fn validate_range(start: NaiveDate, end: NaiveDate) -> Result<(), TradecastError> {
    if start >= end {
        return Err(TradecastError::invalid_input(format!(
            "Invalid date range: start_date ({start}) must be before end_date ({end})"
        )));
    }
    Ok(())
}

pub fn parse_iso_date(raw: &str, field: &str) -> Result<NaiveDate, TradecastError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|e| {
        TradecastError::invalid_input(format!("Invalid date format for {field} '{raw}': {e}"))
    })
}

/// The trailing year ending `today`, used for forecasts.
pub fn last_year_window(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let start = today.checked_sub_months(Months::new(12)).unwrap_or(today);
    (start, today)
}

/// `None` when `bars` meets `minimum`; empty series are reported elsewhere.
pub fn insufficient_data_warning(bars: usize, minimum: usize, purpose: &str) -> Option<String> {
    (bars > 0 && bars < minimum).then(|| {
        let suffix = if purpose.is_empty() {
            String::new()
        } else {
            format!(" for {purpose}")
        };
        format!(
            "Insufficient data: only {bars} bars available (minimum {minimum} recommended{suffix})"
        )
    })
}
