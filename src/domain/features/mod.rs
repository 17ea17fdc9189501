//! Technical feature extraction.
//!
//! [`FeatureFrame::compute`] evaluates every feature for every bar. Each row
//! is a function of the bars up to and including its own date, so a frame
//! computed over a long history agrees row-for-row with one computed over any
//! prefix of it.

pub mod mean_reversion;
pub mod momentum;
pub mod rolling;
pub mod volatility;

use super::ohlcv::{OhlcvBar, closes};
use chrono::NaiveDate;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureRow {
    pub date: NaiveDate,
    pub returns_5d: Option<f64>,
    pub returns_20d: Option<f64>,
    pub returns_60d: Option<f64>,
    pub ma_slope_20: Option<f64>,
    pub ma_slope_60: Option<f64>,
    pub breakout_distance: Option<f64>,
    pub zscore_close_vs_ma20: Option<f64>,
    pub bollinger_distance: Option<f64>,
    pub reversal_1d: Option<f64>,
    pub reversal_3d: Option<f64>,
    pub realized_vol_20d: Option<f64>,
    pub vol_change: Option<f64>,
    pub trend_vs_chop: Option<f64>,
}

impl FeatureRow {
    fn empty(date: NaiveDate) -> Self {
        FeatureRow {
            date,
            ..Default::default()
        }
    }

    pub fn momentum_values(&self) -> Vec<(&'static str, f64)> {
        collect(&[
            ("returns_5d", self.returns_5d),
            ("returns_20d", self.returns_20d),
            ("returns_60d", self.returns_60d),
            ("ma_slope_20", self.ma_slope_20),
            ("ma_slope_60", self.ma_slope_60),
            ("breakout_distance", self.breakout_distance),
        ])
    }

    pub fn reversal_values(&self) -> Vec<(&'static str, f64)> {
        collect(&[
            ("reversal_1d", self.reversal_1d),
            ("reversal_3d", self.reversal_3d),
        ])
    }
}

fn collect(pairs: &[(&'static str, Option<f64>)]) -> Vec<(&'static str, f64)> {
    pairs
        .iter()
        .filter_map(|(name, v)| v.filter(|x| x.is_finite()).map(|x| (*name, x)))
        .collect()
}

#[derive(Debug, Clone, Default)]
pub struct FeatureFrame {
    rows: Vec<FeatureRow>,
}

impl FeatureFrame {
    pub fn compute(bars: &[OhlcvBar]) -> Self {
        let closes = closes(bars);
        let mut rows: Vec<FeatureRow> = bars.iter().map(|b| FeatureRow::empty(b.date)).collect();
        momentum::fill(&closes, &mut rows);
        mean_reversion::fill(&closes, &mut rows);
        volatility::fill(&closes, &mut rows);
        FeatureFrame { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[FeatureRow] {
        &self.rows
    }

    pub fn get(&self, index: usize) -> Option<&FeatureRow> {
        self.rows.get(index)
    }

    /// Row for `date`, or the latest row before it.
    pub fn row_at_or_before(&self, date: NaiveDate) -> Option<&FeatureRow> {
        let n = self.rows.partition_point(|r| r.date <= date);
        n.checked_sub(1).map(|i| &self.rows[i])
    }
}
