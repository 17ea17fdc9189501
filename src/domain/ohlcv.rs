//! Daily OHLCV bar representation.

use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq)]
pub struct OhlcvBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl OhlcvBar {
    pub fn new(date: NaiveDate, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// (high + low + close) / 3
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }

    /// True when every price field is a finite number.
    pub fn is_finite(&self) -> bool {
        self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite()
            && self.volume.is_finite()
    }
}

/// Closing prices in bar order.
pub fn closes(bars: &[OhlcvBar]) -> Vec<f64> {
    bars.iter().map(|b| b.close).collect()
}

/// Index of the last bar dated on or before `date`.
pub fn last_index_at_or_before(bars: &[OhlcvBar], date: NaiveDate) -> Option<usize> {
    let n = bars.partition_point(|b| b.date <= date);
    n.checked_sub(1)
}

/// Keep bars inside `[start, end]`.
pub fn slice_range(bars: &[OhlcvBar], start: NaiveDate, end: NaiveDate) -> &[OhlcvBar] {
    let lo = bars.partition_point(|b| b.date < start);
    let hi = bars.partition_point(|b| b.date <= end);
    if lo >= hi { &[] } else { &bars[lo..hi] }
}
