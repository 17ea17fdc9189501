//! Local bar cache port trait.

use crate::domain::error::TradecastError;
use crate::domain::ohlcv::OhlcvBar;
use chrono::NaiveDate;

pub trait BarCachePort {
    /// Cached bars for `ticker` within `[start, end]`, ascending by date.
    fn get_bars(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, TradecastError>;

    /// Insert or replace bars keyed by `(ticker, date)`. Returns rows written.
    fn upsert_bars(
        &self,
        ticker: &str,
        bars: &[OhlcvBar],
        source: &str,
    ) -> Result<usize, TradecastError>;

    /// First date, last date and bar count cached for `ticker`.
    fn data_range(
        &self,
        ticker: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, TradecastError>;
}
