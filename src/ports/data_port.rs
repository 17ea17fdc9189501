//! Market data provider port trait.

use crate::domain::error::TradecastError;
use crate::domain::ohlcv::OhlcvBar;
use chrono::NaiveDate;

pub trait DataPort {
    /// Daily bars for `ticker` (canonical form) dated within `[start, end]`.
    ///
    /// Providers return raw bars; ordering and cleaning happen in the domain.
    /// An unknown ticker is `TickerNotFound`, a transport failure `Provider`.
    fn fetch_daily(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, TradecastError>;

    /// Short label reported as `data_source`.
    fn name(&self) -> &str;
}
