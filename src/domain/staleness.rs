//! Data freshness relative to wall-clock time.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

/// Daily bars are stamped at the US close, 16:00 ET.
pub const CLOSE_HOUR_UTC: u32 = 20;
pub const DELAY_THRESHOLD_SECONDS: i64 = 86_400;

/// Seconds between the close of `last_bar` and `now`; `None` unless positive.
pub fn staleness_seconds(last_bar: NaiveDate, now: DateTime<Utc>) -> Option<i64> {
    let close = NaiveTime::from_hms_opt(CLOSE_HOUR_UTC, 0, 0)?;
    let stamped = last_bar.and_time(close).and_utc();
    let secs = (now - stamped).num_seconds();
    (secs > 0).then_some(secs)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Freshness {
    pub as_of: DateTime<Utc>,
    pub last_bar_date: Option<NaiveDate>,
    pub staleness_seconds: Option<i64>,
    pub is_delayed: bool,
    pub warnings: Vec<String>,
}

impl Freshness {
    pub fn assess(last_bar: Option<NaiveDate>, now: DateTime<Utc>) -> Self {
        let staleness = last_bar.and_then(|d| staleness_seconds(d, now));
        let is_delayed = staleness.is_some_and(|s| s > DELAY_THRESHOLD_SECONDS);
        let mut warnings = Vec::new();
        if let (true, Some(secs), Some(date)) = (is_delayed, staleness, last_bar) {
            warnings.push(format!(
                "Data is delayed: last bar is {:.1} days old (last_bar={date}). \
                 Provider may not have real-time data.",
                secs as f64 / DELAY_THRESHOLD_SECONDS as f64
            ));
        }
        Freshness {
            as_of: now,
            last_bar_date: last_bar,
            staleness_seconds: staleness,
            is_delayed,
            warnings,
        }
    }
}
