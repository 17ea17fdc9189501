//! Cache-first bar retrieval.
//!
//! The cache is keyed by canonical ticker. A request fully covered by the
//! cached range never touches the provider; otherwise only the missing head
//! and tail are fetched and written back. Everything returned passes through
//! [`normalize_bars`].

use chrono::{Datelike, Duration, NaiveDate, Utc, Weekday};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::error::TradecastError;
use super::normalize::normalize_bars;
use super::ohlcv::{OhlcvBar, slice_range};
use super::ticker::canonicalize;
use crate::ports::cache_port::BarCachePort;
use crate::ports::data_port::DataPort;

pub const CACHE_SOURCE: &str = "cache";

#[derive(Debug, Clone, PartialEq)]
pub struct FetchResult {
    pub ticker: String,
    pub bars: Vec<OhlcvBar>,
    pub warnings: Vec<String>,
    /// Provider name when any bar came from the provider, else `"cache"`.
    pub source: String,
}

impl FetchResult {
    /// Turn an empty result into `NoData`.
    pub fn require_bars(self, start: NaiveDate, end: NaiveDate) -> Result<Self, TradecastError> {
        if self.bars.is_empty() {
            return Err(TradecastError::NoData {
                ticker: self.ticker,
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(self)
    }

    pub fn last_bar_date(&self) -> Option<NaiveDate> {
        self.bars.last().map(|b| b.date)
    }
}

/// First weekday strictly after `d`.
pub fn next_weekday(d: NaiveDate) -> NaiveDate {
    let mut next = d + Duration::days(1);
    while matches!(next.weekday(), Weekday::Sat | Weekday::Sun) {
        next += Duration::days(1);
    }
    next
}

#[derive(Clone)]
pub struct DataFetcher {
    provider: Arc<dyn DataPort + Send + Sync>,
    cache: Option<Arc<dyn BarCachePort + Send + Sync>>,
}

impl DataFetcher {
    pub fn new(
        provider: Arc<dyn DataPort + Send + Sync>,
        cache: Option<Arc<dyn BarCachePort + Send + Sync>>,
    ) -> Self {
        DataFetcher { provider, cache }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn fetch(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<FetchResult, TradecastError> {
        self.fetch_as_of(ticker, start, end, Utc::now().date_naive())
    }

    /// [`fetch`](Self::fetch) with an explicit notion of today.
    pub fn fetch_as_of(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
        today: NaiveDate,
    ) -> Result<FetchResult, TradecastError> {
        let canonical = canonicalize(ticker)?;
        if start > end {
            return Err(TradecastError::invalid_input(format!(
                "start date {start} is after end date {end}"
            )));
        }

        let mut warnings: Vec<String> = canonical.warning.into_iter().collect();
        if end > today {
            warnings.push(format!(
                "End date {end} is in the future; using latest available data"
            ));
        }
        let ticker = canonical.symbol;
        let fetch_end = end.min(today).max(start);

        let (raw, source) = match &self.cache {
            Some(cache) => self.fetch_through_cache(
                cache.as_ref(),
                &ticker,
                start,
                end,
                fetch_end,
                &mut warnings,
            )?,
            None => {
                let bars = self.provider.fetch_daily(&ticker, start, fetch_end)?;
                (bars, self.provider.name().to_string())
            }
        };

        let normalized = normalize_bars(raw);
        warnings.extend(normalized.warnings);
        let bars = slice_range(&normalized.bars, start, end).to_vec();
        info!(%ticker, bars = bars.len(), %source, "fetched bars");

        Ok(FetchResult {
            ticker,
            bars,
            warnings,
            source,
        })
    }

    fn fetch_through_cache(
        &self,
        cache: &dyn BarCachePort,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
        fetch_end: NaiveDate,
        warnings: &mut Vec<String>,
    ) -> Result<(Vec<OhlcvBar>, String), TradecastError> {
        let Some((cached_start, cached_end, count)) = cache.data_range(ticker)? else {
            info!(%ticker, %start, %end, "cache miss, fetching full range");
            let bars = self.provider.fetch_daily(ticker, start, fetch_end)?;
            self.store(cache, ticker, &bars)?;
            return Ok((bars, self.provider.name().to_string()));
        };

        let mut gaps = Vec::new();
        if start < cached_start {
            gaps.push((start, cached_start - Duration::days(1)));
        }
        if cached_end < fetch_end {
            let tail_start = next_weekday(cached_end);
            if tail_start <= fetch_end {
                gaps.push((tail_start, fetch_end));
            }
        }

        if gaps.is_empty() {
            debug!(%ticker, cached = count, "cache hit");
        }

        let mut fetched_any = false;
        for (from, to) in gaps {
            info!(%ticker, %from, %to, "fetching missing range");
            match self.provider.fetch_daily(ticker, from, to) {
                Ok(bars) => {
                    fetched_any |= !bars.is_empty();
                    self.store(cache, ticker, &bars)?;
                }
                Err(e) => {
                    warn!(%ticker, error = %e, "provider failed, serving cached data");
                    warnings.push(format!("Failed to fetch data: {e}; serving cached data"));
                }
            }
        }

        let bars = cache.get_bars(ticker, start, end)?;
        let source = if fetched_any {
            self.provider.name().to_string()
        } else {
            CACHE_SOURCE.to_string()
        };
        Ok((bars, source))
    }

    fn store(
        &self,
        cache: &dyn BarCachePort,
        ticker: &str,
        bars: &[OhlcvBar],
    ) -> Result<(), TradecastError> {
        let clean: Vec<OhlcvBar> = bars.iter().filter(|b| b.is_finite()).cloned().collect();
        if clean.is_empty() {
            return Ok(());
        }
        let written = cache.upsert_bars(ticker, &clean, self.provider.name())?;
        debug!(%ticker, written, "cached bars");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn bar(date: NaiveDate, close: f64) -> OhlcvBar {
        OhlcvBar::new(date, close, close + 1.0, close - 1.0, close, 1000.0)
    }

    struct FakeProvider {
        bars: Vec<OhlcvBar>,
        fail: bool,
        calls: Mutex<Vec<(NaiveDate, NaiveDate)>>,
    }

    impl DataPort for FakeProvider {
        fn fetch_daily(
            &self,
            _t: &str,
            start: NaiveDate,
            end: NaiveDate,
        ) -> Result<Vec<OhlcvBar>, TradecastError> {
            self.calls.lock().unwrap().push((start, end));
            if self.fail {
                return Err(TradecastError::Provider {
                    reason: "connection refused".into(),
                });
            }
            Ok(slice_range(&self.bars, start, end).to_vec())
        }

        fn name(&self) -> &str {
            "fake"
        }
    }

    #[derive(Default)]
    struct MemCache {
        rows: Mutex<BTreeMap<(String, NaiveDate), OhlcvBar>>,
    }

    impl BarCachePort for MemCache {
        fn get_bars(
            &self,
            t: &str,
            start: NaiveDate,
            end: NaiveDate,
        ) -> Result<Vec<OhlcvBar>, TradecastError> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .iter()
                .filter(|((k, date), _)| k == t && *date >= start && *date <= end)
                .map(|(_, b)| b.clone())
                .collect())
        }

        fn upsert_bars(
            &self,
            t: &str,
            bars: &[OhlcvBar],
            _s: &str,
        ) -> Result<usize, TradecastError> {
            let mut rows = self.rows.lock().unwrap();
            for b in bars {
                rows.insert((t.to_string(), b.date), b.clone());
            }
            Ok(bars.len())
        }

        fn data_range(
            &self,
            t: &str,
        ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, TradecastError> {
            let rows = self.rows.lock().unwrap();
            let dates: Vec<NaiveDate> = rows
                .keys()
                .filter(|(k, _)| k == t)
                .map(|(_, d)| *d)
                .collect();
            Ok(match (dates.first(), dates.last()) {
                (Some(a), Some(b)) => Some((*a, *b, dates.len())),
                _ => None,
            })
        }
    }

    fn provider(fail: bool) -> Arc<FakeProvider> {
        let bars = (0..60)
            .map(|i| bar(d(2024, 1, 1) + Duration::days(i), 100.0 + i as f64))
            .collect();
        Arc::new(FakeProvider {
            bars,
            fail,
            calls: Mutex::new(Vec::new()),
        })
    }

    #[test]
    fn next_weekday_skips_weekend() {
        assert_eq!(next_weekday(d(2024, 3, 8)), d(2024, 3, 11));
        assert_eq!(next_weekday(d(2024, 3, 6)), d(2024, 3, 7));
    }

    #[test]
    fn miss_then_hit_uses_cache() {
        let p = provider(false);
        let cache = Arc::new(MemCache::default());
        let f = DataFetcher::new(p.clone(), Some(cache.clone()));
        let today = d(2024, 6, 1);

        let first = f.fetch_as_of("aapl", d(2024, 1, 5), d(2024, 1, 20), today).unwrap();
        assert_eq!(first.ticker, "AAPL");
        assert_eq!(first.source, "fake");
        assert_eq!(first.bars.len(), 16);

        let second = f.fetch_as_of("AAPL.US", d(2024, 1, 8), d(2024, 1, 15), today).unwrap();
        assert_eq!(second.source, CACHE_SOURCE);
        assert_eq!(second.bars.len(), 8);
        assert_eq!(p.calls.lock().unwrap().len(), 1);
    }

    #[test]
    fn partial_hit_fetches_tail_only() {
        let p = provider(false);
        let cache = Arc::new(MemCache::default());
        let f = DataFetcher::new(p.clone(), Some(cache.clone()));
        let today = d(2024, 6, 1);
        f.fetch_as_of("AAPL", d(2024, 1, 1), d(2024, 1, 10), today).unwrap();
        let r = f.fetch_as_of("AAPL", d(2024, 1, 1), d(2024, 1, 20), today).unwrap();
        assert_eq!(r.bars.len(), 20);
        let calls = p.calls.lock().unwrap();
        assert_eq!(calls[1], (d(2024, 1, 11), d(2024, 1, 20)));
    }

    #[test]
    fn provider_failure_serves_cache_with_warning() {
        let cache = Arc::new(MemCache::default());
        let seed: Vec<OhlcvBar> = (0..5)
            .map(|i| bar(d(2024, 1, 1) + Duration::days(i), 50.0))
            .collect();
        cache.upsert_bars("MSFT", &seed, "seed").unwrap();
        let f = DataFetcher::new(provider(true), Some(cache));
        let r = f.fetch_as_of("MSFT", d(2024, 1, 1), d(2024, 1, 31), d(2024, 6, 1)).unwrap();
        assert_eq!(r.bars.len(), 5);
        assert!(r.warnings.iter().any(|w| w.starts_with("Failed to fetch data")));
    }

    #[test]
    fn provider_failure_without_cache_is_an_error() {
        let f = DataFetcher::new(provider(true), None);
        let err = f.fetch_as_of("MSFT", d(2024, 1, 1), d(2024, 1, 31), d(2024, 6, 1)).unwrap_err();
        assert!(matches!(err, TradecastError::Provider { .. }));
    }

    #[test]
    fn future_end_is_warned() {
        let f = DataFetcher::new(provider(false), None);
        let r = f.fetch_as_of("AAPL", d(2024, 2, 1), d(2024, 12, 31), d(2024, 2, 10)).unwrap();
        let expected = "End date 2024-12-31 is in the future; using latest available data";
        assert!(r.warnings.iter().any(|w| w == expected));
        assert_eq!(r.last_bar_date(), Some(d(2024, 2, 10)));
    }

    #[test]
    fn empty_result_can_be_required() {
        let f = DataFetcher::new(provider(false), None);
        let r = f.fetch_as_of("AAPL", d(2023, 1, 1), d(2023, 2, 1), d(2024, 6, 1)).unwrap();
        assert!(matches!(
            r.require_bars(d(2023, 1, 1), d(2023, 2, 1)),
            Err(TradecastError::NoData { .. })
        ));
    }

    #[test]
    fn invalid_range_is_rejected() {
        let f = DataFetcher::new(provider(false), None);
        assert!(f.fetch_as_of("AAPL", d(2024, 2, 1), d(2024, 1, 1), d(2024, 6, 1)).is_err());
    }
}
