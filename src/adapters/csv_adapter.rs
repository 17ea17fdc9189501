//! CSV data adapter: Stooq-format price files and the symbol list.
//!
//! Price files live in one directory, one file per symbol, named after any
//! provider candidate (`aapl.us.txt`, `AAPL.csv`, ...). Both the plain
//! `Date,Open,High,Low,Close,Volume` header and Stooq's bulk-download
//! `<TICKER>,<PER>,<DATE>,...,<VOL>` header are accepted.

use crate::domain::error::TradecastError;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::ticker::provider_candidates;
use crate::domain::universe::{SymbolDirectory, SymbolInfo};
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y%m%d", "%Y/%m/%d", "%m/%d/%Y"];
const EXTENSIONS: &[&str] = &["csv", "txt"];

struct Columns {
    date: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: Option<usize>,
}

fn header_key(raw: &str) -> String {
    raw.trim()
        .trim_start_matches('<')
        .trim_end_matches('>')
        .to_lowercase()
}

fn find_column(headers: &[String], aliases: &[&str]) -> Option<usize> {
    headers.iter().position(|h| aliases.contains(&h.as_str()))
}

fn resolve_columns(headers: &[String]) -> Result<Columns, TradecastError> {
    let required = |name: &str, aliases: &[&str]| {
        find_column(headers, aliases).ok_or_else(|| TradecastError::Provider {
            reason: format!("CSV is missing a '{name}' column"),
        })
    };
    Ok(Columns {
        date: required("date", &["date", "timestamp", "day"])?,
        open: required("open", &["open", "o"])?,
        high: required("high", &["high", "h"])?,
        low: required("low", &["low", "l"])?,
        close: required("close", &["close", "c", "adj close", "adj_close"])?,
        volume: find_column(headers, &["volume", "vol", "v"]),
    })
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    let s = s.split_once(' ').map_or(s, |(d, _)| d);
    DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
}

fn parse_number(raw: Option<&str>) -> f64 {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse().ok())
        .unwrap_or(f64::NAN)
}

/// Parse OHLCV rows. Unparseable numbers become NaN and are dropped later
/// by normalisation; an unparseable date is an error.
pub fn parse_ohlcv_csv(content: &str) -> Result<Vec<OhlcvBar>, TradecastError> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = rdr
        .headers()
        .map_err(|e| TradecastError::Provider {
            reason: format!("CSV header error: {e}"),
        })?
        .iter()
        .map(header_key)
        .collect();
    let cols = resolve_columns(&headers)?;

    let mut bars = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(|e| TradecastError::Provider {
            reason: format!("CSV parse error: {e}"),
        })?;
        let raw_date = record.get(cols.date).unwrap_or_default();
        if raw_date.is_empty() {
            continue;
        }
        let date = parse_date(raw_date).ok_or_else(|| TradecastError::Provider {
            reason: format!("invalid date '{raw_date}'"),
        })?;

        bars.push(OhlcvBar::new(
            date,
            parse_number(record.get(cols.open)),
            parse_number(record.get(cols.high)),
            parse_number(record.get(cols.low)),
            parse_number(record.get(cols.close)),
            cols.volume
                .map_or(0.0, |i| parse_number(record.get(i))),
        ));
    }
    Ok(bars)
}

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn locate(&self, candidates: &[String]) -> Option<PathBuf> {
        candidates.iter().find_map(|c| {
            [c.to_lowercase(), c.clone()].into_iter().find_map(|stem| {
                EXTENSIONS
                    .iter()
                    .map(|ext| self.base_path.join(format!("{stem}.{ext}")))
                    .find(|p| p.is_file())
            })
        })
    }
}

impl DataPort for CsvAdapter {
    fn fetch_daily(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, TradecastError> {
        let candidates = provider_candidates(ticker)?;
        let path = self
            .locate(&candidates)
            .ok_or_else(|| TradecastError::TickerNotFound {
                tried: candidates.clone(),
            })?;
        debug!(path = %path.display(), "reading price file");

        let content = fs::read_to_string(&path).map_err(|e| TradecastError::Provider {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;
        let mut bars = parse_ohlcv_csv(&content)?;
        bars.retain(|b| b.date >= start && b.date <= end);
        Ok(bars)
    }

    fn name(&self) -> &str {
        "csv"
    }
}

/// Load a `symbol,name` CSV into a [`SymbolDirectory`].
pub fn load_symbols(path: &Path) -> Result<SymbolDirectory, TradecastError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)
        .map_err(|e| TradecastError::Provider {
            reason: format!("failed to open {}: {}", path.display(), e),
        })?;

    let headers: Vec<String> = rdr
        .headers()
        .map_err(|e| TradecastError::Provider {
            reason: format!("symbol list header error: {e}"),
        })?
        .iter()
        .map(header_key)
        .collect();
    let symbol_col = find_column(&headers, &["symbol", "ticker"]).ok_or_else(|| {
        TradecastError::Provider {
            reason: format!("{} has no 'symbol' column", path.display()),
        }
    })?;
    let name_col = find_column(&headers, &["name", "description"]);

    let mut entries = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(|e| TradecastError::Provider {
            reason: format!("symbol list parse error: {e}"),
        })?;
        entries.push(SymbolInfo {
            symbol: record.get(symbol_col).unwrap_or_default().to_string(),
            name: name_col
                .and_then(|i| record.get(i))
                .unwrap_or_default()
                .to_string(),
        });
    }
    Ok(SymbolDirectory::new(entries))
}
