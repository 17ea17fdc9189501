//! SQLite bar cache adapter.

use crate::domain::error::TradecastError;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::settings::CacheSettings;
use crate::ports::cache_port::BarCachePort;
use chrono::{NaiveDate, Utc};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;
use std::fs;
use tracing::debug;

const DATE_FORMAT: &str = "%Y-%m-%d";

pub struct SqliteAdapter {
    pool: Pool<SqliteConnectionManager>,
}

fn pool_error(e: r2d2::Error) -> TradecastError {
    TradecastError::Database {
        reason: e.to_string(),
    }
}

fn query_error(e: rusqlite::Error) -> TradecastError {
    TradecastError::DatabaseQuery {
        reason: e.to_string(),
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, TradecastError> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|e: chrono::ParseError| {
        TradecastError::Database {
            reason: format!("bad cached date '{raw}': {e}"),
        }
    })
}

impl SqliteAdapter {
    /// Open (creating if needed) the cache file and its schema.
    pub fn from_settings(settings: &CacheSettings) -> Result<Self, TradecastError> {
        if let Some(parent) = settings.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let manager = SqliteConnectionManager::file(&settings.path);
        let pool = Pool::builder()
            .max_size(settings.pool_size.max(1))
            .build(manager)
            .map_err(pool_error)?;

        let adapter = Self { pool };
        adapter.initialize_schema()?;
        debug!(path = %settings.path.display(), "opened bar cache");
        Ok(adapter)
    }

    pub fn in_memory() -> Result<Self, TradecastError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(pool_error)?;

        let adapter = Self { pool };
        adapter.initialize_schema()?;
        Ok(adapter)
    }

    pub fn initialize_schema(&self) -> Result<(), TradecastError> {
        let conn = self.pool.get().map_err(pool_error)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS bars (
                ticker TEXT NOT NULL,
                date TEXT NOT NULL,
                open REAL NOT NULL,
                high REAL NOT NULL,
                low REAL NOT NULL,
                close REAL NOT NULL,
                volume REAL NOT NULL,
                source TEXT NOT NULL,
                fetched_at TEXT NOT NULL,
                PRIMARY KEY (ticker, date)
            );
            CREATE INDEX IF NOT EXISTS idx_bars_ticker ON bars(ticker);",
        )
        .map_err(query_error)?;
        Ok(())
    }
}

impl BarCachePort for SqliteAdapter {
    fn get_bars(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, TradecastError> {
        let conn = self.pool.get().map_err(pool_error)?;
        let mut stmt = conn
            .prepare(
                "SELECT date, open, high, low, close, volume
                 FROM bars
                 WHERE ticker = ?1 AND date >= ?2 AND date <= ?3
                 ORDER BY date ASC",
            )
            .map_err(query_error)?;

        let rows = stmt
            .query_map(
                params![
                    ticker,
                    start.format(DATE_FORMAT).to_string(),
                    end.format(DATE_FORMAT).to_string()
                ],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, f64>(1)?,
                        row.get::<_, f64>(2)?,
                        row.get::<_, f64>(3)?,
                        row.get::<_, f64>(4)?,
                        row.get::<_, f64>(5)?,
                    ))
                },
            )
            .map_err(query_error)?;

        let mut bars = Vec::new();
        for row in rows {
            let (date, open, high, low, close, volume) = row.map_err(query_error)?;
            bars.push(OhlcvBar::new(parse_date(&date)?, open, high, low, close, volume));
        }
        Ok(bars)
    }

    fn upsert_bars(
        &self,
        ticker: &str,
        bars: &[OhlcvBar],
        source: &str,
    ) -> Result<usize, TradecastError> {
        let mut conn = self.pool.get().map_err(pool_error)?;
        let tx = conn.transaction().map_err(query_error)?;
        let fetched_at = Utc::now().to_rfc3339();

        for bar in bars {
            tx.execute(
                "INSERT OR REPLACE INTO bars
                    (ticker, date, open, high, low, close, volume, source, fetched_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    ticker,
                    bar.date.format(DATE_FORMAT).to_string(),
                    bar.open,
                    bar.high,
                    bar.low,
                    bar.close,
                    bar.volume,
                    source,
                    fetched_at
                ],
            )
            .map_err(query_error)?;
        }

        tx.commit().map_err(query_error)?;
        Ok(bars.len())
    }

    fn data_range(
        &self,
        ticker: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, TradecastError> {
        let conn = self.pool.get().map_err(pool_error)?;
        let result: (Option<String>, Option<String>, i64) = conn
            .query_row(
                "SELECT MIN(date), MAX(date), COUNT(*) FROM bars WHERE ticker = ?1",
                params![ticker],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .map_err(query_error)?;

        match result {
            (Some(min), Some(max), count) if count > 0 => {
                Ok(Some((parse_date(&min)?, parse_date(&max)?, count as usize)))
            }
            _ => Ok(None),
        }
    }
}
