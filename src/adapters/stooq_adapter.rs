//! Stooq HTTP data provider.
//!
//! Stooq serves daily bars as CSV from `q/d/l/`. An unknown symbol comes back
//! as an HTML page or a bare "No data" body rather than an HTTP error, so each
//! provider candidate (`AAPL`, `AAPL.US`) is tried in turn.

use crate::adapters::csv_adapter::parse_ohlcv_csv;
use crate::domain::error::TradecastError;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::settings::StooqSettings;
use crate::domain::ticker::provider_candidates;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const USER_AGENT: &str = concat!("tradecast/", env!("CARGO_PKG_VERSION"));

/// Outcome of one candidate request.
enum Attempt {
    Bars(Vec<OhlcvBar>),
    NotFound(String),
}

pub struct StooqAdapter {
    client: reqwest::blocking::Client,
    base_url: String,
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl StooqAdapter {
    pub fn new(settings: &StooqSettings) -> Result<Self, TradecastError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| TradecastError::Provider {
                reason: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            base_url: settings.base_url.clone(),
            min_interval: Duration::from_secs_f64(settings.rate_limit_seconds.max(0.0)),
            last_request: Mutex::new(None),
        })
    }

    pub fn request_url(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> String {
        format!(
            "{}?s={}&d1={}&d2={}&i=d",
            self.base_url,
            symbol.to_lowercase(),
            start.format("%Y%m%d"),
            end.format("%Y%m%d")
        )
    }

    fn throttle(&self) {
        let mut last = match self.last_request.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.min_interval {
                let wait = self.min_interval - elapsed;
                debug!(wait_ms = wait.as_millis() as u64, "rate limiting stooq request");
                std::thread::sleep(wait);
            }
        }
        *last = Some(Instant::now());
    }

    fn fetch_candidate(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Attempt, TradecastError> {
        self.throttle();
        let url = self.request_url(symbol, start, end);
        info!(%symbol, %start, %end, "fetching from stooq");

        let response = self.client.get(&url).send().map_err(|e| TradecastError::Provider {
            reason: format!("request to stooq failed: {e}"),
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TradecastError::Provider {
                reason: format!("stooq returned status {status}"),
            });
        }

        let is_html = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.to_lowercase().contains("text/html"));
        let body = response.text().map_err(|e| TradecastError::Provider {
            reason: format!("failed to read stooq response: {e}"),
        })?;

        classify_body(symbol, is_html, &body)
    }
}

fn classify_body(symbol: &str, is_html: bool, body: &str) -> Result<Attempt, TradecastError> {
    let trimmed = body.trim();
    if is_html || trimmed.starts_with('<') {
        return Ok(Attempt::NotFound(format!("stooq returned HTML for {symbol}")));
    }
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("no data") {
        return Ok(Attempt::NotFound(format!("no data returned for {symbol}")));
    }
    let bars = parse_ohlcv_csv(trimmed)?;
    if bars.is_empty() {
        return Ok(Attempt::NotFound(format!("no rows returned for {symbol}")));
    }
    Ok(Attempt::Bars(bars))
}

impl DataPort for StooqAdapter {
    fn fetch_daily(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, TradecastError> {
        let candidates = provider_candidates(ticker)?;
        for symbol in &candidates {
            match self.fetch_candidate(symbol, start, end)? {
                Attempt::Bars(bars) => {
                    let expected_days = (end - start).num_days();
                    if (bars.len() as i64) * 2 < expected_days {
                        warn!(
                            %symbol,
                            bars = bars.len(),
                            expected_days,
                            "suspiciously low bar count"
                        );
                    }
                    info!(%symbol, bars = bars.len(), "fetched bars from stooq");
                    return Ok(bars);
                }
                Attempt::NotFound(reason) => debug!(%symbol, %reason, "candidate not found"),
            }
        }
        Err(TradecastError::TickerNotFound { tried: candidates })
    }

    fn name(&self) -> &str {
        "stooq"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::settings::Settings;

    fn adapter() -> StooqAdapter {
        StooqAdapter::new(&Settings::default().stooq).unwrap()
    }

    #[test]
    fn url_uses_compact_dates_and_lowercase_symbol() {
        let url = adapter().request_url(
            "AAPL.US",
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
        );
        assert_eq!(
            url,
            "https://stooq.com/q/d/l/?s=aapl.us&d1=20240102&d2=20240331&i=d"
        );
    }

    #[test]
    fn html_and_no_data_bodies_are_not_found() {
        assert!(matches!(
            classify_body("X", true, "Date,Open\n"),
            Ok(Attempt::NotFound(_))
        ));
        assert!(matches!(
            classify_body("X", false, "<html></html>"),
            Ok(Attempt::NotFound(_))
        ));
        assert!(matches!(
            classify_body("X", false, "No data"),
            Ok(Attempt::NotFound(_))
        ));
    }

    #[test]
    fn csv_body_parses_into_bars() {
        let body = "Date,Open,High,Low,Close,Volume\n\
                    2024-01-02,187.15,188.44,183.89,185.64,82488700\n";
        match classify_body("AAPL.US", false, body) {
            Ok(Attempt::Bars(bars)) => {
                assert_eq!(bars.len(), 1);
                assert_eq!(bars[0].close, 185.64);
            }
            _ => panic!("expected bars"),
        }
    }
}
