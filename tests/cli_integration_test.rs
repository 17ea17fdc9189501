//! CLI integration tests: INI settings, provider/cache wiring and the
//! exit codes each command reports.

mod common;

use chrono::{Duration, NaiveDate, Utc};
use clap::Parser;
use common::*;
use std::fs;
use std::path::Path;
use std::process::ExitCode;
use tempfile::TempDir;
use tradecast::cli::{self, Cli, build_fetcher, load_settings};
use tradecast::domain::error::TradecastError;
use tradecast::domain::fetcher::CACHE_SOURCE;
use tradecast::domain::ohlcv::OhlcvBar;
use tradecast::domain::settings::{LogFormat, ProviderKind};

fn write_price_csv(dir: &Path, file: &str, bars: &[OhlcvBar]) {
    let mut out = String::from("Date,Open,High,Low,Close,Volume\n");
    for b in bars {
        out.push_str(&format!(
            "{},{},{},{},{},{}\n",
            b.date, b.open, b.high, b.low, b.close, b.volume
        ));
    }
    fs::write(dir.join(file), out).unwrap();
}

/// A workspace with a csv price directory, a symbol list and a cache path,
/// plus an INI file pointing at all three.
struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("csv")).unwrap();
        fs::write(
            dir.path().join("symbols.csv"),
            "symbol,name\n\
             SPY,SPDR S&P 500 ETF Trust\n\
             AAPL,Apple Inc.\n\
             MSFT,Microsoft Corporation\n",
        )
        .unwrap();
        let ws = Workspace { dir };
        ws.write_config("");
        ws
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn config_path(&self) -> std::path::PathBuf {
        self.path().join("tradecast.ini")
    }

    /// Base config followed by `extra` lines; a `[cache]` or `[logging]`
    /// section in `extra` replaces the base one.
    fn write_config(&self, extra: &str) {
        let root = self.path().display();
        let mut ini = format!(
            "[data]\n\
             provider = csv\n\
             csv_dir = {root}/csv\n\
             symbols_path = {root}/symbols.csv\n"
        );
        if !extra.contains("[cache]") {
            ini.push_str(&format!("[cache]\nenabled = true\npath = {root}/cache/bars.sqlite\n"));
        }
        if !extra.contains("[logging]") {
            ini.push_str("[logging]\nlevel = warn\n");
        }
        ini.push_str(extra);
        ini.push('\n');
        fs::write(self.config_path(), ini).unwrap();
    }

    fn add_prices(&self, ticker: &str, bars: &[OhlcvBar]) {
        write_price_csv(&self.path().join("csv"), &format!("{ticker}.csv"), bars);
    }

    fn run(&self, args: &[&str]) -> ExitCode {
        let config = self.config_path();
        let mut argv = vec!["tradecast", "--config", config.to_str().unwrap()];
        argv.extend_from_slice(args);
        cli::run(Cli::try_parse_from(argv).unwrap())
    }
}

/// Weekday bars running up to today, so "latest" windows find data.
fn recent_bars(count: usize) -> Vec<OhlcvBar> {
    let today = Utc::now().date_naive();
    let start = today - Duration::days((count as i64) * 7 / 5 + 5);
    trending_bars(start, count, 100.0, 0.0008)
        .into_iter()
        .filter(|b| b.date <= today)
        .collect()
}

mod settings_loading {
    use super::*;

    #[test]
    fn ini_values_overlay_defaults() {
        let ws = Workspace::new();
        ws.write_config(
            "[backtest]\n\
             initial_capital = 50000\n\
             allow_shorting = false\n\
             max_drawdown = -0.25\n\
             [walkforward]\n\
             test_months = 6\n\
             [web]\n\
             port = 9100\n\
             cors_origins = http://a.test, http://b.test\n\
             [logging]\n\
             level = warn\n\
             format = json",
        );
        let settings = load_settings(Some(&ws.config_path())).unwrap();

        assert_eq!(settings.data.provider, ProviderKind::Csv);
        assert_eq!(settings.data.csv_dir, ws.path().join("csv"));
        assert_eq!(settings.backtest.initial_capital, 50_000.0);
        assert!(!settings.backtest.allow_shorting);
        assert_eq!(settings.backtest.constraints.max_drawdown, Some(-0.25));
        assert_eq!(settings.walkforward.test_months, 6);
        assert_eq!(settings.walkforward.train_years, 1);
        assert_eq!(settings.web.port, 9100);
        assert_eq!(
            settings.web.cors_origins,
            vec!["http://a.test".to_string(), "http://b.test".to_string()]
        );
        assert_eq!(settings.logging.format, LogFormat::Json);
    }

    #[test]
    fn shipped_config_matches_defaults() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/tradecast.ini");
        let settings = load_settings(Some(&path)).unwrap();
        let defaults = load_settings(None).unwrap();
        assert_eq!(settings.backtest, defaults.backtest);
        assert_eq!(settings.walkforward, defaults.walkforward);
        assert_eq!(settings.data.symbols_path, defaults.data.symbols_path);
    }

    #[test]
    fn no_config_uses_defaults() {
        let settings = load_settings(None).unwrap();
        assert_eq!(settings.data.provider, ProviderKind::Csv);
        assert!(settings.cache.enabled);
        assert_eq!(settings.web.port, 8000);
    }

    #[test]
    fn out_of_range_limit_is_rejected() {
        let ws = Workspace::new();
        ws.write_config("[backtest]\nmax_drawdown = 0.2");
        let err = load_settings(Some(&ws.config_path())).unwrap_err();
        assert!(matches!(err, TradecastError::ConfigInvalid { .. }));
    }
}

mod fetcher_wiring {
    use super::*;

    #[test]
    fn csv_provider_fills_the_cache() {
        let ws = Workspace::new();
        ws.add_prices("spy", &trending_bars(date(2023, 1, 2), 100, 400.0, 0.001));
        let settings = load_settings(Some(&ws.config_path())).unwrap();
        let fetcher = build_fetcher(&settings).unwrap();
        assert_eq!(fetcher.provider_name(), "csv");

        let first = fetcher
            .fetch(
                "SPY",
                NaiveDate::from_ymd_opt(2023, 1, 2).unwrap(),
                NaiveDate::from_ymd_opt(2023, 3, 31).unwrap(),
            )
            .unwrap();
        assert_eq!(first.source, "csv");
        assert!(ws.path().join("cache/bars.sqlite").exists());

        let second = fetcher
            .fetch(
                "SPY",
                NaiveDate::from_ymd_opt(2023, 2, 1).unwrap(),
                NaiveDate::from_ymd_opt(2023, 3, 1).unwrap(),
            )
            .unwrap();
        assert_eq!(second.source, CACHE_SOURCE);
        assert!(!second.bars.is_empty());
    }

    #[test]
    fn disabled_cache_reads_provider_every_time() {
        let ws = Workspace::new();
        ws.write_config("[cache]\nenabled = false");
        ws.add_prices("spy", &trending_bars(date(2023, 1, 2), 40, 400.0, 0.0));
        let settings = load_settings(Some(&ws.config_path())).unwrap();
        let fetcher = build_fetcher(&settings).unwrap();
        for _ in 0..2 {
            let r = fetcher
                .fetch("SPY", date(2023, 1, 2), date(2023, 2, 15))
                .unwrap();
            assert_eq!(r.source, "csv");
        }
        assert!(!ws.path().join("cache").exists());
    }
}

mod commands {
    use super::*;

    #[test]
    fn fetch_succeeds_for_known_ticker() {
        let ws = Workspace::new();
        ws.add_prices("spy", &trending_bars(date(2023, 1, 2), 80, 400.0, 0.001));
        let code = ws.run(&["fetch", "SPY", "--start", "2023-01-02", "--end", "2023-04-14"]);
        assert_eq!(code, ExitCode::SUCCESS);
    }

    #[test]
    fn unknown_ticker_exits_with_data_error() {
        let ws = Workspace::new();
        let code = ws.run(&["fetch", "NOPE", "--start", "2023-01-02", "--end", "2023-04-14"]);
        assert_eq!(code, ExitCode::from(5));
    }

    #[test]
    fn inverted_range_exits_with_input_error() {
        let ws = Workspace::new();
        ws.add_prices("spy", &trending_bars(date(2023, 1, 2), 80, 400.0, 0.001));
        let code = ws.run(&["fetch", "SPY", "--start", "2023-04-14", "--end", "2023-01-02"]);
        assert_eq!(code, ExitCode::from(4));
    }

    #[test]
    fn invalid_ticker_exits_with_input_error() {
        let ws = Workspace::new();
        let code = ws.run(&["signals", "$$$", "--start", "2023-01-02", "--end", "2023-04-14"]);
        assert_eq!(code, ExitCode::from(4));
    }

    #[test]
    fn bad_config_exits_with_config_error() {
        let ws = Workspace::new();
        ws.write_config("[web]\nport = 70000");
        let code = ws.run(&["search", "spy"]);
        assert_eq!(code, ExitCode::from(2));
    }

    #[test]
    fn backtest_runs_over_csv_history() {
        let ws = Workspace::new();
        ws.add_prices("aapl", &trending_bars(date(2022, 1, 3), 260, 150.0, 0.001));
        let code = ws.run(&[
            "backtest", "AAPL", "--start", "2022-01-03", "--end", "2022-12-30", "--preset", "trend",
        ]);
        assert_eq!(code, ExitCode::SUCCESS);
    }

    #[test]
    fn walk_forward_backtest_with_fitted_weights() {
        let ws = Workspace::new();
        ws.add_prices("aapl", &choppy_bars(date(2020, 1, 1), 650, 150.0));
        let code = ws.run(&[
            "backtest",
            "AAPL",
            "--start",
            "2020-01-01",
            "--end",
            "2022-06-30",
            "--walkforward",
            "--optimize-weights",
        ]);
        assert_eq!(code, ExitCode::SUCCESS);
    }

    #[test]
    fn forecast_uses_latest_year() {
        let ws = Workspace::new();
        ws.add_prices("msft", &recent_bars(300));
        assert_eq!(ws.run(&["forecast", "MSFT", "--preset", "conservative"]), ExitCode::SUCCESS);
    }

    #[test]
    fn forecast_without_recent_data_is_no_data() {
        let ws = Workspace::new();
        ws.add_prices("msft", &trending_bars(date(2015, 1, 1), 100, 50.0, 0.0));
        assert_eq!(ws.run(&["forecast", "MSFT"]), ExitCode::from(5));
    }

    #[test]
    fn signals_on_empty_range_still_succeeds() {
        let ws = Workspace::new();
        ws.add_prices("spy", &trending_bars(date(2023, 1, 2), 40, 400.0, 0.0));
        let code = ws.run(&["signals", "SPY", "--start", "2021-01-04", "--end", "2021-03-01"]);
        assert_eq!(code, ExitCode::SUCCESS);
    }

    #[test]
    fn search_reads_symbol_list() {
        let ws = Workspace::new();
        assert_eq!(ws.run(&["search", "micro"]), ExitCode::SUCCESS);
    }

    #[test]
    fn search_without_symbol_list_is_provider_error() {
        let ws = Workspace::new();
        fs::remove_file(ws.path().join("symbols.csv")).unwrap();
        assert_eq!(ws.run(&["search", "spy"]), ExitCode::from(3));
    }
}
