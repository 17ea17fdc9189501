//! CLI definition and dispatch.

use chrono::{Months, NaiveDate, Utc};
use clap::{Parser, Subcommand, builder::PossibleValuesParser};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{info, warn};

use crate::adapters::csv_adapter::{CsvAdapter, load_symbols};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::analysis::{
    RECOMMENDED_BACKTEST_BARS, RECOMMENDED_HISTORY_BARS, insufficient_data_warning,
    last_year_window, latest_forecast, signal_history, validate_range,
};
use crate::domain::backtest::BacktestEngine;
use crate::domain::error::TradecastError;
use crate::domain::fetcher::{DataFetcher, FetchResult};
use crate::domain::metrics::Metrics;
use crate::domain::presets::get_preset;
use crate::domain::settings::{LogFormat, ProviderKind, Settings};
use crate::domain::staleness::Freshness;
use crate::domain::universe::DEFAULT_SEARCH_LIMIT;
use crate::domain::walkforward::{WalkForwardConfig, WalkForwardEvaluator};
use crate::obs::init_tracing;
use crate::ports::cache_port::BarCachePort;
use crate::ports::data_port::DataPort;

const DEFAULT_LOOKBACK_MONTHS: u32 = 24;

#[derive(Parser, Debug)]
#[command(
    name = "tradecast",
    version,
    about = "Daily-bar signal ensemble, forecaster and backtester"
)]
pub struct Cli {
    /// INI configuration file; built-in defaults apply when omitted
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
    /// Log filter (overrides [logging] level; TRADECAST_LOG overrides both)
    #[arg(long, global = true)]
    pub log_level: Option<String>,
    #[arg(long, global = true, value_parser = PossibleValuesParser::new(["text", "json"]))]
    pub log_format: Option<String>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch daily bars into the cache and report the range
    Fetch {
        ticker: String,
        #[arg(long)]
        start: Option<NaiveDate>,
        #[arg(long)]
        end: Option<NaiveDate>,
    },
    /// Backtest the signal ensemble on one ticker
    Backtest {
        ticker: String,
        #[arg(long)]
        start: Option<NaiveDate>,
        #[arg(long)]
        end: Option<NaiveDate>,
        #[arg(long)]
        preset: Option<String>,
        /// Evaluate on rolling out-of-sample windows
        #[arg(long)]
        walkforward: bool,
        /// Refit signal weights on each training window
        #[arg(long, requires = "walkforward")]
        optimize_weights: bool,
    },
    /// Latest forecast with its signal breakdown
    Forecast {
        ticker: String,
        #[arg(long)]
        preset: Option<String>,
    },
    /// Signal history, newest first
    Signals {
        ticker: String,
        #[arg(long)]
        start: Option<NaiveDate>,
        #[arg(long)]
        end: Option<NaiveDate>,
    },
    /// Search the symbol list by prefix
    Search { query: String },
    /// Start the web server
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let mut settings = match load_settings(cli.config.as_deref()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    if let Some(level) = cli.log_level {
        settings.logging.level = level;
    }
    if let Some(format) = cli.log_format.as_deref() {
        settings.logging.format = match format {
            "json" => LogFormat::Json,
            _ => LogFormat::Text,
        };
    }
    if let Err(e) = init_tracing(&settings.logging.level, settings.logging.format) {
        eprintln!("error: {e}");
        return ExitCode::from(2);
    }

    let result = match cli.command {
        Command::Fetch { ticker, start, end } => run_fetch(&settings, &ticker, start, end),
        Command::Backtest {
            ticker,
            start,
            end,
            preset,
            walkforward,
            optimize_weights,
        } => run_backtest(
            &settings,
            &ticker,
            start,
            end,
            preset.as_deref(),
            walkforward.then_some(optimize_weights),
        ),
        Command::Forecast { ticker, preset } => run_forecast(&settings, &ticker, preset.as_deref()),
        Command::Signals { ticker, start, end } => run_signals(&settings, &ticker, start, end),
        Command::Search { query } => run_search(&settings, &query),
        Command::Serve { host, port } => run_serve(settings, host, port),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_settings(path: Option<&Path>) -> Result<Settings, TradecastError> {
    match path {
        Some(p) => {
            info!(path = %p.display(), "loading config");
            Settings::from_config(&FileConfigAdapter::from_file(p)?)
        }
        None => Ok(Settings::default()),
    }
}

/// Wire the configured provider and (when enabled) the SQLite cache.
pub fn build_fetcher(settings: &Settings) -> Result<DataFetcher, TradecastError> {
    let provider: Arc<dyn DataPort + Send + Sync> = match settings.data.provider {
        ProviderKind::Csv => Arc::new(CsvAdapter::new(settings.data.csv_dir.clone())),
        ProviderKind::Stooq => stooq_provider(settings)?,
    };
    Ok(DataFetcher::new(provider, open_cache(settings)?))
}

#[cfg(feature = "stooq")]
fn stooq_provider(settings: &Settings) -> Result<Arc<dyn DataPort + Send + Sync>, TradecastError> {
    use crate::adapters::stooq_adapter::StooqAdapter;
    Ok(Arc::new(StooqAdapter::new(&settings.stooq)?))
}

#[cfg(not(feature = "stooq"))]
fn stooq_provider(_settings: &Settings) -> Result<Arc<dyn DataPort + Send + Sync>, TradecastError> {
    Err(TradecastError::config_invalid(
        "data",
        "provider",
        "the stooq provider requires the `stooq` feature",
    ))
}

#[cfg(feature = "sqlite")]
fn open_cache(
    settings: &Settings,
) -> Result<Option<Arc<dyn BarCachePort + Send + Sync>>, TradecastError> {
    use crate::adapters::sqlite_adapter::SqliteAdapter;
    if !settings.cache.enabled {
        return Ok(None);
    }
    Ok(Some(Arc::new(SqliteAdapter::from_settings(&settings.cache)?)))
}

#[cfg(not(feature = "sqlite"))]
fn open_cache(
    settings: &Settings,
) -> Result<Option<Arc<dyn BarCachePort + Send + Sync>>, TradecastError> {
    if settings.cache.enabled {
        warn!("cache enabled but built without the `sqlite` feature; fetching uncached");
    }
    Ok(None)
}

fn default_range(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    lookback_months: u32,
) -> (NaiveDate, NaiveDate) {
    let end = end.unwrap_or_else(|| Utc::now().date_naive());
    let start = start.unwrap_or_else(|| {
        end.checked_sub_months(Months::new(lookback_months))
            .unwrap_or(end)
    });
    (start, end)
}

fn report_warnings(warnings: &[String]) {
    for w in warnings {
        warn!("{w}");
        eprintln!("warning: {w}");
    }
}

fn freshness_warnings(fetched: &FetchResult) -> Vec<String> {
    Freshness::assess(fetched.last_bar_date(), Utc::now()).warnings
}

fn run_fetch(
    settings: &Settings,
    ticker: &str,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<(), TradecastError> {
    let (start, end) = default_range(start, end, DEFAULT_LOOKBACK_MONTHS);
    validate_range(start, end)?;
    let fetched = build_fetcher(settings)?
        .fetch(ticker, start, end)?
        .require_bars(start, end)?;

    let mut warnings = fetched.warnings.clone();
    warnings.extend(insufficient_data_warning(
        fetched.bars.len(),
        RECOMMENDED_HISTORY_BARS,
        "",
    ));
    warnings.extend(freshness_warnings(&fetched));
    report_warnings(&warnings);

    let (first, last) = match (fetched.bars.first(), fetched.bars.last()) {
        (Some(f), Some(l)) => (f.date, l.date),
        _ => return Ok(()),
    };
    println!(
        "{}: {} bars from {} to {} (source: {})",
        fetched.ticker,
        fetched.bars.len(),
        first,
        last,
        fetched.source
    );
    Ok(())
}

fn print_metrics(m: &Metrics) {
    println!("  Total return:      {:>10.2}%", m.total_return * 100.0);
    println!("  CAGR:              {:>10.2}%", m.cagr * 100.0);
    println!("  Sharpe:            {:>10.2}", m.sharpe);
    println!("  Sortino:           {:>10.2}", m.sortino);
    println!("  Max drawdown:      {:>10.2}%", m.max_drawdown * 100.0);
    println!("  Max DD duration:   {:>10} bars", m.max_drawdown_duration);
    println!("  Win rate:          {:>10.2}%", m.win_rate * 100.0);
    match m.profit_factor {
        Some(pf) => println!("  Profit factor:     {pf:>10.2}"),
        None => println!("  Profit factor:     {:>10}", "n/a"),
    }
    println!("  Turnover:          {:>10.2}", m.turnover);
    println!("  Exposure:          {:>10.2}%", m.exposure * 100.0);
    println!("  Trades:            {:>10}", m.total_trades);
    println!("  Final equity:      {:>10.2}", m.final_equity);
}

fn run_backtest(
    settings: &Settings,
    ticker: &str,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    preset: Option<&str>,
    walkforward: Option<bool>,
) -> Result<(), TradecastError> {
    let (start, end) = default_range(start, end, DEFAULT_LOOKBACK_MONTHS);
    validate_range(start, end)?;
    let (preset, mut warnings) = get_preset(preset);

    let fetched = build_fetcher(settings)?
        .fetch(ticker, start, end)?
        .require_bars(start, end)?;
    warnings.extend(fetched.warnings.iter().cloned());
    warnings.extend(insufficient_data_warning(
        fetched.bars.len(),
        RECOMMENDED_BACKTEST_BARS,
        "backtest",
    ));
    warnings.extend(freshness_warnings(&fetched));
    report_warnings(&warnings);

    println!(
        "{} {} to {} | preset {} | {} bars",
        fetched.ticker,
        start,
        end,
        preset.name,
        fetched.bars.len()
    );

    if let Some(optimize_weights) = walkforward {
        let config = WalkForwardConfig {
            optimize_weights,
            ..settings.walkforward.clone()
        };
        let evaluator =
            WalkForwardEvaluator::new(config, settings.backtest.clone(), preset.model());
        let result = evaluator.evaluate(&fetched.bars, start, end)?;
        for (n, w) in result.windows.iter().enumerate() {
            println!(
                "Window {:>2}: train {}..{} test {}..{} | return {:>7.2}% | sharpe {:>5.2}",
                n + 1,
                w.window.train_start,
                w.window.train_end,
                w.window.test_start,
                w.window.test_end,
                w.metrics.total_return * 100.0,
                w.metrics.sharpe
            );
            if let Some(weights) = &w.weights {
                let fitted: Vec<String> = weights
                    .iter()
                    .map(|(kind, wt)| format!("{kind}={wt:.3}"))
                    .collect();
                println!("           weights {}", fitted.join(" "));
            }
        }
        println!("Walk-forward aggregate ({} windows):", result.windows.len());
        print_metrics(&result.metrics);
        return Ok(());
    }

    let engine = BacktestEngine::new(settings.backtest.clone(), preset.model());
    let result = engine.run(&fetched.bars, Some(start), Some(end))?;
    print_metrics(&result.metrics);
    if let Some(stopped) = result.stopped_on {
        println!("  Stopped by risk limit on {stopped}");
    }
    if let Some(f) = &result.last_forecast {
        println!(
            "Last forecast ({}): {} confidence {:.2}",
            f.date, f.direction, f.confidence
        );
    }
    Ok(())
}

fn run_forecast(
    settings: &Settings,
    ticker: &str,
    preset: Option<&str>,
) -> Result<(), TradecastError> {
    let (preset, mut warnings) = get_preset(preset);
    let (start, end) = last_year_window(Utc::now().date_naive());
    let fetched = build_fetcher(settings)?
        .fetch(ticker, start, end)?
        .require_bars(start, end)?;
    warnings.extend(fetched.warnings.iter().cloned());
    warnings.extend(freshness_warnings(&fetched));
    report_warnings(&warnings);

    let report = latest_forecast(&fetched.bars, &preset, &settings.backtest.sizing).ok_or_else(
        || TradecastError::NoData {
            ticker: fetched.ticker.clone(),
            start: start.to_string(),
            end: end.to_string(),
        },
    )?;
    let f = &report.forecast;

    println!("{} forecast for {} (preset {})", fetched.ticker, f.date, report.preset);
    println!("  Direction:   {}", f.direction);
    println!("  Confidence:  {:.3}", f.confidence);
    match report.suggested_position_size {
        Some(size) => println!("  Suggested size: {:.1}%", size * 100.0),
        None => println!("  Suggested size: n/a (fewer than 20 bars)"),
    }
    println!("  Regime:      {}", f.explanation.regime_description);
    for c in &f.explanation.top_contributors {
        println!("    {:<16} {:+.4}", c.signal, c.contribution);
    }
    println!("Signals:");
    for s in &report.signals {
        println!(
            "  {:<16} score {:+.3} confidence {:.3}  {}",
            s.name, s.score, s.confidence, s.description
        );
    }
    Ok(())
}

fn run_signals(
    settings: &Settings,
    ticker: &str,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<(), TradecastError> {
    let (start, end) = default_range(start, end, 3);
    validate_range(start, end)?;
    let fetched = build_fetcher(settings)?.fetch(ticker, start, end)?;
    let mut warnings = fetched.warnings.clone();
    if fetched.bars.is_empty() {
        warnings.push(format!("No data found for {}", fetched.ticker));
    }
    warnings.extend(freshness_warnings(&fetched));
    report_warnings(&warnings);

    println!("{:<12} {:<16} {:>7} {:>6}  description", "date", "signal", "score", "conf");
    for s in signal_history(&fetched.bars, start, end) {
        println!(
            "{:<12} {:<16} {:>+7.3} {:>6.3}  {}",
            s.date.to_string(),
            s.name,
            s.score,
            s.confidence,
            s.description
        );
    }
    Ok(())
}

fn run_search(settings: &Settings, query: &str) -> Result<(), TradecastError> {
    let directory = load_symbols(&settings.data.symbols_path)?;
    let matches = directory.search(query, DEFAULT_SEARCH_LIMIT);
    if matches.is_empty() {
        println!("No symbols match '{query}'");
    }
    for m in matches {
        println!("{:<10} {}", m.symbol, m.name);
    }
    Ok(())
}

#[cfg(feature = "web")]
fn run_serve(
    mut settings: Settings,
    host: Option<String>,
    port: Option<u16>,
) -> Result<(), TradecastError> {
    use crate::adapters::web::{AppState, build_router};
    use crate::domain::universe::SymbolDirectory;

    if let Some(h) = host {
        settings.web.host = h;
    }
    if let Some(p) = port {
        settings.web.port = p;
    }

    let fetcher = build_fetcher(&settings)?;
    let symbols = match load_symbols(&settings.data.symbols_path) {
        Ok(dir) => dir,
        Err(e) => {
            warn!(error = %e, "symbol list unavailable; ticker search will be empty");
            SymbolDirectory::new(Vec::new())
        }
    };
    let addr = format!("{}:{}", settings.web.host, settings.web.port);
    let router = build_router(AppState {
        fetcher,
        symbols: Arc::new(symbols),
        settings: Arc::new(settings),
    });

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let listener = tokio::net::TcpListener::bind(addr.as_str()).await?;
        info!(%addr, "web server listening");
        eprintln!("Starting web server on {addr}");
        axum::serve(listener, router).await
    })?;
    Ok(())
}

#[cfg(not(feature = "web"))]
fn run_serve(
    _settings: Settings,
    _host: Option<String>,
    _port: Option<u16>,
) -> Result<(), TradecastError> {
    Err(TradecastError::invalid_input(
        "the web feature is required for serve",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optimize_weights_requires_walkforward() {
        assert!(
            Cli::try_parse_from(["tradecast", "backtest", "SPY", "--optimize-weights"]).is_err()
        );
        let cli = Cli::try_parse_from([
            "tradecast",
            "backtest",
            "SPY",
            "--walkforward",
            "--optimize-weights",
            "--start",
            "2020-01-01",
        ])
        .unwrap();
        match cli.command {
            Command::Backtest {
                walkforward,
                optimize_weights,
                start,
                ..
            } => {
                assert!(walkforward && optimize_weights);
                assert_eq!(start, NaiveDate::from_ymd_opt(2020, 1, 1));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli =
            Cli::try_parse_from(["tradecast", "search", "AA", "--log-format", "json"]).unwrap();
        assert_eq!(cli.log_format.as_deref(), Some("json"));
        assert!(Cli::try_parse_from(["tradecast", "search", "AA", "--log-format", "xml"]).is_err());
    }

    #[test]
    fn default_range_looks_back_from_end() {
        let end = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
        let (start, e) = default_range(None, Some(end), 24);
        assert_eq!(e, end);
        assert_eq!(start, NaiveDate::from_ymd_opt(2022, 6, 30).unwrap());
    }

    #[test]
    fn missing_config_file_is_config_error() {
        let err = load_settings(Some(Path::new("/nonexistent/tradecast.ini"))).unwrap_err();
        assert_eq!(ExitCode::from(&err), ExitCode::from(2));
    }
}
