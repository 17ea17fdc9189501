//! HTML templates using Askama.

use askama::Template;

use crate::domain::analysis::ForecastReport;
use crate::domain::backtest::BacktestResult;
use crate::domain::metrics::Metrics;

use super::chart_svg::{drawdown_svg, equity_svg};

#[derive(Template)]
#[template(path = "base.html")]
pub struct BasePage<'a> {
    pub title: &'a str,
    pub content: &'a str,
}

#[derive(Template)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate<'a> {
    pub presets: &'a [&'a str],
    pub default_ticker: &'a str,
    pub default_start: String,
    pub default_end: String,
}

pub struct MetricRow {
    pub label: &'static str,
    pub value: String,
}

pub struct TradeRow {
    pub date: String,
    pub action: String,
    pub quantity: String,
    pub price: String,
    pub pnl: String,
}

pub struct ForecastView {
    pub direction: String,
    pub confidence: String,
    pub suggested_size: String,
    pub regime: String,
    pub contributors: Vec<(String, String)>,
}

#[derive(Template)]
#[template(path = "report.html")]
pub struct ReportTemplate {
    pub ticker: String,
    pub preset: String,
    pub start: String,
    pub end: String,
    pub metrics: Vec<MetricRow>,
    pub equity_svg: String,
    pub drawdown_svg: String,
    pub forecast: Option<ForecastView>,
    pub trades: Vec<TradeRow>,
    pub warnings: Vec<String>,
}

fn pct(v: f64) -> String {
    format!("{:.2}%", v * 100.0)
}

fn metric_rows(m: &Metrics) -> Vec<MetricRow> {
    let row = |label, value| MetricRow { label, value };
    vec![
        row("Total Return", pct(m.total_return)),
        row("CAGR", pct(m.cagr)),
        row("Sharpe Ratio", format!("{:.2}", m.sharpe)),
        row("Sortino Ratio", format!("{:.2}", m.sortino)),
        row("Max Drawdown", pct(m.max_drawdown)),
        row("Max Drawdown Duration", format!("{} bars", m.max_drawdown_duration)),
        row("Win Rate", pct(m.win_rate)),
        row(
            "Profit Factor",
            m.profit_factor.map_or_else(|| "n/a".to_string(), |p| format!("{p:.2}")),
        ),
        row("Turnover", format!("{:.2}", m.turnover)),
        row("Exposure", pct(m.exposure)),
        row("Total Trades", m.total_trades.to_string()),
        row("Final Equity", format!("{:.2}", m.final_equity)),
    ]
}

impl ReportTemplate {
    pub fn new(
        ticker: &str,
        preset: &str,
        range: (chrono::NaiveDate, chrono::NaiveDate),
        result: &BacktestResult,
        forecast: Option<&ForecastReport>,
        warnings: Vec<String>,
    ) -> Self {
        let forecast = forecast.map(|r| ForecastView {
            direction: r.forecast.direction.to_string(),
            confidence: pct(r.forecast.confidence),
            suggested_size: r
                .suggested_position_size
                .map_or_else(|| "n/a".to_string(), pct),
            regime: r.forecast.explanation.regime_description.clone(),
            contributors: r
                .forecast
                .explanation
                .top_contributors
                .iter()
                .map(|c| (c.signal.clone(), format!("{:+.3}", c.contribution)))
                .collect(),
        });
        let trades = result
            .trades
            .iter()
            .map(|t| TradeRow {
                date: t.date.to_string(),
                action: t.action.to_string(),
                quantity: format!("{:.2}", t.quantity),
                price: format!("{:.2}", t.price),
                pnl: format!("{:.2}", t.pnl),
            })
            .collect();

        Self {
            ticker: ticker.to_string(),
            preset: preset.to_string(),
            start: range.0.to_string(),
            end: range.1.to_string(),
            metrics: metric_rows(&result.metrics),
            equity_svg: equity_svg(&result.equity_curve),
            drawdown_svg: drawdown_svg(&result.equity_curve),
            forecast,
            trades,
            warnings,
        }
    }
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate<'a> {
    pub message: &'a str,
    pub status: u16,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_fragment_escapes_message() {
        let html = ErrorTemplate {
            message: "bad <ticker>",
            status: 400,
        }
        .render()
        .unwrap();
        assert!(html.contains("Error 400"));
        assert!(html.contains("bad &lt;ticker&gt;"));
    }

    #[test]
    fn base_page_embeds_content_unescaped() {
        let html = BasePage {
            title: "Tradecast",
            content: "<div id=\"x\"></div>",
        }
        .render()
        .unwrap();
        assert!(html.contains("<div id=\"x\"></div>"));
        assert!(html.contains("<title>Tradecast</title>"));
    }

    #[test]
    fn metric_rows_format_percentages() {
        let m = Metrics {
            total_return: 0.125,
            profit_factor: None,
            ..Metrics::default()
        };
        let rows = metric_rows(&m);
        assert_eq!(rows[0].value, "12.50%");
        let pf = rows.iter().find(|r| r.label == "Profit Factor").unwrap();
        assert_eq!(pf.value, "n/a");
    }
}
