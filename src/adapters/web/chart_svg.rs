//! Inline SVG line charts for the dashboard report.

use crate::domain::portfolio::EquityPoint;

const WIDTH: f64 = 640.0;
const HEIGHT: f64 = 220.0;
const PADDING: f64 = 40.0;

pub fn equity_svg(curve: &[EquityPoint]) -> String {
    let values: Vec<f64> = curve.iter().map(|p| p.equity).collect();
    line_chart(&values, "Equity Curve", "#1f6feb")
}

/// Drawdown in percent, zero at the top of the plot.
pub fn drawdown_svg(curve: &[EquityPoint]) -> String {
    let values: Vec<f64> = curve.iter().map(|p| p.drawdown * 100.0).collect();
    line_chart(&values, "Drawdown (%)", "#cf222e")
}

fn line_chart(values: &[f64], title: &str, stroke: &str) -> String {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return format!("<p class=\"chart-empty\">No data for {title}.</p>");
    }

    let min = finite.iter().copied().fold(f64::INFINITY, f64::min);
    let max = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let plot_width = WIDTH - 2.0 * PADDING;
    let plot_height = HEIGHT - 2.0 * PADDING;
    let range = max - min;
    let scale_y = if range > 0.0 { plot_height / range } else { 0.0 };
    let scale_x = if values.len() > 1 {
        plot_width / (values.len() - 1) as f64
    } else {
        0.0
    };

    let points: Vec<String> = values
        .iter()
        .enumerate()
        .filter(|(_, v)| v.is_finite())
        .map(|(i, v)| {
            let x = PADDING + i as f64 * scale_x;
            let y = if range > 0.0 {
                HEIGHT - PADDING - (v - min) * scale_y
            } else {
                HEIGHT / 2.0
            };
            format!("{x:.1},{y:.1}")
        })
        .collect();

    format!(
        concat!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" viewBox=\"0 0 {w:.0} {h:.0}\" ",
            "width=\"{w:.0}\" height=\"{h:.0}\" role=\"img\" aria-label=\"{title}\">",
            "<rect width=\"100%\" height=\"100%\" fill=\"white\"/>",
            "<text x=\"{p:.0}\" y=\"20\" font-size=\"13\">{title}</text>",
            "<line x1=\"{p:.0}\" y1=\"{p:.0}\" x2=\"{p:.0}\" y2=\"{base:.0}\" stroke=\"#888\"/>",
            "<line x1=\"{p:.0}\" y1=\"{base:.0}\" x2=\"{right:.0}\" y2=\"{base:.0}\" ",
            "stroke=\"#888\"/>",
            "<text x=\"4\" y=\"{top_label:.0}\" font-size=\"10\">{max:.1}</text>",
            "<text x=\"4\" y=\"{base:.0}\" font-size=\"10\">{min:.1}</text>",
            "<polyline fill=\"none\" stroke=\"{stroke}\" stroke-width=\"1.5\" ",
            "points=\"{points}\"/>",
            "</svg>"
        ),
        w = WIDTH,
        h = HEIGHT,
        p = PADDING,
        base = HEIGHT - PADDING,
        right = WIDTH - PADDING,
        top_label = PADDING + 4.0,
        title = title,
        max = max,
        min = min,
        stroke = stroke,
        points = points.join(" "),
    )
}
