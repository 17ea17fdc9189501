//! Pullback signal: fades stretches away from the 20-bar average.

use super::{Signal, SignalKind, SignalResult, clip};
use crate::domain::features::FeatureFrame;
use crate::domain::features::rolling::mean;
use chrono::NaiveDate;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Default)]
pub struct MeanReversionSignal;

impl Signal for MeanReversionSignal {
    fn kind(&self) -> SignalKind {
        SignalKind::MeanReversion
    }

    fn name(&self) -> &'static str {
        "Pullback vs average"
    }

    fn compute(&self, features: &FeatureFrame, date: NaiveDate) -> SignalResult {
        let Some(row) = features.row_at_or_before(date) else {
            return SignalResult::neutral(
                self.kind(),
                self.name(),
                date,
                0.0,
                "Insufficient data for mean reversion signal",
            );
        };

        // Bollinger distance is a quarter of the z-score; 2x is the historical approximation.
        let Some(z) = row
            .zscore_close_vs_ma20
            .or(row.bollinger_distance.map(|b| b * 2.0))
            .filter(|z| z.is_finite())
        else {
            return SignalResult::neutral(
                self.kind(),
                self.name(),
                date,
                0.0,
                "Missing mean reversion features",
            );
        };

        let mut score = clip((-z / 2.0).tanh(), -1.0, 1.0);
        let confidence = (z.abs() / 3.0).min(1.0);

        let reversals: Vec<f64> = row.reversal_values().into_iter().map(|(_, v)| v).collect();
        if !reversals.is_empty() {
            score = clip(0.7 * score + 0.3 * (mean(&reversals) * 10.0).tanh(), -1.0, 1.0);
        }

        let mut components = BTreeMap::new();
        let mut reasons = Vec::new();
        if let Some(zs) = row.zscore_close_vs_ma20 {
            components.insert("zscore_close_vs_ma20".to_string(), zs);
            reasons.push(format!("zscore={zs:.2} vs MA20"));
        }
        if let Some(b) = row.bollinger_distance.filter(|b| b.abs() > 0.1) {
            components.insert("bollinger_distance".to_string(), b);
            reasons.push(format!("Bollinger_dist={b:.3}"));
        }
        let reason = if reasons.is_empty() {
            format!("zscore={z:.2}")
        } else {
            reasons.join(", ")
        };

        let regime = if z > 1.0 {
            "overbought (sell signal)"
        } else if z < -1.0 {
            "oversold (buy signal)"
        } else {
            "neutral"
        };

        SignalResult {
            kind: self.kind(),
            name: self.name(),
            date,
            score,
            confidence,
            description: format!(
                "Reversion signal ({regime}): Is price stretched away from its typical range? \
                 z-score={z:.2}, score={score:.2}"
            ),
            reason: Some(reason),
            components,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ohlcv::OhlcvBar;

    fn frame(closes: &[f64]) -> (FeatureFrame, NaiveDate) {
        let start = NaiveDate::from_ymd_opt(2022, 1, 3).unwrap();
        let bars: Vec<OhlcvBar> = closes
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let date = start + chrono::Duration::days(i as i64);
                OhlcvBar::new(date, *c, c + 1.0, c - 1.0, *c, 1e5)
            })
            .collect();
        let last = bars[bars.len() - 1].date;
        (FeatureFrame::compute(&bars), last)
    }

    fn choppy(n: usize) -> Vec<f64> {
        (0..n).map(|i| 100.0 + if i % 2 == 0 { 1.0 } else { -1.0 }).collect()
    }

    #[test]
    fn sharp_drop_reads_oversold() {
        let mut closes = choppy(40);
        closes.push(90.0);
        let (f, d) = frame(&closes);
        let r = MeanReversionSignal.compute(&f, d);
        assert!(r.score > 0.5, "score {}", r.score);
        assert!((r.confidence - 1.0).abs() < 1e-12);
        assert!(r.description.contains("oversold"));
    }

    #[test]
    fn sharp_spike_reads_overbought() {
        let mut closes = choppy(40);
        closes.push(110.0);
        let (f, d) = frame(&closes);
        let r = MeanReversionSignal.compute(&f, d);
        assert!(r.score < -0.5);
        assert!(r.components.contains_key("zscore_close_vs_ma20"));
    }

    #[test]
    fn flat_prices_give_no_signal() {
        let (f, d) = frame(&vec![50.0; 30]);
        let r = MeanReversionSignal.compute(&f, d);
        assert_eq!(r.score, 0.0);
        assert_eq!(r.confidence, 0.0);
        assert_eq!(r.description, "Missing mean reversion features");
    }
}
