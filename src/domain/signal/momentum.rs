//! Trend-following signal.

use super::{Signal, SignalKind, SignalResult, clip};
use crate::domain::features::FeatureFrame;
use crate::domain::features::rolling::{mean, population_std};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Features are squashed with `tanh(x * SCALE)` before averaging.
const SCALE: f64 = 10.0;

#[derive(Debug, Clone, Copy, Default)]
pub struct MomentumSignal;

impl Signal for MomentumSignal {
    fn kind(&self) -> SignalKind {
        SignalKind::Momentum
    }

    fn name(&self) -> &'static str {
        "Trend (recent price strength)"
    }

    fn compute(&self, features: &FeatureFrame, date: NaiveDate) -> SignalResult {
        let Some(row) = features.row_at_or_before(date) else {
            return SignalResult::neutral(
                self.kind(),
                self.name(),
                date,
                0.0,
                "Insufficient data for momentum signal",
            );
        };

        let values = row.momentum_values();
        if values.is_empty() {
            return SignalResult::neutral(
                self.kind(),
                self.name(),
                date,
                0.0,
                "All momentum features are missing",
            );
        }

        let normalized: Vec<f64> = values.iter().map(|(_, v)| (v * SCALE).tanh()).collect();
        let score = clip(mean(&normalized), -1.0, 1.0);
        let consistency = 1.0 - (population_std(&normalized) / 2.0).min(1.0);
        let confidence = clip(score.abs() * 0.7 + consistency * 0.3, 0.0, 1.0);

        let mut components = BTreeMap::new();
        let mut reasons = Vec::new();
        if let Some(s) = row.ma_slope_20 {
            components.insert("ma_slope_20".to_string(), s);
            if s.abs() > 0.001 {
                reasons.push(format!("MA20 slope={s:.4}"));
            }
        }
        if let Some(s) = row.ma_slope_60 {
            components.insert("ma_slope_60".to_string(), s);
            if s.abs() > 0.001 {
                reasons.push(format!("MA60 slope={s:.4}"));
            }
        }
        if let Some(b) = row.breakout_distance {
            components.insert("breakout_distance".to_string(), b);
            if b.abs() > 0.01 {
                reasons.push(format!("breakout_dist={b:.3}"));
            }
        }
        if let Some(r) = row.returns_20d {
            components.insert("returns_20d".to_string(), r);
            if r.abs() > 0.01 {
                reasons.push(format!("20d_return={r:.3}"));
            }
        }
        let reason = if reasons.is_empty() {
            format!("Based on {} momentum features", values.len())
        } else {
            reasons.truncate(3);
            reasons.join(", ")
        };

        let direction = if score > 0.1 {
            "bullish"
        } else if score < -0.1 {
            "bearish"
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
                "Trend signal ({direction}): Is price gaining strength vs recent history? \
                 Score={score:.2}, based on {} features",
                values.len()
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

    #[test]
    fn steady_uptrend_is_bullish() {
        let closes: Vec<f64> = (0..100).map(|i| 100.0 * 1.01f64.powi(i)).collect();
        let (f, d) = frame(&closes);
        let r = MomentumSignal.compute(&f, d);
        assert!(r.score > 0.3, "score {}", r.score);
        assert!(r.confidence > 0.0 && r.confidence <= 1.0);
        assert!(r.description.contains("bullish"));
        assert!(r.components.contains_key("returns_20d"));
    }

    #[test]
    fn steady_downtrend_is_bearish() {
        let closes: Vec<f64> = (0..100).map(|i| 100.0 * 0.99f64.powi(i)).collect();
        let (f, d) = frame(&closes);
        let r = MomentumSignal.compute(&f, d);
        assert!(r.score < -0.3);
    }

    #[test]
    fn warmup_only_frame_is_neutral() {
        let (f, d) = frame(&[100.0, 101.0, 102.0]);
        let r = MomentumSignal.compute(&f, d);
        assert_eq!(r.score, 0.0);
        assert_eq!(r.confidence, 0.0);
    }
}
