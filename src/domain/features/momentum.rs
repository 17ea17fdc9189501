//! Momentum features: log returns, moving-average slopes, breakout distance.

use super::FeatureRow;
use super::rolling::{diff, present, rolling_max, rolling_mean, rolling_min};

pub const BREAKOUT_WINDOW: usize = 20;

/// `ln(c_i / c_{i-n})`.
pub fn log_returns(closes: &[f64], n: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; closes.len()];
    for i in n..closes.len() {
        let (now, then) = (closes[i], closes[i - n]);
        if now > 0.0 && then > 0.0 {
            out[i] = Some((now / then).ln());
        }
    }
    out
}

/// Change of the `window` SMA over `lag` bars, scaled by the current close.
pub fn ma_slope(closes: &[f64], window: usize, lag: usize) -> Vec<Option<f64>> {
    let sma = rolling_mean(&present(closes), window);
    diff(&sma, lag)
        .into_iter()
        .zip(closes)
        .map(|(d, c)| match d {
            Some(d) if *c != 0.0 => Some(d / c),
            _ => None,
        })
        .collect()
}

/// Signed distance to whichever rolling boundary is nearer.
///
/// Positive values measure the distance above the rolling low, negative
/// values the distance below the rolling high.
pub fn breakout_distance(closes: &[f64], window: usize) -> Vec<Option<f64>> {
    let series = present(closes);
    let highs = rolling_max(&series, window);
    let lows = rolling_min(&series, window);
    closes
        .iter()
        .zip(highs.iter().zip(lows.iter()))
        .map(|(c, (hi, lo))| {
            let (hi, lo) = ((*hi)?, (*lo)?);
            if hi == 0.0 || lo == 0.0 {
                return None;
            }
            let from_high = (c - hi) / hi;
            let from_low = (c - lo) / lo;
            Some(if from_low.abs() < from_high.abs() {
                from_low
            } else {
                from_high
            })
        })
        .collect()
}

pub fn fill(closes: &[f64], rows: &mut [FeatureRow]) {
    let r5 = log_returns(closes, 5);
    let r20 = log_returns(closes, 20);
    let r60 = log_returns(closes, 60);
    let s20 = ma_slope(closes, 20, 5);
    let s60 = ma_slope(closes, 60, 10);
    let bo = breakout_distance(closes, BREAKOUT_WINDOW);
    for (i, row) in rows.iter_mut().enumerate() {
        row.returns_5d = r5[i];
        row.returns_20d = r20[i];
        row.returns_60d = r60[i];
        row.ma_slope_20 = s20[i];
        row.ma_slope_60 = s60[i];
        row.breakout_distance = bo[i];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn log_return_five_day() {
        let closes: Vec<f64> = (0..10).map(|i| 100.0 + i as f64).collect();
        let r = log_returns(&closes, 5);
        assert!(r[4].is_none());
        assert_abs_diff_eq!(r[5].unwrap(), (105.0_f64 / 100.0).ln(), epsilon = 1e-12);
    }

    #[test]
    fn ma_slope_of_linear_series() {
        // SMA of a +1/day line also rises 1/day, so a 5-bar diff is 5.
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
        let s = ma_slope(&closes, 20, 5);
        assert!(s[23].is_none());
        assert_abs_diff_eq!(s[24].unwrap(), 5.0 / 124.0, epsilon = 1e-12);
    }

    #[test]
    fn breakout_at_new_high_is_zero() {
        let closes: Vec<f64> = (0..25).map(|i| 50.0 + i as f64).collect();
        let b = breakout_distance(&closes, 20);
        assert!(b[18].is_none());
        assert_abs_diff_eq!(b[24].unwrap(), 0.0);
    }

    #[test]
    fn breakout_near_low_is_positive() {
        let mut closes = vec![100.0; 19];
        closes.push(50.0);
        closes.push(51.0);
        let b = breakout_distance(&closes, 20);
        assert_abs_diff_eq!(b[20].unwrap(), 0.02, epsilon = 1e-12);
    }
}
