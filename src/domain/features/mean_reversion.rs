//! Mean-reversion features.

use super::FeatureRow;
use super::rolling::{is_degenerate, present, rolling_mean, rolling_std};

pub const MA_WINDOW: usize = 20;
const BAND_STDS: f64 = 2.0;

/// `(close - MA) / SD` and the band-normalised distance `(close - MA) / (upper - lower)`.
pub fn zscore_and_bollinger(closes: &[f64], window: usize) -> (Vec<Option<f64>>, Vec<Option<f64>>) {
    let series = present(closes);
    let ma = rolling_mean(&series, window);
    let sd = rolling_std(&series, window);
    let mut z = vec![None; closes.len()];
    let mut bb = vec![None; closes.len()];
    for i in 0..closes.len() {
        if let (Some(m), Some(s)) = (ma[i], sd[i]) {
            if is_degenerate(s, m) {
                continue;
            }
            let dev = closes[i] - m;
            z[i] = Some(dev / s);
            bb[i] = Some(dev / (2.0 * BAND_STDS * s));
        }
    }
    (z, bb)
}

/// Negated simple return over `n` bars.
pub fn reversal(closes: &[f64], n: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; closes.len()];
    for i in n..closes.len() {
        let then = closes[i - n];
        if then != 0.0 {
            out[i] = Some(-(closes[i] / then - 1.0));
        }
    }
    out
}

pub fn fill(closes: &[f64], rows: &mut [FeatureRow]) {
    let (z, bb) = zscore_and_bollinger(closes, MA_WINDOW);
    let r1 = reversal(closes, 1);
    let r3 = reversal(closes, 3);
    for (i, row) in rows.iter_mut().enumerate() {
        row.zscore_close_vs_ma20 = z[i];
        row.bollinger_distance = bb[i];
        row.reversal_1d = r1[i];
        row.reversal_3d = r3[i];
    }
}
