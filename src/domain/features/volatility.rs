//! Volatility and regime features.

use super::FeatureRow;
use super::rolling::{is_degenerate, linear_fit, pct_change, rolling_std};

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;
pub const VOL_WINDOW: usize = 20;
pub const SHORT_VOL_WINDOW: usize = 10;
pub const TREND_WINDOW: usize = 20;

/// Rolling sample SD of daily percentage returns (not annualised).
pub fn daily_vol(closes: &[f64], window: usize) -> Vec<Option<f64>> {
    rolling_std(&pct_change(closes), window)
}

pub fn realized_vol(closes: &[f64], window: usize) -> Vec<Option<f64>> {
    daily_vol(closes, window)
        .into_iter()
        .map(|v| v.map(|v| v * TRADING_DAYS_PER_YEAR.sqrt()))
        .collect()
}

/// Relative change of short-window vol against long-window vol.
pub fn vol_change(closes: &[f64], short: usize, long: usize) -> Vec<Option<f64>> {
    let s = daily_vol(closes, short);
    let l = daily_vol(closes, long);
    s.into_iter()
        .zip(l)
        .map(|(s, l)| match (s, l) {
            (Some(s), Some(l)) if l > 0.0 => Some((s - l) / l),
            _ => None,
        })
        .collect()
}

/// Signed r² of a linear fit over the `window` closes strictly before each bar.
///
/// Near +1 is a clean uptrend, near -1 a clean downtrend, near 0 chop.
pub fn trend_vs_chop(closes: &[f64], window: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; closes.len()];
    for i in window..closes.len() {
        let w = &closes[i - window..i];
        out[i] = Some(match linear_fit(w) {
            Some((slope, r2)) => {
                if slope > 0.0 {
                    r2
                } else {
                    -r2
                }
            }
            None => 0.0,
        });
    }
    out
}

/// Last available daily vol, for sizing.
pub fn latest_daily_vol(closes: &[f64], window: usize) -> Option<f64> {
    daily_vol(closes, window)
        .last()
        .copied()
        .flatten()
        .filter(|v| v.is_finite() && !is_degenerate(*v, 0.0))
}

pub fn fill(closes: &[f64], rows: &mut [FeatureRow]) {
    let rv = realized_vol(closes, VOL_WINDOW);
    let vc = vol_change(closes, SHORT_VOL_WINDOW, VOL_WINDOW);
    let tc = trend_vs_chop(closes, TREND_WINDOW);
    for (i, row) in rows.iter_mut().enumerate() {
        row.realized_vol_20d = rv[i];
        row.vol_change = vc[i];
        row.trend_vs_chop = tc[i];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn realized_vol_annualises_daily() {
        let closes: Vec<f64> = (0..30)
            .map(|i| if i % 2 == 0 { 100.0 } else { 101.0 })
            .collect();
        let d = daily_vol(&closes, 20);
        let a = realized_vol(&closes, 20);
        assert!(d[19].is_none());
        assert_abs_diff_eq!(a[25].unwrap(), d[25].unwrap() * 252f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn trend_excludes_current_bar() {
        let mut closes: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        closes.push(1.0);
        let t = trend_vs_chop(&closes, 20);
        assert!(t[19].is_none());
        assert_abs_diff_eq!(t[20].unwrap(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn trend_sign_and_flat() {
        let down: Vec<f64> = (0..21).map(|i| 100.0 - i as f64).collect();
        assert_abs_diff_eq!(trend_vs_chop(&down, 20)[20].unwrap(), -1.0, epsilon = 1e-12);
        let flat = vec![10.0; 21];
        assert_eq!(trend_vs_chop(&flat, 20)[20], Some(0.0));
    }

    #[test]
    fn vol_change_zero_for_stationary_alternation() {
        let closes: Vec<f64> = (0..40)
            .map(|i| if i % 2 == 0 { 100.0 } else { 102.0 })
            .collect();
        let v = vol_change(&closes, 10, 20);
        assert!(v[39].unwrap().abs() < 0.1);
    }

    #[test]
    fn latest_daily_vol_none_for_short_series() {
        assert!(latest_daily_vol(&[1.0, 2.0, 3.0], 20).is_none());
    }
}
