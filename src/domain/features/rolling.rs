//! Trailing-window statistics over a price series.
//!
//! Every function here produces an output the same length as its input where
//! element `i` depends only on inputs `0..=i`. A window is only evaluated once
//! it is full and every value in it is present.

/// Treat a standard deviation this small relative to the level as zero.
const DEGENERATE_STD_RATIO: f64 = 1e-12;

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (divides by n - 1).
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values);
    let ss: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
    Some((ss / (values.len() - 1) as f64).sqrt())
}

/// Population standard deviation (divides by n).
pub fn population_std(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let ss: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
    (ss / values.len() as f64).sqrt()
}

/// True when `std` is zero up to floating-point noise at `scale`.
pub fn is_degenerate(std: f64, scale: f64) -> bool {
    std <= DEGENERATE_STD_RATIO * scale.abs().max(1.0)
}

fn window_apply<F>(values: &[Option<f64>], window: usize, f: F) -> Vec<Option<f64>>
where
    F: Fn(&[f64]) -> Option<f64>,
{
    let mut out = vec![None; values.len()];
    if window == 0 {
        return out;
    }
    let mut buf = Vec::with_capacity(window);
    for i in (window - 1)..values.len() {
        buf.clear();
        for v in &values[i + 1 - window..=i] {
            match v {
                Some(x) => buf.push(*x),
                None => break,
            }
        }
        if buf.len() == window {
            out[i] = f(&buf);
        }
    }
    out
}

pub fn rolling_mean(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    window_apply(values, window, |w| Some(mean(w)))
}

pub fn rolling_std(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    window_apply(values, window, sample_std)
}

pub fn rolling_max(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    window_apply(values, window, |w| w.iter().copied().reduce(f64::max))
}

pub fn rolling_min(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    window_apply(values, window, |w| w.iter().copied().reduce(f64::min))
}

/// Simple percentage change from the previous element.
pub fn pct_change(closes: &[f64]) -> Vec<Option<f64>> {
    let mut out = vec![None; closes.len()];
    for i in 1..closes.len() {
        let prev = closes[i - 1];
        if prev != 0.0 {
            out[i] = Some(closes[i] / prev - 1.0);
        }
    }
    out
}

/// `values[i] - values[i - lag]` when both are present.
pub fn diff(values: &[Option<f64>], lag: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    for i in lag..values.len() {
        if let (Some(a), Some(b)) = (values[i], values[i - lag]) {
            out[i] = Some(a - b);
        }
    }
    out
}

pub fn present(values: &[f64]) -> Vec<Option<f64>> {
    values.iter().map(|v| Some(*v)).collect()
}

/// Ordinary least squares of `y` on `0..n`. Returns `(slope, r_squared)`.
///
/// `None` when there are fewer than two points or `y` has no variation.
pub fn linear_fit(y: &[f64]) -> Option<(f64, f64)> {
    let n = y.len();
    if n < 2 {
        return None;
    }
    let nf = n as f64;
    let x_mean = (nf - 1.0) / 2.0;
    let y_mean = mean(y);
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (i, v) in y.iter().enumerate() {
        let dx = i as f64 - x_mean;
        let dy = v - y_mean;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if syy == 0.0 || sxx == 0.0 {
        return None;
    }
    let slope = sxy / sxx;
    let r2 = (sxy * sxy) / (sxx * syy);
    Some((slope, r2.clamp(0.0, 1.0)))
}
