//! Bar normalisation and data-quality checks.
//!
//! Every provider funnels its rows through [`normalize_bars`], so the rest of
//! the domain can rely on ascending, de-duplicated, internally consistent
//! bars. Problems that can be repaired are repaired and reported as warnings;
//! nothing here fails.

use super::ohlcv::OhlcvBar;
use tracing::warn;

/// Close-to-close move above which a bar is flagged as a suspicious jump.
pub const JUMP_THRESHOLD: f64 = 0.35;

#[derive(Debug, Clone, Default)]
pub struct NormalizedBars {
    pub bars: Vec<OhlcvBar>,
    pub warnings: Vec<String>,
}

pub fn normalize_bars(raw: Vec<OhlcvBar>) -> NormalizedBars {
    let mut warnings = Vec::new();

    let before = raw.len();
    let mut bars: Vec<OhlcvBar> = raw.into_iter().filter(|b| b.is_finite()).collect();
    let dropped = before - bars.len();
    if dropped > 0 {
        warnings.push(format!("Dropped {dropped} row(s) with missing values"));
    }

    // Stable sort keeps file order among equal dates, so dedup can keep the last.
    bars.sort_by_key(|b| b.date);
    let mut deduped: Vec<OhlcvBar> = Vec::with_capacity(bars.len());
    let mut duplicates = 0usize;
    for bar in bars {
        match deduped.last_mut() {
            Some(last) if last.date == bar.date => {
                *last = bar;
                duplicates += 1;
            }
            _ => deduped.push(bar),
        }
    }
    if duplicates > 0 {
        warnings.push(format!("Removed {duplicates} duplicate date(s)"));
    }

    let mut high_fixed = 0usize;
    let mut low_fixed = 0usize;
    let mut volume_fixed = 0usize;
    for bar in &mut deduped {
        let max_body = bar.open.max(bar.close).max(bar.low);
        if bar.high < max_body {
            bar.high = max_body;
            high_fixed += 1;
        }
        let min_body = bar.open.min(bar.close).min(bar.high);
        if bar.low > min_body {
            bar.low = min_body;
            low_fixed += 1;
        }
        if bar.volume < 0.0 {
            bar.volume = 0.0;
            volume_fixed += 1;
        }
    }
    if high_fixed > 0 {
        warnings.push(format!(
            "Fixed {high_fixed} bar(s) where high was below open/close/low"
        ));
    }
    if low_fixed > 0 {
        warnings.push(format!(
            "Fixed {low_fixed} bar(s) where low was above open/close/high"
        ));
    }
    if volume_fixed > 0 {
        warnings.push(format!("Set {volume_fixed} negative volume value(s) to 0"));
    }

    let jumps = deduped
        .windows(2)
        .filter(|w| w[0].close != 0.0 && ((w[1].close / w[0].close) - 1.0).abs() > JUMP_THRESHOLD)
        .count();
    if jumps > 0 {
        warnings.push(format!(
            "Detected {jumps} price jump(s) greater than {:.0}% (possible split or bad data)",
            JUMP_THRESHOLD * 100.0
        ));
    }

    if let Some(last) = deduped.last() {
        if last.close < 1.0 || last.close > 10_000.0 {
            warnings.push(format!(
                "Unusual price level: last close is {:.2}",
                last.close
            ));
        }
    }

    for w in &warnings {
        warn!(warning = %w, "bar normalisation");
    }

    NormalizedBars {
        bars: deduped,
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    fn bar(day: u32, close: f64) -> OhlcvBar {
        OhlcvBar::new(d(day), close, close + 1.0, close - 1.0, close, 1000.0)
    }

    #[test]
    fn clean_input_has_no_warnings() {
        let out = normalize_bars(vec![bar(1, 100.0), bar(2, 101.0), bar(3, 102.0)]);
        assert_eq!(out.bars.len(), 3);
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn sorts_and_keeps_last_duplicate() {
        let mut dup = bar(2, 200.0);
        dup.close = 105.0;
        let out = normalize_bars(vec![bar(3, 102.0), bar(2, 101.0), bar(1, 100.0), dup]);
        let dates: Vec<_> = out.bars.iter().map(|b| b.date).collect();
        assert_eq!(dates, vec![d(1), d(2), d(3)]);
        assert!((out.bars[1].close - 105.0).abs() < f64::EPSILON);
        assert!(out.warnings.iter().any(|w| w.contains("1 duplicate")));
    }

    #[test]
    fn drops_non_finite_rows() {
        let mut bad = bar(2, 101.0);
        bad.close = f64::NAN;
        let out = normalize_bars(vec![bar(1, 100.0), bad, bar(3, 102.0)]);
        assert_eq!(out.bars.len(), 2);
        assert!(out.warnings[0].contains("Dropped 1"));
    }

    #[test]
    fn repairs_inconsistent_high_low_and_volume() {
        let broken = OhlcvBar::new(d(1), 100.0, 99.0, 101.0, 100.5, -5.0);
        let out = normalize_bars(vec![broken]);
        let b = &out.bars[0];
        assert!(b.high >= b.open.max(b.close).max(b.low));
        assert!(b.low <= b.open.min(b.close).min(b.high));
        assert_eq!(b.volume, 0.0);
        assert_eq!(out.warnings.len(), 3);
    }

    #[test]
    fn flags_large_jumps_without_dropping() {
        let out = normalize_bars(vec![bar(1, 100.0), bar(2, 150.0), bar(3, 151.0)]);
        assert_eq!(out.bars.len(), 3);
        assert!(out.warnings.iter().any(|w| w.contains("1 price jump")));
    }

    #[test]
    fn flags_unusual_last_price() {
        let out = normalize_bars(vec![bar(1, 0.5)]);
        assert!(out.warnings.iter().any(|w| w.starts_with("Unusual price level")));
    }
}
