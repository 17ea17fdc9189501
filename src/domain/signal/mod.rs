//! Trading signals derived from a [`FeatureFrame`].
//!
//! A signal reads the feature row for a date (or the latest row before it)
//! and reports a directional score with a confidence. Trading signals score
//! in [-1, 1]; the regime filter scores in [0, 1] and acts as a gate on the
//! others inside the ensemble.

pub mod mean_reversion;
pub mod momentum;
pub mod regime;

pub use mean_reversion::MeanReversionSignal;
pub use momentum::MomentumSignal;
pub use regime::RegimeFilterSignal;

use super::features::FeatureFrame;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SignalKind {
    Momentum,
    MeanReversion,
    Regime,
}

impl SignalKind {
    pub fn is_regime(self) -> bool {
        matches!(self, SignalKind::Regime)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SignalKind::Momentum => "momentum",
            SignalKind::MeanReversion => "mean_reversion",
            SignalKind::Regime => "regime",
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignalResult {
    pub kind: SignalKind,
    pub name: &'static str,
    pub date: NaiveDate,
    pub score: f64,
    pub confidence: f64,
    pub description: String,
    pub reason: Option<String>,
    pub components: BTreeMap<String, f64>,
}

impl SignalResult {
    /// A zero-information result.
    pub fn neutral(
        kind: SignalKind,
        name: &'static str,
        date: NaiveDate,
        score: f64,
        description: impl Into<String>,
    ) -> Self {
        SignalResult {
            kind,
            name,
            date,
            score,
            confidence: 0.0,
            description: description.into(),
            reason: None,
            components: BTreeMap::new(),
        }
    }
}

pub trait Signal {
    fn kind(&self) -> SignalKind;
    fn name(&self) -> &'static str;
    fn compute(&self, features: &FeatureFrame, date: NaiveDate) -> SignalResult;
}

pub fn default_signals() -> Vec<Box<dyn Signal + Send + Sync>> {
    vec![
        Box::new(MomentumSignal),
        Box::new(MeanReversionSignal),
        Box::new(RegimeFilterSignal),
    ]
}

/// Run every signal for one date.
pub fn evaluate(
    signals: &[Box<dyn Signal + Send + Sync>],
    features: &FeatureFrame,
    date: NaiveDate,
) -> Vec<SignalResult> {
    signals.iter().map(|s| s.compute(features, date)).collect()
}

pub(crate) fn clip(v: f64, lo: f64, hi: f64) -> f64 {
    if v.is_nan() { 0.0 } else { v.clamp(lo, hi) }
}
