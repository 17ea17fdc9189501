//! Named ensemble configurations.

use super::ensemble::EnsembleModel;
use super::signal::SignalKind;
use std::collections::BTreeMap;

pub const PRESET_NAMES: [&str; 4] = ["default", "trend", "mean_reversion", "conservative"];

#[derive(Debug, Clone, PartialEq)]
pub struct StrategyPreset {
    pub name: &'static str,
    pub signal_weights: Option<BTreeMap<SignalKind, f64>>,
    pub regime_weight: f64,
    pub threshold: f64,
}

impl StrategyPreset {
    pub fn model(&self) -> EnsembleModel {
        EnsembleModel::new(self.signal_weights.clone(), self.regime_weight, self.threshold)
    }
}

fn weighted(momentum: f64, mean_reversion: f64) -> Option<BTreeMap<SignalKind, f64>> {
    Some(BTreeMap::from([
        (SignalKind::Momentum, momentum),
        (SignalKind::MeanReversion, mean_reversion),
    ]))
}

fn lookup(name: &str) -> Option<StrategyPreset> {
    let preset = match name {
        "default" => StrategyPreset {
            name: "default",
            signal_weights: None,
            regime_weight: 0.3,
            threshold: 0.1,
        },
        "trend" => StrategyPreset {
            name: "trend",
            signal_weights: weighted(0.6, 0.2),
            regime_weight: 0.2,
            threshold: 0.15,
        },
        "mean_reversion" => StrategyPreset {
            name: "mean_reversion",
            signal_weights: weighted(0.2, 0.6),
            regime_weight: 0.2,
            threshold: 0.08,
        },
        "conservative" => StrategyPreset {
            name: "conservative",
            signal_weights: None,
            regime_weight: 0.2,
            threshold: 0.2,
        },
        _ => return None,
    };
    Some(preset)
}

/// Resolve a preset by name. `None` and unknown names fall back to `default`;
/// an unknown name also yields a warning.
pub fn get_preset(name: Option<&str>) -> (StrategyPreset, Vec<String>) {
    let mut warnings = Vec::new();
    if let Some(n) = name {
        if let Some(p) = lookup(n) {
            return (p, warnings);
        }
        warnings.push(format!("Unknown preset '{n}', using 'default'"));
    }
    let default = StrategyPreset {
        name: "default",
        signal_weights: None,
        regime_weight: 0.3,
        threshold: 0.1,
    };
    (default, warnings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_named_preset_resolves_without_warning() {
        for name in PRESET_NAMES {
            let (p, w) = get_preset(Some(name));
            assert_eq!(p.name, name);
            assert!(w.is_empty());
        }
    }

    #[test]
    fn unknown_preset_falls_back_with_warning() {
        let (p, w) = get_preset(Some("yolo"));
        assert_eq!(p.name, "default");
        assert_eq!(w, vec!["Unknown preset 'yolo', using 'default'".to_string()]);
        let (p, w) = get_preset(None);
        assert_eq!(p.name, "default");
        assert!(w.is_empty());
    }

    #[test]
    fn trend_preset_favours_momentum() {
        let (p, _) = get_preset(Some("trend"));
        let model = p.model();
        let weights = model.signal_weights.unwrap();
        assert!(weights[&SignalKind::Momentum] > weights[&SignalKind::MeanReversion]);
        assert_eq!(model.threshold, 0.15);
    }
}
