//! Volatility-targeted position sizing.

use super::ensemble::Direction;
use tracing::debug;

pub const DEFAULT_VOL_FLOOR: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizingParams {
    /// Daily volatility target, e.g. 0.01 for 1% per day.
    pub target_volatility: f64,
    pub max_position_size: f64,
    pub vol_floor: f64,
}

impl Default for SizingParams {
    fn default() -> Self {
        SizingParams {
            target_volatility: 0.01,
            max_position_size: 1.0,
            vol_floor: DEFAULT_VOL_FLOOR,
        }
    }
}

/// Fraction of equity to allocate, given a forecast and the asset's daily volatility.
///
/// Both `daily_vol` and the target are daily figures. A non-positive vol
/// falls back to half the confidence.
pub fn compute_position_size(
    direction: Direction,
    confidence: f64,
    daily_vol: f64,
    params: &SizingParams,
) -> f64 {
    if direction == Direction::Flat {
        return 0.0;
    }
    if daily_vol <= 0.0 || !daily_vol.is_finite() {
        debug!(daily_vol, "non-positive volatility, using fallback size");
        return confidence * 0.5;
    }
    let vol = daily_vol.max(params.vol_floor);
    let size = params.target_volatility / vol * confidence;
    size.min(params.max_position_size).max(0.0)
}
