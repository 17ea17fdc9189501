//! Portfolio risk constraints.

use super::ensemble::Direction;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskConstraints {
    pub max_leverage: f64,
    /// Stop when drawdown from peak reaches this (negative) fraction.
    pub max_drawdown: Option<f64>,
    /// Flatten for the day when the daily return reaches this (negative) fraction.
    pub max_daily_loss: Option<f64>,
    pub turnover_threshold: f64,
}

impl Default for RiskConstraints {
    fn default() -> Self {
        RiskConstraints {
            max_leverage: 1.0,
            max_drawdown: None,
            max_daily_loss: None,
            turnover_threshold: 0.1,
        }
    }
}

impl RiskConstraints {
    pub fn apply_leverage(&self, size: f64) -> f64 {
        if size.abs() > self.max_leverage {
            self.max_leverage.copysign(size)
        } else {
            size
        }
    }

    pub fn drawdown_stop(&self, equity: f64, peak: f64) -> bool {
        let Some(limit) = self.max_drawdown else {
            return false;
        };
        if peak <= 0.0 {
            return false;
        }
        let dd = (equity - peak) / peak;
        if dd <= limit {
            warn!(drawdown = dd, limit, "drawdown stop triggered");
            return true;
        }
        false
    }

    pub fn daily_loss_stop(&self, daily_return: f64) -> bool {
        match self.max_daily_loss {
            Some(limit) if daily_return <= limit => {
                warn!(daily_return, limit, "daily loss stop triggered");
                true
            }
            _ => false,
        }
    }

    /// Trade on a direction change, or when confidence moved by at least the threshold.
    pub fn should_trade(
        &self,
        direction: Direction,
        prev_direction: Direction,
        confidence: f64,
        prev_confidence: f64,
    ) -> bool {
        direction != prev_direction
            || (confidence - prev_confidence).abs() >= self.turnover_threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leverage_clamps_both_sides() {
        let c = RiskConstraints {
            max_leverage: 0.5,
            ..RiskConstraints::default()
        };
        assert_eq!(c.apply_leverage(0.8), 0.5);
        assert_eq!(c.apply_leverage(-0.8), -0.5);
        assert_eq!(c.apply_leverage(0.3), 0.3);
    }

    #[test]
    fn drawdown_stop_only_when_configured() {
        let none = RiskConstraints::default();
        assert!(!none.drawdown_stop(50.0, 100.0));
        let c = RiskConstraints {
            max_drawdown: Some(-0.2),
            ..RiskConstraints::default()
        };
        assert!(!c.drawdown_stop(85.0, 100.0));
        assert!(c.drawdown_stop(80.0, 100.0));
        assert!(!c.drawdown_stop(80.0, 0.0));
    }

    #[test]
    fn daily_loss_stop() {
        let c = RiskConstraints {
            max_daily_loss: Some(-0.05),
            ..RiskConstraints::default()
        };
        assert!(c.daily_loss_stop(-0.06));
        assert!(!c.daily_loss_stop(-0.01));
    }

    #[test]
    fn turnover_filter() {
        let c = RiskConstraints::default();
        assert!(c.should_trade(Direction::Long, Direction::Flat, 0.5, 0.5));
        assert!(!c.should_trade(Direction::Long, Direction::Long, 0.55, 0.5));
        assert!(c.should_trade(Direction::Long, Direction::Long, 0.7, 0.5));
    }
}
