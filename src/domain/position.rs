//! Single-instrument position with average-entry accounting.

/// Share counts below this are treated as flat.
pub const SHARE_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    /// Signed share count: positive long, negative short.
    pub shares: f64,
    /// Average entry price of the open shares; 0 when flat.
    pub entry_price: f64,
}

impl Position {
    pub fn is_flat(&self) -> bool {
        self.shares.abs() < SHARE_EPSILON
    }

    pub fn is_long(&self) -> bool {
        self.shares >= SHARE_EPSILON
    }

    pub fn is_short(&self) -> bool {
        self.shares <= -SHARE_EPSILON
    }

    /// Signed value of the position at `price`.
    pub fn market_value(&self, price: f64) -> f64 {
        self.shares * price
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        if self.is_flat() {
            0.0
        } else {
            self.shares * (price - self.entry_price)
        }
    }

    /// Move to `target` shares at `price`, returning the realised P&L.
    ///
    /// Adding re-averages the entry price. Reducing realises P&L on the
    /// closed shares and keeps the entry price. Crossing zero realises the
    /// whole old position and opens the remainder at `price`.
    pub fn rebalance(&mut self, target: f64, price: f64) -> f64 {
        let old = self.shares;
        let delta = target - old;

        let pnl = if self.is_flat() {
            self.entry_price = price;
            0.0
        } else if old.signum() == delta.signum() {
            let total = old.abs() + delta.abs();
            self.entry_price = (old.abs() * self.entry_price + delta.abs() * price) / total;
            0.0
        } else {
            let closed = old.abs().min(delta.abs());
            let realised = closed * (price - self.entry_price) * old.signum();
            if target.abs() >= SHARE_EPSILON && target.signum() != old.signum() {
                self.entry_price = price;
            }
            realised
        };

        self.shares = target;
        if self.is_flat() {
            self.shares = 0.0;
            self.entry_price = 0.0;
        }
        pnl
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn open_long_has_no_pnl() {
        let mut p = Position::default();
        assert_eq!(p.rebalance(100.0, 50.0), 0.0);
        assert!(p.is_long());
        assert_eq!(p.entry_price, 50.0);
    }

    #[test]
    fn adding_reaverages_entry() {
        let mut p = Position::default();
        p.rebalance(100.0, 50.0);
        assert_eq!(p.rebalance(200.0, 60.0), 0.0);
        assert_abs_diff_eq!(p.entry_price, 55.0);
    }

    #[test]
    fn partial_reduce_realises_on_closed_shares() {
        let mut p = Position::default();
        p.rebalance(100.0, 50.0);
        let pnl = p.rebalance(40.0, 55.0);
        assert_abs_diff_eq!(pnl, 300.0);
        assert_eq!(p.entry_price, 50.0);
        assert_eq!(p.shares, 40.0);
    }

    #[test]
    fn full_close_resets() {
        let mut p = Position::default();
        p.rebalance(-100.0, 50.0);
        let pnl = p.rebalance(0.0, 45.0);
        assert_abs_diff_eq!(pnl, 500.0);
        assert!(p.is_flat());
        assert_eq!(p.entry_price, 0.0);
    }

    #[test]
    fn reversal_realises_old_and_opens_new() {
        let mut p = Position::default();
        p.rebalance(100.0, 50.0);
        let pnl = p.rebalance(-30.0, 48.0);
        assert_abs_diff_eq!(pnl, -200.0);
        assert!(p.is_short());
        assert_eq!(p.entry_price, 48.0);
        assert_abs_diff_eq!(p.unrealized_pnl(46.0), 60.0);
    }

    #[test]
    fn market_value_is_signed() {
        let p = Position {
            shares: -10.0,
            entry_price: 20.0,
        };
        assert_eq!(p.market_value(25.0), -250.0);
        assert_eq!(p.unrealized_pnl(25.0), -50.0);
    }
}
