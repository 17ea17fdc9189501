//! Transaction costs: fixed basis-point fees plus a square-root slippage term.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransactionCostModel {
    pub fixed_bps: f64,
    pub slippage_factor: f64,
}

impl Default for TransactionCostModel {
    fn default() -> Self {
        TransactionCostModel {
            fixed_bps: 5.0,
            slippage_factor: 0.001,
        }
    }
}

impl TransactionCostModel {
    /// Dollar cost of trading `notional` at `price`.
    ///
    /// Slippage applies only when `annual_vol` is known and the bar traded
    /// volume: `k * vol * price * sqrt(notional / (volume * price)) * notional`.
    pub fn cost(&self, notional: f64, price: f64, volume: f64, annual_vol: Option<f64>) -> f64 {
        if notional <= 0.0 || price <= 0.0 {
            return 0.0;
        }
        let fixed = notional * self.fixed_bps / 10_000.0;
        let slippage = match annual_vol {
            Some(vol) if volume > 0.0 => {
                let participation = notional / (volume * price);
                self.slippage_factor * vol * price * participation.sqrt() * notional
            }
            _ => 0.0,
        };
        fixed + slippage
    }

    pub fn cost_bps(&self, notional: f64, price: f64, volume: f64, annual_vol: Option<f64>) -> f64 {
        if notional <= 0.0 {
            return 0.0;
        }
        self.cost(notional, price, volume, annual_vol) / notional * 10_000.0
    }
}
