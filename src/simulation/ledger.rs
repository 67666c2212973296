// src/simulation/ledger.rs

/// Running record of one hedging simulation: tracking errors, costs and rebalance days.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct HedgeLedger {
    /// Squared P&L mismatch per simulated day
    squared_errors: Vec<f64>,
    /// Establishment cost plus every rebalance cost
    total_cost: f64,
    /// Day indices on which a rebalance happened
    rehedge_days: Vec<usize>,
}

impl HedgeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a transaction cost. Costs are absolute values, so the total never decreases.
    pub fn charge(&mut self, cost: f64) {
        debug_assert!(cost.is_nan() || cost >= 0.0, "negative cost {}", cost);
        self.total_cost += cost;
    }

    pub fn record_error(&mut self, squared_error: f64) {
        self.squared_errors.push(squared_error);
    }

    pub fn record_rehedge(&mut self, day: usize, cost: f64) {
        self.rehedge_days.push(day);
        self.charge(cost);
    }

    /// Arithmetic mean of the squared errors (NaN when no day was simulated).
    pub fn mse(&self) -> f64 {
        if self.squared_errors.is_empty() {
            return f64::NAN;
        }
        self.squared_errors.iter().sum::<f64>() / self.squared_errors.len() as f64
    }

    pub fn total_cost(&self) -> f64 {
        self.total_cost
    }

    pub fn squared_errors(&self) -> &[f64] {
        &self.squared_errors
    }

    pub fn rehedge_days(&self) -> &[usize] {
        &self.rehedge_days
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mse_is_mean_of_errors() {
        let mut ledger = HedgeLedger::new();
        for e in [1.0, 4.0, 0.0, 3.0] {
            ledger.record_error(e);
        }
        assert_eq!(ledger.squared_errors().len(), 4);
        assert!((ledger.mse() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_ledger_mse_is_nan() {
        assert!(HedgeLedger::new().mse().is_nan());
    }

    #[test]
    fn test_costs_accumulate() {
        let mut ledger = HedgeLedger::new();
        ledger.charge(1.5);
        ledger.record_rehedge(2, 0.25);
        ledger.record_rehedge(4, 0.0);
        assert!((ledger.total_cost() - 1.75).abs() < 1e-12);
        assert_eq!(ledger.rehedge_days(), &[2, 4]);
    }
}
