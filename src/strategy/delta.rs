// src/strategy/delta.rs
//
// Delta hedging: a long call portfolio hedged with a short position in the
// underlying, sized to the portfolio's aggregate delta.

use super::selection::select_atm_strikes;
use super::carry_prices;
use crate::models::{HedgeError, HedgeParams, HedgeType, OptionSeries, QuoteRow};
use crate::pricing::PricedCall;
use crate::traits::HedgingStrategy;
use log::debug;
use std::collections::BTreeMap;

/// Position carried from one day to the next.
#[derive(Debug, Clone, PartialEq)]
pub struct DeltaState {
    /// Market value of the call portfolio
    pub long: f64,
    /// Market value of the hedge (aggregate delta × S)
    pub short: f64,
    /// Aggregate delta the hedge is currently sized to
    pub delta: f64,
    /// Latest valid delta of each strike (`None` until one is observed)
    pub strike_deltas: BTreeMap<u32, Option<f64>>,
    /// Latest observed price of each strike
    pub last_prices: BTreeMap<u32, f64>,
}

/// Delta hedge of the at-the-money calls of one series.
pub struct DeltaHedge<'a> {
    rows: &'a [QuoteRow],
    strikes: Vec<u32>,
    cost_basis: f64,
}

impl<'a> DeltaHedge<'a> {
    /// Selects the portfolio on the first row of `series`.
    /// The last row of the series is never simulated.
    pub fn new(series: &'a OptionSeries, params: &HedgeParams) -> Result<Self, HedgeError> {
        if series.len() < 3 {
            return Err(HedgeError::InsufficientData {
                sheet: series.name.clone(),
                rows: series.len(),
            });
        }

        let day0 = &series.rows[0];
        let strikes = select_atm_strikes(day0, params.portfolio_size);
        if strikes.is_empty() {
            return Err(HedgeError::NoQuotedStrikes {
                sheet: series.name.clone(),
                date: day0.date,
            });
        }

        Ok(Self {
            rows: &series.rows,
            strikes,
            cost_basis: params.cost_basis,
        })
    }

    fn price(&self, row: &QuoteRow) -> Vec<PricedCall> {
        self.strikes
            .iter()
            .map(|&strike| PricedCall::from_row(row, strike))
            .collect()
    }
}

impl HedgingStrategy for DeltaHedge<'_> {
    type State = DeltaState;

    fn hedge_type(&self) -> HedgeType {
        HedgeType::Delta
    }

    fn strikes(&self) -> &[u32] {
        &self.strikes
    }

    fn open(&self) -> (DeltaState, f64) {
        let day0 = &self.rows[0];
        let calls = self.price(day0);

        // Strikes without an implied volatility start unhedged
        let delta: f64 = calls.iter().map(|c| c.delta().unwrap_or(0.0)).sum();
        let last_prices = carry_prices(&calls, &BTreeMap::new());
        let long = last_prices.values().sum();
        let short = delta * day0.spot;

        let state = DeltaState {
            long,
            short,
            delta,
            strike_deltas: calls.iter().map(|c| (c.strike, c.delta())).collect(),
            last_prices,
        };
        (state, self.cost_basis * short)
    }

    fn steps(&self) -> usize {
        self.rows.len() - 2
    }

    fn day_index(&self, step: usize) -> usize {
        step + 1
    }

    fn mark(&self, prev: &DeltaState, step: usize) -> DeltaState {
        let row = &self.rows[self.day_index(step)];
        let calls = self.price(row);

        let last_prices = carry_prices(&calls, &prev.last_prices);
        let strike_deltas = calls
            .iter()
            .map(|c| {
                let fallback = prev.strike_deltas.get(&c.strike).copied().flatten();
                (c.strike, c.delta().or(fallback))
            })
            .collect();

        DeltaState {
            long: last_prices.values().sum(),
            short: prev.delta * row.spot,
            delta: prev.delta,
            strike_deltas,
            last_prices,
        }
    }

    fn tracking_error(&self, prev: &DeltaState, current: &DeltaState) -> f64 {
        let dlong = current.long - prev.long;
        let dshort = current.short - prev.short;
        (dlong - dshort).powi(2)
    }

    fn rehedge(&self, prev: &DeltaState, current: &mut DeltaState, step: usize) -> f64 {
        let row = &self.rows[self.day_index(step)];

        let unhedged = current.strike_deltas.values().filter(|d| d.is_none()).count();
        if unhedged > 0 {
            debug!("{} strike(s) without a valid delta on {}", unhedged, row.date);
        }

        let delta: f64 = current.strike_deltas.values().flatten().sum();
        current.delta = delta;
        current.short = delta * row.spot;
        (self.cost_basis * (prev.delta - delta) * row.spot).abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::BlackScholes;
    use crate::simulation::simulate;
    use chrono::NaiveDate;

    fn quote(day: u32, spot: f64, strikes: &[u32], vol: f64) -> QuoteRow {
        let date = NaiveDate::from_ymd_opt(2010, 2, day).unwrap();
        let days = 40 - day;
        let mut row = QuoteRow::new(date, days, spot, 0.01);
        for &k in strikes {
            let price =
                BlackScholes::new(spot, k as f64, row.time_to_maturity, 0.01, vol).call_price();
            row.insert_call(k, price);
        }
        row
    }

    fn series(spots: &[f64]) -> OptionSeries {
        let rows = spots
            .iter()
            .enumerate()
            .map(|(i, &s)| quote(i as u32 + 1, s, &[90, 100, 110], 0.25))
            .collect();
        OptionSeries::new("test", rows)
    }

    #[test]
    fn test_requires_three_rows() {
        let binding = series(&[100.0, 101.0]);
        let err = DeltaHedge::new(&binding, &HedgeParams::default());
        assert!(matches!(err, Err(HedgeError::InsufficientData { rows: 2, .. })));
    }

    #[test]
    fn test_open_sizes_hedge_to_portfolio_delta() {
        let data = series(&[100.0, 101.0, 99.0]);
        let params = HedgeParams::new().with_portfolio_size(2);
        let hedge = DeltaHedge::new(&data, &params).unwrap();
        assert_eq!(hedge.strikes(), &[100, 90]);

        let (state, cost) = hedge.open();
        let expected_delta: f64 = hedge
            .price(&data.rows[0])
            .iter()
            .map(|c| c.delta().unwrap())
            .sum();
        assert!((state.delta - expected_delta).abs() < 1e-12);
        assert!((state.short - expected_delta * 100.0).abs() < 1e-9);
        assert!((cost - 0.01 * state.short).abs() < 1e-12);
    }

    #[test]
    fn test_mark_keeps_yesterdays_delta() {
        let data = series(&[100.0, 104.0, 99.0]);
        let hedge = DeltaHedge::new(&data, &HedgeParams::new().with_portfolio_size(1)).unwrap();
        let (day0, _) = hedge.open();
        let day1 = hedge.mark(&day0, 0);
        assert_eq!(day1.delta, day0.delta);
        assert!((day1.short - day0.delta * 104.0).abs() < 1e-12);
        // Today's implied delta is recorded for the next rebalance
        assert!(day1.strike_deltas[&100].unwrap() > day0.strike_deltas[&100].unwrap());
    }

    #[test]
    fn test_missing_delta_falls_back_to_same_strike() {
        let mut data = series(&[100.0, 101.0, 102.0, 100.0]);
        // Strike 110 trades below intrinsic on day 1: no implied volatility
        data.rows[1].insert_call(110, 0.0);
        let params = HedgeParams::new().with_portfolio_size(3).with_schedule(1);
        let hedge = DeltaHedge::new(&data, &params).unwrap();

        let (day0, _) = hedge.open();
        let day1 = hedge.mark(&day0, 0);
        assert_eq!(day1.strike_deltas[&110], day0.strike_deltas[&110]);
        assert_ne!(day1.strike_deltas[&100], day0.strike_deltas[&100]);
    }

    #[test]
    fn test_missing_quote_carries_last_price() {
        let mut data = series(&[100.0, 101.0, 102.0]);
        data.rows[1].calls.remove(&100);
        let hedge = DeltaHedge::new(&data, &HedgeParams::new().with_portfolio_size(1)).unwrap();
        let (day0, _) = hedge.open();
        let day1 = hedge.mark(&day0, 0);
        assert_eq!(day1.long, day0.long);
        assert_eq!(day1.strike_deltas[&100], day0.strike_deltas[&100]);
    }

    #[test]
    fn test_never_valid_delta_counts_as_zero() {
        let mut data = series(&[100.0, 101.0, 102.0, 103.0]);
        for row in data.rows.iter_mut() {
            row.insert_call(110, 0.0);
        }
        let params = HedgeParams::new().with_portfolio_size(3).with_schedule(1);
        let hedge = DeltaHedge::new(&data, &params).unwrap();
        let ledger = simulate(&hedge, &params);
        assert!(ledger.total_cost().is_finite());
        assert!(ledger.mse().is_finite());
    }

    #[test]
    fn test_simulation_covers_all_but_first_and_last_row() {
        let data = series(&[100.0, 101.0, 99.5, 102.0, 103.0, 101.0]);
        let params = HedgeParams::new().with_portfolio_size(2).with_schedule(2);
        let hedge = DeltaHedge::new(&data, &params).unwrap();
        let ledger = simulate(&hedge, &params);
        assert_eq!(ledger.squared_errors().len(), data.len() - 2);
        assert_eq!(ledger.rehedge_days(), &[2, 4]);
    }
}
