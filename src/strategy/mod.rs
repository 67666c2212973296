// src/strategy/mod.rs

// 1. The hedging strategies and the strike selection they share
pub mod delta;
pub mod delta_vega;
pub mod selection;

// 2. Re-exports for cleaner imports ('use crate::strategy::DeltaHedge')
pub use delta::{DeltaHedge, DeltaState};
pub use delta_vega::{DeltaVegaHedge, DeltaVegaState, HedgeRatios};
pub use selection::select_atm_strikes;

use crate::pricing::PricedCall;
use std::collections::BTreeMap;

/// Today's price of every call, falling back to the last observed price of the
/// same strike when it was not quoted today.
pub(crate) fn carry_prices(calls: &[PricedCall], last: &BTreeMap<u32, f64>) -> BTreeMap<u32, f64> {
    calls
        .iter()
        .filter_map(|c| {
            c.observed
                .or_else(|| last.get(&c.strike).copied())
                .map(|price| (c.strike, price))
        })
        .collect()
}
