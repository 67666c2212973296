// src/simulation/mod.rs
//
// The day-by-day driver shared by every hedging strategy.

pub mod ledger;

pub use ledger::HedgeLedger;

use crate::models::HedgeParams;
use crate::traits::HedgingStrategy;
use log::debug;

/// Runs `strategy` over its window and returns the ledger of errors and costs.
///
/// Day 0 opens the hedge. Every following day the position is first valued with
/// yesterday's hedge ratios, the squared mismatch is recorded, and on days where
/// `t mod schedule == 0` the strategy rebalances.
pub fn simulate<H: HedgingStrategy>(strategy: &H, params: &HedgeParams) -> HedgeLedger {
    let mut ledger = HedgeLedger::new();

    let (mut prev, opening_cost) = strategy.open();
    ledger.charge(opening_cost);

    for step in 0..strategy.steps() {
        let t = strategy.day_index(step);
        let mut state = strategy.mark(&prev, step);
        ledger.record_error(strategy.tracking_error(&prev, &state));

        if params.is_rehedge_day(t) {
            let cost = strategy.rehedge(&prev, &mut state, step);
            debug!("{} rehedge on day {}: cost {:.4}", strategy.hedge_type(), t, cost);
            ledger.record_rehedge(t, cost);
        }
        prev = state;
    }

    ledger
}
