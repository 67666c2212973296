// src/strategy/selection.rs

use crate::models::QuoteRow;
use std::cmp::Ordering;

/// Picks the `count` quoted strikes closest to the money on `row`.
///
/// Strikes are ranked by `|S - E|`; equally distant strikes are ranked by
/// ascending strike, so the lower strike wins a tie. Strikes without a quote
/// on `row` are never selected. Fewer than `count` strikes are returned when
/// the chain is thinner than that.
pub fn select_atm_strikes(row: &QuoteRow, count: usize) -> Vec<u32> {
    let mut strikes: Vec<(f64, u32)> = row
        .quoted_strikes()
        .map(|strike| ((row.spot - strike as f64).abs(), strike))
        .collect();

    strikes.sort_by(|a, b| {
        a.0.partial_cmp(&b.0)
            .unwrap_or(Ordering::Equal)
            .then(a.1.cmp(&b.1))
    });

    strikes.into_iter().take(count).map(|(_, strike)| strike).collect()
}
